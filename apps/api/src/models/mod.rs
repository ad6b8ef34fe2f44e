pub mod interview;
pub mod jobs;
pub mod org;
pub mod user;
