pub mod candidates;
pub mod listings;
pub mod matching;
