pub mod feedback;
pub mod schedule;
