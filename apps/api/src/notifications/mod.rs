// Per-user notifications held in memory, plus the mocked email side effect.
// Nothing here survives a restart.

pub mod handlers;
pub mod mailer;
pub mod seed;
pub mod store;
