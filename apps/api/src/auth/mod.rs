// Local credential authentication and session tokens.
// Login maps an employee record onto a `User`; every other module consumes
// `CurrentUser` through the extractor.

pub mod accounts;
pub mod extractor;
pub mod handlers;
pub mod password;
pub mod roles;
pub mod session;
