// Organization administration: branches, departments, roles, designations,
// leave types and employees. Reads need any signed-in employee; writes need
// an administrator.

pub mod branches;
pub mod departments;
pub mod designations;
pub mod employees;
pub mod guards;
pub mod leave_types;
pub mod roles;
