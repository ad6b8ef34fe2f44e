//! Delete guards for organization records.
//!
//! Protected records (headquarters, system roles, defaults) and records that
//! still have dependents are refused with 409.

use crate::errors::AppError;
use crate::models::org::{BranchRow, DesignationRow, LeaveTypeRow, RoleRow};

pub fn ensure_branch_deletable(branch: &BranchRow, department_count: i64) -> Result<(), AppError> {
    if branch.is_headquarters {
        return Err(AppError::Conflict(format!(
            "Branch '{}' is the headquarters and cannot be deleted",
            branch.name
        )));
    }
    if department_count > 0 {
        return Err(AppError::Conflict(format!(
            "Branch '{}' still has {department_count} department(s)",
            branch.name
        )));
    }
    Ok(())
}

pub fn ensure_department_deletable(name: &str, member_count: i64) -> Result<(), AppError> {
    if member_count > 0 {
        return Err(AppError::Conflict(format!(
            "Department '{name}' still has {member_count} member(s)"
        )));
    }
    Ok(())
}

pub fn ensure_role_deletable(role: &RoleRow) -> Result<(), AppError> {
    if role.is_system {
        return Err(AppError::Conflict(format!(
            "Role '{}' is a system role and cannot be deleted",
            role.name
        )));
    }
    Ok(())
}

pub fn ensure_designation_deletable(
    designation: &DesignationRow,
    employee_count: i64,
) -> Result<(), AppError> {
    if designation.is_default {
        return Err(AppError::Conflict(format!(
            "Designation '{}' is a default designation and cannot be deleted",
            designation.title
        )));
    }
    if employee_count > 0 {
        return Err(AppError::Conflict(format!(
            "Designation '{}' is assigned to {employee_count} employee(s)",
            designation.title
        )));
    }
    Ok(())
}

pub fn ensure_leave_type_deletable(leave_type: &LeaveTypeRow) -> Result<(), AppError> {
    if leave_type.is_default {
        return Err(AppError::Conflict(format!(
            "Leave type '{}' is a default leave type and cannot be deleted",
            leave_type.name
        )));
    }
    Ok(())
}
