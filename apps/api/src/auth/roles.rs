use crate::errors::AppError;
use crate::models::user::UserRole;

/// Designation title → role lookup. Matched case-insensitively after trimming.
const DESIGNATION_ROLES: &[(&str, UserRole)] = &[
    ("ceo", UserRole::Ceo),
    ("chief executive officer", UserRole::Ceo),
    ("branch manager", UserRole::BranchManager),
    ("marketing head", UserRole::MarketingHead),
    ("marketing supervisor", UserRole::MarketingSupervisor),
    ("marketing recruiter", UserRole::MarketingRecruiter),
    ("recruiter", UserRole::MarketingRecruiter),
    ("marketing associate", UserRole::MarketingAssociate),
    ("associate", UserRole::MarketingAssociate),
];

/// Resolves a role from an employee's designation title.
/// Unknown or missing designations get the least-privileged role.
pub fn role_for_designation(designation: Option<&str>) -> UserRole {
    let Some(title) = designation else {
        return UserRole::Applicant;
    };
    let normalized = title.split_whitespace().collect::<Vec<_>>().join(" ");
    DESIGNATION_ROLES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&normalized))
        .map(|(_, role)| *role)
        .unwrap_or(UserRole::Applicant)
}

/// Only a CEO may create, rename to, or hand out a title that resolves to
/// the CEO role.
pub fn ensure_can_grant(caller: UserRole, title: &str) -> Result<(), AppError> {
    if role_for_designation(Some(title)) == UserRole::Ceo && caller != UserRole::Ceo {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_designations() {
        assert_eq!(role_for_designation(Some("CEO")), UserRole::Ceo);
        assert_eq!(
            role_for_designation(Some("Branch Manager")),
            UserRole::BranchManager
        );
        assert_eq!(
            role_for_designation(Some("marketing head")),
            UserRole::MarketingHead
        );
        assert_eq!(
            role_for_designation(Some("Recruiter")),
            UserRole::MarketingRecruiter
        );
    }

    #[test]
    fn test_whitespace_is_normalized() {
        assert_eq!(
            role_for_designation(Some("  Marketing   Supervisor ")),
            UserRole::MarketingSupervisor
        );
    }

    #[test]
    fn test_unknown_falls_back_to_applicant() {
        assert_eq!(role_for_designation(Some("Janitor")), UserRole::Applicant);
        assert_eq!(role_for_designation(None), UserRole::Applicant);
    }

    #[test]
    fn test_ceo_title_needs_ceo_caller() {
        assert!(matches!(
            ensure_can_grant(UserRole::BranchManager, "CEO"),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_can_grant(UserRole::BranchManager, " chief  executive officer ").is_err());
        assert!(ensure_can_grant(UserRole::Ceo, "CEO").is_ok());
        assert!(ensure_can_grant(UserRole::BranchManager, "Recruiter").is_ok());
    }
}
