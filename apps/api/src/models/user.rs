use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of roles a signed-in user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    Ceo,
    BranchManager,
    MarketingHead,
    MarketingSupervisor,
    MarketingRecruiter,
    MarketingAssociate,
    Applicant,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Ceo => "ceo",
            UserRole::BranchManager => "branch-manager",
            UserRole::MarketingHead => "marketing-head",
            UserRole::MarketingSupervisor => "marketing-supervisor",
            UserRole::MarketingRecruiter => "marketing-recruiter",
            UserRole::MarketingAssociate => "marketing-associate",
            UserRole::Applicant => "applicant",
        }
    }

    /// Roles allowed to see company-facing profit figures.
    pub fn sees_company_financials(self) -> bool {
        matches!(
            self,
            UserRole::Ceo
                | UserRole::BranchManager
                | UserRole::MarketingHead
                | UserRole::MarketingSupervisor
        )
    }

    /// Roles allowed to mutate organization records.
    pub fn is_administrator(self) -> bool {
        matches!(self, UserRole::Ceo | UserRole::BranchManager)
    }
}

/// The signed-in user as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub designation: Option<String>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_kebab_case() {
        let v = serde_json::to_value(UserRole::MarketingSupervisor).unwrap();
        assert_eq!(v, "marketing-supervisor");
        assert_eq!(UserRole::BranchManager.as_str(), "branch-manager");
    }

    #[test]
    fn test_financial_visibility_roles() {
        assert!(UserRole::Ceo.sees_company_financials());
        assert!(UserRole::MarketingSupervisor.sees_company_financials());
        assert!(!UserRole::MarketingRecruiter.sees_company_financials());
        assert!(!UserRole::Applicant.sees_company_financials());
    }
}
