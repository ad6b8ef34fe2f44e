//! Employee accounts as seen by authentication.
//!
//! Every authenticated request resolves its caller through an
//! `AccountDirectory`, so a deactivated or re-designated employee loses
//! their old privileges on the next request rather than at token expiry.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::roles::role_for_designation;
use crate::errors::AppError;
use crate::models::user::User;

/// Employee joined with its designation title.
#[derive(Debug, FromRow)]
pub struct EmployeeAccount {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub branch_id: Uuid,
    pub department_id: Option<Uuid>,
    pub designation_title: Option<String>,
}

impl EmployeeAccount {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            role: role_for_designation(self.designation_title.as_deref()),
            name: self.name,
            email: self.email,
            designation: self.designation_title,
            branch_id: Some(self.branch_id),
            department_id: self.department_id,
        }
    }
}

const ACCOUNT_QUERY: &str = r#"
    SELECT e.id, e.name, e.email, e.password_hash, e.branch_id, e.department_id,
           d.title AS designation_title
    FROM employees e
    LEFT JOIN designations d ON d.id = e.designation_id
"#;

pub async fn find_account_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<EmployeeAccount>, AppError> {
    let sql = format!("{ACCOUNT_QUERY} WHERE lower(e.email) = lower($1) AND e.is_active");
    Ok(sqlx::query_as::<_, EmployeeAccount>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?)
}

pub async fn find_account_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<EmployeeAccount>, AppError> {
    let sql = format!("{ACCOUNT_QUERY} WHERE e.id = $1 AND e.is_active");
    Ok(sqlx::query_as::<_, EmployeeAccount>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// The active account behind `id`, with its role resolved from the
    /// current designation. `None` when missing or deactivated.
    async fn active_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
}

pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PgAccountDirectory {
    async fn active_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(find_account_by_id(&self.pool, id)
            .await?
            .map(EmployeeAccount::into_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn account(designation: Option<&str>) -> EmployeeAccount {
        EmployeeAccount {
            id: Uuid::new_v4(),
            name: "Asha Rao".into(),
            email: "asha.rao@example.com".into(),
            password_hash: "$argon2id$placeholder".into(),
            branch_id: Uuid::new_v4(),
            department_id: None,
            designation_title: designation.map(str::to_string),
        }
    }

    #[test]
    fn test_role_comes_from_designation() {
        assert_eq!(account(Some("Branch Manager")).into_user().role, UserRole::BranchManager);
        assert_eq!(account(None).into_user().role, UserRole::Applicant);
    }

    #[test]
    fn test_user_never_carries_password_hash() {
        let json = serde_json::to_value(account(Some("CEO")).into_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "ceo");
    }
}
