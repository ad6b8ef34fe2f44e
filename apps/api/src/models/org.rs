use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BranchRow {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_headquarters: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DepartmentRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DesignationRow {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LeaveTypeRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub days_per_year: i32,
    pub is_paid: bool,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EmployeeRow {
    pub id: Uuid,
    pub employee_code: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub branch_id: Uuid,
    pub department_id: Option<Uuid>,
    pub designation_id: Option<Uuid>,
    pub is_active: bool,
    pub joined_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_never_serialized() {
        let now = Utc::now();
        let row = EmployeeRow {
            id: Uuid::new_v4(),
            employee_code: "EMP-001".into(),
            name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: None,
            password_hash: "$argon2id$secret".into(),
            branch_id: Uuid::new_v4(),
            department_id: None,
            designation_id: None,
            is_active: true,
            joined_on: now.date_naive(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }
}
