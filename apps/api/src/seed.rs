//! Default records inserted into an empty database at startup, so a fresh
//! install has an HQ, the built-in catalogue and one account to log in with.

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::Config;
use crate::org::roles::PERMISSIONS;

const HQ_NAME: &str = "Headquarters";
const HQ_CODE: &str = "HQ";

const DEPARTMENTS: &[(&str, &str)] = &[
    ("Management", "Executive leadership"),
    ("Talent Acquisition", "Sourcing, screening and placement"),
    ("Marketing", "Client acquisition and account management"),
    ("Human Resources", "People operations and leave administration"),
];

/// Every default title resolves to a role through the designation table.
const DESIGNATIONS: &[&str] = &[
    "CEO",
    "Branch Manager",
    "Marketing Head",
    "Marketing Supervisor",
    "Marketing Recruiter",
    "Marketing Associate",
];

/// (name, days per year, paid)
const LEAVE_TYPES: &[(&str, i32, bool)] = &[
    ("Annual Leave", 18, true),
    ("Sick Leave", 10, true),
    ("Casual Leave", 6, true),
    ("Unpaid Leave", 0, false),
];

/// (name, description, permission keys; `None` grants the whole catalogue)
const SYSTEM_ROLES: &[(&str, &str, Option<&[&str]>)] = &[
    ("Administrator", "Full access", None),
    (
        "Manager",
        "Branch-level management",
        Some(&[
            "branches.view",
            "departments.view",
            "departments.manage",
            "employees.view",
            "employees.manage",
            "jobs.view",
            "jobs.manage",
            "interviews.schedule",
            "profit.view",
        ]),
    ),
    (
        "Recruiter",
        "Day-to-day recruitment",
        Some(&[
            "jobs.view",
            "candidates.manage",
            "interviews.schedule",
            "feedback.submit",
        ]),
    ),
];

/// (title, client, location, skills, client budget, company %, candidate offer, fee %)
const DEMO_JOBS: &[(&str, &str, &str, &[&str], f64, f64, f64, f64)] = &[
    (
        "Senior Rust Engineer",
        "Northwind Logistics",
        "Remote",
        &["Rust", "PostgreSQL", "Tokio", "Docker"],
        120.0,
        20.0,
        90.0,
        5.0,
    ),
    (
        "Frontend Developer",
        "Contoso Retail",
        "Pune",
        &["React", "TypeScript", "CSS"],
        80.0,
        15.0,
        62.0,
        4.0,
    ),
];

/// (name, email, skills, years of experience)
const DEMO_CANDIDATES: &[(&str, &str, &[&str], f64)] = &[
    ("Asha Rao", "asha.rao@example.com", &["Rust", "PostgreSQL", "Docker"], 6.0),
    ("Ben Ortiz", "ben.ortiz@example.com", &["React Native", "TypeScript"], 3.0),
    ("Chen Wei", "chen.wei@example.com", &["Rust", "Tokio", "Kubernetes"], 8.0),
];

async fn is_empty(tx: &mut Transaction<'_, Postgres>, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(&mut **tx)
        .await?;
    Ok(count == 0)
}

async fn seed_headquarters(tx: &mut Transaction<'_, Postgres>) -> Result<Uuid> {
    if let Some(id) =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM branches WHERE is_headquarters LIMIT 1")
            .fetch_optional(&mut **tx)
            .await?
    {
        return Ok(id);
    }
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO branches (name, code, description, is_headquarters)
        VALUES ($1, $2, 'Head office', TRUE)
        RETURNING id
        "#,
    )
    .bind(HQ_NAME)
    .bind(HQ_CODE)
    .fetch_one(&mut **tx)
    .await?;
    info!("Seeded headquarters branch");
    Ok(id)
}

async fn seed_org(tx: &mut Transaction<'_, Postgres>, hq: Uuid) -> Result<()> {
    if is_empty(tx, "departments").await? {
        for (name, description) in DEPARTMENTS {
            sqlx::query("INSERT INTO departments (branch_id, name, description) VALUES ($1, $2, $3)")
                .bind(hq)
                .bind(name)
                .bind(description)
                .execute(&mut **tx)
                .await?;
        }
        info!("Seeded {} departments", DEPARTMENTS.len());
    }

    if is_empty(tx, "designations").await? {
        for title in DESIGNATIONS {
            sqlx::query(
                "INSERT INTO designations (branch_id, title, is_default) VALUES ($1, $2, TRUE)",
            )
            .bind(hq)
            .bind(title)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded {} designations", DESIGNATIONS.len());
    }

    if is_empty(tx, "roles").await? {
        for (name, description, keys) in SYSTEM_ROLES {
            let permissions: Vec<String> = match keys {
                Some(keys) => keys.iter().map(|k| k.to_string()).collect(),
                None => PERMISSIONS.iter().map(|(k, _, _)| k.to_string()).collect(),
            };
            sqlx::query(
                "INSERT INTO roles (name, description, permissions, is_system) VALUES ($1, $2, $3, TRUE)",
            )
            .bind(name)
            .bind(description)
            .bind(&permissions)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded {} system roles", SYSTEM_ROLES.len());
    }

    if is_empty(tx, "leave_types").await? {
        for (name, days, paid) in LEAVE_TYPES {
            sqlx::query(
                "INSERT INTO leave_types (name, days_per_year, is_paid, is_default) VALUES ($1, $2, $3, TRUE)",
            )
            .bind(name)
            .bind(days)
            .bind(paid)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded {} leave types", LEAVE_TYPES.len());
    }
    Ok(())
}

async fn seed_admin(tx: &mut Transaction<'_, Postgres>, hq: Uuid, config: &Config) -> Result<()> {
    if !is_empty(tx, "employees").await? {
        return Ok(());
    }
    let department: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM departments WHERE branch_id = $1 AND name = 'Management'",
    )
    .bind(hq)
    .fetch_optional(&mut **tx)
    .await?;
    let designation: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM designations WHERE branch_id = $1 AND title = 'CEO'")
            .bind(hq)
            .fetch_optional(&mut **tx)
            .await?;
    let password_hash = hash_password(&config.seed_admin_password)?;

    sqlx::query(
        r#"
        INSERT INTO employees
            (employee_code, name, email, password_hash, branch_id, department_id, designation_id)
        VALUES ('EMP-0001', 'Administrator', $1, $2, $3, $4, $5)
        "#,
    )
    .bind(config.seed_admin_email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(hq)
    .bind(department)
    .bind(designation)
    .execute(&mut **tx)
    .await?;
    info!("Seeded CEO account {}", config.seed_admin_email);
    Ok(())
}

async fn seed_recruitment(tx: &mut Transaction<'_, Postgres>) -> Result<()> {
    if is_empty(tx, "job_listings").await? {
        for (title, client, location, skills, budget, company_pct, offer, fee_pct) in DEMO_JOBS {
            let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
            sqlx::query(
                r#"
                INSERT INTO job_listings
                    (title, client_name, location, skills, client_budget,
                     company_profit_pct, candidate_offer, consultancy_fee_pct)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(title)
            .bind(client)
            .bind(location)
            .bind(&skills)
            .bind(budget)
            .bind(company_pct)
            .bind(offer)
            .bind(fee_pct)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded {} demo jobs", DEMO_JOBS.len());
    }

    if is_empty(tx, "job_candidates").await? {
        for (name, email, skills, years) in DEMO_CANDIDATES {
            let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
            sqlx::query(
                "INSERT INTO job_candidates (name, email, skills, experience_years) VALUES ($1, $2, $3, $4)",
            )
            .bind(name)
            .bind(email)
            .bind(&skills)
            .bind(years)
            .execute(&mut **tx)
            .await?;
        }
        info!("Seeded {} demo candidates", DEMO_CANDIDATES.len());
    }
    Ok(())
}

/// Fills whichever default tables are empty. Existing data is never touched.
pub async fn seed_defaults(pool: &PgPool, config: &Config) -> Result<()> {
    let mut tx = pool.begin().await?;
    let hq = seed_headquarters(&mut tx).await?;
    seed_org(&mut tx, hq).await?;
    seed_admin(&mut tx, hq, config).await?;
    seed_recruitment(&mut tx).await?;
    tx.commit().await.context("Failed to commit seed data")?;
    Ok(())
}
