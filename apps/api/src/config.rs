use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl_minutes: i64,
    pub port: u16,
    pub rust_log: String,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub enable_direct_upload: bool,
    /// When set, outgoing notification emails are also POSTed here.
    pub mail_relay_url: Option<String>,
    pub email_delay_ms: u64,
    pub screening_connect_delay_ms: u64,
    /// Credentials of the CEO account created on an empty database.
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port: u16 = optional_env("PORT", 8080)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            jwt_secret: require_env("JWT_SECRET")?,
            session_ttl_minutes: optional_env("SESSION_TTL_MINUTES", 480)?,
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            enable_direct_upload: optional_env("ENABLE_DIRECT_UPLOAD", true)?,
            mail_relay_url: std::env::var("MAIL_RELAY_URL")
                .ok()
                .filter(|u| !u.trim().is_empty()),
            email_delay_ms: optional_env("EMAIL_DELAY_MS", 1000)?,
            screening_connect_delay_ms: optional_env("SCREENING_CONNECT_DELAY_MS", 1500)?,
            seed_admin_email: std::env::var("SEED_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@talentdesk.local".to_string()),
            seed_admin_password: std::env::var("SEED_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "change-me-now".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
