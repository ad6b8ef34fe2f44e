use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobListingRow {
    pub id: Uuid,
    pub title: String,
    pub client_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub skills: Vec<String>,
    pub status: String,
    pub client_budget: f64,
    pub company_profit_pct: f64,
    pub candidate_offer: f64,
    pub consultancy_fee_pct: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobCandidateRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub experience_years: f64,
    pub expected_rate: Option<f64>,
    pub resume_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    OnHold,
    Closed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::OnHold => "on_hold",
            JobStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    New,
    Screening,
    Interviewing,
    Offered,
    Hired,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::New => "new",
            CandidateStatus::Screening => "screening",
            CandidateStatus::Interviewing => "interviewing",
            CandidateStatus::Offered => "offered",
            CandidateStatus::Hired => "hired",
            CandidateStatus::Rejected => "rejected",
        }
    }
}
