//! Candidate matching: a pluggable scorer comparing a candidate's skills with
//! a job listing's required skills.
//!
//! Default: `KeywordMatcher` (deterministic keyword overlap).
//! `AppState` holds an `Arc<dyn CandidateMatcher>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::jobs::{JobCandidateRow, JobListingRow};

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillMatch {
    pub required: String,
    pub evidence: Option<String>, // the candidate skill that covered it
    pub strength: f32,            // 0.0, 0.5 or 1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMatch {
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub score: u32, // 0 – 100
    pub matched: Vec<SkillMatch>,
    pub missing: Vec<String>,
    pub recommendation: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait CandidateMatcher: Send + Sync {
    async fn rank(
        &self,
        job: &JobListingRow,
        candidates: &[JobCandidateRow],
    ) -> Result<Vec<CandidateMatch>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KeywordMatcher
// ────────────────────────────────────────────────────────────────────────────

/// Keyword matcher.
///
/// Algorithm, per required skill:
///    - exact (case-insensitive) skill match → strength 1.0
///    - one contains the other ("rust" / "rust async") → strength 0.5
///    - otherwise → 0.0, listed as missing
///
/// score = mean strength × 100, rounded. Sorted by score desc, then name.
pub struct KeywordMatcher;

#[async_trait]
impl CandidateMatcher for KeywordMatcher {
    async fn rank(
        &self,
        job: &JobListingRow,
        candidates: &[JobCandidateRow],
    ) -> Result<Vec<CandidateMatch>, AppError> {
        Ok(rank_candidates(&job.skills, candidates))
    }
}

pub fn rank_candidates(required: &[String], candidates: &[JobCandidateRow]) -> Vec<CandidateMatch> {
    let mut ranked: Vec<CandidateMatch> = candidates
        .iter()
        .map(|c| score_candidate(required, c))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.candidate_name.cmp(&b.candidate_name))
    });
    ranked
}

fn score_candidate(required: &[String], candidate: &JobCandidateRow) -> CandidateMatch {
    let candidate_skills: Vec<String> = candidate
        .skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    let mut matched = Vec::new();
    let mut missing = Vec::new();
    let mut total = 0.0_f32;
    let mut counted = 0usize;

    for skill in required {
        let needle = skill.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        counted += 1;

        let mut best_strength = 0.0_f32;
        let mut best_evidence = None;
        for have in &candidate_skills {
            let strength = if *have == needle {
                1.0
            } else if have.contains(&needle) || needle.contains(have.as_str()) {
                0.5
            } else {
                0.0
            };
            if strength > best_strength {
                best_strength = strength;
                best_evidence = Some(have.clone());
            }
        }

        total += best_strength;
        if best_strength > 0.0 {
            matched.push(SkillMatch {
                required: skill.trim().to_string(),
                evidence: best_evidence,
                strength: best_strength,
            });
        } else {
            missing.push(skill.trim().to_string());
        }
    }

    let score = if counted > 0 {
        ((total / counted as f32) * 100.0).round() as u32
    } else {
        0
    };

    CandidateMatch {
        candidate_id: candidate.id,
        candidate_name: candidate.name.clone(),
        score,
        recommendation: build_recommendation(score, &missing),
        matched,
        missing,
    }
}

fn build_recommendation(score: u32, missing: &[String]) -> String {
    let top: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();
    if score >= 80 {
        "Strong match. Shortlist for screening.".to_string()
    } else if score >= 50 {
        format!("Partial match ({score}/100). Probe for: {}.", top.join(", "))
    } else if missing.is_empty() {
        "No required skills listed for this job.".to_string()
    } else {
        format!("Weak match ({score}/100). Missing: {}.", top.join(", "))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
