use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::CurrentUser;
use crate::envelope::ApiResponse;
use crate::errors::AppError;
use crate::profit::calculator::{
    calculate, pair_candidate_split, pair_company_split, ProfitInputs, ProfitView,
};

/// POST /api/v1/profit/calculate
///
/// Company-facing figures are stripped for roles without financial visibility.
pub async fn handle_calculate(
    user: CurrentUser,
    Json(inputs): Json<ProfitInputs>,
) -> Json<ApiResponse<ProfitView>> {
    let breakdown = calculate(inputs);
    Json(ApiResponse::ok(breakdown.visible_to(user.role)))
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub candidate_split: Option<f64>,
    pub company_split: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SplitPair {
    pub candidate_split: f64,
    pub company_split: f64,
}

/// POST /api/v1/profit/split
///
/// Slider pairing: send exactly one side, receive both.
pub async fn handle_split(
    Json(req): Json<SplitRequest>,
) -> Result<Json<ApiResponse<SplitPair>>, AppError> {
    let (candidate_split, company_split) = match (req.candidate_split, req.company_split) {
        (Some(candidate), None) => pair_candidate_split(candidate),
        (None, Some(company)) => pair_company_split(company),
        _ => {
            return Err(AppError::Validation(
                "Provide exactly one of candidate_split or company_split".to_string(),
            ))
        }
    };
    if !(0.0..=100.0).contains(&candidate_split) {
        return Err(AppError::Validation(
            "Split percentages must be between 0 and 100".to_string(),
        ));
    }
    Ok(Json(ApiResponse::ok(SplitPair {
        candidate_split,
        company_split,
    })))
}
