//! Two-stage markup calculation.
//!
//! ```text
//! client_to_company_profit   = client_budget - internal_budget
//! company_to_candidate_profit = internal_budget * company_split / 100
//! total_profit               = client_to_company_profit + company_to_candidate_profit
//! profit_margin              = total_profit / client_budget * 100
//! ```
//!
//! `candidate_split + company_split == 100` is advisory: only the pairing
//! helpers keep the two in sync. A zero client budget produces a non-finite
//! margin, which serializes as `null`.

use serde::{Deserialize, Serialize};

use crate::models::user::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitInputs {
    pub client_budget: f64,
    pub internal_budget: f64,
    pub candidate_split: f64,
    pub company_split: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitBreakdown {
    pub inputs: ProfitInputs,
    pub client_to_company_profit: f64,
    pub company_to_candidate_profit: f64,
    pub total_profit: f64,
    pub profit_margin: f64,
    /// What the candidate actually receives out of the internal budget.
    pub candidate_payout: f64,
    pub warnings: Vec<String>,
}

pub fn calculate(inputs: ProfitInputs) -> ProfitBreakdown {
    let ProfitInputs {
        client_budget,
        internal_budget,
        candidate_split,
        company_split,
    } = inputs;

    let client_to_company_profit = client_budget - internal_budget;
    let company_to_candidate_profit = internal_budget * company_split / 100.0;
    let total_profit = client_to_company_profit + company_to_candidate_profit;
    let profit_margin = total_profit / client_budget * 100.0;
    let candidate_payout = internal_budget * candidate_split / 100.0;

    ProfitBreakdown {
        inputs,
        client_to_company_profit,
        company_to_candidate_profit,
        total_profit,
        profit_margin,
        candidate_payout,
        warnings: advisory_warnings(&inputs),
    }
}

/// Advisory checks. None of these reject the calculation.
fn advisory_warnings(inputs: &ProfitInputs) -> Vec<String> {
    let mut warnings = Vec::new();
    if inputs.client_budget < 0.0 || inputs.internal_budget < 0.0 {
        warnings.push("Budgets are expected to be non-negative".to_string());
    }
    if inputs.internal_budget > inputs.client_budget {
        warnings.push("Internal budget exceeds client budget".to_string());
    }
    if (inputs.candidate_split + inputs.company_split - 100.0).abs() > 1e-9 {
        warnings.push(format!(
            "Candidate and company splits sum to {}, not 100",
            inputs.candidate_split + inputs.company_split
        ));
    }
    if inputs.client_budget == 0.0 {
        warnings.push("Client budget is zero; profit margin is undefined".to_string());
    }
    warnings
}

/// Setting the candidate slider to `x` moves the company slider to `100 - x`.
pub fn pair_candidate_split(candidate_split: f64) -> (f64, f64) {
    (candidate_split, 100.0 - candidate_split)
}

/// Setting the company slider to `x` moves the candidate slider to `100 - x`.
pub fn pair_company_split(company_split: f64) -> (f64, f64) {
    (100.0 - company_split, company_split)
}

/// Role-filtered projection of a breakdown. Company-facing figures are
/// omitted entirely for roles without financial visibility.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitView {
    pub candidate_split: f64,
    pub candidate_payout: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_split: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_to_company_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_to_candidate_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProfitBreakdown {
    pub fn visible_to(&self, role: UserRole) -> ProfitView {
        if role.sees_company_financials() {
            ProfitView {
                candidate_split: self.inputs.candidate_split,
                candidate_payout: self.candidate_payout,
                client_budget: Some(self.inputs.client_budget),
                internal_budget: Some(self.inputs.internal_budget),
                company_split: Some(self.inputs.company_split),
                client_to_company_profit: Some(self.client_to_company_profit),
                company_to_candidate_profit: Some(self.company_to_candidate_profit),
                total_profit: Some(self.total_profit),
                profit_margin: Some(self.profit_margin),
                warnings: self.warnings.clone(),
            }
        } else {
            ProfitView {
                candidate_split: self.inputs.candidate_split,
                candidate_payout: self.candidate_payout,
                client_budget: None,
                internal_budget: None,
                company_split: None,
                client_to_company_profit: None,
                company_to_candidate_profit: None,
                total_profit: None,
                profit_margin: None,
                warnings: vec![],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(client: f64, internal: f64, candidate: f64, company: f64) -> ProfitInputs {
        ProfitInputs {
            client_budget: client,
            internal_budget: internal,
            candidate_split: candidate,
            company_split: company,
        }
    }

    #[test]
    fn test_reference_example() {
        let b = calculate(inputs(120.0, 90.0, 80.0, 20.0));
        assert!((b.client_to_company_profit - 30.0).abs() < 1e-9);
        assert!((b.company_to_candidate_profit - 18.0).abs() < 1e-9);
        assert!((b.total_profit - 48.0).abs() < 1e-9);
        assert!((b.profit_margin - 40.0).abs() < 1e-9);
        assert!((b.candidate_payout - 72.0).abs() < 1e-9);
        assert!(b.warnings.is_empty());
    }

    #[test]
    fn test_margin_and_total_identities() {
        for &(c, i, s) in &[
            (100.0, 50.0, 10.0),
            (250.5, 200.0, 35.0),
            (1.0, 0.0, 0.0),
            (80.0, 95.0, 50.0),
        ] {
            let b = calculate(inputs(c, i, 100.0 - s, s));
            let expected_total = (c - i) + i * s / 100.0;
            assert!((b.total_profit - expected_total).abs() < 1e-9);
            assert!((b.profit_margin - b.total_profit / c * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_client_budget_is_non_finite_not_error() {
        let b = calculate(inputs(0.0, 0.0, 80.0, 20.0));
        assert!(!b.profit_margin.is_finite());
        let json = serde_json::to_value(&b).unwrap();
        assert!(json["profit_margin"].is_null());
        assert!(b.warnings.iter().any(|w| w.contains("undefined")));
    }

    #[test]
    fn test_internal_over_client_is_advisory() {
        let b = calculate(inputs(80.0, 95.0, 50.0, 50.0));
        assert!(b.client_to_company_profit < 0.0);
        assert!(b.warnings.iter().any(|w| w.contains("exceeds")));
    }

    #[test]
    fn test_divergent_splits_warn() {
        let b = calculate(inputs(100.0, 50.0, 70.0, 20.0));
        assert!(b.warnings.iter().any(|w| w.contains("sum to 90")));
    }

    #[test]
    fn test_slider_pairing() {
        for x in [0.0, 12.5, 50.0, 80.0, 100.0] {
            let (candidate, company) = pair_candidate_split(x);
            assert_eq!(candidate, x);
            assert_eq!(company, 100.0 - x);

            let (candidate, company) = pair_company_split(x);
            assert_eq!(company, x);
            assert_eq!(candidate, 100.0 - x);
        }
    }

    #[test]
    fn test_restricted_roles_see_only_candidate_figures() {
        let b = calculate(inputs(120.0, 90.0, 80.0, 20.0));
        for role in [
            UserRole::MarketingRecruiter,
            UserRole::MarketingAssociate,
            UserRole::Applicant,
        ] {
            let json = serde_json::to_value(b.visible_to(role)).unwrap();
            assert_eq!(json["candidate_split"], 80.0);
            assert_eq!(json["candidate_payout"], 72.0);
            assert!(json.get("total_profit").is_none());
            assert!(json.get("client_to_company_profit").is_none());
            assert!(json.get("company_to_candidate_profit").is_none());
            assert!(json.get("profit_margin").is_none());
        }
    }

    #[test]
    fn test_privileged_roles_see_everything() {
        let b = calculate(inputs(120.0, 90.0, 80.0, 20.0));
        for role in [
            UserRole::Ceo,
            UserRole::BranchManager,
            UserRole::MarketingHead,
            UserRole::MarketingSupervisor,
        ] {
            let view = b.visible_to(role);
            assert_eq!(view.total_profit, Some(b.total_profit));
            assert_eq!(view.client_to_company_profit, Some(30.0));
            assert_eq!(view.candidate_split, 80.0);
        }
    }
}
