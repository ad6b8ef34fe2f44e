//! Shared response envelope and list query parameters.
//!
//! Every JSON endpoint outside `/health` answers with
//! `{ success, data, message, pagination }`; absent fields are omitted.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    pub fn paged(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total_pages = if total <= 0 {
            0
        } else {
            ((total as u64 + limit as u64 - 1) / limit as u64) as u32
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

/// Query string accepted by every list endpoint. The scope filters are
/// ignored by lists that have no such relation.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub branch_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }

    /// ILIKE pattern for the search box, or `%` when no search is given.
    pub fn search_pattern(&self) -> String {
        match self.search.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => format!("%{}%", escape_like(s)),
            _ => "%".to_string(),
        }
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        Pagination::new(self.page(), self.limit(), total)
    }
}

/// Escapes LIKE wildcards so user input matches literally (escape char `\`).
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Rejects blank required text fields and returns the trimmed value.
pub fn require_text(field: &str, value: &str) -> Result<String, crate::errors::AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::errors::AppError::Validation(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// For nullable fields in partial updates: a missing key stays `None`,
/// an explicit `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = ListQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.search_pattern(), "%");
    }

    #[test]
    fn test_limit_is_capped_and_page_floored() {
        let q = ListQuery {
            page: Some(0),
            limit: Some(5000),
            ..Default::default()
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_LIMIT);
    }

    #[test]
    fn test_offset_third_page() {
        let q = ListQuery {
            page: Some(3),
            limit: Some(20),
            ..Default::default()
        };
        assert_eq!(q.offset(), 40);
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let q = ListQuery {
            search: Some("  50%_off ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_pattern(), "%50\\%\\_off%");
    }

    #[test]
    fn test_blank_search_matches_all() {
        let q = ListQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.search_pattern(), "%");
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 10, 21).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 20).total_pages, 2);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
    }

    #[test]
    fn test_require_text() {
        assert_eq!(require_text("name", "  HQ ").unwrap(), "HQ");
        assert!(require_text("name", "   ").is_err());
    }

    #[test]
    fn test_envelope_omits_missing_fields() {
        let body = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(body["success"], true);
        assert!(body.get("message").is_none());
        assert!(body.get("pagination").is_none());
    }
}
