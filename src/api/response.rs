//! Response types for the payroll API.
//!
//! This module defines the error body and the mapping from
//! [`PayrollError`] to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::PayrollError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

/// Returns the HTTP status for an engine error.
fn status_for(error: &PayrollError) -> StatusCode {
    match error {
        PayrollError::RunNotFound { .. } | PayrollError::ApprovalItemNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        PayrollError::InvalidPhaseTransition { .. }
        | PayrollError::OutOfOrderApproval { .. }
        | PayrollError::ApprovalsIncomplete { .. }
        | PayrollError::EmptyRun { .. }
        | PayrollError::StaleDraft { .. }
        | PayrollError::NotLocked { .. }
        | PayrollError::AlreadyFinalized { .. }
        | PayrollError::PartialRun { .. }
        | PayrollError::DuplicateRunId { .. }
        | PayrollError::ImmutableAfterDecision { .. }
        | PayrollError::AlreadyDecidedDifferently { .. }
        | PayrollError::DuplicateApprovalItem { .. }
        | PayrollError::ApprovalsFrozen { .. }
        | PayrollError::RefundAlreadyConsumed { .. } => StatusCode::CONFLICT,
        PayrollError::DataUnavailable { .. }
        | PayrollError::RuleSetMissing { .. }
        | PayrollError::InvalidAdjustment { .. }
        | PayrollError::InvalidRunId { .. } => StatusCode::BAD_REQUEST,
        PayrollError::ConfigNotFound { .. }
        | PayrollError::ConfigParseError { .. }
        | PayrollError::CalculationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Returns a hint for errors the caller can resolve.
fn details_for(error: &PayrollError) -> Option<String> {
    match error {
        PayrollError::ApprovalsIncomplete { pending, .. } => Some(format!(
            "Approve or reject these items first: {}",
            pending.join(", ")
        )),
        PayrollError::StaleDraft { .. } => {
            Some("Generate the draft again before reviewing".to_string())
        }
        PayrollError::PartialRun { missing, .. } => Some(format!(
            "These employees have no breakdown: {}",
            missing.join(", ")
        )),
        PayrollError::AlreadyDecidedDifferently { .. } => {
            Some("Reopen the item before changing its decision".to_string())
        }
        PayrollError::ApprovalsFrozen { run_id, .. } => Some(format!(
            "Finalize or delete run '{run_id}' before changing approvals for its period"
        )),
        PayrollError::RefundAlreadyConsumed { .. } => Some(
            "Unfreeze the run and delete it, then draft a new run without the paid refund"
                .to_string(),
        ),
        PayrollError::ConfigNotFound { .. } | PayrollError::ConfigParseError { .. } => {
            Some("Check the engine configuration directory".to_string())
        }
        _ => None,
    }
}

impl From<PayrollError> for ApiErrorResponse {
    fn from(error: PayrollError) -> Self {
        let status = status_for(&error);
        let api_error = match details_for(&error) {
            Some(details) => ApiError::with_details(error.code(), error.to_string(), details),
            None => ApiError::new(error.code(), error.to_string()),
        };
        ApiErrorResponse {
            status,
            error: api_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PayrollPhase, RunEvent};

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_api_error_with_details_serialization() {
        let error = ApiError::with_details("TEST_ERROR", "Test message", "Some details");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"details\":\"Some details\""));
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let api_error: ApiErrorResponse = PayrollError::RunNotFound {
            run_id: "PR-404".to_string(),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);
        assert_eq!(api_error.error.code, "RUN_NOT_FOUND");
    }

    #[test]
    fn test_state_errors_map_to_409() {
        let api_error: ApiErrorResponse = PayrollError::InvalidPhaseTransition {
            current: PayrollPhase::DraftReviewed,
            attempted: RunEvent::Lock,
        }
        .into();
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(api_error.error.code, "INVALID_PHASE_TRANSITION");
        assert!(api_error.error.message.contains("PHASE2_DRAFT_REVIEWED"));
    }

    #[test]
    fn test_approvals_incomplete_lists_pending_items() {
        let api_error: ApiErrorResponse = PayrollError::ApprovalsIncomplete {
            period_end: chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            pending: vec!["sb-1".to_string(), "eb-2".to_string()],
        }
        .into();
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert!(api_error.error.details.unwrap().contains("sb-1, eb-2"));
    }

    #[test]
    fn test_config_errors_map_to_500() {
        let api_error: ApiErrorResponse = PayrollError::ConfigNotFound {
            path: "/etc/payroll".to_string(),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error.code, "CONFIG_ERROR");
    }
}
