//! Error types for the payroll execution engine.
//!
//! Every fallible operation returns [`PayrollError`]. Variants fall into three
//! families: input errors (attached to a single employee line), state errors
//! (the whole call is rejected and the run is left unchanged), and
//! configuration errors raised while loading policy and rule tables.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ApprovalStatus, PayrollPhase, RunEvent, SignoffStage};

/// The main error type for the payroll engine.
///
/// # Example
///
/// ```
/// use payroll_engine::error::PayrollError;
///
/// let error = PayrollError::EmptyRun {
///     run_id: "PR-2025-0001".to_string(),
/// };
/// assert_eq!(error.to_string(), "Payroll run 'PR-2025-0001' has no employees in scope");
/// assert_eq!(error.code(), "EMPTY_RUN");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayrollError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed or failed validation.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The employee has no active profile for the requested period.
    #[error("No active profile for employee '{employee_id}' between {period_start} and {period_end}")]
    DataUnavailable {
        /// The employee that was requested.
        employee_id: String,
        /// First day of the requested period.
        period_start: NaiveDate,
        /// Last day of the requested period.
        period_end: NaiveDate,
    },

    /// No tax/insurance bracket set is active for the entity on the date.
    #[error("No tax/insurance rule set active for entity '{entity}' on {date}")]
    RuleSetMissing {
        /// The legal entity whose rules were requested.
        entity: String,
        /// The date the rules had to be effective on.
        date: NaiveDate,
    },

    /// A manual adjustment record was rejected at input.
    #[error("Invalid adjustment '{adjustment_id}': {message}")]
    InvalidAdjustment {
        /// The adjustment record id.
        adjustment_id: String,
        /// Why the record was rejected.
        message: String,
    },

    /// The requested operation is not legal from the run's current phase.
    #[error("Cannot {attempted} while payroll run is in phase {current}")]
    InvalidPhaseTransition {
        /// The phase the run is in.
        current: PayrollPhase,
        /// The operation that was attempted.
        attempted: RunEvent,
    },

    /// A sign-off was attempted before the sign-off it depends on.
    #[error("{attempted} approval requires {required} approval first")]
    OutOfOrderApproval {
        /// The sign-off that was attempted.
        attempted: SignoffStage,
        /// The sign-off that must be recorded first.
        required: SignoffStage,
    },

    /// Signing-bonus or exit-benefit items for the period are still pending.
    #[error("{} approval item(s) still pending for period ending {period_end}: {}", .pending.len(), .pending.join(", "))]
    ApprovalsIncomplete {
        /// The payroll period end date.
        period_end: NaiveDate,
        /// Ids of the items still pending.
        pending: Vec<String>,
    },

    /// The run has no employees in scope.
    #[error("Payroll run '{run_id}' has no employees in scope")]
    EmptyRun {
        /// The run id.
        run_id: String,
    },

    /// Facts changed after the last draft generation.
    #[error("Payroll run '{run_id}' has fact changes since the last draft; regenerate the draft first")]
    StaleDraft {
        /// The run id.
        run_id: String,
    },

    /// Payslips were requested from a run that is not locked.
    #[error("Payroll run '{run_id}' is not locked (current phase {phase})")]
    NotLocked {
        /// The run id.
        run_id: String,
        /// The phase the run is in.
        phase: PayrollPhase,
    },

    /// Payslips were already generated for the run.
    #[error("Payroll run '{run_id}' is already finalized")]
    AlreadyFinalized {
        /// The run id.
        run_id: String,
    },

    /// Some employee lines have no breakdown.
    #[error("Payroll run '{run_id}' has {} line(s) without a breakdown: {}", .missing.len(), .missing.join(", "))]
    PartialRun {
        /// The run id.
        run_id: String,
        /// Employees whose line has no breakdown.
        missing: Vec<String>,
    },

    /// A run with the same id already exists.
    #[error("Payroll run '{run_id}' already exists")]
    DuplicateRunId {
        /// The duplicated run id.
        run_id: String,
    },

    /// No run exists with the given id.
    #[error("Payroll run not found: {run_id}")]
    RunNotFound {
        /// The requested run id.
        run_id: String,
    },

    /// The run id is not a valid human run code.
    #[error("Invalid run id '{run_id}': {message}")]
    InvalidRunId {
        /// The rejected run id.
        run_id: String,
        /// Why the id was rejected.
        message: String,
    },

    /// An approval item can no longer be edited.
    #[error("Approval item '{item_id}' is {status} and can no longer be edited")]
    ImmutableAfterDecision {
        /// The item id.
        item_id: String,
        /// The item's terminal status.
        status: ApprovalStatus,
    },

    /// An approval item was flipped between terminal states directly.
    #[error("Approval item '{item_id}' is already {current}; reopen it before marking it {attempted}")]
    AlreadyDecidedDifferently {
        /// The item id.
        item_id: String,
        /// The item's current terminal status.
        current: ApprovalStatus,
        /// The status that was requested.
        attempted: ApprovalStatus,
    },

    /// No approval item exists with the given id.
    #[error("Approval item not found: {item_id}")]
    ApprovalItemNotFound {
        /// The requested item id.
        item_id: String,
    },

    /// An approval item with the same id was already submitted.
    #[error("Approval item '{item_id}' already exists")]
    DuplicateApprovalItem {
        /// The duplicated item id.
        item_id: String,
    },

    /// Approval items of a period cannot change while a run for it is open.
    #[error("Approval item '{item_id}' cannot change: run '{run_id}' has frozen approvals for {entity} ending {period_end}")]
    ApprovalsFrozen {
        /// The item id.
        item_id: String,
        /// The entity the item belongs to.
        entity: String,
        /// End date of the frozen period.
        period_end: NaiveDate,
        /// A run holding the freeze.
        run_id: String,
    },

    /// A refund was already paid out by another run.
    #[error("Refund '{refund_id}' was already paid out")]
    RefundAlreadyConsumed {
        /// The refund id.
        refund_id: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl PayrollError {
    /// Returns a stable, machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigNotFound { .. } | Self::ConfigParseError { .. } => "CONFIG_ERROR",
            Self::DataUnavailable { .. } => "DATA_UNAVAILABLE",
            Self::RuleSetMissing { .. } => "RULE_SET_MISSING",
            Self::InvalidAdjustment { .. } => "INVALID_ADJUSTMENT",
            Self::InvalidPhaseTransition { .. } => "INVALID_PHASE_TRANSITION",
            Self::OutOfOrderApproval { .. } => "OUT_OF_ORDER_APPROVAL",
            Self::ApprovalsIncomplete { .. } => "APPROVALS_INCOMPLETE",
            Self::EmptyRun { .. } => "EMPTY_RUN",
            Self::StaleDraft { .. } => "STALE_DRAFT",
            Self::NotLocked { .. } => "NOT_LOCKED",
            Self::AlreadyFinalized { .. } => "ALREADY_FINALIZED",
            Self::PartialRun { .. } => "PARTIAL_RUN",
            Self::DuplicateRunId { .. } => "DUPLICATE_RUN_ID",
            Self::RunNotFound { .. } => "RUN_NOT_FOUND",
            Self::InvalidRunId { .. } => "INVALID_RUN_ID",
            Self::ImmutableAfterDecision { .. } => "IMMUTABLE_AFTER_DECISION",
            Self::AlreadyDecidedDifferently { .. } => "ALREADY_DECIDED_DIFFERENTLY",
            Self::ApprovalItemNotFound { .. } => "APPROVAL_ITEM_NOT_FOUND",
            Self::DuplicateApprovalItem { .. } => "DUPLICATE_APPROVAL_ITEM",
            Self::ApprovalsFrozen { .. } => "APPROVALS_FROZEN",
            Self::RefundAlreadyConsumed { .. } => "REFUND_ALREADY_CONSUMED",
            Self::CalculationError { .. } => "CALCULATION_ERROR",
        }
    }

    /// Returns true for errors caused by one employee's facts.
    ///
    /// These are stored on the employee's line instead of failing the run.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::RuleSetMissing { .. } | Self::InvalidAdjustment { .. }
        )
    }
}

/// A type alias for Results that return PayrollError.
pub type PayrollResult<T> = Result<T, PayrollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = PayrollError::ConfigNotFound {
            path: "/missing/payroll.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/payroll.yaml"
        );
    }

    #[test]
    fn test_invalid_phase_transition_names_phase_and_operation() {
        let error = PayrollError::InvalidPhaseTransition {
            current: PayrollPhase::DraftReviewed,
            attempted: RunEvent::Lock,
        };
        assert_eq!(
            error.to_string(),
            "Cannot lock while payroll run is in phase PHASE2_DRAFT_REVIEWED"
        );
    }

    #[test]
    fn test_approvals_incomplete_lists_pending_items() {
        let error = PayrollError::ApprovalsIncomplete {
            period_end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            pending: vec!["sb-1".to_string(), "eb-2".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "2 approval item(s) still pending for period ending 2025-01-31: sb-1, eb-2"
        );
    }

    #[test]
    fn test_out_of_order_approval_message() {
        let error = PayrollError::OutOfOrderApproval {
            attempted: SignoffStage::Finance,
            required: SignoffStage::Manager,
        };
        assert_eq!(
            error.to_string(),
            "finance approval requires manager approval first"
        );
    }

    #[test]
    fn test_already_decided_differently_message() {
        let error = PayrollError::AlreadyDecidedDifferently {
            item_id: "sb-1".to_string(),
            current: ApprovalStatus::Approved,
            attempted: ApprovalStatus::Rejected,
        };
        assert_eq!(
            error.to_string(),
            "Approval item 'sb-1' is already approved; reopen it before marking it rejected"
        );
    }

    #[test]
    fn test_input_errors_are_classified() {
        let input = PayrollError::RuleSetMissing {
            entity: "acme".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        };
        let state = PayrollError::AlreadyFinalized {
            run_id: "PR-2025-0001".to_string(),
        };
        assert!(input.is_input_error());
        assert!(!state.is_input_error());
        assert_eq!(input.code(), "RULE_SET_MISSING");
        assert_eq!(state.code(), "ALREADY_FINALIZED");
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<PayrollError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_not_found() -> PayrollResult<()> {
            Err(PayrollError::RunNotFound {
                run_id: "PR-2025-0009".to_string(),
            })
        }

        fn propagates_error() -> PayrollResult<()> {
            returns_not_found()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
