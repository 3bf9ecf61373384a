//! Payroll run models.
//!
//! This module contains the [`PayrollRun`] entity, its lifecycle phase, the
//! events that drive the phase forward, and the per-employee
//! [`EmployeePayrollLine`] owned by a run.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{AuditTrace, CalculationWarning, RunSignoffs, SalaryCalculationBreakdown};
use crate::error::PayrollError;

/// The lifecycle phase of a payroll run.
///
/// Phases are ordered; a run only moves forward, except for `unfreeze`
/// which returns a locked run to [`PayrollPhase::DraftReviewed`].
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayrollPhase;
///
/// let phase: PayrollPhase = "PHASE3_LOCKED".parse().unwrap();
/// assert_eq!(phase, PayrollPhase::Locked);
/// assert!(PayrollPhase::DraftGenerated < PayrollPhase::Locked);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PayrollPhase {
    /// Waiting for signing-bonus and exit-benefit approvals.
    #[default]
    #[serde(rename = "PHASE0_PENDING_APPROVALS")]
    PendingApprovals,
    /// Period facts are frozen; ready for draft generation.
    #[serde(rename = "PHASE1_PERIOD_LOCKED")]
    PeriodLocked,
    /// Draft lines exist and may be regenerated.
    #[serde(rename = "PHASE1_1_DRAFT_GENERATED")]
    DraftGenerated,
    /// The specialist has reviewed the draft.
    #[serde(rename = "PHASE2_DRAFT_REVIEWED")]
    DraftReviewed,
    /// The payroll manager has approved.
    #[serde(rename = "PHASE3_MANAGER_APPROVED")]
    ManagerApproved,
    /// Finance has approved.
    #[serde(rename = "PHASE3_FINANCE_APPROVED")]
    FinanceApproved,
    /// All lines are frozen.
    #[serde(rename = "PHASE3_LOCKED")]
    Locked,
    /// Payslips were emitted. Terminal.
    #[serde(rename = "PHASE4_PAYSLIPS_GENERATED")]
    PayslipsGenerated,
}

impl PayrollPhase {
    /// Returns the wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingApprovals => "PHASE0_PENDING_APPROVALS",
            Self::PeriodLocked => "PHASE1_PERIOD_LOCKED",
            Self::DraftGenerated => "PHASE1_1_DRAFT_GENERATED",
            Self::DraftReviewed => "PHASE2_DRAFT_REVIEWED",
            Self::ManagerApproved => "PHASE3_MANAGER_APPROVED",
            Self::FinanceApproved => "PHASE3_FINANCE_APPROVED",
            Self::Locked => "PHASE3_LOCKED",
            Self::PayslipsGenerated => "PHASE4_PAYSLIPS_GENERATED",
        }
    }

    /// Check if this is the terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PayslipsGenerated)
    }

    /// Check if lines are frozen in this phase.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked | Self::PayslipsGenerated)
    }
}

impl fmt::Display for PayrollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayrollPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PHASE0_PENDING_APPROVALS" => Ok(Self::PendingApprovals),
            "PHASE1_PERIOD_LOCKED" => Ok(Self::PeriodLocked),
            "PHASE1_1_DRAFT_GENERATED" => Ok(Self::DraftGenerated),
            "PHASE2_DRAFT_REVIEWED" => Ok(Self::DraftReviewed),
            "PHASE3_MANAGER_APPROVED" => Ok(Self::ManagerApproved),
            "PHASE3_FINANCE_APPROVED" => Ok(Self::FinanceApproved),
            "PHASE3_LOCKED" => Ok(Self::Locked),
            "PHASE4_PAYSLIPS_GENERATED" => Ok(Self::PayslipsGenerated),
            _ => Err(format!("Invalid payroll phase: {s}")),
        }
    }
}

/// An operation requested against a payroll run.
///
/// Some events move the run to a new phase; others (HR events, penalties,
/// deletion) are only legal in particular phases and leave it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEvent {
    /// Leave phase 0 once approvals are complete.
    StartInitiation,
    /// Generate (or regenerate) draft lines.
    GenerateDraft,
    /// Record HR events against the draft's facts.
    ProcessHrEvents,
    /// Record manual penalties against the draft's facts.
    ApplyPenalties,
    /// Mark the draft reviewed.
    ReviewDraft,
    /// Record manager approval.
    ManagerApprove,
    /// Record finance approval.
    FinanceApprove,
    /// Freeze all lines.
    Lock,
    /// Return a locked run to review.
    Unfreeze,
    /// Emit payslips.
    GeneratePayslips,
    /// Remove the run.
    Delete,
}

impl RunEvent {
    /// Get a string representation of the event for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartInitiation => "start_initiation",
            Self::GenerateDraft => "generate_draft",
            Self::ProcessHrEvents => "process_hr_events",
            Self::ApplyPenalties => "apply_penalties",
            Self::ReviewDraft => "review_draft",
            Self::ManagerApprove => "manager_approve",
            Self::FinanceApprove => "finance_approve",
            Self::Lock => "lock",
            Self::Unfreeze => "unfreeze",
            Self::GeneratePayslips => "generate_payslips",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The date range a run pays for.
///
/// A run is identified by its period end date; the period starts on the
/// first day of that month.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayrollPeriod;
/// use chrono::NaiveDate;
///
/// let period = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
/// assert_eq!(period.start, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
/// assert_eq!(period.days(), 28);
/// assert!(period.contains(NaiveDate::from_ymd_opt(2025, 2, 14).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// First day of the period (inclusive).
    pub start: NaiveDate,
    /// Last day of the period (inclusive).
    pub end: NaiveDate,
}

impl PayrollPeriod {
    /// Builds the monthly period ending on `end`.
    pub fn ending(end: NaiveDate) -> Self {
        Self {
            start: end.with_day(1).unwrap_or(end),
            end,
        }
    }

    /// Checks if a date falls within the period (inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Checks if an inclusive date range overlaps the period.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end && end >= self.start
    }

    /// Number of calendar days in the period.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// One payroll processing cycle for an entity and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// Human run code, e.g. `PR-2025-0001`. Immutable.
    pub run_id: String,
    /// The legal entity being paid.
    pub entity: String,
    /// The period being paid.
    pub period: PayrollPeriod,
    /// Current lifecycle phase.
    pub phase: PayrollPhase,
    /// The payroll specialist who created the run.
    pub created_by: String,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// When the run was last locked, if it is locked.
    pub locked_at: Option<DateTime<Utc>>,
    /// When payslips were emitted.
    pub finalized_at: Option<DateTime<Utc>>,
    /// Manager and finance sign-offs.
    pub signoffs: RunSignoffs,
}

/// Validates a human run code.
///
/// Run codes are non-empty and contain only ASCII letters, digits, `-` and `_`.
pub fn validate_run_id(run_id: &str) -> Result<(), PayrollError> {
    let invalid = |message: &str| PayrollError::InvalidRunId {
        run_id: run_id.to_string(),
        message: message.to_string(),
    };

    if run_id.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if run_id.len() > 64 {
        return Err(invalid("must be at most 64 characters"));
    }
    if !run_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("may only contain letters, digits, '-' and '_'"));
    }
    Ok(())
}

/// Review status of an employee line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Freshly generated.
    Draft,
    /// Seen by the specialist.
    Reviewed,
    /// Approved by finance.
    Approved,
    /// Frozen by `lock`.
    Locked,
}

/// An input error recorded on a line in place of a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineFailure {
    /// Machine-readable error code, e.g. `DATA_UNAVAILABLE`.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl From<&PayrollError> for LineFailure {
    fn from(error: &PayrollError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// The calculation result for one employee in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePayrollLine {
    /// The employee this line pays.
    pub employee_id: String,
    /// Review status.
    pub status: LineStatus,
    /// The salary breakdown; absent when the employee's facts could not be fetched.
    pub breakdown: Option<SalaryCalculationBreakdown>,
    /// The input error that prevented calculation.
    pub failure: Option<LineFailure>,
    /// Warnings raised while calculating, for human review.
    pub warnings: Vec<CalculationWarning>,
    /// Ordered record of every rule applied.
    pub audit_trace: AuditTrace,
}

impl EmployeePayrollLine {
    /// Builds a draft line from a successful calculation.
    pub fn calculated(
        employee_id: impl Into<String>,
        breakdown: SalaryCalculationBreakdown,
        warnings: Vec<CalculationWarning>,
        audit_trace: AuditTrace,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            status: LineStatus::Draft,
            breakdown: Some(breakdown),
            failure: None,
            warnings,
            audit_trace,
        }
    }

    /// Builds a draft line for an employee whose facts could not be fetched.
    pub fn failed(employee_id: impl Into<String>, error: &PayrollError) -> Self {
        Self {
            employee_id: employee_id.into(),
            status: LineStatus::Draft,
            breakdown: None,
            failure: Some(error.into()),
            warnings: Vec::new(),
            audit_trace: AuditTrace::default(),
        }
    }

    /// Returns true if the line carries a breakdown.
    pub fn is_calculated(&self) -> bool {
        self.breakdown.is_some()
    }
}
