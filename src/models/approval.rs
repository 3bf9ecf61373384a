//! Approval models.
//!
//! Signing-bonus and exit-benefit items gate phase 0 of a run; manager and
//! finance sign-offs gate phase 3.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The kind of payment an approval item authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// One-off bonus paid to a new hire.
    SigningBonus,
    /// Termination or resignation benefit.
    ExitBenefit,
}

/// Decision status of an approval item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Awaiting a decision. The only editable status.
    Pending,
    /// Approved; the amount is paid.
    Approved,
    /// Rejected; the amount is not paid.
    Rejected,
}

impl ApprovalStatus {
    /// Check if a decision has been made.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Who decided an approval item, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// The approver's id.
    pub actor: String,
    /// When the decision was recorded.
    pub decided_at: DateTime<Utc>,
}

/// A signing bonus or exit benefit awaiting approval.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{ApprovalItem, ApprovalKind, ApprovalStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let item = ApprovalItem::pending(
///     "sb-001",
///     ApprovalKind::SigningBonus,
///     "emp-001",
///     "acme",
///     NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     Decimal::from(1000),
/// );
/// assert_eq!(item.status, ApprovalStatus::Pending);
/// assert!(!item.contributes());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalItem {
    /// Unique item id.
    pub id: String,
    /// Bonus or benefit.
    pub kind: ApprovalKind,
    /// The employee to be paid.
    pub employee_id: String,
    /// The employing entity whose run pays the item.
    pub entity: String,
    /// End date of the payroll period the item is paid in.
    pub period_end: NaiveDate,
    /// Amount to pay if approved.
    pub amount: Decimal,
    /// Current decision status.
    pub status: ApprovalStatus,
    /// Decision metadata, present once approved or rejected.
    #[serde(default)]
    pub decision: Option<ApprovalDecision>,
}

impl ApprovalItem {
    /// Creates a new pending item.
    pub fn pending(
        id: impl Into<String>,
        kind: ApprovalKind,
        employee_id: impl Into<String>,
        entity: impl Into<String>,
        period_end: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            employee_id: employee_id.into(),
            entity: entity.into(),
            period_end,
            amount,
            status: ApprovalStatus::Pending,
            decision: None,
        }
    }

    /// Returns true if the item's amount is paid.
    pub fn contributes(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}

/// Fields of a pending approval item that may be edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPatch {
    /// New amount.
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// New payroll period end date.
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
}

/// A run-level sign-off stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignoffStage {
    /// Payroll manager approval.
    Manager,
    /// Finance approval.
    Finance,
}

impl fmt::Display for SignoffStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Finance => write!(f, "finance"),
        }
    }
}

/// A recorded sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signoff {
    /// The approver's id.
    pub approver_id: String,
    /// When the sign-off was recorded.
    pub signed_at: DateTime<Utc>,
}

/// Manager and finance sign-offs for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSignoffs {
    /// Manager sign-off.
    pub manager: Option<Signoff>,
    /// Finance sign-off.
    pub finance: Option<Signoff>,
}
