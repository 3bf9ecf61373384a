//! Period facts consumed by the salary calculator.
//!
//! These records are supplied read-only by HR collaborators (roster,
//! attendance, leave, adjustments, refunds) and by the rule configuration
//! (tax and insurance brackets).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ApprovalItem, PayrollPeriod};

/// Employment status of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    /// Currently employed and paid.
    Active,
    /// Employed but excluded from payroll (e.g. suspended).
    Inactive,
    /// No longer employed.
    Terminated,
}

/// A recurring allowance paid with salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    /// Allowance name (e.g. "housing").
    pub name: String,
    /// Amount per period.
    pub amount: Decimal,
}

/// An employee's payroll profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Unique employee id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The legal entity employing the person.
    pub entity: String,
    /// Base salary per period.
    pub base_salary: Decimal,
    /// Recurring allowances.
    #[serde(default)]
    pub allowances: Vec<Allowance>,
    /// Employment status.
    pub status: EmploymentStatus,
    /// First day of employment.
    pub hired_on: NaiveDate,
    /// Last day of employment, if known.
    #[serde(default)]
    pub terminated_on: Option<NaiveDate>,
}

impl EmployeeProfile {
    /// Returns true if the profile is active at some point in the period.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{EmployeeProfile, EmploymentStatus, PayrollPeriod};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let profile = EmployeeProfile {
    ///     id: "emp-001".to_string(),
    ///     name: "Ada".to_string(),
    ///     entity: "acme".to_string(),
    ///     base_salary: Decimal::from(10000),
    ///     allowances: vec![],
    ///     status: EmploymentStatus::Active,
    ///     hired_on: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
    ///     terminated_on: None,
    /// };
    /// let january = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    /// let february = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    /// assert!(!profile.is_active_during(&january));
    /// assert!(profile.is_active_during(&february));
    /// ```
    pub fn is_active_during(&self, period: &PayrollPeriod) -> bool {
        self.status == EmploymentStatus::Active
            && self.hired_on <= period.end
            && self.terminated_on.is_none_or(|t| t >= period.start)
    }

    /// Sum of all allowances.
    pub fn allowances_total(&self) -> Decimal {
        self.allowances.iter().map(|a| a.amount).sum()
    }
}

/// Expected and actual worked minutes for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceDay {
    /// The work day.
    pub date: NaiveDate,
    /// Minutes the employee was scheduled to work.
    pub expected_minutes: u32,
    /// Minutes the employee actually worked.
    pub actual_minutes: u32,
}

/// Whether a leave span is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveKind {
    /// Paid leave: already inside base salary.
    Paid,
    /// Unpaid leave: deducted at the daily rate.
    Unpaid,
}

/// An approved leave span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveSpan {
    /// Leave type id from the leave system (e.g. "annual", "sick").
    pub leave_type_id: String,
    /// Paid or unpaid.
    pub kind: LeaveKind,
    /// First day of leave (inclusive).
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive).
    pub end_date: NaiveDate,
    /// Leave days charged (may be fractional for half days).
    pub days: Decimal,
}

impl LeaveSpan {
    /// Checks if the span covers the date.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// The share of `days` that falls inside the period.
    ///
    /// Days are spread evenly over the span's calendar days. Each share is the
    /// difference of two cumulative amounts rounded to four places, so the
    /// shares of consecutive periods add up to exactly `days`.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{LeaveKind, LeaveSpan, PayrollPeriod};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let span = LeaveSpan {
    ///     leave_type_id: "unpaid".to_string(),
    ///     kind: LeaveKind::Unpaid,
    ///     start_date: NaiveDate::from_ymd_opt(2025, 1, 30).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
    ///     days: Decimal::from(5),
    /// };
    /// let january = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    /// let february = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
    /// assert_eq!(span.days_within(&january), Decimal::from(2));
    /// assert_eq!(span.days_within(&february), Decimal::from(3));
    /// ```
    pub fn days_within(&self, period: &PayrollPeriod) -> Decimal {
        let span_days = (self.end_date - self.start_date).num_days() + 1;
        if span_days <= 0 {
            return Decimal::ZERO;
        }
        let before = (period.start - self.start_date).num_days().clamp(0, span_days);
        let through_end = ((period.end - self.start_date).num_days() + 1).clamp(0, span_days);
        if through_end <= before {
            return Decimal::ZERO;
        }
        if before == 0 && through_end == span_days {
            return self.days;
        }

        let cumulative = |elapsed: i64| {
            (self.days * Decimal::from(elapsed) / Decimal::from(span_days)).round_dp(4)
        };
        cumulative(through_end) - cumulative(before)
    }
}

/// The kind of a manual adjustment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// A penalty deducted from pay.
    Penalty,
    /// Any other adjustment; ignored by the salary calculator.
    Other,
}

/// A manual adjustment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAdjustment {
    /// Unique record id.
    pub id: String,
    /// The employee the adjustment applies to.
    pub employee_id: String,
    /// Adjustment kind.
    pub kind: AdjustmentKind,
    /// Leave type id or free-form category.
    #[serde(default)]
    pub category: Option<String>,
    /// Date the adjustment is effective on.
    pub effective_date: NaiveDate,
    /// Amount; validated to be non-negative at input.
    pub amount: Decimal,
    /// Why the adjustment was made.
    pub reason: String,
}

/// Which base a bracket applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketBase {
    /// Gross salary.
    #[default]
    Gross,
    /// Gross salary net of tax.
    Net,
}

/// A rate tier applied to a slice of a monetary base.
///
/// The bracket covers `(lower_bound, upper_bound]`; an absent upper bound is
/// open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketRule {
    /// Bracket or rule name.
    pub name: String,
    /// Rate as a fraction (0.10 for 10%).
    pub rate: Decimal,
    /// Lower bound of the slice.
    pub lower_bound: Decimal,
    /// Upper bound of the slice, if any.
    #[serde(default)]
    pub upper_bound: Option<Decimal>,
    /// Which base the bracket applies to.
    #[serde(default)]
    pub applies_to: BracketBase,
}

/// Approval status of a refund record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Not yet approved.
    Pending,
    /// Approved for payout.
    Approved,
    /// Rejected.
    Rejected,
}

/// A refund owed to an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundEntry {
    /// Unique refund id.
    pub id: String,
    /// The employee being refunded.
    pub employee_id: String,
    /// Where the refund originates.
    pub source: String,
    /// Refund amount.
    pub amount: Decimal,
    /// Approval status.
    pub status: RefundStatus,
    /// True once paid out by a finalized run.
    #[serde(default)]
    pub consumed: bool,
}

impl RefundEntry {
    /// Returns true if the refund should be paid by the next run.
    pub fn is_payable(&self) -> bool {
        self.status == RefundStatus::Approved && !self.consumed
    }
}

/// Everything the salary calculator needs for one employee and period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodFacts {
    /// The employee's profile.
    pub employee: EmployeeProfile,
    /// The period being paid.
    pub period: PayrollPeriod,
    /// Signing-bonus and exit-benefit items in every status.
    pub approvals: Vec<ApprovalItem>,
    /// Daily attendance for the period.
    pub attendance: Vec<AttendanceDay>,
    /// Approved leave spans overlapping the period.
    pub leaves: Vec<LeaveSpan>,
    /// Manual adjustments effective in the period.
    pub adjustments: Vec<ManualAdjustment>,
    /// Active tax brackets for the employee's entity.
    pub tax_rules: Vec<BracketRule>,
    /// Active insurance brackets for the employee's entity.
    pub insurance_rules: Vec<BracketRule>,
    /// Refund records for the employee.
    pub refunds: Vec<RefundEntry>,
}

/// An HR event recorded against a draft run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HrEvent {
    /// Corrects the actual worked minutes of one day.
    AttendanceCorrection {
        /// The employee.
        employee_id: String,
        /// The corrected day.
        date: NaiveDate,
        /// Corrected expected minutes; keeps the recorded value if absent.
        #[serde(default)]
        expected_minutes: Option<u32>,
        /// Corrected actual minutes.
        actual_minutes: u32,
    },
    /// Adds a leave span approved after the draft was generated.
    LeaveApproved {
        /// The employee.
        employee_id: String,
        /// The approved span.
        span: LeaveSpan,
    },
    /// Removes an employee from the run's scope.
    Termination {
        /// The employee.
        employee_id: String,
    },
}

impl HrEvent {
    /// The employee the event concerns.
    pub fn employee_id(&self) -> &str {
        match self {
            Self::AttendanceCorrection { employee_id, .. }
            | Self::LeaveApproved { employee_id, .. }
            | Self::Termination { employee_id } => employee_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn span(start: NaiveDate, end: NaiveDate, days: &str) -> LeaveSpan {
        LeaveSpan {
            leave_type_id: "unpaid".to_string(),
            kind: LeaveKind::Unpaid,
            start_date: start,
            end_date: end,
            days: Decimal::from_str(days).unwrap(),
        }
    }

    #[test]
    fn test_span_inside_period_keeps_its_days() {
        let leave = span(date(1, 6), date(1, 10), "4.5");
        let days = leave.days_within(&PayrollPeriod::ending(date(1, 31)));
        assert_eq!(days, Decimal::from_str("4.5").unwrap());
    }

    #[test]
    fn test_span_outside_period_contributes_nothing() {
        let leave = span(date(1, 6), date(1, 10), "5");
        assert_eq!(leave.days_within(&PayrollPeriod::ending(date(2, 28))), Decimal::ZERO);
    }

    #[test]
    fn test_month_crossing_shares_add_up() {
        // 3 charged days over a 7 day span: Jan 29 - Feb 4
        let leave = span(date(1, 29), date(2, 4), "3");
        let january = leave.days_within(&PayrollPeriod::ending(date(1, 31)));
        let february = leave.days_within(&PayrollPeriod::ending(date(2, 28)));

        assert_eq!(january, Decimal::from_str("1.2857").unwrap());
        assert_eq!(february, Decimal::from_str("1.7143").unwrap());
        assert_eq!(january + february, Decimal::from(3));
    }

    #[test]
    fn test_span_covering_whole_period_and_more() {
        let leave = span(date(1, 31), date(3, 1), "30");
        let february = leave.days_within(&PayrollPeriod::ending(date(2, 28)));
        let total = leave.days_within(&PayrollPeriod::ending(date(1, 31)))
            + february
            + leave.days_within(&PayrollPeriod::ending(date(3, 31)));

        assert_eq!(february, Decimal::from(28));
        assert_eq!(total, Decimal::from(30));
    }
}
