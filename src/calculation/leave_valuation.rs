//! Leave valuation.
//!
//! Paid leave is already inside base salary; its value is reported for
//! information only and never added to pay.

use rust_decimal::Decimal;

use crate::models::{AuditStep, LeaveBreakdown, LeaveKind, LeaveSpan, PayrollPeriod};

use super::round_money;

/// The result of a leave valuation.
#[derive(Debug, Clone)]
pub struct LeaveValuationResult {
    /// Day counts and paid leave value.
    pub leaves: LeaveBreakdown,
    /// The audit step recording this valuation.
    pub audit_step: AuditStep,
}

/// Counts the period's paid and unpaid leave days and values the paid days.
pub fn value_leave(
    leaves: &[LeaveSpan],
    period: &PayrollPeriod,
    daily_rate: Decimal,
    money_scale: u32,
    step_number: u32,
) -> LeaveValuationResult {
    let days_of = |kind: LeaveKind| -> Decimal {
        leaves
            .iter()
            .filter(|span| span.kind == kind)
            .map(|span| span.days_within(period))
            .sum()
    };

    let paid_leave_days = days_of(LeaveKind::Paid);
    let unpaid_leave_days = days_of(LeaveKind::Unpaid);
    let total_paid_leave_value = round_money(paid_leave_days * daily_rate, money_scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: "leave_valuation".to_string(),
        rule_name: "Leave Valuation".to_string(),
        input: serde_json::json!({
            "spans": leaves.len(),
            "daily_rate": daily_rate.normalize().to_string()
        }),
        output: serde_json::json!({
            "paid_leave_days": paid_leave_days.normalize().to_string(),
            "unpaid_leave_days": unpaid_leave_days.normalize().to_string(),
            "total_paid_leave_value": total_paid_leave_value.normalize().to_string()
        }),
        reasoning: format!(
            "{} paid day(s) × ${} = ${} (informational; already in base salary)",
            paid_leave_days.normalize(),
            daily_rate.normalize(),
            total_paid_leave_value.normalize()
        ),
    };

    LeaveValuationResult {
        leaves: LeaveBreakdown {
            paid_leave_days,
            unpaid_leave_days,
            total_paid_leave_value,
        },
        audit_step,
    }
}
