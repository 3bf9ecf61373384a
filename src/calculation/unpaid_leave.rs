//! Unpaid leave deduction.

use rust_decimal::Decimal;

use crate::models::{
    AuditStep, Itemized, LeaveKind, LeaveSpan, PayrollPeriod, UnpaidLeaveDeduction,
};

use super::round_money;

/// The result of an unpaid leave calculation.
#[derive(Debug, Clone)]
pub struct UnpaidLeaveResult {
    /// One deduction per unpaid span, and their total.
    pub deductions: Itemized<UnpaidLeaveDeduction>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Deducts unpaid leave days at the daily rate, one line per unpaid span.
///
/// Only the span's days inside the period are charged; see
/// [`LeaveSpan::days_within`].
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_unpaid_leave;
/// use payroll_engine::models::{LeaveKind, LeaveSpan, PayrollPeriod};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let span = LeaveSpan {
///     leave_type_id: "unpaid".to_string(),
///     kind: LeaveKind::Unpaid,
///     start_date: NaiveDate::from_ymd_opt(2025, 1, 13).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
///     days: Decimal::from(2),
/// };
/// let period = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
/// let result = calculate_unpaid_leave(&[span], &period, Decimal::from(300), 2, 1);
/// assert_eq!(result.deductions.total, Decimal::from(600));
/// ```
pub fn calculate_unpaid_leave(
    leaves: &[LeaveSpan],
    period: &PayrollPeriod,
    daily_rate: Decimal,
    money_scale: u32,
    step_number: u32,
) -> UnpaidLeaveResult {
    let unpaid: Vec<(&LeaveSpan, Decimal)> = leaves
        .iter()
        .filter(|span| span.kind == LeaveKind::Unpaid)
        .map(|span| (span, span.days_within(period)))
        .filter(|(_, days)| *days > Decimal::ZERO)
        .collect();

    let entries: Vec<UnpaidLeaveDeduction> = unpaid
        .iter()
        .map(|(_, days)| UnpaidLeaveDeduction {
            days: *days,
            daily_rate,
            total: round_money(*days * daily_rate, money_scale),
        })
        .collect();
    let deductions = Itemized::from_entries(entries);

    let unpaid_days: Decimal = deductions.entries.iter().map(|d| d.days).sum();

    let audit_step = AuditStep {
        step_number,
        rule_id: "unpaid_leave".to_string(),
        rule_name: "Unpaid Leave Deduction".to_string(),
        input: serde_json::json!({
            "unpaid_spans": unpaid
                .iter()
                .map(|(span, days)| serde_json::json!({
                    "leave_type_id": span.leave_type_id,
                    "start_date": span.start_date.to_string(),
                    "end_date": span.end_date.to_string(),
                    "days": span.days.normalize().to_string(),
                    "days_in_period": days.normalize().to_string()
                }))
                .collect::<Vec<_>>(),
            "daily_rate": daily_rate.normalize().to_string()
        }),
        output: serde_json::json!({
            "unpaid_days": unpaid_days.normalize().to_string(),
            "total": deductions.total.normalize().to_string()
        }),
        reasoning: format!(
            "Unpaid leave: {} day(s) × ${} = ${}",
            unpaid_days.normalize(),
            daily_rate.normalize(),
            deductions.total.normalize()
        ),
    };

    UnpaidLeaveResult {
        deductions,
        audit_step,
    }
}
