//! Daily rate derivation.
//!
//! The daily rate values unpaid leave, paid leave, and pro-rated
//! working-hours shortfalls.

use rust_decimal::Decimal;

use crate::config::CalculationPolicy;
use crate::error::{PayrollError, PayrollResult};
use crate::models::AuditStep;

use super::round_money;

/// The result of a daily rate derivation, including the rate and audit step.
#[derive(Debug, Clone)]
pub struct DailyRateResult {
    /// Base salary divided by the standard days in the period, rounded.
    pub rate: Decimal,
    /// The audit step recording this derivation.
    pub audit_step: AuditStep,
}

/// Derives the daily rate from a base salary.
///
/// Returns a `CalculationError` if the policy's standard day count is zero.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_daily_rate;
/// use payroll_engine::config::CalculationPolicy;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let result = calculate_daily_rate(Decimal::from(10000), &CalculationPolicy::default(), 1).unwrap();
/// assert_eq!(result.rate, Decimal::from_str("333.33").unwrap());
/// ```
pub fn calculate_daily_rate(
    base_salary: Decimal,
    policy: &CalculationPolicy,
    step_number: u32,
) -> PayrollResult<DailyRateResult> {
    let days = Decimal::from(policy.standard_days_in_period);
    let raw = base_salary
        .checked_div(days)
        .ok_or_else(|| PayrollError::CalculationError {
            message: format!(
                "cannot divide base salary {} by {} standard days",
                base_salary, policy.standard_days_in_period
            ),
        })?;
    let rate = round_money(raw, policy.money_scale);

    let audit_step = AuditStep {
        step_number,
        rule_id: "daily_rate".to_string(),
        rule_name: "Daily Rate".to_string(),
        input: serde_json::json!({
            "base_salary": base_salary.normalize().to_string(),
            "standard_days_in_period": policy.standard_days_in_period
        }),
        output: serde_json::json!({
            "daily_rate": rate.normalize().to_string()
        }),
        reasoning: format!(
            "Daily rate: ${} / {} days = ${}",
            base_salary.normalize(),
            policy.standard_days_in_period,
            rate.normalize()
        ),
    };

    Ok(DailyRateResult { rate, audit_step })
}
