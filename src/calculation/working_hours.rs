//! Working-hours shortfall penalty calculation.
//!
//! Each work day where actual minutes fall short of expected minutes is
//! penalized. Days covered by an approved leave span are not penalized.

use rust_decimal::Decimal;

use crate::config::WorkingHoursPenaltyMode;
use crate::models::{AttendanceDay, AuditStep, Itemized, LeaveSpan, WorkingHoursPenalty};

use super::round_money;

/// The result of a working-hours penalty calculation.
#[derive(Debug, Clone)]
pub struct WorkingHoursPenaltyResult {
    /// Penalties for days with a non-zero shortfall, and their total.
    pub penalties: Itemized<WorkingHoursPenalty>,
    /// The audit step recording every day considered.
    pub audit_step: AuditStep,
}

/// Calculates working-hours penalties for a period's attendance.
///
/// # Arguments
///
/// * `attendance` - Daily expected/actual minutes
/// * `leaves` - Approved leave spans; covered days are skipped
/// * `daily_rate` - The employee's daily rate (used by pro-rated mode)
/// * `mode` - How shortfall minutes convert to money
/// * `money_scale` - Decimal places each day's penalty is rounded to
/// * `step_number` - The step number for audit trail sequencing
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_working_hours_penalty;
/// use payroll_engine::config::WorkingHoursPenaltyMode;
/// use payroll_engine::models::AttendanceDay;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let attendance = vec![AttendanceDay {
///     date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
///     expected_minutes: 480,
///     actual_minutes: 420,
/// }];
/// let mode = WorkingHoursPenaltyMode::PerMinute { per_minute_rate: Decimal::new(50, 2) };
///
/// let result = calculate_working_hours_penalty(&attendance, &[], Decimal::from(300), &mode, 2, 1);
/// // 60 minutes × $0.50
/// assert_eq!(result.penalties.total, Decimal::from(30));
/// ```
pub fn calculate_working_hours_penalty(
    attendance: &[AttendanceDay],
    leaves: &[LeaveSpan],
    daily_rate: Decimal,
    mode: &WorkingHoursPenaltyMode,
    money_scale: u32,
    step_number: u32,
) -> WorkingHoursPenaltyResult {
    let mut entries = Vec::new();
    let mut days = Vec::with_capacity(attendance.len());

    for day in attendance {
        let shortfall = day.expected_minutes.saturating_sub(day.actual_minutes);
        let on_leave = leaves.iter().any(|span| span.covers(day.date));

        let penalty = if on_leave || shortfall == 0 {
            Decimal::ZERO
        } else {
            let minutes = Decimal::from(shortfall);
            let raw = match mode {
                WorkingHoursPenaltyMode::PerMinute { per_minute_rate } => minutes * per_minute_rate,
                // expected_minutes > 0 whenever shortfall > 0
                WorkingHoursPenaltyMode::ProRated => {
                    daily_rate * minutes / Decimal::from(day.expected_minutes)
                }
            };
            round_money(raw, money_scale)
        };

        days.push(serde_json::json!({
            "day": day.date.to_string(),
            "expected_minutes": day.expected_minutes,
            "actual_minutes": day.actual_minutes,
            "shortfall_minutes": shortfall,
            "on_leave": on_leave,
            "penalty": penalty.normalize().to_string()
        }));

        if penalty > Decimal::ZERO {
            entries.push(WorkingHoursPenalty {
                day: day.date,
                expected_minutes: day.expected_minutes,
                actual_minutes: day.actual_minutes,
                penalty,
            });
        }
    }

    let penalties = Itemized::from_entries(entries);

    let mode_description = match mode {
        WorkingHoursPenaltyMode::ProRated => {
            format!("pro-rated from daily rate ${}", daily_rate.normalize())
        }
        WorkingHoursPenaltyMode::PerMinute { per_minute_rate } => {
            format!("${} per minute", per_minute_rate.normalize())
        }
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "working_hours_penalty".to_string(),
        rule_name: "Working Hours Penalty".to_string(),
        input: serde_json::json!({
            "days": attendance.len(),
            "daily_rate": daily_rate.normalize().to_string(),
            "mode": mode
        }),
        output: serde_json::json!({
            "days": days,
            "penalized_days": penalties.entries.len(),
            "total": penalties.total.normalize().to_string()
        }),
        reasoning: format!(
            "{} of {} day(s) short of expected minutes, {}: total ${}",
            penalties.entries.len(),
            attendance.len(),
            mode_description,
            penalties.total.normalize()
        ),
    };

    WorkingHoursPenaltyResult {
        penalties,
        audit_step,
    }
}
