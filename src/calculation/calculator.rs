//! The salary calculator.
//!
//! [`SalaryCalculator::calculate`] runs every calculation rule in a fixed
//! order over one employee's [`PeriodFacts`] and assembles the
//! [`SalaryCalculationBreakdown`]. It is a pure function of its input.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::CalculationPolicy;
use crate::error::PayrollResult;
use crate::models::{
    AuditStep, AuditTrace, CalculationWarning, DeductionBreakdown, PenaltyBreakdown, PeriodFacts,
    SalaryCalculationBreakdown,
};

use super::{
    calculate_daily_rate, calculate_gross_salary, calculate_insurance, calculate_tax,
    calculate_unpaid_leave, calculate_working_hours_penalty, collect_manual_penalties,
    collect_refunds, value_leave,
};

/// The output of one employee's salary calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryCalculation {
    /// The assembled breakdown.
    pub breakdown: SalaryCalculationBreakdown,
    /// Warnings for human review.
    pub warnings: Vec<CalculationWarning>,
    /// Every rule applied, in order.
    pub audit_trace: AuditTrace,
}

/// Maps one employee's period facts to a salary breakdown.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::SalaryCalculator;
/// use payroll_engine::config::CalculationPolicy;
/// use payroll_engine::models::{
///     Allowance, BracketBase, BracketRule, EmployeeProfile, EmploymentStatus, PayrollPeriod,
///     PeriodFacts,
/// };
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let flat = |name: &str, rate: i64| BracketRule {
///     name: name.to_string(),
///     rate: Decimal::new(rate, 2),
///     lower_bound: Decimal::ZERO,
///     upper_bound: None,
///     applies_to: BracketBase::Gross,
/// };
/// let facts = PeriodFacts {
///     employee: EmployeeProfile {
///         id: "emp-001".to_string(),
///         name: "Ada".to_string(),
///         entity: "acme".to_string(),
///         base_salary: Decimal::from(10000),
///         allowances: vec![Allowance { name: "housing".to_string(), amount: Decimal::from(500) }],
///         status: EmploymentStatus::Active,
///         hired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         terminated_on: None,
///     },
///     period: PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()),
///     approvals: vec![],
///     attendance: vec![],
///     leaves: vec![],
///     adjustments: vec![],
///     tax_rules: vec![flat("Flat tax", 10)],
///     insurance_rules: vec![flat("Social insurance", 5)],
///     refunds: vec![],
/// };
///
/// let calculator = SalaryCalculator::new(CalculationPolicy::default());
/// let result = calculator.calculate(&facts).unwrap();
/// assert_eq!(result.breakdown.salary().gross_salary, Decimal::from(10500));
/// assert_eq!(result.breakdown.deductions().total_deductions, Decimal::from(1575));
/// assert_eq!(result.breakdown.net_pay(), Decimal::from(8925));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SalaryCalculator {
    policy: CalculationPolicy,
}

impl SalaryCalculator {
    /// Creates a calculator for the given policy.
    pub fn new(policy: CalculationPolicy) -> Self {
        Self { policy }
    }

    /// Returns the calculation policy.
    pub fn policy(&self) -> &CalculationPolicy {
        &self.policy
    }

    /// Calculates one employee's breakdown for the period.
    pub fn calculate(&self, facts: &PeriodFacts) -> PayrollResult<SalaryCalculation> {
        let scale = self.policy.money_scale;
        let employee = &facts.employee;
        let mut steps: Vec<AuditStep> = Vec::with_capacity(11);
        let mut warnings: Vec<CalculationWarning> = Vec::new();
        let mut step_number: u32 = 1;

        let gross = calculate_gross_salary(employee, &facts.approvals, step_number);
        steps.push(gross.audit_step);
        step_number += 1;
        let salary = gross.components;

        let daily = calculate_daily_rate(employee.base_salary, &self.policy, step_number)?;
        steps.push(daily.audit_step);
        step_number += 1;
        let daily_rate = daily.rate;

        let working_hours = calculate_working_hours_penalty(
            &facts.attendance,
            &facts.leaves,
            daily_rate,
            &self.policy.working_hours_penalty,
            scale,
            step_number,
        );
        steps.push(working_hours.audit_step);
        step_number += 1;

        let unpaid_leave =
            calculate_unpaid_leave(&facts.leaves, &facts.period, daily_rate, scale, step_number);
        steps.push(unpaid_leave.audit_step);
        step_number += 1;

        let manual = collect_manual_penalties(&facts.adjustments, step_number);
        steps.push(manual.audit_step);
        step_number += 1;

        let penalties = PenaltyBreakdown::new(
            manual.penalties,
            working_hours.penalties,
            unpaid_leave.deductions,
        );

        let tax = calculate_tax(
            &facts.tax_rules,
            salary.gross_salary,
            penalties.total_penalties,
            scale,
            step_number,
        );
        steps.push(tax.audit_step);
        step_number += 1;

        let insurance = calculate_insurance(
            &facts.insurance_rules,
            salary.gross_salary,
            tax.deductions.total,
            scale,
            step_number,
        );
        steps.push(insurance.audit_step);
        step_number += 1;

        let deductions = DeductionBreakdown::new(tax.deductions, insurance.deductions);

        let refunds = collect_refunds(&employee.id, &facts.refunds, step_number);
        steps.push(refunds.audit_step);
        step_number += 1;

        let leave = value_leave(&facts.leaves, &facts.period, daily_rate, scale, step_number);
        steps.push(leave.audit_step);
        step_number += 1;

        let breakdown = SalaryCalculationBreakdown::assemble(
            salary,
            penalties,
            deductions,
            leave.leaves,
            refunds.refunds,
        );

        let raw_net = breakdown.unclamped_net_salary();
        if raw_net < Decimal::ZERO {
            warn!(
                employee_id = %employee.id,
                raw_net_salary = %raw_net,
                "Net salary clamped to zero"
            );
            warnings.push(CalculationWarning::negative_net_pay(raw_net));
        }

        let summary = breakdown.summary();
        steps.push(AuditStep {
            step_number,
            rule_id: "net_pay".to_string(),
            rule_name: "Net Pay".to_string(),
            input: serde_json::json!({
                "gross_salary": summary.gross_salary.normalize().to_string(),
                "total_penalties": summary.minus_all_penalties.normalize().to_string(),
                "total_deductions": summary.minus_all_deductions.normalize().to_string(),
                "refunds": summary.plus_refunds.normalize().to_string()
            }),
            output: serde_json::json!({
                "unclamped_net_salary": raw_net.normalize().to_string(),
                "net_salary": breakdown.net_salary().normalize().to_string(),
                "net_pay": breakdown.net_pay().normalize().to_string()
            }),
            reasoning: format!(
                "Net: max(0, ${} - ${} - ${}) + ${} refunds = ${}",
                summary.gross_salary.normalize(),
                summary.minus_all_penalties.normalize(),
                summary.minus_all_deductions.normalize(),
                summary.plus_refunds.normalize(),
                breakdown.net_pay().normalize()
            ),
        });

        debug!(
            employee_id = %employee.id,
            gross_salary = %summary.gross_salary,
            net_pay = %breakdown.net_pay(),
            steps = steps.len(),
            "Salary calculated"
        );

        Ok(SalaryCalculation {
            breakdown,
            warnings,
            audit_trace: AuditTrace { steps },
        })
    }
}
