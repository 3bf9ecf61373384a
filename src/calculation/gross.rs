//! Gross salary calculation.
//!
//! Gross salary is base salary plus allowances plus any approved signing
//! bonus and exit benefit for the employee.

use rust_decimal::Decimal;

use crate::models::{ApprovalItem, ApprovalKind, AuditStep, EmployeeProfile, SalaryComponents};

/// The result of a gross salary calculation, including the components and audit step.
#[derive(Debug, Clone)]
pub struct GrossSalaryResult {
    /// The salary components and derived gross salary.
    pub components: SalaryComponents,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates gross salary for an employee.
///
/// Only approval items belonging to the employee and in status `approved`
/// contribute; pending and rejected items are listed in the audit step but
/// add nothing.
///
/// # Arguments
///
/// * `employee` - The employee's profile
/// * `approvals` - Signing-bonus and exit-benefit items in any status
/// * `step_number` - The step number for audit trail sequencing
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::calculate_gross_salary;
/// use payroll_engine::models::{
///     Allowance, ApprovalItem, ApprovalKind, EmployeeProfile, EmploymentStatus,
/// };
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let employee = EmployeeProfile {
///     id: "emp-001".to_string(),
///     name: "Ada".to_string(),
///     entity: "acme".to_string(),
///     base_salary: Decimal::from(10000),
///     allowances: vec![Allowance { name: "housing".to_string(), amount: Decimal::from(500) }],
///     status: EmploymentStatus::Active,
///     hired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     terminated_on: None,
/// };
/// let pending = ApprovalItem::pending(
///     "sb-1",
///     ApprovalKind::SigningBonus,
///     "emp-001",
///     "acme",
///     NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     Decimal::from(1000),
/// );
///
/// let result = calculate_gross_salary(&employee, &[pending], 1);
/// assert_eq!(result.components.gross_salary, Decimal::from(10500));
/// assert_eq!(result.components.bonus_amount, Decimal::ZERO);
/// ```
pub fn calculate_gross_salary(
    employee: &EmployeeProfile,
    approvals: &[ApprovalItem],
    step_number: u32,
) -> GrossSalaryResult {
    let approved_total = |kind: ApprovalKind| -> Decimal {
        approvals
            .iter()
            .filter(|item| item.employee_id == employee.id && item.kind == kind)
            .filter(|item| item.contributes())
            .map(|item| item.amount)
            .sum()
    };

    let allowances = employee.allowances_total();
    let bonus_amount = approved_total(ApprovalKind::SigningBonus);
    let exit_benefit_amount = approved_total(ApprovalKind::ExitBenefit);

    let components =
        SalaryComponents::new(employee.base_salary, allowances, bonus_amount, exit_benefit_amount);

    let items: Vec<serde_json::Value> = approvals
        .iter()
        .filter(|item| item.employee_id == employee.id)
        .map(|item| {
            serde_json::json!({
                "id": item.id,
                "kind": item.kind,
                "status": item.status.to_string(),
                "amount": item.amount.normalize().to_string()
            })
        })
        .collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "gross_salary".to_string(),
        rule_name: "Gross Salary".to_string(),
        input: serde_json::json!({
            "base_salary": employee.base_salary.normalize().to_string(),
            "allowances": employee.allowances.iter().map(|a| serde_json::json!({
                "name": a.name,
                "amount": a.amount.normalize().to_string()
            })).collect::<Vec<_>>(),
            "approval_items": items
        }),
        output: serde_json::json!({
            "allowances": allowances.normalize().to_string(),
            "bonus_amount": bonus_amount.normalize().to_string(),
            "exit_benefit_amount": exit_benefit_amount.normalize().to_string(),
            "gross_salary": components.gross_salary.normalize().to_string()
        }),
        reasoning: format!(
            "Gross: ${} base + ${} allowances + ${} bonus + ${} exit benefit = ${}",
            employee.base_salary.normalize(),
            allowances.normalize(),
            bonus_amount.normalize(),
            exit_benefit_amount.normalize(),
            components.gross_salary.normalize()
        ),
    };

    GrossSalaryResult {
        components,
        audit_step,
    }
}
