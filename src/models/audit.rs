//! Audit trail models.
//!
//! Every rule the salary calculator applies records an [`AuditStep`]; data
//! integrity problems are raised as [`CalculationWarning`]s and kept on the
//! employee line for human review.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Warning code raised when deductions exceed gross pay.
pub const NEGATIVE_NET_PAY: &str = "NEGATIVE_NET_PAY";

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// The ordered audit trace for one employee's calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
}

/// A warning generated during calculation.
///
/// Warnings never stop a calculation but must reach a reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl CalculationWarning {
    /// Warning for a net salary that had to be clamped to zero.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_engine::models::{CalculationWarning, NEGATIVE_NET_PAY};
    /// use rust_decimal::Decimal;
    ///
    /// let warning = CalculationWarning::negative_net_pay(Decimal::new(-1250, 2));
    /// assert_eq!(warning.code, NEGATIVE_NET_PAY);
    /// assert!(warning.message.contains("-12.50"));
    /// ```
    pub fn negative_net_pay(raw_net_salary: Decimal) -> Self {
        Self {
            code: NEGATIVE_NET_PAY.to_string(),
            message: format!(
                "Net salary computed as {} before clamping; payslip net salary set to 0",
                raw_net_salary
            ),
            severity: "high".to_string(),
        }
    }
}
