//! Payslip model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PayrollPeriod, SalaryCalculationBreakdown};

/// An immutable payslip emitted from a locked run.
///
/// The breakdown is a deep copy; later changes to the run never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payslip {
    /// Unique payslip id.
    pub payslip_id: Uuid,
    /// The run that produced the payslip.
    pub run_id: String,
    /// The employee being paid.
    pub employee_id: String,
    /// The paying entity.
    pub entity: String,
    /// The period paid.
    pub period: PayrollPeriod,
    /// When the payslip was generated.
    pub generated_at: DateTime<Utc>,
    /// The version of the engine that produced the payslip.
    pub engine_version: String,
    /// The salary breakdown at lock time.
    pub breakdown: SalaryCalculationBreakdown,
    /// Refund records paid out by this payslip.
    pub consumed_refund_ids: Vec<String>,
}
