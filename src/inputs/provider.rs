//! Collaborator seams.
//!
//! The engine reads facts through [`RuleInputProvider`] and hands finished
//! payslips to a [`PayslipSink`]. Both are called from blocking worker
//! threads, so implementations must be `Send + Sync`.

use chrono::NaiveDate;

use crate::error::PayrollResult;
use crate::models::{Payslip, PayrollPeriod, PeriodFacts};

/// Read-only access to the facts a payroll run needs.
pub trait RuleInputProvider: Send + Sync {
    /// Ids of the employees of `entity` with an active profile overlapping
    /// `period`, sorted ascending.
    fn active_employees(&self, entity: &str, period: &PayrollPeriod) -> PayrollResult<Vec<String>>;

    /// Everything needed to calculate one employee's pay for the period.
    ///
    /// Fails with `DataUnavailable` if the employee has no active profile for
    /// the period, or `RuleSetMissing` if no tax/insurance rules are active
    /// for the employee's entity on `period_end`.
    fn fetch_period_facts(
        &self,
        employee_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> PayrollResult<PeriodFacts>;
}

/// Receives payslips emitted from a locked run.
pub trait PayslipSink: Send + Sync {
    /// Publishes a batch of payslips. Called once per run.
    fn publish(&self, payslips: &[Payslip]) -> PayrollResult<()>;
}
