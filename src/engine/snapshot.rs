//! Read-only run views.

use serde::Serialize;

use crate::models::{EmployeePayrollLine, Payslip, PayrollRun};
use crate::state_machine::PayrollRunStateMachine;

/// An immutable copy of a run, published after every successful write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    /// The run record.
    pub run: PayrollRun,
    /// Employee lines, ordered by employee id.
    pub lines: Vec<EmployeePayrollLine>,
    /// True if facts changed since the last draft generation.
    pub draft_stale: bool,
    /// Payslips emitted by the run.
    pub payslips: Vec<Payslip>,
}

impl RunSnapshot {
    /// Copies the current state of a run.
    pub fn capture(machine: &PayrollRunStateMachine) -> Self {
        Self {
            run: machine.run().clone(),
            lines: machine.lines().values().cloned().collect(),
            draft_stale: machine.is_draft_stale(),
            payslips: machine.payslips().to_vec(),
        }
    }

    /// Returns the line for `employee_id`, if any.
    pub fn line(&self, employee_id: &str) -> Option<&EmployeePayrollLine> {
        self.lines.iter().find(|l| l.employee_id == employee_id)
    }
}
