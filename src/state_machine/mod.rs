//! Payroll run lifecycle.
//!
//! [`next_phase`] is the transition table; [`PayrollRunStateMachine`] applies
//! it to one run and owns the run's lines and recorded fact changes.

mod overlay;
mod run_machine;
mod transitions;

pub use overlay::FactOverlay;
pub use run_machine::{DraftPlan, PayrollRunStateMachine};
pub use transitions::next_phase;
