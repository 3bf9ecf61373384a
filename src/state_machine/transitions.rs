//! The payroll run transition table.

use crate::error::{PayrollError, PayrollResult};
use crate::models::{PayrollPhase, RunEvent, SignoffStage};

/// Determines the phase a run moves to when `event` is applied in `current`.
///
/// Events that are legal but do not move the run (regenerating a draft,
/// recording HR events or penalties, deleting a run) return `current`.
/// The function is pure; it never mutates a run.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{PayrollPhase, RunEvent};
/// use payroll_engine::state_machine::next_phase;
///
/// let next = next_phase("PR-2025-0001", PayrollPhase::FinanceApproved, RunEvent::Lock).unwrap();
/// assert_eq!(next, PayrollPhase::Locked);
/// assert!(next_phase("PR-2025-0001", PayrollPhase::DraftReviewed, RunEvent::Lock).is_err());
/// ```
pub fn next_phase(
    run_id: &str,
    current: PayrollPhase,
    event: RunEvent,
) -> PayrollResult<PayrollPhase> {
    use PayrollPhase as P;
    use RunEvent as E;

    let target = match (current, event) {
        // Phase 0 -> 1
        (P::PendingApprovals, E::StartInitiation) => P::PeriodLocked,

        // Draft generation and fact changes
        (P::PeriodLocked | P::DraftGenerated, E::GenerateDraft) => P::DraftGenerated,
        (P::DraftGenerated, E::ProcessHrEvents | E::ApplyPenalties) => P::DraftGenerated,
        (P::DraftGenerated, E::ReviewDraft) => P::DraftReviewed,

        // Sign-offs
        (P::DraftReviewed, E::ManagerApprove) => P::ManagerApproved,
        (P::DraftReviewed, E::FinanceApprove) => {
            return Err(PayrollError::OutOfOrderApproval {
                attempted: SignoffStage::Finance,
                required: SignoffStage::Manager,
            });
        }
        (P::ManagerApproved, E::FinanceApprove) => P::FinanceApproved,

        // Lock and unfreeze
        (P::FinanceApproved, E::Lock) => P::Locked,
        (P::Locked, E::Unfreeze) => P::DraftReviewed,
        (P::PayslipsGenerated, E::Unfreeze | E::GeneratePayslips) => {
            return Err(PayrollError::AlreadyFinalized {
                run_id: run_id.to_string(),
            });
        }

        // Payslips
        (P::Locked, E::GeneratePayslips) => P::PayslipsGenerated,
        (phase, E::GeneratePayslips) => {
            return Err(PayrollError::NotLocked {
                run_id: run_id.to_string(),
                phase,
            });
        }

        // Deletion is only allowed before lock
        (phase, E::Delete) if !phase.is_locked() => phase,

        // Invalid transitions
        (phase, attempted) => {
            return Err(PayrollError::InvalidPhaseTransition {
                current: phase,
                attempted,
            });
        }
    };

    Ok(target)
}
