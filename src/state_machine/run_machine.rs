//! The payroll run state machine.
//!
//! [`PayrollRunStateMachine`] owns one run, its employee lines and its fact
//! overlay. Every operation checks the transition table first; a rejected
//! operation leaves the run untouched.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::approval::ApprovalGateway;
use crate::calculation::SalaryCalculator;
use crate::error::{PayrollError, PayrollResult};
use crate::inputs::RuleInputProvider;
use crate::models::{
    AdjustmentKind, EmployeePayrollLine, HrEvent, LineStatus, ManualAdjustment, Payslip,
    PayrollPeriod, PayrollPhase, PayrollRun, RunEvent, RunSignoffs, SignoffStage,
    validate_run_id,
};

use super::{FactOverlay, next_phase};

/// Everything needed to calculate draft lines outside the run's lock.
///
/// A plan is a snapshot: it does not change when the run changes.
#[derive(Debug, Clone)]
pub struct DraftPlan {
    /// The run being drafted.
    pub run_id: String,
    /// The entity being paid.
    pub entity: String,
    /// The period being paid.
    pub period: PayrollPeriod,
    /// Fact changes recorded against the run.
    pub overlay: FactOverlay,
}

impl DraftPlan {
    /// Employees in scope: active in the period and not terminated by an HR event.
    pub fn scope(&self, provider: &dyn RuleInputProvider) -> PayrollResult<Vec<String>> {
        Ok(provider
            .active_employees(&self.entity, &self.period)?
            .into_iter()
            .filter(|id| !self.overlay.excludes(id))
            .collect())
    }

    /// Calculates one employee's draft line.
    ///
    /// Input errors (missing profile, missing rules) become a line without a
    /// breakdown instead of failing the run.
    pub fn compute_line(
        &self,
        provider: &dyn RuleInputProvider,
        calculator: &SalaryCalculator,
        employee_id: &str,
    ) -> EmployeePayrollLine {
        let result = provider
            .fetch_period_facts(employee_id, self.period.start, self.period.end)
            .and_then(|mut facts| {
                self.overlay.apply(&mut facts);
                calculator.calculate(&facts)
            });

        match result {
            Ok(calc) => {
                debug!(
                    run_id = %self.run_id,
                    employee_id = %employee_id,
                    net_pay = %calc.breakdown.net_pay(),
                    "Draft line calculated"
                );
                EmployeePayrollLine::calculated(
                    employee_id,
                    calc.breakdown,
                    calc.warnings,
                    calc.audit_trace,
                )
            }
            Err(err) => {
                warn!(
                    run_id = %self.run_id,
                    employee_id = %employee_id,
                    code = err.code(),
                    error = %err,
                    "Draft line has no breakdown"
                );
                EmployeePayrollLine::failed(employee_id, &err)
            }
        }
    }
}

/// Owns the lifecycle of one payroll run.
///
/// # Example
///
/// ```
/// use payroll_engine::state_machine::PayrollRunStateMachine;
/// use payroll_engine::models::PayrollPhase;
/// use chrono::NaiveDate;
///
/// let machine = PayrollRunStateMachine::new(
///     "PR-2025-0001",
///     "acme",
///     NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     "hr-1",
/// )
/// .unwrap();
/// assert_eq!(machine.run().phase, PayrollPhase::PendingApprovals);
/// assert!(machine.lines().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct PayrollRunStateMachine {
    run: PayrollRun,
    lines: BTreeMap<String, EmployeePayrollLine>,
    overlay: FactOverlay,
    draft_stale: bool,
    payslips: Vec<Payslip>,
}

impl PayrollRunStateMachine {
    /// Creates a run in phase 0. Fails with `InvalidRunId` for a malformed id.
    pub fn new(
        run_id: &str,
        entity: &str,
        period_end: NaiveDate,
        created_by: &str,
    ) -> PayrollResult<Self> {
        validate_run_id(run_id)?;

        Ok(Self {
            run: PayrollRun {
                run_id: run_id.to_string(),
                entity: entity.to_string(),
                period: PayrollPeriod::ending(period_end),
                phase: PayrollPhase::default(),
                created_by: created_by.to_string(),
                created_at: Utc::now(),
                locked_at: None,
                finalized_at: None,
                signoffs: RunSignoffs::default(),
            },
            lines: BTreeMap::new(),
            overlay: FactOverlay::default(),
            draft_stale: false,
            payslips: Vec::new(),
        })
    }

    /// The run record.
    pub fn run(&self) -> &PayrollRun {
        &self.run
    }

    /// Employee lines keyed by employee id.
    pub fn lines(&self) -> &BTreeMap<String, EmployeePayrollLine> {
        &self.lines
    }

    /// The recorded fact changes.
    pub fn overlay(&self) -> &FactOverlay {
        &self.overlay
    }

    /// Returns true if facts changed since the last draft generation.
    pub fn is_draft_stale(&self) -> bool {
        self.draft_stale
    }

    /// Payslips emitted by the run, empty until finalized.
    pub fn payslips(&self) -> &[Payslip] {
        &self.payslips
    }

    /// Checks that `event` is legal now and returns the target phase.
    fn transition(&self, event: RunEvent) -> PayrollResult<PayrollPhase> {
        next_phase(&self.run.run_id, self.run.phase, event).inspect_err(|err| {
            warn!(
                run_id = %self.run.run_id,
                phase = %self.run.phase,
                event = %event,
                code = err.code(),
                "Run transition rejected"
            );
        })
    }

    fn enter(&mut self, event: RunEvent, target: PayrollPhase) {
        if self.run.phase != target {
            info!(
                run_id = %self.run.run_id,
                from = %self.run.phase,
                to = %target,
                event = %event,
                "Run phase changed"
            );
        }
        self.run.phase = target;
    }

    fn set_line_status(&mut self, status: LineStatus) {
        for line in self.lines.values_mut() {
            line.status = status;
        }
    }

    /// Fails with `ApprovalsIncomplete` while any of the entity's signing-bonus
    /// or exit-benefit items for the run's period is pending.
    pub fn validate_phase0(&self, approvals: &ApprovalGateway) -> PayrollResult<()> {
        approvals.ensure_period_decided(&self.run.entity, self.run.period.end)
    }

    /// Moves from phase 0 to phase 1 once approvals are complete.
    ///
    /// The entity's approval items for the period stay frozen until the run
    /// is finalized or deleted.
    pub fn start_initiation(&mut self, approvals: &ApprovalGateway) -> PayrollResult<()> {
        let target = self.transition(RunEvent::StartInitiation)?;
        approvals
            .freeze_period(&self.run.entity, self.run.period.end, &self.run.run_id)
            .inspect_err(|err| {
                warn!(run_id = %self.run.run_id, error = %err, "Initiation blocked");
            })?;
        self.enter(RunEvent::StartInitiation, target);
        Ok(())
    }

    /// Snapshots what draft generation needs.
    pub fn prepare_draft(&self) -> PayrollResult<DraftPlan> {
        self.transition(RunEvent::GenerateDraft)?;
        Ok(DraftPlan {
            run_id: self.run.run_id.clone(),
            entity: self.run.entity.clone(),
            period: self.run.period,
            overlay: self.overlay.clone(),
        })
    }

    /// Replaces every line with a freshly calculated set.
    pub fn install_draft(&mut self, lines: Vec<EmployeePayrollLine>) -> PayrollResult<()> {
        let target = self.transition(RunEvent::GenerateDraft)?;

        self.lines = lines
            .into_iter()
            .map(|line| (line.employee_id.clone(), line))
            .collect();
        self.draft_stale = false;

        let failed = self.lines.values().filter(|l| !l.is_calculated()).count();
        info!(
            run_id = %self.run.run_id,
            lines = self.lines.len(),
            failed,
            "Draft installed"
        );
        self.enter(RunEvent::GenerateDraft, target);
        Ok(())
    }

    /// Calculates and installs draft lines on the current thread.
    ///
    /// [`PayrollEngine`](crate::engine::PayrollEngine) does the same work in
    /// parallel.
    pub fn generate_draft(
        &mut self,
        provider: &dyn RuleInputProvider,
        calculator: &SalaryCalculator,
    ) -> PayrollResult<()> {
        let plan = self.prepare_draft()?;
        let lines = plan
            .scope(provider)?
            .iter()
            .map(|id| plan.compute_line(provider, calculator, id))
            .collect();
        self.install_draft(lines)
    }

    /// Records HR events against the open draft.
    pub fn process_hr_events(&mut self, events: Vec<HrEvent>) -> PayrollResult<()> {
        let target = self.transition(RunEvent::ProcessHrEvents)?;
        if events.is_empty() {
            return Ok(());
        }

        info!(run_id = %self.run.run_id, count = events.len(), "HR events recorded");
        self.overlay.record_hr_events(events);
        self.draft_stale = true;
        self.enter(RunEvent::ProcessHrEvents, target);
        Ok(())
    }

    /// Records manual penalties against the open draft.
    ///
    /// Every record must be a `penalty` with a non-negative amount effective
    /// inside the run's period; otherwise nothing is recorded and the call
    /// fails with `InvalidAdjustment`.
    pub fn apply_penalties(&mut self, adjustments: Vec<ManualAdjustment>) -> PayrollResult<()> {
        let target = self.transition(RunEvent::ApplyPenalties)?;

        for adjustment in &adjustments {
            let problem = if adjustment.kind != AdjustmentKind::Penalty {
                Some("only penalty adjustments can be applied to a run")
            } else if adjustment.amount < Decimal::ZERO {
                Some("amount must not be negative")
            } else if !self.run.period.contains(adjustment.effective_date) {
                Some("effective date is outside the payroll period")
            } else {
                None
            };
            if let Some(message) = problem {
                warn!(
                    run_id = %self.run.run_id,
                    adjustment_id = %adjustment.id,
                    message,
                    "Penalty rejected"
                );
                return Err(PayrollError::InvalidAdjustment {
                    adjustment_id: adjustment.id.clone(),
                    message: message.to_string(),
                });
            }
        }
        if adjustments.is_empty() {
            return Ok(());
        }

        info!(run_id = %self.run.run_id, count = adjustments.len(), "Penalties recorded");
        self.overlay.record_penalties(adjustments);
        self.draft_stale = true;
        self.enter(RunEvent::ApplyPenalties, target);
        Ok(())
    }

    /// Marks the draft reviewed.
    ///
    /// Fails with `EmptyRun` when there are no lines, and `StaleDraft` when
    /// facts changed after the last generation.
    pub fn review_draft(&mut self) -> PayrollResult<()> {
        let target = self.transition(RunEvent::ReviewDraft)?;

        if self.lines.is_empty() {
            warn!(run_id = %self.run.run_id, "Review rejected: no employees in scope");
            return Err(PayrollError::EmptyRun {
                run_id: self.run.run_id.clone(),
            });
        }
        if self.draft_stale {
            warn!(run_id = %self.run.run_id, "Review rejected: draft is stale");
            return Err(PayrollError::StaleDraft {
                run_id: self.run.run_id.clone(),
            });
        }

        self.set_line_status(LineStatus::Reviewed);
        self.enter(RunEvent::ReviewDraft, target);
        Ok(())
    }

    /// Records the payroll manager's approval.
    pub fn manager_approve(&mut self, approver_id: &str) -> PayrollResult<()> {
        let target = self.transition(RunEvent::ManagerApprove)?;
        self.run
            .signoffs
            .record(SignoffStage::Manager, approver_id, Utc::now())?;
        self.enter(RunEvent::ManagerApprove, target);
        Ok(())
    }

    /// Records finance approval; lines become `approved`.
    pub fn finance_approve(&mut self, approver_id: &str) -> PayrollResult<()> {
        let target = self.transition(RunEvent::FinanceApprove)?;
        self.run
            .signoffs
            .record(SignoffStage::Finance, approver_id, Utc::now())?;
        self.set_line_status(LineStatus::Approved);
        self.enter(RunEvent::FinanceApprove, target);
        Ok(())
    }

    /// Freezes every line.
    pub fn lock(&mut self) -> PayrollResult<()> {
        let target = self.transition(RunEvent::Lock)?;
        self.set_line_status(LineStatus::Locked);
        self.run.locked_at = Some(Utc::now());
        self.enter(RunEvent::Lock, target);
        Ok(())
    }

    /// Returns a locked run to review. Both sign-offs must be given again.
    pub fn unfreeze(&mut self) -> PayrollResult<()> {
        let target = self.transition(RunEvent::Unfreeze)?;
        self.set_line_status(LineStatus::Reviewed);
        self.run.signoffs.clear();
        self.run.locked_at = None;
        self.enter(RunEvent::Unfreeze, target);
        Ok(())
    }

    /// Stores emitted payslips and moves to the terminal phase.
    pub fn finalize(&mut self, payslips: Vec<Payslip>) -> PayrollResult<()> {
        let target = self.transition(RunEvent::GeneratePayslips)?;
        self.payslips = payslips;
        self.run.finalized_at = Some(Utc::now());
        self.enter(RunEvent::GeneratePayslips, target);
        Ok(())
    }

    /// Fails unless the run may still be deleted.
    pub fn ensure_deletable(&self) -> PayrollResult<()> {
        self.transition(RunEvent::Delete).map(|_| ())
    }
}
