//! The concurrent payroll engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::approval::ApprovalGateway;
use crate::calculation::SalaryCalculator;
use crate::error::{PayrollError, PayrollResult};
use crate::inputs::{PayslipSink, RuleInputProvider};
use crate::models::{EmployeePayrollLine, HrEvent, ManualAdjustment, Payslip, PayrollPhase};
use crate::payslip::PayslipEmitter;
use crate::state_machine::PayrollRunStateMachine;

use super::RunSnapshot;

/// One registered run: a writer lock and the latest published snapshot.
#[derive(Debug)]
struct RunSlot {
    writer: Mutex<PayrollRunStateMachine>,
    snapshot: watch::Sender<Arc<RunSnapshot>>,
}

impl RunSlot {
    fn new(machine: PayrollRunStateMachine) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(RunSnapshot::capture(&machine)));
        Self {
            writer: Mutex::new(machine),
            snapshot,
        }
    }

    fn publish(&self, machine: &PayrollRunStateMachine) -> Arc<RunSnapshot> {
        let snapshot = Arc::new(RunSnapshot::capture(machine));
        self.snapshot.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    fn latest(&self) -> Arc<RunSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }
}

/// Owns every payroll run and serializes writes per run.
///
/// Writers to the same run queue on that run's async mutex. Readers never
/// wait: they get the snapshot published by the last completed write.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use payroll_engine::approval::ApprovalGateway;
/// use payroll_engine::calculation::SalaryCalculator;
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::engine::PayrollEngine;
/// use payroll_engine::inputs::InMemoryDirectory;
/// use chrono::NaiveDate;
///
/// # async fn run() -> payroll_engine::error::PayrollResult<()> {
/// let config = Arc::new(ConfigLoader::load("./config/default")?);
/// let approvals = Arc::new(ApprovalGateway::new());
/// let directory = Arc::new(InMemoryDirectory::new(Arc::clone(&config), Arc::clone(&approvals)));
/// let engine = PayrollEngine::new(
///     directory.clone(),
///     directory,
///     approvals,
///     SalaryCalculator::new(config.policy().clone()),
/// );
///
/// let period_end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// engine.create_run("PR-2025-0001", "acme", period_end, "hr-1")?;
/// engine.start_initiation("PR-2025-0001").await?;
/// let snapshot = engine.generate_draft("PR-2025-0001").await?;
/// println!("{} lines", snapshot.lines.len());
/// # Ok(())
/// # }
/// ```
pub struct PayrollEngine {
    provider: Arc<dyn RuleInputProvider>,
    sink: Arc<dyn PayslipSink>,
    approvals: Arc<ApprovalGateway>,
    calculator: Arc<SalaryCalculator>,
    emitter: PayslipEmitter,
    runs: DashMap<String, Arc<RunSlot>>,
}

impl PayrollEngine {
    /// Creates an engine with no runs.
    pub fn new(
        provider: Arc<dyn RuleInputProvider>,
        sink: Arc<dyn PayslipSink>,
        approvals: Arc<ApprovalGateway>,
        calculator: SalaryCalculator,
    ) -> Self {
        Self {
            provider,
            sink,
            approvals,
            calculator: Arc::new(calculator),
            emitter: PayslipEmitter::default(),
            runs: DashMap::new(),
        }
    }

    /// Replaces the payslip emitter.
    pub fn with_emitter(mut self, emitter: PayslipEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    /// The shared approval gateway.
    pub fn approvals(&self) -> &ApprovalGateway {
        &self.approvals
    }

    fn slot(&self, run_id: &str) -> PayrollResult<Arc<RunSlot>> {
        self.runs
            .get(run_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| PayrollError::RunNotFound {
                run_id: run_id.to_string(),
            })
    }

    /// Applies `op` under the run's writer lock and publishes the result.
    async fn write<F>(&self, run_id: &str, op: F) -> PayrollResult<Arc<RunSnapshot>>
    where
        F: FnOnce(&mut PayrollRunStateMachine) -> PayrollResult<()>,
    {
        let slot = self.slot(run_id)?;
        let mut machine = slot.writer.lock().await;
        op(&mut *machine)?;
        Ok(slot.publish(&machine))
    }

    // ==========================================================================
    // Run registry
    // ==========================================================================

    /// Registers a new run in phase 0.
    pub fn create_run(
        &self,
        run_id: &str,
        entity: &str,
        period_end: NaiveDate,
        created_by: &str,
    ) -> PayrollResult<Arc<RunSnapshot>> {
        let machine = PayrollRunStateMachine::new(run_id, entity, period_end, created_by)?;

        match self.runs.entry(run_id.to_string()) {
            Entry::Occupied(_) => {
                warn!(run_id = %run_id, "Run id already exists");
                Err(PayrollError::DuplicateRunId {
                    run_id: run_id.to_string(),
                })
            }
            Entry::Vacant(vacant) => {
                let slot = RunSlot::new(machine);
                let snapshot = slot.latest();
                vacant.insert(Arc::new(slot));
                info!(
                    run_id = %run_id,
                    entity = %entity,
                    period_end = %period_end,
                    created_by = %created_by,
                    "Run created"
                );
                Ok(snapshot)
            }
        }
    }

    /// The latest published state of a run. Never waits on writers.
    pub fn run_status(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        Ok(self.slot(run_id)?.latest())
    }

    /// The latest snapshot of every run, ordered by run id.
    pub fn list_runs(&self) -> Vec<Arc<RunSnapshot>> {
        let mut runs: Vec<Arc<RunSnapshot>> =
            self.runs.iter().map(|slot| slot.value().latest()).collect();
        runs.sort_by(|a, b| a.run.run_id.cmp(&b.run.run_id));
        runs
    }

    /// Checks the run's approval gate without taking the writer lock.
    pub fn validate_phase0(&self, run_id: &str) -> PayrollResult<()> {
        let snapshot = self.run_status(run_id)?;
        self.approvals
            .ensure_period_decided(&snapshot.run.entity, snapshot.run.period.end)
    }

    /// Subscribes to a run's snapshots.
    pub fn watch_run(&self, run_id: &str) -> PayrollResult<watch::Receiver<Arc<RunSnapshot>>> {
        Ok(self.slot(run_id)?.snapshot.subscribe())
    }

    /// The run's employee lines.
    pub fn lines(&self, run_id: &str) -> PayrollResult<Vec<EmployeePayrollLine>> {
        Ok(self.run_status(run_id)?.lines.clone())
    }

    /// The run's payslips; empty until finalized.
    pub fn payslips(&self, run_id: &str) -> PayrollResult<Vec<Payslip>> {
        Ok(self.run_status(run_id)?.payslips.clone())
    }

    /// Removes a run that has not been locked.
    pub async fn delete_run(&self, run_id: &str) -> PayrollResult<()> {
        let slot = self.slot(run_id)?;
        let machine = slot.writer.lock().await;
        machine.ensure_deletable()?;
        self.runs.remove(run_id);
        let run = machine.run();
        if run.phase != PayrollPhase::PendingApprovals {
            self.approvals.thaw_period(&run.entity, run.period.end, run_id);
        }
        info!(run_id = %run_id, phase = %run.phase, "Run deleted");
        Ok(())
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// Leaves phase 0 once every approval item for the period is decided.
    pub async fn start_initiation(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        let approvals = Arc::clone(&self.approvals);
        self.write(run_id, |m| m.start_initiation(&approvals)).await
    }

    /// Calculates every employee in scope on the blocking pool and installs
    /// the lines in one step.
    ///
    /// A panicking calculation aborts the draft with `CalculationError`; the
    /// run keeps its previous lines.
    pub async fn generate_draft(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        let slot = self.slot(run_id)?;
        let mut machine = slot.writer.lock().await;

        let plan = Arc::new(machine.prepare_draft()?);
        let scope = plan.scope(self.provider.as_ref())?;
        debug!(run_id = %run_id, employees = scope.len(), "Calculating draft");

        let mut tasks = JoinSet::new();
        for employee_id in scope {
            let plan = Arc::clone(&plan);
            let provider = Arc::clone(&self.provider);
            let calculator = Arc::clone(&self.calculator);
            tasks.spawn_blocking(move || {
                plan.compute_line(provider.as_ref(), &calculator, &employee_id)
            });
        }

        let mut lines = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let line = joined.map_err(|err| {
                warn!(run_id = %run_id, error = %err, "Draft calculation task failed");
                PayrollError::CalculationError {
                    message: format!("draft calculation task failed: {err}"),
                }
            })?;
            lines.insert(line.employee_id.clone(), line);
        }

        machine.install_draft(lines.into_values().collect())?;
        Ok(slot.publish(&machine))
    }

    /// Records HR events against the open draft.
    pub async fn process_hr_events(
        &self,
        run_id: &str,
        events: Vec<HrEvent>,
    ) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, |m| m.process_hr_events(events)).await
    }

    /// Records manual penalties against the open draft.
    pub async fn apply_penalties(
        &self,
        run_id: &str,
        adjustments: Vec<ManualAdjustment>,
    ) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, |m| m.apply_penalties(adjustments)).await
    }

    /// Marks the draft reviewed.
    pub async fn review_draft(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, PayrollRunStateMachine::review_draft).await
    }

    /// Records the payroll manager's sign-off.
    pub async fn manager_approve(
        &self,
        run_id: &str,
        approver_id: &str,
    ) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, |m| m.manager_approve(approver_id)).await
    }

    /// Records finance's sign-off.
    pub async fn finance_approve(
        &self,
        run_id: &str,
        approver_id: &str,
    ) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, |m| m.finance_approve(approver_id)).await
    }

    /// Freezes the run.
    pub async fn lock(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, PayrollRunStateMachine::lock).await
    }

    /// Returns a locked run to review.
    pub async fn unfreeze(&self, run_id: &str) -> PayrollResult<Arc<RunSnapshot>> {
        self.write(run_id, PayrollRunStateMachine::unfreeze).await
    }

    /// Emits payslips from a locked run and finalizes it.
    pub async fn generate_payslips(&self, run_id: &str) -> PayrollResult<Vec<Payslip>> {
        let slot = self.slot(run_id)?;
        let mut machine = slot.writer.lock().await;
        let payslips = self.emitter.emit(&mut *machine, self.sink.as_ref())?;
        slot.publish(&machine);
        let run = machine.run();
        self.approvals.thaw_period(&run.entity, run.period.end, run_id);
        Ok(payslips)
    }
}
