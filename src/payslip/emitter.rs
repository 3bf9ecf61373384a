//! Payslip emission from locked runs.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PayrollError, PayrollResult};
use crate::inputs::PayslipSink;
use crate::models::{Payslip, RunEvent};
use crate::state_machine::{PayrollRunStateMachine, next_phase};

/// Converts a locked run's lines into payslips.
///
/// The emitter never changes a line; it copies each breakdown into a new
/// payslip, publishes the batch, and then finalizes the run.
#[derive(Debug, Clone)]
pub struct PayslipEmitter {
    engine_version: String,
}

impl Default for PayslipEmitter {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl PayslipEmitter {
    /// Creates an emitter that stamps payslips with `engine_version`.
    pub fn new(engine_version: impl Into<String>) -> Self {
        Self {
            engine_version: engine_version.into(),
        }
    }

    /// The version stamped on each payslip.
    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// Emits one payslip per line and moves the run to its terminal phase.
    ///
    /// # Errors
    ///
    /// - `NotLocked` if the run has not been locked.
    /// - `AlreadyFinalized` if payslips were already emitted.
    /// - `PartialRun` if any line has no breakdown.
    ///
    /// If the sink fails, the run stays locked and nothing is recorded.
    pub fn emit(
        &self,
        machine: &mut PayrollRunStateMachine,
        sink: &dyn PayslipSink,
    ) -> PayrollResult<Vec<Payslip>> {
        let run = machine.run();
        next_phase(&run.run_id, run.phase, RunEvent::GeneratePayslips)?;

        let missing: Vec<String> = machine
            .lines()
            .values()
            .filter(|line| !line.is_calculated())
            .map(|line| line.employee_id.clone())
            .collect();
        if !missing.is_empty() {
            warn!(
                run_id = %run.run_id,
                missing = missing.len(),
                "Payslips blocked by lines without a breakdown"
            );
            return Err(PayrollError::PartialRun {
                run_id: run.run_id.clone(),
                missing,
            });
        }

        let generated_at = Utc::now();
        let payslips: Vec<Payslip> = machine
            .lines()
            .values()
            .filter_map(|line| {
                let breakdown = line.breakdown.clone()?;
                Some(Payslip {
                    payslip_id: Uuid::new_v4(),
                    run_id: run.run_id.clone(),
                    employee_id: line.employee_id.clone(),
                    entity: run.entity.clone(),
                    period: run.period,
                    generated_at,
                    engine_version: self.engine_version.clone(),
                    consumed_refund_ids: breakdown.refund_ids().map(str::to_string).collect(),
                    breakdown,
                })
            })
            .collect();

        sink.publish(&payslips)?;
        info!(
            run_id = %run.run_id,
            payslips = payslips.len(),
            engine_version = %self.engine_version,
            "Payslips emitted"
        );

        machine.finalize(payslips.clone())?;
        Ok(payslips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalGateway;
    use crate::calculation::SalaryCalculator;
    use crate::inputs::RuleInputProvider;
    use crate::models::{
        EmployeeProfile, EmploymentStatus, PayrollPeriod, PayrollPhase, PeriodFacts,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    struct Roster(Vec<&'static str>);

    impl RuleInputProvider for Roster {
        fn active_employees(&self, _: &str, _: &PayrollPeriod) -> PayrollResult<Vec<String>> {
            Ok(self.0.iter().map(|id| id.to_string()).collect())
        }

        fn fetch_period_facts(
            &self,
            employee_id: &str,
            period_start: NaiveDate,
            period_end: NaiveDate,
        ) -> PayrollResult<PeriodFacts> {
            if employee_id == "emp-missing" {
                return Err(PayrollError::DataUnavailable {
                    employee_id: employee_id.to_string(),
                    period_start,
                    period_end,
                });
            }
            Ok(PeriodFacts {
                employee: EmployeeProfile {
                    id: employee_id.to_string(),
                    name: employee_id.to_string(),
                    entity: "acme".to_string(),
                    base_salary: Decimal::from(3000),
                    allowances: vec![],
                    status: EmploymentStatus::Active,
                    hired_on: date(1, 1),
                    terminated_on: None,
                },
                period: PayrollPeriod {
                    start: period_start,
                    end: period_end,
                },
                approvals: vec![],
                attendance: vec![],
                leaves: vec![],
                adjustments: vec![],
                tax_rules: vec![],
                insurance_rules: vec![],
                refunds: vec![],
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<usize>>,
        fail: bool,
    }

    impl PayslipSink for RecordingSink {
        fn publish(&self, payslips: &[Payslip]) -> PayrollResult<()> {
            if self.fail {
                return Err(PayrollError::CalculationError {
                    message: "sink offline".to_string(),
                });
            }
            self.batches.lock().unwrap().push(payslips.len());
            Ok(())
        }
    }

    fn locked_run(roster: &[&'static str]) -> PayrollRunStateMachine {
        let mut m =
            PayrollRunStateMachine::new("PR-2025-0001", "acme", date(1, 31), "hr-1").unwrap();
        m.start_initiation(&ApprovalGateway::new()).unwrap();
        m.generate_draft(&Roster(roster.to_vec()), &SalaryCalculator::default())
            .unwrap();
        m.review_draft().unwrap();
        m.manager_approve("mgr-1").unwrap();
        m.finance_approve("fin-1").unwrap();
        m.lock().unwrap();
        m
    }

    #[test]
    fn test_emit_one_payslip_per_line() {
        let mut m = locked_run(&["emp-001", "emp-002"]);
        let sink = RecordingSink::default();

        let payslips = PayslipEmitter::new("1.2.3").emit(&mut m, &sink).unwrap();

        assert_eq!(payslips.len(), 2);
        assert_eq!(payslips[0].employee_id, "emp-001");
        assert_eq!(payslips[0].engine_version, "1.2.3");
        assert_eq!(payslips[0].period.start, date(1, 1));
        assert_ne!(payslips[0].payslip_id, payslips[1].payslip_id);
        assert_eq!(
            Some(&payslips[1].breakdown),
            m.lines()["emp-002"].breakdown.as_ref()
        );
        assert_eq!(m.run().phase, PayrollPhase::PayslipsGenerated);
        assert!(m.run().finalized_at.is_some());
        assert_eq!(m.payslips(), payslips.as_slice());
        assert_eq!(*sink.batches.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_second_emit_is_already_finalized() {
        let mut m = locked_run(&["emp-001"]);
        let sink = RecordingSink::default();
        let emitter = PayslipEmitter::default();
        emitter.emit(&mut m, &sink).unwrap();

        let result = emitter.emit(&mut m, &sink);

        assert!(matches!(result, Err(PayrollError::AlreadyFinalized { .. })));
        assert_eq!(m.payslips().len(), 1);
        assert_eq!(*sink.batches.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_emit_before_lock_is_not_locked() {
        let mut m =
            PayrollRunStateMachine::new("PR-2025-0001", "acme", date(1, 31), "hr-1").unwrap();

        let result = PayslipEmitter::default().emit(&mut m, &RecordingSink::default());

        assert!(matches!(
            result,
            Err(PayrollError::NotLocked {
                phase: PayrollPhase::PendingApprovals,
                ..
            })
        ));
    }

    #[test]
    fn test_lines_without_breakdown_block_emission() {
        let mut m = locked_run(&["emp-001", "emp-missing"]);

        let result = PayslipEmitter::default().emit(&mut m, &RecordingSink::default());

        assert_eq!(
            result,
            Err(PayrollError::PartialRun {
                run_id: "PR-2025-0001".to_string(),
                missing: vec!["emp-missing".to_string()],
            })
        );
        assert_eq!(m.run().phase, PayrollPhase::Locked);
    }

    #[test]
    fn test_sink_failure_keeps_run_locked() {
        let mut m = locked_run(&["emp-001"]);
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        assert!(PayslipEmitter::default().emit(&mut m, &sink).is_err());
        assert_eq!(m.run().phase, PayrollPhase::Locked);
        assert!(m.payslips().is_empty());
    }
}
