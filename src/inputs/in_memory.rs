//! In-memory HR directory.
//!
//! Backs tests, benchmarks and the HTTP server. Approval items come from the
//! shared [`ApprovalGateway`]; bracket tables come from the loaded
//! configuration.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::approval::ApprovalGateway;
use crate::config::ConfigLoader;
use crate::error::{PayrollError, PayrollResult};
use crate::models::{
    AttendanceDay, EmployeeProfile, LeaveSpan, ManualAdjustment, Payslip, PayrollPeriod,
    PeriodFacts, RefundEntry,
};

use super::{PayslipSink, RuleInputProvider};

/// An in-memory roster with attendance, leave, adjustment and refund records.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use payroll_engine::approval::ApprovalGateway;
/// use payroll_engine::config::ConfigLoader;
/// use payroll_engine::inputs::{InMemoryDirectory, RuleInputProvider};
/// use payroll_engine::models::PayrollPeriod;
/// use chrono::NaiveDate;
///
/// let config = Arc::new(ConfigLoader::load("./config/default").unwrap());
/// let directory = InMemoryDirectory::new(config, Arc::new(ApprovalGateway::new()));
/// let period = PayrollPeriod::ending(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
/// assert!(directory.active_employees("acme", &period).unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct InMemoryDirectory {
    config: Arc<ConfigLoader>,
    approvals: Arc<ApprovalGateway>,
    profiles: DashMap<String, EmployeeProfile>,
    attendance: DashMap<String, Vec<AttendanceDay>>,
    leaves: DashMap<String, Vec<LeaveSpan>>,
    adjustments: DashMap<String, Vec<ManualAdjustment>>,
    refunds: DashMap<String, RefundEntry>,
    payslips: DashMap<Uuid, Payslip>,
    /// Serializes refund consumption across publishes.
    publishing: Mutex<()>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new(config: Arc<ConfigLoader>, approvals: Arc<ApprovalGateway>) -> Self {
        Self {
            config,
            approvals,
            profiles: DashMap::new(),
            attendance: DashMap::new(),
            leaves: DashMap::new(),
            adjustments: DashMap::new(),
            refunds: DashMap::new(),
            payslips: DashMap::new(),
            publishing: Mutex::new(()),
        }
    }

    /// Adds or replaces an employee profile.
    pub fn upsert_employee(&self, profile: EmployeeProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Records a day of attendance, replacing any record for the same day.
    pub fn record_attendance(&self, employee_id: &str, day: AttendanceDay) {
        let mut days = self.attendance.entry(employee_id.to_string()).or_default();
        days.retain(|d| d.date != day.date);
        days.push(day);
        days.sort_by_key(|d| d.date);
    }

    /// Records an approved leave span.
    pub fn record_leave(&self, employee_id: &str, span: LeaveSpan) {
        self.leaves
            .entry(employee_id.to_string())
            .or_default()
            .push(span);
    }

    /// Records a manual adjustment.
    ///
    /// Fails with `InvalidAdjustment` if the amount is negative.
    pub fn record_adjustment(&self, adjustment: ManualAdjustment) -> PayrollResult<()> {
        if adjustment.amount < Decimal::ZERO {
            return Err(PayrollError::InvalidAdjustment {
                adjustment_id: adjustment.id,
                message: "amount must not be negative".to_string(),
            });
        }
        self.adjustments
            .entry(adjustment.employee_id.clone())
            .or_default()
            .push(adjustment);
        Ok(())
    }

    /// Adds or replaces a refund record.
    pub fn record_refund(&self, refund: RefundEntry) {
        self.refunds.insert(refund.id.clone(), refund);
    }

    /// Returns a copy of a refund record.
    pub fn refund(&self, refund_id: &str) -> Option<RefundEntry> {
        self.refunds.get(refund_id).map(|r| r.value().clone())
    }

    /// Payslips published for a run, sorted by employee id.
    pub fn published_payslips(&self, run_id: &str) -> Vec<Payslip> {
        let mut payslips: Vec<Payslip> = self
            .payslips
            .iter()
            .filter(|p| p.run_id == run_id)
            .map(|p| p.value().clone())
            .collect();
        payslips.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        payslips
    }
}

impl RuleInputProvider for InMemoryDirectory {
    fn active_employees(&self, entity: &str, period: &PayrollPeriod) -> PayrollResult<Vec<String>> {
        let mut ids: Vec<String> = self
            .profiles
            .iter()
            .filter(|p| p.entity == entity && p.is_active_during(period))
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn fetch_period_facts(
        &self,
        employee_id: &str,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> PayrollResult<PeriodFacts> {
        let period = PayrollPeriod {
            start: period_start,
            end: period_end,
        };

        let employee = self
            .profiles
            .get(employee_id)
            .map(|p| p.value().clone())
            .filter(|p| p.is_active_during(&period))
            .ok_or_else(|| PayrollError::DataUnavailable {
                employee_id: employee_id.to_string(),
                period_start,
                period_end,
            })?;

        let rules = self.config.rules_for(&employee.entity, period_end)?;

        let attendance: Vec<AttendanceDay> = self
            .attendance
            .get(employee_id)
            .map(|days| {
                days.iter()
                    .filter(|d| period.contains(d.date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let leaves: Vec<LeaveSpan> = self
            .leaves
            .get(employee_id)
            .map(|spans| {
                spans
                    .iter()
                    .filter(|s| period.overlaps(s.start_date, s.end_date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let adjustments: Vec<ManualAdjustment> = self
            .adjustments
            .get(employee_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|a| period.contains(a.effective_date))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut refunds: Vec<RefundEntry> = self
            .refunds
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .map(|r| r.value().clone())
            .collect();
        refunds.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            employee_id = %employee_id,
            period_start = %period_start,
            period_end = %period_end,
            "Fetched period facts"
        );

        Ok(PeriodFacts {
            approvals: self.approvals.items_for_employee(employee_id, period_end),
            employee,
            period,
            attendance,
            leaves,
            adjustments,
            tax_rules: rules.tax.clone(),
            insurance_rules: rules.insurance.clone(),
            refunds,
        })
    }
}

impl PayslipSink for InMemoryDirectory {
    /// Stores the payslips and marks their refunds consumed.
    ///
    /// Fails with `RefundAlreadyConsumed`, storing nothing, when another run
    /// already paid one of the refunds.
    fn publish(&self, payslips: &[Payslip]) -> PayrollResult<()> {
        let _publishing = self.publishing.lock().unwrap_or_else(PoisonError::into_inner);

        for payslip in payslips {
            for refund_id in &payslip.consumed_refund_ids {
                if self.refunds.get(refund_id).is_some_and(|r| r.consumed) {
                    warn!(
                        run_id = %payslip.run_id,
                        employee_id = %payslip.employee_id,
                        refund_id = %refund_id,
                        "Refund already paid by another run"
                    );
                    return Err(PayrollError::RefundAlreadyConsumed {
                        refund_id: refund_id.clone(),
                    });
                }
            }
        }

        for payslip in payslips {
            for refund_id in &payslip.consumed_refund_ids {
                if let Some(mut refund) = self.refunds.get_mut(refund_id) {
                    refund.consumed = true;
                }
            }
            self.payslips.insert(payslip.payslip_id, payslip.clone());
        }
        if let Some(first) = payslips.first() {
            info!(run_id = %first.run_id, count = payslips.len(), "Payslips published");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalculationPolicy, EntityRules, RuleBook};
    use crate::models::{
        AdjustmentKind, ApprovalItem, ApprovalKind, BracketBase, BracketRule, EmploymentStatus,
        LeaveKind, RefundStatus,
    };
    use std::collections::HashMap;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn config() -> Arc<ConfigLoader> {
        let mut entities = HashMap::new();
        entities.insert(
            "acme".to_string(),
            EntityRules {
                tax: vec![BracketRule {
                    name: "Flat".to_string(),
                    rate: Decimal::new(10, 2),
                    lower_bound: Decimal::ZERO,
                    upper_bound: None,
                    applies_to: BracketBase::Gross,
                }],
                insurance: vec![],
            },
        );
        let book = RuleBook {
            effective_date: date(1, 1),
            entities,
        };
        Arc::new(ConfigLoader::from_parts(CalculationPolicy::default(), vec![book]).unwrap())
    }

    fn profile(id: &str, entity: &str, status: EmploymentStatus) -> EmployeeProfile {
        EmployeeProfile {
            id: id.to_string(),
            name: id.to_uppercase(),
            entity: entity.to_string(),
            base_salary: Decimal::from(9000),
            allowances: vec![],
            status,
            hired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            terminated_on: None,
        }
    }

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new(config(), Arc::new(ApprovalGateway::new()));
        directory.upsert_employee(profile("emp-002", "acme", EmploymentStatus::Active));
        directory.upsert_employee(profile("emp-001", "acme", EmploymentStatus::Active));
        directory.upsert_employee(profile("emp-003", "acme", EmploymentStatus::Inactive));
        directory.upsert_employee(profile("emp-009", "globex", EmploymentStatus::Active));
        directory
    }

    #[test]
    fn test_active_employees_sorted_and_filtered() {
        let directory = directory();
        let period = PayrollPeriod::ending(date(1, 31));

        let ids = directory.active_employees("acme", &period).unwrap();

        assert_eq!(ids, vec!["emp-001", "emp-002"]);
    }

    #[test]
    fn test_facts_are_filtered_to_period() {
        let directory = directory();
        directory.record_attendance(
            "emp-001",
            AttendanceDay {
                date: date(1, 6),
                expected_minutes: 480,
                actual_minutes: 400,
            },
        );
        directory.record_attendance(
            "emp-001",
            AttendanceDay {
                date: date(2, 3),
                expected_minutes: 480,
                actual_minutes: 0,
            },
        );
        directory.record_leave(
            "emp-001",
            LeaveSpan {
                leave_type_id: "annual".to_string(),
                kind: LeaveKind::Paid,
                start_date: date(1, 30),
                end_date: date(2, 2),
                days: Decimal::from(2),
            },
        );
        directory
            .record_adjustment(ManualAdjustment {
                id: "adj-1".to_string(),
                employee_id: "emp-001".to_string(),
                kind: AdjustmentKind::Penalty,
                category: None,
                effective_date: date(2, 10),
                amount: Decimal::from(50),
                reason: "Next month".to_string(),
            })
            .unwrap();

        let facts = directory
            .fetch_period_facts("emp-001", date(1, 1), date(1, 31))
            .unwrap();

        assert_eq!(facts.attendance.len(), 1);
        assert_eq!(facts.leaves.len(), 1);
        assert!(facts.adjustments.is_empty());
        assert_eq!(facts.tax_rules.len(), 1);
    }

    #[test]
    fn test_inactive_or_unknown_employee_is_unavailable() {
        let directory = directory();

        for id in ["emp-003", "emp-404"] {
            assert!(matches!(
                directory.fetch_period_facts(id, date(1, 1), date(1, 31)),
                Err(PayrollError::DataUnavailable { .. })
            ));
        }
    }

    #[test]
    fn test_entity_without_rules() {
        let directory = directory();

        assert!(matches!(
            directory.fetch_period_facts("emp-009", date(1, 1), date(1, 31)),
            Err(PayrollError::RuleSetMissing { entity, .. }) if entity == "globex"
        ));
    }

    #[test]
    fn test_negative_adjustment_is_rejected() {
        let directory = directory();

        let result = directory.record_adjustment(ManualAdjustment {
            id: "adj-neg".to_string(),
            employee_id: "emp-001".to_string(),
            kind: AdjustmentKind::Penalty,
            category: None,
            effective_date: date(1, 10),
            amount: Decimal::from(-5),
            reason: "Typo".to_string(),
        });

        assert!(matches!(
            result,
            Err(PayrollError::InvalidAdjustment { adjustment_id, .. }) if adjustment_id == "adj-neg"
        ));
    }

    #[test]
    fn test_facts_include_gateway_items() {
        let approvals = Arc::new(ApprovalGateway::new());
        let directory = InMemoryDirectory::new(config(), Arc::clone(&approvals));
        directory.upsert_employee(profile("emp-001", "acme", EmploymentStatus::Active));
        approvals
            .submit(ApprovalItem::pending(
                "sb-1",
                ApprovalKind::SigningBonus,
                "emp-001",
                "acme",
                date(1, 31),
                Decimal::from(1000),
            ))
            .unwrap();

        let facts = directory
            .fetch_period_facts("emp-001", date(1, 1), date(1, 31))
            .unwrap();

        assert_eq!(facts.approvals.len(), 1);
        assert_eq!(facts.approvals[0].id, "sb-1");
    }

    #[test]
    fn test_publish_marks_refunds_consumed() {
        let directory = directory();
        directory.record_refund(RefundEntry {
            id: "rf-1".to_string(),
            employee_id: "emp-001".to_string(),
            source: "Expense claim".to_string(),
            amount: Decimal::from(40),
            status: RefundStatus::Approved,
            consumed: false,
        });
        let facts = directory
            .fetch_period_facts("emp-001", date(1, 1), date(1, 31))
            .unwrap();
        let breakdown = crate::calculation::SalaryCalculator::default()
            .calculate(&facts)
            .unwrap()
            .breakdown;

        let payslip = Payslip {
            payslip_id: Uuid::new_v4(),
            run_id: "PR-2025-0001".to_string(),
            employee_id: "emp-001".to_string(),
            entity: "acme".to_string(),
            period: facts.period,
            generated_at: chrono::Utc::now(),
            engine_version: "test".to_string(),
            consumed_refund_ids: breakdown.refund_ids().map(String::from).collect(),
            breakdown,
        };
        directory.publish(&[payslip]).unwrap();

        assert!(directory.refund("rf-1").unwrap().consumed);
        assert_eq!(directory.published_payslips("PR-2025-0001").len(), 1);
    }

    #[test]
    fn test_publish_rejects_refund_paid_by_another_run() {
        let directory = directory();
        directory.record_refund(RefundEntry {
            id: "rf-1".to_string(),
            employee_id: "emp-001".to_string(),
            source: "Expense claim".to_string(),
            amount: Decimal::from(40),
            status: RefundStatus::Approved,
            consumed: false,
        });
        // Both runs were drafted before either published
        let payslip_for = |run_id: &str, period_start: NaiveDate, period_end: NaiveDate| {
            let facts = directory
                .fetch_period_facts("emp-001", period_start, period_end)
                .unwrap();
            let breakdown = crate::calculation::SalaryCalculator::default()
                .calculate(&facts)
                .unwrap()
                .breakdown;
            Payslip {
                payslip_id: Uuid::new_v4(),
                run_id: run_id.to_string(),
                employee_id: "emp-001".to_string(),
                entity: "acme".to_string(),
                period: facts.period,
                generated_at: chrono::Utc::now(),
                engine_version: "test".to_string(),
                consumed_refund_ids: breakdown.refund_ids().map(String::from).collect(),
                breakdown,
            }
        };
        let january = payslip_for("PR-JAN", date(1, 1), date(1, 31));
        let february = payslip_for("PR-FEB", date(2, 1), date(2, 28));
        assert_eq!(february.consumed_refund_ids, vec!["rf-1"]);

        directory.publish(&[january]).unwrap();
        let result = directory.publish(&[february]);

        assert!(matches!(
            result,
            Err(PayrollError::RefundAlreadyConsumed { refund_id }) if refund_id == "rf-1"
        ));
        assert!(directory.published_payslips("PR-FEB").is_empty());
        assert_eq!(directory.published_payslips("PR-JAN").len(), 1);
    }
}
