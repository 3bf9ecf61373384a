//! Run-scoped fact changes.
//!
//! HR events and manual penalties recorded while a draft is open are kept on
//! the run and layered over the provider's facts on every later draft
//! generation.

use serde::{Deserialize, Serialize};

use crate::models::{AttendanceDay, HrEvent, ManualAdjustment, PeriodFacts};

/// Fact changes recorded against one run, applied in recording order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactOverlay {
    hr_events: Vec<HrEvent>,
    penalties: Vec<ManualAdjustment>,
}

impl FactOverlay {
    /// Records HR events.
    pub fn record_hr_events(&mut self, events: impl IntoIterator<Item = HrEvent>) {
        self.hr_events.extend(events);
    }

    /// Records manual penalties. Callers validate them first.
    pub fn record_penalties(&mut self, penalties: impl IntoIterator<Item = ManualAdjustment>) {
        self.penalties.extend(penalties);
    }

    /// Recorded HR events.
    pub fn hr_events(&self) -> &[HrEvent] {
        &self.hr_events
    }

    /// Recorded penalties.
    pub fn penalties(&self) -> &[ManualAdjustment] {
        &self.penalties
    }

    /// Returns true if a termination removed the employee from scope.
    pub fn excludes(&self, employee_id: &str) -> bool {
        self.hr_events.iter().any(|event| {
            matches!(event, HrEvent::Termination { employee_id: id } if id == employee_id)
        })
    }

    /// Layers the recorded changes for `facts.employee` over `facts`.
    ///
    /// Attendance corrections and leave spans outside the period are ignored.
    pub fn apply(&self, facts: &mut PeriodFacts) {
        let employee_id = facts.employee.id.clone();
        let period = facts.period;

        for event in self.hr_events.iter().filter(|e| e.employee_id() == employee_id) {
            match event {
                HrEvent::AttendanceCorrection {
                    date,
                    expected_minutes,
                    actual_minutes,
                    ..
                } if period.contains(*date) => {
                    match facts.attendance.iter_mut().find(|d| d.date == *date) {
                        Some(day) => {
                            day.actual_minutes = *actual_minutes;
                            if let Some(expected) = expected_minutes {
                                day.expected_minutes = *expected;
                            }
                        }
                        None => facts.attendance.push(AttendanceDay {
                            date: *date,
                            expected_minutes: expected_minutes.unwrap_or(0),
                            actual_minutes: *actual_minutes,
                        }),
                    }
                }
                HrEvent::LeaveApproved { span, .. }
                    if period.overlaps(span.start_date, span.end_date) =>
                {
                    facts.leaves.push(span.clone());
                }
                _ => {}
            }
        }
        facts.attendance.sort_by_key(|d| d.date);

        facts.adjustments.extend(
            self.penalties
                .iter()
                .filter(|p| p.employee_id == employee_id)
                .cloned(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AdjustmentKind, EmployeeProfile, EmploymentStatus, LeaveKind, LeaveSpan, PayrollPeriod,
    };
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn facts() -> PeriodFacts {
        PeriodFacts {
            employee: EmployeeProfile {
                id: "emp-001".to_string(),
                name: "Ada".to_string(),
                entity: "acme".to_string(),
                base_salary: Decimal::from(9000),
                allowances: vec![],
                status: EmploymentStatus::Active,
                hired_on: date(1, 1),
                terminated_on: None,
            },
            period: PayrollPeriod::ending(date(1, 31)),
            approvals: vec![],
            attendance: vec![AttendanceDay {
                date: date(1, 6),
                expected_minutes: 480,
                actual_minutes: 300,
            }],
            leaves: vec![],
            adjustments: vec![],
            tax_rules: vec![],
            insurance_rules: vec![],
            refunds: vec![],
        }
    }

    #[test]
    fn test_attendance_correction_updates_and_adds_days() {
        let mut overlay = FactOverlay::default();
        overlay.record_hr_events(vec![
            HrEvent::AttendanceCorrection {
                employee_id: "emp-001".to_string(),
                date: date(1, 6),
                expected_minutes: None,
                actual_minutes: 480,
            },
            HrEvent::AttendanceCorrection {
                employee_id: "emp-001".to_string(),
                date: date(1, 3),
                expected_minutes: Some(480),
                actual_minutes: 240,
            },
            HrEvent::AttendanceCorrection {
                employee_id: "emp-001".to_string(),
                date: date(2, 3),
                expected_minutes: Some(480),
                actual_minutes: 0,
            },
        ]);

        let mut facts = facts();
        overlay.apply(&mut facts);

        assert_eq!(facts.attendance.len(), 2);
        assert_eq!(facts.attendance[0].date, date(1, 3));
        assert_eq!(facts.attendance[0].actual_minutes, 240);
        assert_eq!(facts.attendance[1].expected_minutes, 480);
        assert_eq!(facts.attendance[1].actual_minutes, 480);
    }

    #[test]
    fn test_other_employees_changes_are_not_applied() {
        let mut overlay = FactOverlay::default();
        overlay.record_hr_events(vec![HrEvent::LeaveApproved {
            employee_id: "emp-002".to_string(),
            span: LeaveSpan {
                leave_type_id: "unpaid".to_string(),
                kind: LeaveKind::Unpaid,
                start_date: date(1, 6),
                end_date: date(1, 6),
                days: Decimal::ONE,
            },
        }]);
        overlay.record_penalties(vec![ManualAdjustment {
            id: "adj-1".to_string(),
            employee_id: "emp-002".to_string(),
            kind: AdjustmentKind::Penalty,
            category: None,
            effective_date: date(1, 10),
            amount: Decimal::from(10),
            reason: "Late".to_string(),
        }]);

        let mut facts = facts();
        let before = facts.clone();
        overlay.apply(&mut facts);

        assert_eq!(facts, before);
    }

    #[test]
    fn test_termination_excludes_employee() {
        let mut overlay = FactOverlay::default();
        overlay.record_hr_events(vec![HrEvent::Termination {
            employee_id: "emp-002".to_string(),
        }]);

        assert!(overlay.excludes("emp-002"));
        assert!(!overlay.excludes("emp-001"));
    }
}
