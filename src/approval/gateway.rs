//! Signing-bonus and exit-benefit approval tracking.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::error::{PayrollError, PayrollResult};
use crate::models::{ApprovalDecision, ApprovalItem, ApprovalPatch, ApprovalStatus};

/// Tracks approval items shared by every run.
///
/// Items are editable only while `pending`. Approving an approved item (or
/// rejecting a rejected one) is a no-op; flipping a decision requires an
/// explicit [`ApprovalGateway::reopen`] first.
///
/// A run that leaves phase 0 freezes its entity and period: until the run is
/// finalized or deleted, items of that period cannot be submitted, edited,
/// decided or reopened.
///
/// # Example
///
/// ```
/// use payroll_engine::approval::ApprovalGateway;
/// use payroll_engine::models::{ApprovalItem, ApprovalKind, ApprovalStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let gateway = ApprovalGateway::new();
/// let period_end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// gateway
///     .submit(ApprovalItem::pending("sb-1", ApprovalKind::SigningBonus, "emp-001", "acme", period_end, Decimal::from(1000)))
///     .unwrap();
///
/// assert_eq!(gateway.pending_for_period(period_end).len(), 1);
/// let item = gateway.approve("sb-1", "mgr-7").unwrap();
/// assert_eq!(item.status, ApprovalStatus::Approved);
/// assert!(gateway.pending_for_period(period_end).is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ApprovalGateway {
    items: DashMap<String, ApprovalItem>,
    /// Runs holding each (entity, period end) freeze.
    frozen: DashMap<(String, NaiveDate), BTreeSet<String>>,
    /// Serializes item changes against freezes.
    changes: Mutex<()>,
}

impl ApprovalGateway {
    /// Creates an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new item. Fails with `DuplicateApprovalItem` if the id is taken.
    pub fn submit(&self, item: ApprovalItem) -> PayrollResult<ApprovalItem> {
        let _changes = self.lock_changes();
        self.ensure_open(&item.id, &item.entity, item.period_end)?;

        match self.items.entry(item.id.clone()) {
            Entry::Occupied(_) => Err(PayrollError::DuplicateApprovalItem { item_id: item.id }),
            Entry::Vacant(slot) => {
                info!(
                    item_id = %item.id,
                    employee_id = %item.employee_id,
                    entity = %item.entity,
                    period_end = %item.period_end,
                    "Approval item submitted"
                );
                slot.insert(item.clone());
                Ok(item)
            }
        }
    }

    /// Approves an item.
    pub fn approve(&self, item_id: &str, actor: &str) -> PayrollResult<ApprovalItem> {
        self.decide(item_id, ApprovalStatus::Approved, actor)
    }

    /// Rejects an item.
    pub fn reject(&self, item_id: &str, actor: &str) -> PayrollResult<ApprovalItem> {
        self.decide(item_id, ApprovalStatus::Rejected, actor)
    }

    fn decide(
        &self,
        item_id: &str,
        decision: ApprovalStatus,
        actor: &str,
    ) -> PayrollResult<ApprovalItem> {
        let _changes = self.lock_changes();
        let mut item = self.get_mut(item_id)?;
        let current = item.status;

        match current {
            ApprovalStatus::Pending => {
                self.ensure_open(item_id, &item.entity, item.period_end)?;
                item.status = decision;
                item.decision = Some(ApprovalDecision {
                    actor: actor.to_string(),
                    decided_at: Utc::now(),
                });
                info!(
                    item_id = %item_id,
                    status = %decision,
                    actor = %actor,
                    "Approval item decided"
                );
                Ok(item.clone())
            }
            _ if current == decision => Ok(item.clone()),
            _ => Err(PayrollError::AlreadyDecidedDifferently {
                item_id: item_id.to_string(),
                current,
                attempted: decision,
            }),
        }
    }

    /// Edits a pending item. Fails with `ImmutableAfterDecision` otherwise.
    pub fn edit(&self, item_id: &str, patch: ApprovalPatch) -> PayrollResult<ApprovalItem> {
        let _changes = self.lock_changes();
        let mut item = self.get_mut(item_id)?;

        if item.status.is_terminal() {
            return Err(PayrollError::ImmutableAfterDecision {
                item_id: item_id.to_string(),
                status: item.status,
            });
        }
        self.ensure_open(item_id, &item.entity, item.period_end)?;
        if let Some(period_end) = patch.period_end {
            self.ensure_open(item_id, &item.entity, period_end)?;
        }

        if let Some(amount) = patch.amount {
            item.amount = amount;
        }
        if let Some(period_end) = patch.period_end {
            item.period_end = period_end;
        }
        Ok(item.clone())
    }

    /// Returns a decided item to `pending`, clearing its decision.
    pub fn reopen(&self, item_id: &str) -> PayrollResult<ApprovalItem> {
        let _changes = self.lock_changes();
        let mut item = self.get_mut(item_id)?;

        if item.status.is_terminal() {
            self.ensure_open(item_id, &item.entity, item.period_end)?;
            info!(item_id = %item_id, previous = %item.status, "Approval item reopened");
            item.status = ApprovalStatus::Pending;
            item.decision = None;
        }
        Ok(item.clone())
    }

    /// Returns a copy of an item.
    pub fn get(&self, item_id: &str) -> PayrollResult<ApprovalItem> {
        self.items
            .get(item_id)
            .map(|item| item.value().clone())
            .ok_or_else(|| PayrollError::ApprovalItemNotFound {
                item_id: item_id.to_string(),
            })
    }

    /// Items for the period that are still pending, across entities, sorted by id.
    pub fn pending_for_period(&self, period_end: NaiveDate) -> Vec<ApprovalItem> {
        self.collect(|item| item.period_end == period_end && item.status == ApprovalStatus::Pending)
    }

    /// Fails with `ApprovalsIncomplete` while any of the entity's items for
    /// the period is pending.
    pub fn ensure_period_decided(&self, entity: &str, period_end: NaiveDate) -> PayrollResult<()> {
        let pending: Vec<String> = self
            .collect(|item| {
                item.entity == entity
                    && item.period_end == period_end
                    && item.status == ApprovalStatus::Pending
            })
            .into_iter()
            .map(|item| item.id)
            .collect();

        if pending.is_empty() {
            Ok(())
        } else {
            Err(PayrollError::ApprovalsIncomplete {
                period_end,
                pending,
            })
        }
    }

    /// Checks the entity's items for the period and freezes them for `run_id`.
    pub fn freeze_period(
        &self,
        entity: &str,
        period_end: NaiveDate,
        run_id: &str,
    ) -> PayrollResult<()> {
        let _changes = self.lock_changes();
        self.ensure_period_decided(entity, period_end)?;
        self.frozen
            .entry((entity.to_string(), period_end))
            .or_default()
            .insert(run_id.to_string());
        info!(run_id = %run_id, entity = %entity, period_end = %period_end, "Approvals frozen");
        Ok(())
    }

    /// Releases the freeze held by `run_id`.
    pub fn thaw_period(&self, entity: &str, period_end: NaiveDate, run_id: &str) {
        let _changes = self.lock_changes();
        let key = (entity.to_string(), period_end);
        if let Some(mut runs) = self.frozen.get_mut(&key) {
            runs.remove(run_id);
        }
        self.frozen.remove_if(&key, |_, runs| runs.is_empty());
        info!(run_id = %run_id, entity = %entity, period_end = %period_end, "Approvals thawed");
    }

    /// Returns true while any run holds the entity's period frozen.
    pub fn is_frozen(&self, entity: &str, period_end: NaiveDate) -> bool {
        self.frozen
            .get(&(entity.to_string(), period_end))
            .is_some_and(|runs| !runs.is_empty())
    }

    /// All of an employee's items for the period, sorted by id.
    pub fn items_for_employee(&self, employee_id: &str, period_end: NaiveDate) -> Vec<ApprovalItem> {
        self.collect(|item| item.employee_id == employee_id && item.period_end == period_end)
    }

    fn ensure_open(
        &self,
        item_id: &str,
        entity: &str,
        period_end: NaiveDate,
    ) -> PayrollResult<()> {
        let holder = self
            .frozen
            .get(&(entity.to_string(), period_end))
            .and_then(|runs| runs.iter().next().cloned());

        match holder {
            None => Ok(()),
            Some(run_id) => {
                warn!(item_id = %item_id, run_id = %run_id, "Approval change blocked by open run");
                Err(PayrollError::ApprovalsFrozen {
                    item_id: item_id.to_string(),
                    entity: entity.to_string(),
                    period_end,
                    run_id,
                })
            }
        }
    }

    fn lock_changes(&self) -> MutexGuard<'_, ()> {
        self.changes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collect(&self, keep: impl Fn(&ApprovalItem) -> bool) -> Vec<ApprovalItem> {
        let mut items: Vec<ApprovalItem> = self
            .items
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    fn get_mut(
        &self,
        item_id: &str,
    ) -> PayrollResult<dashmap::mapref::one::RefMut<'_, String, ApprovalItem>> {
        self.items
            .get_mut(item_id)
            .ok_or_else(|| PayrollError::ApprovalItemNotFound {
                item_id: item_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalKind;
    use rust_decimal::Decimal;

    fn period_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }

    fn gateway_with(ids: &[&str]) -> ApprovalGateway {
        let gateway = ApprovalGateway::new();
        for id in ids {
            gateway
                .submit(ApprovalItem::pending(
                    *id,
                    ApprovalKind::SigningBonus,
                    "emp-001",
                    "acme",
                    period_end(),
                    Decimal::from(1000),
                ))
                .unwrap();
        }
        gateway
    }

    // ==========================================================================
    // Submission
    // ==========================================================================

    #[test]
    fn test_duplicate_submission_is_rejected() {
        let gateway = gateway_with(&["sb-1"]);
        let again = ApprovalItem::pending(
            "sb-1",
            ApprovalKind::ExitBenefit,
            "emp-002",
            "acme",
            period_end(),
            Decimal::from(5),
        );

        assert!(matches!(
            gateway.submit(again),
            Err(PayrollError::DuplicateApprovalItem { item_id }) if item_id == "sb-1"
        ));
        assert_eq!(gateway.get("sb-1").unwrap().employee_id, "emp-001");
    }

    // ==========================================================================
    // Decisions
    // ==========================================================================

    #[test]
    fn test_approve_records_decision() {
        let gateway = gateway_with(&["sb-1"]);

        let item = gateway.approve("sb-1", "mgr-7").unwrap();

        assert_eq!(item.status, ApprovalStatus::Approved);
        assert_eq!(item.decision.unwrap().actor, "mgr-7");
    }

    #[test]
    fn test_repeat_decision_is_a_no_op() {
        let gateway = gateway_with(&["sb-1"]);
        let first = gateway.reject("sb-1", "mgr-7").unwrap();

        let second = gateway.reject("sb-1", "mgr-8").unwrap();

        assert_eq!(second, first);
        assert_eq!(second.decision.unwrap().actor, "mgr-7");
    }

    #[test]
    fn test_flipping_decision_requires_reopen() {
        let gateway = gateway_with(&["sb-1"]);
        gateway.approve("sb-1", "mgr-7").unwrap();

        match gateway.reject("sb-1", "mgr-7") {
            Err(PayrollError::AlreadyDecidedDifferently {
                current, attempted, ..
            }) => {
                assert_eq!(current, ApprovalStatus::Approved);
                assert_eq!(attempted, ApprovalStatus::Rejected);
            }
            other => panic!("Expected AlreadyDecidedDifferently, got {:?}", other),
        }

        let reopened = gateway.reopen("sb-1").unwrap();
        assert_eq!(reopened.status, ApprovalStatus::Pending);
        assert!(reopened.decision.is_none());
        assert_eq!(
            gateway.reject("sb-1", "mgr-7").unwrap().status,
            ApprovalStatus::Rejected
        );
    }

    #[test]
    fn test_unknown_item() {
        let gateway = ApprovalGateway::new();
        assert!(matches!(
            gateway.approve("nope", "mgr-7"),
            Err(PayrollError::ApprovalItemNotFound { .. })
        ));
    }

    // ==========================================================================
    // Editing
    // ==========================================================================

    #[test]
    fn test_edit_pending_item() {
        let gateway = gateway_with(&["sb-1"]);
        let next_period = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();

        let item = gateway
            .edit(
                "sb-1",
                ApprovalPatch {
                    amount: Some(Decimal::from(1500)),
                    period_end: Some(next_period),
                },
            )
            .unwrap();

        assert_eq!(item.amount, Decimal::from(1500));
        assert_eq!(item.period_end, next_period);
        assert!(gateway.pending_for_period(period_end()).is_empty());
    }

    #[test]
    fn test_edit_after_decision_fails() {
        let gateway = gateway_with(&["sb-1"]);
        gateway.approve("sb-1", "mgr-7").unwrap();

        let result = gateway.edit(
            "sb-1",
            ApprovalPatch {
                amount: Some(Decimal::from(1)),
                period_end: None,
            },
        );

        assert!(matches!(
            result,
            Err(PayrollError::ImmutableAfterDecision { status: ApprovalStatus::Approved, .. })
        ));
        assert_eq!(gateway.get("sb-1").unwrap().amount, Decimal::from(1000));
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    #[test]
    fn test_pending_for_period_is_sorted() {
        let gateway = gateway_with(&["sb-3", "sb-1", "sb-2"]);
        gateway.approve("sb-2", "mgr-7").unwrap();

        let pending: Vec<String> = gateway
            .pending_for_period(period_end())
            .into_iter()
            .map(|item| item.id)
            .collect();

        assert_eq!(pending, vec!["sb-1", "sb-3"]);
        assert_eq!(gateway.items_for_employee("emp-001", period_end()).len(), 3);
        assert!(gateway.items_for_employee("emp-002", period_end()).is_empty());
    }

    #[test]
    fn test_gate_is_scoped_to_entity() {
        let gateway = gateway_with(&["sb-1"]);
        gateway
            .submit(ApprovalItem::pending(
                "sb-other",
                ApprovalKind::SigningBonus,
                "emp-900",
                "initech",
                period_end(),
                Decimal::from(700),
            ))
            .unwrap();
        gateway.approve("sb-1", "mgr-7").unwrap();

        assert!(gateway.ensure_period_decided("acme", period_end()).is_ok());
        match gateway.ensure_period_decided("initech", period_end()) {
            Err(PayrollError::ApprovalsIncomplete { pending, .. }) => {
                assert_eq!(pending, vec!["sb-other"]);
            }
            other => panic!("Expected ApprovalsIncomplete, got {:?}", other),
        }
    }

    // ==========================================================================
    // Freezes
    // ==========================================================================

    #[test]
    fn test_freeze_requires_decided_items() {
        let gateway = gateway_with(&["sb-1"]);

        assert!(matches!(
            gateway.freeze_period("acme", period_end(), "PR-2025-0001"),
            Err(PayrollError::ApprovalsIncomplete { .. })
        ));
        assert!(!gateway.is_frozen("acme", period_end()));
    }

    #[test]
    fn test_frozen_period_rejects_changes() {
        let gateway = gateway_with(&["sb-1", "sb-2"]);
        gateway.approve("sb-1", "mgr-7").unwrap();
        gateway.reject("sb-2", "mgr-7").unwrap();
        gateway.freeze_period("acme", period_end(), "PR-2025-0001").unwrap();

        assert!(matches!(
            gateway.reopen("sb-1"),
            Err(PayrollError::ApprovalsFrozen { run_id, .. }) if run_id == "PR-2025-0001"
        ));
        assert!(matches!(
            gateway.submit(ApprovalItem::pending(
                "sb-3",
                ApprovalKind::SigningBonus,
                "emp-001",
                "acme",
                period_end(),
                Decimal::from(10),
            )),
            Err(PayrollError::ApprovalsFrozen { .. })
        ));
        // Repeating a decision changes nothing and stays allowed
        assert_eq!(
            gateway.approve("sb-1", "mgr-8").unwrap().status,
            ApprovalStatus::Approved
        );
        assert_eq!(gateway.get("sb-1").unwrap().status, ApprovalStatus::Approved);
    }

    #[test]
    fn test_edit_cannot_move_item_into_frozen_period() {
        let gateway = gateway_with(&[]);
        let next_period = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        gateway
            .submit(ApprovalItem::pending(
                "sb-feb",
                ApprovalKind::SigningBonus,
                "emp-001",
                "acme",
                next_period,
                Decimal::from(10),
            ))
            .unwrap();
        gateway.freeze_period("acme", period_end(), "PR-2025-0001").unwrap();

        let result = gateway.edit(
            "sb-feb",
            ApprovalPatch {
                amount: None,
                period_end: Some(period_end()),
            },
        );

        assert!(matches!(result, Err(PayrollError::ApprovalsFrozen { .. })));
        assert_eq!(gateway.get("sb-feb").unwrap().period_end, next_period);
    }

    #[test]
    fn test_thaw_releases_after_last_run() {
        let gateway = gateway_with(&["sb-1"]);
        gateway.approve("sb-1", "mgr-7").unwrap();
        gateway.freeze_period("acme", period_end(), "PR-A").unwrap();
        gateway.freeze_period("acme", period_end(), "PR-B").unwrap();
        // Other entities are unaffected
        assert!(!gateway.is_frozen("initech", period_end()));

        gateway.thaw_period("acme", period_end(), "PR-A");
        assert!(gateway.reopen("sb-1").is_err());

        gateway.thaw_period("acme", period_end(), "PR-B");
        assert!(!gateway.is_frozen("acme", period_end()));
        assert_eq!(gateway.reopen("sb-1").unwrap().status, ApprovalStatus::Pending);
    }
}
