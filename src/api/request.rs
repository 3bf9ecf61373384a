//! Request types for the payroll API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AdjustmentKind, ApprovalItem, ApprovalKind, HrEvent, ManualAdjustment};

/// Request body for `POST /runs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    /// Human run code, e.g. `PR-2025-0001`.
    pub run_id: String,
    /// The legal entity being paid.
    pub entity: String,
    /// Last day of the payroll period.
    pub period_end: NaiveDate,
    /// The payroll specialist creating the run.
    pub created_by: String,
}

/// Request body for run sign-offs and approval decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproverRequest {
    /// Who is signing.
    pub approver_id: String,
}

/// Request body for `POST /runs/:run_id/hr-events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrEventsRequest {
    /// Events to record, applied in order.
    pub events: Vec<HrEvent>,
}

/// Request body for `POST /runs/:run_id/penalties`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltiesRequest {
    /// Penalties to record.
    pub penalties: Vec<PenaltyRequest>,
}

/// A manual penalty in a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyRequest {
    /// Record id.
    pub id: String,
    /// The penalized employee.
    pub employee_id: String,
    /// Day the penalty applies to; must fall inside the run's period.
    pub effective_date: NaiveDate,
    /// Penalty amount, not negative.
    pub amount: Decimal,
    /// Why the penalty was given.
    pub reason: String,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
}

impl From<PenaltyRequest> for ManualAdjustment {
    fn from(req: PenaltyRequest) -> Self {
        ManualAdjustment {
            id: req.id,
            employee_id: req.employee_id,
            kind: AdjustmentKind::Penalty,
            category: req.category,
            effective_date: req.effective_date,
            amount: req.amount,
            reason: req.reason,
        }
    }
}

/// Request body for `POST /approvals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApprovalRequest {
    /// Item id.
    pub id: String,
    /// Signing bonus or exit benefit.
    pub kind: ApprovalKind,
    /// The employee to be paid.
    pub employee_id: String,
    /// The employing entity.
    pub entity: String,
    /// End date of the period the item is paid in.
    pub period_end: NaiveDate,
    /// Amount to pay if approved.
    pub amount: Decimal,
}

impl From<SubmitApprovalRequest> for ApprovalItem {
    fn from(req: SubmitApprovalRequest) -> Self {
        ApprovalItem::pending(
            req.id,
            req.kind,
            req.employee_id,
            req.entity,
            req.period_end,
            req.amount,
        )
    }
}

/// Query string for `GET /approvals`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApprovalsQuery {
    /// The period whose pending items are listed.
    pub period_end: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_create_run_request_deserialization() {
        let json = r#"{
            "run_id": "PR-2025-0001",
            "entity": "acme",
            "period_end": "2025-01-31",
            "created_by": "hr-1"
        }"#;

        let request: CreateRunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.run_id, "PR-2025-0001");
        assert_eq!(
            request.period_end,
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
    }

    #[test]
    fn test_penalty_request_becomes_penalty_adjustment() {
        let json = r#"{
            "penalties": [{
                "id": "adj-1",
                "employee_id": "emp-001",
                "effective_date": "2025-01-10",
                "amount": "150.50",
                "reason": "Unreported absence"
            }]
        }"#;

        let request: PenaltiesRequest = serde_json::from_str(json).unwrap();
        let adjustment: ManualAdjustment = request.penalties[0].clone().into();

        assert_eq!(adjustment.kind, AdjustmentKind::Penalty);
        assert_eq!(adjustment.amount, Decimal::from_str("150.50").unwrap());
        assert!(adjustment.category.is_none());
    }

    #[test]
    fn test_hr_events_request_deserialization() {
        let json = r#"{
            "events": [
                {"type": "termination", "employee_id": "emp-002"},
                {
                    "type": "attendance_correction",
                    "employee_id": "emp-001",
                    "date": "2025-01-06",
                    "actual_minutes": 480
                }
            ]
        }"#;

        let request: HrEventsRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.events.len(), 2);
        assert_eq!(request.events[0].employee_id(), "emp-002");
    }
}
