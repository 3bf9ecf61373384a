//! Refund collection.

use crate::models::{AuditStep, Itemized, RefundEntry, RefundLine};

/// The result of collecting refunds.
#[derive(Debug, Clone)]
pub struct RefundsResult {
    /// Refunds paid by this run, and their total.
    pub refunds: Itemized<RefundLine>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Collects the employee's approved, unconsumed refunds.
pub fn collect_refunds(employee_id: &str, entries: &[RefundEntry], step_number: u32) -> RefundsResult {
    let refunds = Itemized::from_entries(
        entries
            .iter()
            .filter(|entry| entry.employee_id == employee_id && entry.is_payable())
            .map(|entry| RefundLine {
                refund_id: entry.id.clone(),
                source: entry.source.clone(),
                amount: entry.amount,
            })
            .collect(),
    );

    let skipped: Vec<&str> = entries
        .iter()
        .filter(|entry| entry.employee_id == employee_id && !entry.is_payable())
        .map(|entry| entry.id.as_str())
        .collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "refunds".to_string(),
        rule_name: "Refunds".to_string(),
        input: serde_json::json!({
            "entries": entries.len(),
            "skipped": skipped
        }),
        output: serde_json::json!({
            "refund_ids": refunds.entries.iter().map(|r| r.refund_id.as_str()).collect::<Vec<_>>(),
            "total": refunds.total.normalize().to_string()
        }),
        reasoning: format!(
            "{} refund(s) payable totalling ${}",
            refunds.entries.len(),
            refunds.total.normalize()
        ),
    };

    RefundsResult {
        refunds,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefundStatus;
    use rust_decimal::Decimal;

    fn entry(id: &str, employee: &str, amount: i64, status: RefundStatus, consumed: bool) -> RefundEntry {
        RefundEntry {
            id: id.to_string(),
            employee_id: employee.to_string(),
            source: "Expense claim".to_string(),
            amount: Decimal::from(amount),
            status,
            consumed,
        }
    }

    #[test]
    fn test_only_approved_unconsumed_refunds_for_employee() {
        let entries = vec![
            entry("rf-1", "emp-001", 40, RefundStatus::Approved, false),
            entry("rf-2", "emp-001", 99, RefundStatus::Pending, false),
            entry("rf-3", "emp-001", 15, RefundStatus::Approved, true),
            entry("rf-4", "emp-002", 70, RefundStatus::Approved, false),
            entry("rf-5", "emp-001", 35, RefundStatus::Approved, false),
        ];

        let result = collect_refunds("emp-001", &entries, 10);

        assert_eq!(result.refunds.entries.len(), 2);
        assert_eq!(result.refunds.total, Decimal::from(75));
        assert_eq!(result.audit_step.input["skipped"].as_array().unwrap().len(), 2);
        assert_eq!(result.audit_step.output["refund_ids"][1], "rf-5");
    }
}
