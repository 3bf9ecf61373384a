//! Manual penalty collection.

use crate::models::{AdjustmentKind, AuditStep, Itemized, ManualAdjustment, ManualPenalty};

/// The result of collecting manual penalties.
#[derive(Debug, Clone)]
pub struct ManualPenaltiesResult {
    /// Penalties taken from adjustment records, and their total.
    pub penalties: Itemized<ManualPenalty>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Takes manual penalties verbatim from adjustment records of kind `penalty`.
///
/// Adjustments of any other kind are ignored.
pub fn collect_manual_penalties(
    adjustments: &[ManualAdjustment],
    step_number: u32,
) -> ManualPenaltiesResult {
    let applied: Vec<&ManualAdjustment> = adjustments
        .iter()
        .filter(|adj| adj.kind == AdjustmentKind::Penalty)
        .collect();

    let penalties = Itemized::from_entries(
        applied
            .iter()
            .map(|adj| ManualPenalty {
                reason: adj.reason.clone(),
                amount: adj.amount,
            })
            .collect(),
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "manual_penalties".to_string(),
        rule_name: "Manual Penalties".to_string(),
        input: serde_json::json!({
            "adjustments": adjustments.len(),
            "penalty_ids": applied.iter().map(|adj| adj.id.as_str()).collect::<Vec<_>>()
        }),
        output: serde_json::json!({
            "count": penalties.entries.len(),
            "total": penalties.total.normalize().to_string()
        }),
        reasoning: format!(
            "{} manual penalt{} totalling ${}",
            penalties.entries.len(),
            if penalties.entries.len() == 1 { "y" } else { "ies" },
            penalties.total.normalize()
        ),
    };

    ManualPenaltiesResult {
        penalties,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn adjustment(id: &str, kind: AdjustmentKind, amount: &str) -> ManualAdjustment {
        ManualAdjustment {
            id: id.to_string(),
            employee_id: "emp-001".to_string(),
            kind,
            category: None,
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            amount: dec(amount),
            reason: format!("reason for {id}"),
        }
    }

    #[test]
    fn test_only_penalty_kind_is_collected() {
        let adjustments = vec![
            adjustment("adj-1", AdjustmentKind::Penalty, "50"),
            adjustment("adj-2", AdjustmentKind::Other, "999"),
            adjustment("adj-3", AdjustmentKind::Penalty, "25.50"),
        ];

        let result = collect_manual_penalties(&adjustments, 5);

        assert_eq!(result.penalties.entries.len(), 2);
        assert_eq!(result.penalties.entries[0].reason, "reason for adj-1");
        assert_eq!(result.penalties.total, dec("75.50"));
        assert_eq!(result.audit_step.input["penalty_ids"][1], "adj-3");
    }

    #[test]
    fn test_no_penalties() {
        let result = collect_manual_penalties(&[], 1);
        assert_eq!(result.penalties.total, Decimal::ZERO);
        assert!(result.audit_step.reasoning.starts_with("0 manual penalties"));
    }
}
