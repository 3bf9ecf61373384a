//! Progressive bracket deductions (tax and insurance).
//!
//! Brackets are applied in ascending order of lower bound. Each bracket
//! charges its rate on the slice of the base that falls inside
//! `(lower_bound, upper_bound]`.

use rust_decimal::Decimal;

use crate::models::{
    AuditStep, BracketBase, BracketRule, InsuranceDeduction, Itemized, TaxDeduction,
};

use super::round_money;

/// One bracket's share of a base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketSlice {
    /// Bracket name.
    pub name: String,
    /// Bracket rate.
    pub rate: Decimal,
    /// The part of the base inside the bracket.
    pub slice: Decimal,
    /// `slice × rate`, rounded.
    pub amount: Decimal,
}

/// Splits a base across brackets and charges each slice at its rate.
///
/// Brackets whose slice is empty are omitted.
///
/// # Example
///
/// ```
/// use payroll_engine::calculation::apply_brackets;
/// use payroll_engine::models::{BracketBase, BracketRule};
/// use rust_decimal::Decimal;
///
/// let brackets = vec![
///     BracketRule {
///         name: "Low".to_string(),
///         rate: Decimal::new(10, 2),
///         lower_bound: Decimal::ZERO,
///         upper_bound: Some(Decimal::from(1000)),
///         applies_to: BracketBase::Gross,
///     },
///     BracketRule {
///         name: "High".to_string(),
///         rate: Decimal::new(20, 2),
///         lower_bound: Decimal::from(1000),
///         upper_bound: None,
///         applies_to: BracketBase::Gross,
///     },
/// ];
///
/// let slices = apply_brackets(&brackets, Decimal::from(1500), 2);
/// let total: Decimal = slices.iter().map(|s| s.amount).sum();
/// assert_eq!(total, Decimal::from(200));
/// ```
pub fn apply_brackets(rules: &[BracketRule], base: Decimal, money_scale: u32) -> Vec<BracketSlice> {
    sorted(rules)
        .into_iter()
        .filter_map(|rule| slice_for(rule, base, money_scale))
        .collect()
}

fn sorted(rules: &[BracketRule]) -> Vec<&BracketRule> {
    let mut rules: Vec<&BracketRule> = rules.iter().collect();
    rules.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
    rules
}

fn slice_for(rule: &BracketRule, base: Decimal, money_scale: u32) -> Option<BracketSlice> {
    let top = rule.upper_bound.map_or(base, |upper| base.min(upper));
    let slice = top - rule.lower_bound;
    if slice <= Decimal::ZERO {
        return None;
    }
    Some(BracketSlice {
        name: rule.name.clone(),
        rate: rule.rate,
        slice,
        amount: round_money(slice * rule.rate, money_scale),
    })
}

fn slices_json(slices: &[BracketSlice]) -> Vec<serde_json::Value> {
    slices
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.name,
                "rate": s.rate.normalize().to_string(),
                "slice": s.slice.normalize().to_string(),
                "amount": s.amount.normalize().to_string()
            })
        })
        .collect()
}

/// The result of a tax calculation.
#[derive(Debug, Clone)]
pub struct TaxResult {
    /// Tax per bracket, and the total.
    pub deductions: Itemized<TaxDeduction>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates progressive tax on gross salary net of penalties.
///
/// The taxable base is `max(0, gross_salary - total_penalties)`. Every tax
/// bracket applies to that base.
pub fn calculate_tax(
    rules: &[BracketRule],
    gross_salary: Decimal,
    total_penalties: Decimal,
    money_scale: u32,
    step_number: u32,
) -> TaxResult {
    let taxable = (gross_salary - total_penalties).max(Decimal::ZERO);
    let slices = apply_brackets(rules, taxable, money_scale);

    let deductions = Itemized::from_entries(
        slices
            .iter()
            .map(|s| TaxDeduction {
                rule_name: s.name.clone(),
                rate: s.rate,
                amount: s.amount,
            })
            .collect(),
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "tax".to_string(),
        rule_name: "Progressive Tax".to_string(),
        input: serde_json::json!({
            "gross_salary": gross_salary.normalize().to_string(),
            "total_penalties": total_penalties.normalize().to_string(),
            "brackets": rules.len()
        }),
        output: serde_json::json!({
            "taxable_base": taxable.normalize().to_string(),
            "slices": slices_json(&slices),
            "total": deductions.total.normalize().to_string()
        }),
        reasoning: format!(
            "Tax on ${} across {} bracket(s) = ${}",
            taxable.normalize(),
            slices.len(),
            deductions.total.normalize()
        ),
    };

    TaxResult {
        deductions,
        audit_step,
    }
}

/// The result of an insurance calculation.
#[derive(Debug, Clone)]
pub struct InsuranceResult {
    /// Contribution per bracket, and the total.
    pub deductions: Itemized<InsuranceDeduction>,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates insurance contributions.
///
/// Brackets marked `applies_to: net` are charged on `gross_salary - tax_total`;
/// all others on gross salary.
pub fn calculate_insurance(
    rules: &[BracketRule],
    gross_salary: Decimal,
    tax_total: Decimal,
    money_scale: u32,
    step_number: u32,
) -> InsuranceResult {
    let net_base = (gross_salary - tax_total).max(Decimal::ZERO);

    let slices: Vec<BracketSlice> = sorted(rules)
        .into_iter()
        .filter_map(|rule| {
            let base = match rule.applies_to {
                BracketBase::Gross => gross_salary,
                BracketBase::Net => net_base,
            };
            slice_for(rule, base, money_scale)
        })
        .collect();

    let deductions = Itemized::from_entries(
        slices
            .iter()
            .map(|s| InsuranceDeduction {
                bracket_name: s.name.clone(),
                rate: s.rate,
                amount: s.amount,
            })
            .collect(),
    );

    let audit_step = AuditStep {
        step_number,
        rule_id: "insurance".to_string(),
        rule_name: "Insurance Contributions".to_string(),
        input: serde_json::json!({
            "gross_salary": gross_salary.normalize().to_string(),
            "net_of_tax": net_base.normalize().to_string(),
            "brackets": rules.len()
        }),
        output: serde_json::json!({
            "slices": slices_json(&slices),
            "total": deductions.total.normalize().to_string()
        }),
        reasoning: format!(
            "Insurance across {} bracket(s) = ${}",
            slices.len(),
            deductions.total.normalize()
        ),
    };

    InsuranceResult {
        deductions,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn bracket(name: &str, rate: &str, lower: &str, upper: Option<&str>, base: BracketBase) -> BracketRule {
        BracketRule {
            name: name.to_string(),
            rate: dec(rate),
            lower_bound: dec(lower),
            upper_bound: upper.map(dec),
            applies_to: base,
        }
    }

    fn progressive() -> Vec<BracketRule> {
        // Deliberately out of order
        vec![
            bracket("High", "0.20", "1000", None, BracketBase::Gross),
            bracket("Low", "0.10", "0", Some("1000"), BracketBase::Gross),
        ]
    }

    // ==========================================================================
    // Tax
    // ==========================================================================

    #[test]
    fn test_progressive_tax_on_1500() {
        let result = calculate_tax(&progressive(), dec("1500"), Decimal::ZERO, 2, 6);

        assert_eq!(result.deductions.entries.len(), 2);
        assert_eq!(result.deductions.entries[0].rule_name, "Low");
        assert_eq!(result.deductions.entries[0].amount, dec("100"));
        assert_eq!(result.deductions.entries[1].amount, dec("100"));
        assert_eq!(result.deductions.total, dec("200"));
    }

    #[test]
    fn test_tax_base_is_net_of_penalties() {
        let result = calculate_tax(&progressive(), dec("1500"), dec("600"), 2, 6);

        // 900 taxable, all in the first bracket
        assert_eq!(result.deductions.entries.len(), 1);
        assert_eq!(result.deductions.total, dec("90"));
        assert_eq!(result.audit_step.output["taxable_base"], "900");
    }

    #[test]
    fn test_tax_base_never_negative() {
        let result = calculate_tax(&progressive(), dec("1000"), dec("5000"), 2, 6);
        assert!(result.deductions.entries.is_empty());
        assert_eq!(result.deductions.total, Decimal::ZERO);
    }

    #[test]
    fn test_flat_tax_on_scenario_gross() {
        let flat = vec![bracket("Flat", "0.10", "0", None, BracketBase::Gross)];
        let result = calculate_tax(&flat, dec("10500"), Decimal::ZERO, 2, 6);
        assert_eq!(result.deductions.total, dec("1050"));
    }

    // ==========================================================================
    // Insurance
    // ==========================================================================

    #[test]
    fn test_insurance_on_gross() {
        let rules = vec![bracket("Social", "0.05", "0", None, BracketBase::Gross)];
        let result = calculate_insurance(&rules, dec("10500"), dec("1050"), 2, 7);
        assert_eq!(result.deductions.total, dec("525"));
        assert_eq!(result.deductions.entries[0].bracket_name, "Social");
    }

    #[test]
    fn test_insurance_on_net_of_tax() {
        let rules = vec![
            bracket("Social", "0.05", "0", None, BracketBase::Gross),
            bracket("Health", "0.01", "0", None, BracketBase::Net),
        ];
        let result = calculate_insurance(&rules, dec("10500"), dec("1050"), 2, 7);

        assert_eq!(result.deductions.entries[0].amount, dec("525"));
        assert_eq!(result.deductions.entries[1].amount, dec("94.50"));
        assert_eq!(result.deductions.total, dec("619.50"));
    }

    #[test]
    fn test_capped_insurance_bracket() {
        let rules = vec![bracket("Capped", "0.05", "0", Some("5000"), BracketBase::Gross)];
        let result = calculate_insurance(&rules, dec("10500"), Decimal::ZERO, 2, 7);
        assert_eq!(result.deductions.total, dec("250"));
    }
}
