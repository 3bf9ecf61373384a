//! Configuration types for payroll execution.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PayrollError, PayrollResult};
use crate::models::BracketRule;

/// How working-hours shortfall minutes are converted to money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WorkingHoursPenaltyMode {
    /// Each missed minute costs `daily_rate / expected_minutes` of that day.
    ProRated,
    /// Each missed minute costs a fixed amount.
    PerMinute {
        /// Amount charged per missed minute.
        per_minute_rate: Decimal,
    },
}

/// Engine-wide calculation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationPolicy {
    /// Days the base salary is divided by to get the daily rate.
    pub standard_days_in_period: u32,
    /// Working-hours penalty conversion.
    pub working_hours_penalty: WorkingHoursPenaltyMode,
    /// Decimal places money amounts are rounded to.
    #[serde(default = "default_money_scale")]
    pub money_scale: u32,
}

fn default_money_scale() -> u32 {
    2
}

impl Default for CalculationPolicy {
    fn default() -> Self {
        Self {
            standard_days_in_period: 30,
            working_hours_penalty: WorkingHoursPenaltyMode::ProRated,
            money_scale: default_money_scale(),
        }
    }
}

impl CalculationPolicy {
    /// Checks the policy for values the calculator cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.standard_days_in_period == 0 {
            return Err("standard_days_in_period must be greater than zero".to_string());
        }
        if self.money_scale > 10 {
            return Err("money_scale must be at most 10".to_string());
        }
        if let WorkingHoursPenaltyMode::PerMinute { per_minute_rate } = &self.working_hours_penalty
        {
            if per_minute_rate.is_sign_negative() {
                return Err("per_minute_rate must not be negative".to_string());
            }
        }
        Ok(())
    }
}

/// Root of `payroll.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyFile {
    /// The engine policy.
    pub engine: CalculationPolicy,
}

/// Tax and insurance tables for one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRules {
    /// Tax brackets.
    #[serde(default)]
    pub tax: Vec<BracketRule>,
    /// Insurance brackets.
    #[serde(default)]
    pub insurance: Vec<BracketRule>,
}

impl EntityRules {
    /// Checks every bracket for a usable rate and bounds.
    pub fn validate(&self) -> Result<(), String> {
        for rule in self.tax.iter().chain(self.insurance.iter()) {
            if rule.rate.is_sign_negative() || rule.rate > Decimal::ONE {
                return Err(format!("bracket '{}' rate must be between 0 and 1", rule.name));
            }
            if rule.lower_bound.is_sign_negative() {
                return Err(format!("bracket '{}' lower_bound must not be negative", rule.name));
            }
            if let Some(upper) = rule.upper_bound {
                if upper <= rule.lower_bound {
                    return Err(format!(
                        "bracket '{}' upper_bound must exceed lower_bound",
                        rule.name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Rule tables effective from a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    /// The first date these rules apply.
    pub effective_date: NaiveDate,
    /// Map of entity name to its tables.
    pub entities: HashMap<String, EntityRules>,
}

/// The complete payroll configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct PayrollConfig {
    /// Calculation policy.
    policy: CalculationPolicy,
    /// Rule books by effective date (sorted oldest first).
    rule_books: Vec<RuleBook>,
}

impl PayrollConfig {
    /// Creates a new PayrollConfig from its component parts.
    pub fn new(policy: CalculationPolicy, rule_books: Vec<RuleBook>) -> Self {
        let mut sorted = rule_books;
        sorted.sort_by(|a, b| a.effective_date.cmp(&b.effective_date));
        Self {
            policy,
            rule_books: sorted,
        }
    }

    /// Returns the calculation policy.
    pub fn policy(&self) -> &CalculationPolicy {
        &self.policy
    }

    /// Returns all rule books, oldest first.
    pub fn rule_books(&self) -> &[RuleBook] {
        &self.rule_books
    }

    /// Finds the tax/insurance tables active for an entity on a date.
    ///
    /// The latest rule book effective on or before `date` applies. Fails with
    /// `RuleSetMissing` if there is no such book or the entity is absent from it.
    pub fn rules_for(&self, entity: &str, date: NaiveDate) -> PayrollResult<&EntityRules> {
        self.rule_books
            .iter()
            .rev()
            .find(|book| book.effective_date <= date)
            .and_then(|book| book.entities.get(entity))
            .ok_or_else(|| PayrollError::RuleSetMissing {
                entity: entity.to_string(),
                date,
            })
    }
}
