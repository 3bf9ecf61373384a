//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading payroll
//! configuration from YAML files.

use chrono::NaiveDate;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PayrollError, PayrollResult};

use super::types::{CalculationPolicy, EntityRules, PayrollConfig, PolicyFile, RuleBook};

/// Loads and provides access to payroll configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── payroll.yaml         # Calculation policy
/// └── rules/
///     └── 2025-01-01.yaml  # Tax/insurance brackets effective from this date
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
/// use chrono::NaiveDate;
///
/// let loader = ConfigLoader::load("./config/default").unwrap();
/// let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
/// let rules = loader.rules_for("acme", date).unwrap();
/// println!("{} tax brackets", rules.tax.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: PayrollConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if any required file is missing, contains invalid
    /// YAML, or fails validation.
    pub fn load<P: AsRef<Path>>(path: P) -> PayrollResult<Self> {
        let path = path.as_ref();

        let policy_path = path.join("payroll.yaml");
        let policy = Self::load_yaml::<PolicyFile>(&policy_path)?.engine;
        policy
            .validate()
            .map_err(|message| PayrollError::ConfigParseError {
                path: policy_path.display().to_string(),
                message,
            })?;

        let rule_books = Self::load_rule_books(&path.join("rules"))?;
        debug!(
            path = %path.display(),
            rule_books = rule_books.len(),
            "Loaded payroll configuration"
        );

        Ok(Self {
            config: PayrollConfig::new(policy, rule_books),
        })
    }

    /// Builds a loader from in-memory parts, validating them as `load` would.
    pub fn from_parts(policy: CalculationPolicy, rule_books: Vec<RuleBook>) -> PayrollResult<Self> {
        let invalid = |message: String| PayrollError::ConfigParseError {
            path: "<in-memory>".to_string(),
            message,
        };
        policy.validate().map_err(invalid)?;
        for book in &rule_books {
            for rules in book.entities.values() {
                rules.validate().map_err(invalid)?;
            }
        }
        Ok(Self {
            config: PayrollConfig::new(policy, rule_books),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> PayrollResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| PayrollError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| PayrollError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads all rule books from the rules directory.
    fn load_rule_books(rules_dir: &Path) -> PayrollResult<Vec<RuleBook>> {
        let rules_dir_str = rules_dir.display().to_string();

        let entries = fs::read_dir(rules_dir).map_err(|_| PayrollError::ConfigNotFound {
            path: rules_dir_str.clone(),
        })?;

        let mut books = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|_| PayrollError::ConfigNotFound {
                path: rules_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                let book = Self::load_yaml::<RuleBook>(&path)?;
                for rules in book.entities.values() {
                    rules
                        .validate()
                        .map_err(|message| PayrollError::ConfigParseError {
                            path: path.display().to_string(),
                            message,
                        })?;
                }
                books.push(book);
            }
        }

        if books.is_empty() {
            return Err(PayrollError::ConfigNotFound {
                path: format!("{} (no rule files found)", rules_dir_str),
            });
        }

        Ok(books)
    }

    /// Returns the underlying payroll configuration.
    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Returns the calculation policy.
    pub fn policy(&self) -> &CalculationPolicy {
        self.config.policy()
    }

    /// Finds the tax/insurance tables active for an entity on a date.
    pub fn rules_for(&self, entity: &str, date: NaiveDate) -> PayrollResult<&EntityRules> {
        self.config.rules_for(entity, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkingHoursPenaltyMode;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/default"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.policy().standard_days_in_period, 30);
        assert_eq!(loader.policy().money_scale, 2);
        assert_eq!(
            loader.policy().working_hours_penalty,
            WorkingHoursPenaltyMode::ProRated
        );
    }

    #[test]
    fn test_rules_for_acme_in_2025() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let rules = loader.rules_for("acme", date).unwrap();

        assert_eq!(rules.tax.len(), 2);
        assert_eq!(rules.tax[0].rate, dec("0.10"));
        assert_eq!(rules.tax[0].upper_bound, Some(dec("1000")));
        assert_eq!(rules.tax[1].upper_bound, None);
        assert_eq!(rules.insurance.len(), 1);
        assert_eq!(rules.insurance[0].rate, dec("0.05"));
    }

    #[test]
    fn test_rules_before_first_book_are_missing() {
        let loader = ConfigLoader::load(config_path()).unwrap();

        let date = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
        match loader.rules_for("acme", date) {
            Err(PayrollError::RuleSetMissing { entity, date: d }) => {
                assert_eq!(entity, "acme");
                assert_eq!(d, date);
            }
            other => panic!("Expected RuleSetMissing error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(PayrollError::ConfigNotFound { path }) => {
                assert!(path.contains("payroll.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_from_parts_rejects_invalid_policy() {
        let policy = CalculationPolicy {
            standard_days_in_period: 0,
            ..CalculationPolicy::default()
        };
        assert!(matches!(
            ConfigLoader::from_parts(policy, vec![]),
            Err(PayrollError::ConfigParseError { .. })
        ));
    }
}
