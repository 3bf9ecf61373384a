//! Configuration loading and management for the payroll engine.
//!
//! This module loads the calculation policy and the dated tax/insurance
//! rule books from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Standard days: {}", config.policy().standard_days_in_period);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CalculationPolicy, EntityRules, PayrollConfig, PolicyFile, RuleBook, WorkingHoursPenaltyMode,
};
