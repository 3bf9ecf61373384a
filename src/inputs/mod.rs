//! Fact providers and payslip sinks.

mod in_memory;
mod provider;

pub use in_memory::InMemoryDirectory;
pub use provider::{PayslipSink, RuleInputProvider};
