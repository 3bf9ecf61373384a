//! The payroll engine service.
//!
//! [`PayrollEngine`] owns many runs, serializes writes to each run and
//! publishes a [`RunSnapshot`] after every successful write.

mod service;
mod snapshot;

pub use service::PayrollEngine;
pub use snapshot::RunSnapshot;
