//! Approval workflows gating a payroll run.
//!
//! [`ApprovalGateway`] tracks signing-bonus and exit-benefit items, which
//! must all be decided before a run leaves phase 0. Manager and finance
//! sign-offs are recorded on the run itself as
//! [`RunSignoffs`](crate::models::RunSignoffs).

mod gateway;
mod signoff;

pub use gateway::ApprovalGateway;
