//! HTTP API module for the payroll engine.
//!
//! This module exposes run operations, read views and approval items as a
//! JSON API for dashboards.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ApproverRequest, CreateRunRequest, HrEventsRequest, PenaltiesRequest, PenaltyRequest,
    PendingApprovalsQuery, SubmitApprovalRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
