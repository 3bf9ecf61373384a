//! HTTP request handlers for the payroll API.
//!
//! Handlers translate JSON to engine calls and engine errors to
//! [`ApiError`] bodies. They carry no payroll rules of their own.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PayrollError, PayrollResult};
use crate::models::{ApprovalItem, ApprovalPatch, ManualAdjustment};

use super::request::{
    ApproverRequest, CreateRunRequest, HrEventsRequest, PenaltiesRequest, PendingApprovalsQuery,
    SubmitApprovalRequest,
};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/runs", get(list_runs_handler).post(create_run_handler))
        .route(
            "/runs/:run_id",
            get(get_run_handler).delete(delete_run_handler),
        )
        .route("/runs/:run_id/lines", get(lines_handler))
        .route(
            "/runs/:run_id/payslips",
            get(payslips_handler).post(generate_payslips_handler),
        )
        .route("/runs/:run_id/approval-gate", get(approval_gate_handler))
        .route("/runs/:run_id/initiate", post(initiate_handler))
        .route("/runs/:run_id/draft", post(draft_handler))
        .route("/runs/:run_id/hr-events", post(hr_events_handler))
        .route("/runs/:run_id/penalties", post(penalties_handler))
        .route("/runs/:run_id/review", post(review_handler))
        .route("/runs/:run_id/manager-approval", post(manager_approval_handler))
        .route("/runs/:run_id/finance-approval", post(finance_approval_handler))
        .route("/runs/:run_id/lock", post(lock_handler))
        .route("/runs/:run_id/unfreeze", post(unfreeze_handler))
        .route(
            "/approvals",
            get(pending_approvals_handler).post(submit_approval_handler),
        )
        .route(
            "/approvals/:item_id",
            get(get_approval_handler).patch(edit_approval_handler),
        )
        .route("/approvals/:item_id/approve", post(approve_item_handler))
        .route("/approvals/:item_id/reject", post(reject_item_handler))
        .route("/approvals/:item_id/reopen", post(reopen_item_handler))
        .with_state(state)
}

// ==========================================================================
// Response helpers
// ==========================================================================

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(correlation_id: Uuid, error: PayrollError) -> Response {
    warn!(
        correlation_id = %correlation_id,
        code = error.code(),
        error = %error,
        "Request rejected"
    );
    let api_error: ApiErrorResponse = error.into();
    json_response(api_error.status, api_error.error)
}

fn respond<T: Serialize>(
    correlation_id: Uuid,
    status: StatusCode,
    result: PayrollResult<T>,
) -> Response {
    match result {
        Ok(body) => json_response(status, body),
        Err(error) => error_response(correlation_id, error),
    }
}

/// Unwraps a JSON body or builds the 400 response for it.
fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, Response> {
    let rejection = match payload {
        Ok(Json(body)) => return Ok(body),
        Err(rejection) => rejection,
    };

    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    Err(json_response(StatusCode::BAD_REQUEST, error))
}

// ==========================================================================
// Runs
// ==========================================================================

/// Handler for GET /runs.
async fn list_runs_handler(State(state): State<AppState>) -> Response {
    json_response(StatusCode::OK, state.engine().list_runs())
}

/// Handler for POST /runs.
async fn create_run_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateRunRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        run_id = %request.run_id,
        entity = %request.entity,
        "Creating payroll run"
    );

    let result = state.engine().create_run(
        &request.run_id,
        &request.entity,
        request.period_end,
        &request.created_by,
    );
    respond(correlation_id, StatusCode::CREATED, result)
}

/// Handler for GET /runs/:run_id.
async fn get_run_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    respond(Uuid::new_v4(), StatusCode::OK, state.engine().run_status(&run_id))
}

/// Handler for DELETE /runs/:run_id.
async fn delete_run_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Deleting payroll run");

    match state.engine().delete_run(&run_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(correlation_id, error),
    }
}

/// Handler for GET /runs/:run_id/lines.
async fn lines_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    respond(Uuid::new_v4(), StatusCode::OK, state.engine().lines(&run_id))
}

/// Handler for GET /runs/:run_id/payslips.
async fn payslips_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    respond(Uuid::new_v4(), StatusCode::OK, state.engine().payslips(&run_id))
}

/// Handler for GET /runs/:run_id/approval-gate.
async fn approval_gate_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    let result = state
        .engine()
        .validate_phase0(&run_id)
        .map(|()| json!({ "run_id": run_id, "ready": true }));
    respond(Uuid::new_v4(), StatusCode::OK, result)
}

// ==========================================================================
// Run lifecycle
// ==========================================================================

/// Handler for POST /runs/:run_id/initiate.
async fn initiate_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Starting initiation");
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().start_initiation(&run_id).await,
    )
}

/// Handler for POST /runs/:run_id/draft.
async fn draft_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Generating draft");

    let start_time = Instant::now();
    let result = state.engine().generate_draft(&run_id).await;
    if let Ok(snapshot) = &result {
        info!(
            correlation_id = %correlation_id,
            run_id = %run_id,
            lines = snapshot.lines.len(),
            duration_us = start_time.elapsed().as_micros(),
            "Draft generated"
        );
    }
    respond(correlation_id, StatusCode::OK, result)
}

/// Handler for POST /runs/:run_id/hr-events.
async fn hr_events_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<HrEventsRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        run_id = %run_id,
        events = request.events.len(),
        "Recording HR events"
    );
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().process_hr_events(&run_id, request.events).await,
    )
}

/// Handler for POST /runs/:run_id/penalties.
async fn penalties_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<PenaltiesRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let penalties: Vec<ManualAdjustment> =
        request.penalties.into_iter().map(Into::into).collect();
    info!(
        correlation_id = %correlation_id,
        run_id = %run_id,
        penalties = penalties.len(),
        "Recording penalties"
    );
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().apply_penalties(&run_id, penalties).await,
    )
}

/// Handler for POST /runs/:run_id/review.
async fn review_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Reviewing draft");
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().review_draft(&run_id).await,
    )
}

/// Handler for POST /runs/:run_id/manager-approval.
async fn manager_approval_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<ApproverRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        run_id = %run_id,
        approver_id = %request.approver_id,
        "Recording manager approval"
    );
    respond(
        correlation_id,
        StatusCode::OK,
        state
            .engine()
            .manager_approve(&run_id, &request.approver_id)
            .await,
    )
}

/// Handler for POST /runs/:run_id/finance-approval.
async fn finance_approval_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    payload: Result<Json<ApproverRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!(
        correlation_id = %correlation_id,
        run_id = %run_id,
        approver_id = %request.approver_id,
        "Recording finance approval"
    );
    respond(
        correlation_id,
        StatusCode::OK,
        state
            .engine()
            .finance_approve(&run_id, &request.approver_id)
            .await,
    )
}

/// Handler for POST /runs/:run_id/lock.
async fn lock_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Locking run");
    respond(correlation_id, StatusCode::OK, state.engine().lock(&run_id).await)
}

/// Handler for POST /runs/:run_id/unfreeze.
async fn unfreeze_handler(State(state): State<AppState>, Path(run_id): Path<String>) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Unfreezing run");
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().unfreeze(&run_id).await,
    )
}

/// Handler for POST /runs/:run_id/payslips.
async fn generate_payslips_handler(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, run_id = %run_id, "Generating payslips");
    respond(
        correlation_id,
        StatusCode::CREATED,
        state.engine().generate_payslips(&run_id).await,
    )
}

// ==========================================================================
// Approval items
// ==========================================================================

/// Handler for GET /approvals?period_end=YYYY-MM-DD.
async fn pending_approvals_handler(
    State(state): State<AppState>,
    query: Result<Query<PendingApprovalsQuery>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(query)) => json_response(
            StatusCode::OK,
            state.engine().approvals().pending_for_period(query.period_end),
        ),
        Err(rejection) => json_response(
            StatusCode::BAD_REQUEST,
            ApiError::validation_error(rejection.body_text()),
        ),
    }
}

/// Handler for POST /approvals.
async fn submit_approval_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitApprovalRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let item: ApprovalItem = request.into();
    info!(
        correlation_id = %correlation_id,
        item_id = %item.id,
        employee_id = %item.employee_id,
        "Submitting approval item"
    );
    respond(
        correlation_id,
        StatusCode::CREATED,
        state.engine().approvals().submit(item),
    )
}

/// Handler for GET /approvals/:item_id.
async fn get_approval_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Response {
    respond(
        Uuid::new_v4(),
        StatusCode::OK,
        state.engine().approvals().get(&item_id),
    )
}

/// Handler for PATCH /approvals/:item_id.
async fn edit_approval_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    payload: Result<Json<ApprovalPatch>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let patch = match parse_body(correlation_id, payload) {
        Ok(patch) => patch,
        Err(response) => return response,
    };
    info!(correlation_id = %correlation_id, item_id = %item_id, "Editing approval item");
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().approvals().edit(&item_id, patch),
    )
}

/// Handler for POST /approvals/:item_id/approve.
async fn approve_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    payload: Result<Json<ApproverRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    respond(
        correlation_id,
        StatusCode::OK,
        state
            .engine()
            .approvals()
            .approve(&item_id, &request.approver_id),
    )
}

/// Handler for POST /approvals/:item_id/reject.
async fn reject_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    payload: Result<Json<ApproverRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let request = match parse_body(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    respond(
        correlation_id,
        StatusCode::OK,
        state
            .engine()
            .approvals()
            .reject(&item_id, &request.approver_id),
    )
}

/// Handler for POST /approvals/:item_id/reopen.
async fn reopen_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, item_id = %item_id, "Reopening approval item");
    respond(
        correlation_id,
        StatusCode::OK,
        state.engine().approvals().reopen(&item_id),
    )
}
