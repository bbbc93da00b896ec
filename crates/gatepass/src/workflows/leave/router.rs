use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::approval::{ApproverRole, Verdict};
use super::directory::Directory;
use super::domain::{LeaveId, LeaveStatus, LeaveSubmission};
use super::policy::{Actor, ActorRole, AuthenticatedIdentity, IdentityError};
use super::reports::GateQueue;
use super::repository::{LeaveFilter, LeaveRepository};
use super::service::{LeaveServiceError, LeaveWorkflowService};

/// Header carrying the caller's role, set by the upstream auth gateway.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
/// Header carrying the caller's id, set by the upstream auth gateway.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

type SharedService<R, D> = Arc<LeaveWorkflowService<R, D>>;

/// Router builder exposing the leave workflow and gate reports.
pub fn leave_router<R, D>(service: SharedService<R, D>) -> Router
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    Router::new()
        .route(
            "/api/v1/leaves",
            post(submit_handler::<R, D>).get(list_handler::<R, D>),
        )
        .route("/api/v1/leaves/:leave_id", get(get_handler::<R, D>))
        .route(
            "/api/v1/leaves/:leave_id/decision",
            put(decision_handler::<R, D>),
        )
        .route(
            "/api/v1/leaves/:leave_id/final-approval",
            put(final_approval_handler::<R, D>),
        )
        .route("/api/v1/leaves/:leave_id/exit", put(exit_handler::<R, D>))
        .route(
            "/api/v1/leaves/:leave_id/return",
            put(return_handler::<R, D>),
        )
        .route("/api/v1/gate/summary", get(gate_summary_handler::<R, D>))
        .route("/api/v1/gate/queue/:stage", get(gate_queue_handler::<R, D>))
        .route(
            "/api/v1/gate/students/:register_number",
            get(active_pass_handler::<R, D>),
        )
        .route(
            "/api/v1/dashboard/pending",
            get(pending_count_handler::<R, D>),
        )
        .route(
            "/api/v1/analytics/exits",
            get(exit_analytics_handler::<R, D>),
        )
        .with_state(service)
}

/// Body of `PUT /api/v1/leaves/:leave_id/decision`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub role: ApproverRole,
    pub decision: Verdict,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Query string accepted by `GET /api/v1/leaves`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Comma separated statuses, e.g. `approved,exited`.
    pub status: Option<String>,
    pub register_number: Option<String>,
    pub hostel: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ListQuery {
    fn into_filter(self) -> Result<LeaveFilter, String> {
        let statuses = match self.status.as_deref() {
            Some(raw) => raw
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .map(str::parse::<LeaveStatus>)
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let mut filter = LeaveFilter {
            register_number: self.register_number,
            hostel: self
                .hostel
                .map(|hostel| hostel.trim().to_string())
                .filter(|hostel| !hostel.is_empty()),
            ..LeaveFilter::default()
        }
        .with_statuses(statuses);

        if self.from.is_some() || self.to.is_some() {
            let from = self.from.unwrap_or(NaiveDate::MIN);
            let to = self.to.unwrap_or(NaiveDate::MAX);
            if to < from {
                return Err(format!("'to' ({to}) is before 'from' ({from})"));
            }
            filter = filter.within(from, to);
        }
        Ok(filter)
    }
}

pub(crate) async fn submit_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<LeaveSubmission>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.submit_leave(&actor, submission) {
        Ok(leave) => (StatusCode::CREATED, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };
    match service.list_leaves(&actor, &filter) {
        Ok(leaves) => {
            let leaves: Vec<_> = leaves.collect();
            let payload = json!({ "count": leaves.len(), "leaves": leaves });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn get_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(leave_id): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.get_leave(&actor, &LeaveId(leave_id)) {
        Ok(leave) => (StatusCode::OK, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn decision_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(leave_id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let leave_id = LeaveId(leave_id);
    match service.decide(
        &actor,
        &leave_id,
        request.role,
        request.decision,
        request.reason,
    ) {
        Ok(leave) => (StatusCode::OK, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn final_approval_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(leave_id): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.final_approve(&actor, &LeaveId(leave_id)) {
        Ok(leave) => (StatusCode::OK, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn exit_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(leave_id): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.record_exit(&actor, &LeaveId(leave_id)) {
        Ok(leave) => (StatusCode::OK, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn return_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(leave_id): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.record_return(&actor, &LeaveId(leave_id)) {
        Ok(leave) => (StatusCode::OK, axum::Json(leave)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn gate_summary_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.gate_summary(&actor) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn gate_queue_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(stage): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let queue = match stage.parse::<GateQueue>() {
        Ok(queue) => queue,
        Err(message) => {
            let payload = json!({ "error": message });
            return (StatusCode::NOT_FOUND, axum::Json(payload)).into_response();
        }
    };
    match service.gate_queue(&actor, queue) {
        Ok(leaves) => {
            let payload = json!({ "stage": queue, "count": leaves.len(), "leaves": leaves });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn active_pass_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
    Path(register_number): Path<String>,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.active_pass(&actor, &register_number) {
        Ok(pass) => {
            let payload = json!({
                "register_number": register_number,
                "active_pass": pass,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn pending_count_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.pending_count(&actor) {
        Ok(pending) => (StatusCode::OK, axum::Json(json!({ "pending": pending }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn exit_analytics_handler<R, D>(
    State(service): State<SharedService<R, D>>,
    headers: HeaderMap,
) -> Response
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let actor = match authenticate(&service, &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.exit_analytics(&actor) {
        Ok(rows) => (StatusCode::OK, axum::Json(json!({ "exits": rows }))).into_response(),
        Err(error) => error_response(error),
    }
}

fn authenticate<R, D>(
    service: &LeaveWorkflowService<R, D>,
    headers: &HeaderMap,
) -> Result<Actor, Response>
where
    R: LeaveRepository + 'static,
    D: Directory + 'static,
{
    let identity = identity_from_headers(headers).ok_or_else(|| {
        let payload = json!({
            "error": format!(
                "missing or malformed {ACTOR_ROLE_HEADER} / {ACTOR_ID_HEADER} headers"
            ),
        });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })?;
    service.resolve(&identity).map_err(error_response)
}

fn identity_from_headers(headers: &HeaderMap) -> Option<AuthenticatedIdentity> {
    let role = headers.get(ACTOR_ROLE_HEADER)?.to_str().ok()?;
    let id = headers.get(ACTOR_ID_HEADER)?.to_str().ok()?.trim();
    if id.is_empty() {
        return None;
    }
    Some(AuthenticatedIdentity {
        role: role.parse::<ActorRole>().ok()?,
        id: id.to_string(),
    })
}

/// Map a service error onto the HTTP contract.
pub(crate) fn error_response(error: LeaveServiceError) -> Response {
    let (status, payload) = match &error {
        LeaveServiceError::Validation(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": error.to_string() }),
        ),
        LeaveServiceError::InvalidTransition(_) => (
            StatusCode::CONFLICT,
            json!({ "error": error.to_string(), "retryable": false }),
        ),
        LeaveServiceError::PreconditionNotMet { missing } => (
            StatusCode::PRECONDITION_FAILED,
            json!({ "error": error.to_string(), "missing": missing }),
        ),
        LeaveServiceError::Authorization(_) => {
            (StatusCode::FORBIDDEN, json!({ "error": error.to_string() }))
        }
        LeaveServiceError::Identity(IdentityError::Directory(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
        LeaveServiceError::Identity(_) => {
            (StatusCode::UNAUTHORIZED, json!({ "error": error.to_string() }))
        }
        LeaveServiceError::Conflict { leave_id } => (
            StatusCode::CONFLICT,
            json!({
                "error": error.to_string(),
                "leave_id": leave_id,
                "retryable": true,
            }),
        ),
        LeaveServiceError::NotFound(leave_id) => (
            StatusCode::NOT_FOUND,
            json!({ "error": error.to_string(), "leave_id": leave_id }),
        ),
        LeaveServiceError::Repository(_) | LeaveServiceError::Directory(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };
    (status, axum::Json(payload)).into_response()
}

