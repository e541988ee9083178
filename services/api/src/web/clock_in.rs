//! services/api/src/web/clock_in.rs
//!
//! Consumes the magic links sent by email. A valid link records the join time and
//! forwards the participant to the meeting.

use crate::web::protocol::{ClockInResponse, MagicLinkParams, OperationReport};
use crate::web::rest::{parse_field, reject, Rejection};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use std::sync::Arc;
use tracing::info;
use tutoring_core::{DomainError, Role};

const CLOCK_IN_ACTION: &str = "clock_in";

/// Clock in from an emailed link.
///
/// Without `action=clock_in` this is just the landing page. On success the
/// participant is redirected to the meeting link with `303 See Other`.
#[utoipa::path(
    get,
    path = "/",
    params(MagicLinkParams),
    responses(
        (status = 303, description = "Clocked in; redirect to the meeting link"),
        (status = 200, description = "Landing page, or clocked in to a session without a meeting link", body = ClockInResponse),
        (status = 400, description = "Missing session id or invalid role", body = OperationReport),
        (status = 404, description = "Unknown session", body = OperationReport),
        (status = 409, description = "Class already ended", body = OperationReport)
    )
)]
pub async fn magic_link_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<MagicLinkParams>,
) -> Result<Response, Rejection> {
    if params.action.as_deref() != Some(CLOCK_IN_ACTION) {
        let report = OperationReport::ok("Tutoring back-office is running.");
        return Ok((StatusCode::OK, Json(report)).into_response());
    }

    let session_id = params
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| reject(DomainError::InvalidInput("session_id is required".to_string())))?;
    let role: Role = parse_field(params.role.as_deref().unwrap_or_default())?;

    let outcome = app_state
        .sessions
        .clock_in_by_link(session_id, role)
        .await
        .map_err(reject)?;

    if outcome.meeting_link.trim().is_empty() {
        return Ok(Json(ClockInResponse::from(outcome)).into_response());
    }
    info!(
        session_id = %outcome.session_id,
        role = %outcome.role,
        "Redirecting to meeting"
    );
    Ok(Redirect::to(&outcome.meeting_link).into_response())
}
