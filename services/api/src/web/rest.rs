//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::*;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, warn};
use tutoring_core::{
    domain::UnknownVariant, BillingTerms, DomainError, NewStudent, NewTeacher, PortError,
    ScheduleRequest,
};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::clock_in::magic_link_handler,
        schedule_class_handler,
        list_sessions_handler,
        end_class_handler,
        clock_in_code_handler,
        register_student_handler,
        register_teacher_handler,
        list_students_handler,
        student_summary_handler,
        action_items_handler,
        add_review_handler,
        historical_balance_handler,
        update_billing_handler,
        teacher_pay_handler,
    ),
    components(schemas(
        OperationReport,
        ScheduleClassRequest,
        ScheduleClassResponse,
        SessionView,
        CodeClockInRequest,
        ClockInResponse,
        EndClassResponse,
        BillingTermsPayload,
        RegisterStudentRequest,
        RegisterTeacherRequest,
        RegistrationResponse,
        StudentView,
        TeacherView,
        StudentSummaryView,
        ActionItemsView,
        ReviewRequest,
        BillingProfileView,
        UpdateBillingRequest,
        BillingResponse,
        BalanceResponse,
        ProjectionView,
        PayrollResponse,
    )),
    tags(
        (name = "Tutoring Back-Office API", description = "Class scheduling, attendance, billing and payroll.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Failure reply shared by every handler.
pub type Rejection = (StatusCode, Json<OperationReport>);

pub(crate) fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyCompleted(_) | DomainError::Conflict(_) => StatusCode::CONFLICT,
        DomainError::InvalidCode(_) => StatusCode::UNAUTHORIZED,
        DomainError::NameMismatch { .. } => StatusCode::FORBIDDEN,
        DomainError::MissingContact(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::Store(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
        DomainError::Store(PortError::Conflict(_)) => StatusCode::CONFLICT,
        DomainError::Store(PortError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn reject(err: DomainError) -> Rejection {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {:?}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (status, Json(OperationReport::failure(err.to_string())))
}

pub(crate) fn parse_field<T>(value: &str) -> Result<T, Rejection>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|e: UnknownVariant| reject(DomainError::InvalidInput(e.to_string())))
}

/// Parses and validates billing terms before anything is written.
fn billing_terms(payload: &BillingTermsPayload) -> Result<BillingTerms, Rejection> {
    let terms = BillingTerms {
        billing_type: parse_field(&payload.billing_type)?,
        rate: payload.rate,
        currency: parse_field(&payload.currency)?,
        payment_terms: parse_field(&payload.payment_terms)?,
    };
    terms.validate().map_err(reject)?;
    Ok(terms)
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Schedule a class and email each participant their clock-in link.
///
/// Email failures do not undo the booking; the reply then says the links must be
/// shared by hand.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = ScheduleClassRequest,
    responses(
        (status = 201, description = "Session scheduled", body = ScheduleClassResponse),
        (status = 422, description = "A participant has no email on file", body = OperationReport),
        (status = 503, description = "Store unavailable", body = OperationReport)
    )
)]
pub async fn schedule_class_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ScheduleClassRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let request = ScheduleRequest {
        teacher_name: payload.teacher_name,
        student_name: payload.student_name,
        subject: payload.subject,
        scheduled_time: payload.scheduled_time,
        meeting_link: payload.meeting_link,
    };
    let outcome = app_state.sessions.schedule(&request).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(ScheduleClassResponse::from(outcome))))
}

/// List every readable session.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "All sessions", body = [SessionView]),
        (status = 503, description = "Store unavailable", body = OperationReport)
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionView>>, Rejection> {
    let sessions = app_state.sessions.list_sessions().await.map_err(reject)?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

/// End a class and record it in the review log.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/end",
    params(("session_id" = String, Path, description = "Id of the session to end.")),
    responses(
        (status = 200, description = "Class ended", body = EndClassResponse),
        (status = 404, description = "Unknown session", body = OperationReport),
        (status = 409, description = "Class already ended", body = OperationReport)
    )
)]
pub async fn end_class_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<EndClassResponse>, Rejection> {
    let outcome = app_state.sessions.end_class(&session_id).await.map_err(reject)?;
    Ok(Json(outcome.into()))
}

/// Clock in with the session's attendance code.
#[utoipa::path(
    post,
    path = "/clock-in/code",
    request_body = CodeClockInRequest,
    responses(
        (status = 200, description = "Clocked in", body = ClockInResponse),
        (status = 401, description = "No session has this code", body = OperationReport),
        (status = 403, description = "Name does not match the session", body = OperationReport),
        (status = 409, description = "Class already ended", body = OperationReport)
    )
)]
pub async fn clock_in_code_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CodeClockInRequest>,
) -> Result<Json<ClockInResponse>, Rejection> {
    let role = parse_field(&payload.role)?;
    let outcome = app_state
        .sessions
        .clock_in_by_code(&payload.code, &payload.name, role)
        .await
        .map_err(reject)?;
    Ok(Json(outcome.into()))
}

//=========================================================================================
// Roster Handlers
//=========================================================================================

/// Register a student, optionally with their billing profile.
#[utoipa::path(
    post,
    path = "/students",
    request_body = RegisterStudentRequest,
    responses(
        (status = 201, description = "Student registered", body = RegistrationResponse),
        (status = 400, description = "Missing name or invalid billing terms", body = OperationReport)
    )
)]
pub async fn register_student_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterStudentRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let terms = payload.billing.as_ref().map(billing_terms).transpose()?;
    let student = app_state
        .roster
        .register_student(&NewStudent {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            class_times: payload.class_times,
            subjects: payload.subjects,
        })
        .await
        .map_err(reject)?;

    let billing = match terms {
        Some(terms) => Some(
            app_state
                .ledger
                .update_billing_profile(&student.name, &terms, false)
                .await
                .map_err(reject)?,
        ),
        None => None,
    };

    let response = RegistrationResponse {
        success: true,
        message: format!("Student {} registered.", student.name),
        student: Some(student.into()),
        teacher: None,
        billing: billing.map(Into::into),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Register a teacher and the students assigned to them.
#[utoipa::path(
    post,
    path = "/teachers",
    request_body = RegisterTeacherRequest,
    responses(
        (status = 201, description = "Teacher registered", body = RegistrationResponse),
        (status = 400, description = "Missing name", body = OperationReport)
    )
)]
pub async fn register_teacher_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RegisterTeacherRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let teacher = app_state
        .roster
        .register_teacher(&NewTeacher {
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            expertise: payload.expertise,
            assigned_students: payload.assigned_students,
        })
        .await
        .map_err(reject)?;
    let response = RegistrationResponse {
        success: true,
        message: format!("Teacher {} registered.", teacher.name),
        student: None,
        teacher: Some(teacher.into()),
        billing: None,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/students",
    params(StudentSearch),
    responses((status = 200, description = "Matching students", body = [StudentView]))
)]
pub async fn list_students_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<StudentSearch>,
) -> Result<Json<Vec<StudentView>>, Rejection> {
    let students = app_state
        .roster
        .list_students(query.search.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(students.into_iter().map(StudentView::from).collect()))
}

/// Counts of students per payment status.
#[utoipa::path(
    get,
    path = "/students/summary",
    params(StudentSearch),
    responses((status = 200, description = "Payment status counts", body = StudentSummaryView))
)]
pub async fn student_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<StudentSearch>,
) -> Result<Json<StudentSummaryView>, Rejection> {
    let summary = app_state
        .roster
        .student_summary(query.search.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(summary.into()))
}

/// Students with overdue payments or low attendance.
#[utoipa::path(
    get,
    path = "/students/action-items",
    responses((status = 200, description = "Students needing follow-up", body = ActionItemsView))
)]
pub async fn action_items_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ActionItemsView>, Rejection> {
    let items = app_state.roster.action_items().await.map_err(reject)?;
    Ok(Json(items.into()))
}

/// Record a class by hand when no session was used.
#[utoipa::path(
    post,
    path = "/reviews",
    request_body = ReviewRequest,
    responses(
        (status = 201, description = "Class recorded", body = OperationReport),
        (status = 400, description = "A field is empty", body = OperationReport)
    )
)]
pub async fn add_review_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let record = app_state
        .reviews
        .add_review(&payload.teacher_name, &payload.student_name, &payload.review)
        .await
        .map_err(reject)?;
    let report = OperationReport::ok(format!(
        "Recorded a class of {} with {} at {}.",
        record.student_name, record.teacher_name, record.timestamp
    ));
    Ok((StatusCode::CREATED, Json(report)))
}

//=========================================================================================
// Billing and Payroll Handlers
//=========================================================================================

/// Balance owed for every recorded class of a student at the given rate.
#[utoipa::path(
    get,
    path = "/billing/{student_name}/balance",
    params(
        ("student_name" = String, Path, description = "Student name, matched exactly."),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Computed balance", body = BalanceResponse),
        (status = 400, description = "Unknown billing type", body = OperationReport)
    )
)]
pub async fn historical_balance_handler(
    State(app_state): State<Arc<AppState>>,
    Path(student_name): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, Rejection> {
    let billing_type = parse_field(&query.billing_type)?;
    let balance = app_state
        .ledger
        .historical_balance(&student_name, query.rate, billing_type)
        .await
        .map_err(reject)?;
    Ok(Json(BalanceResponse {
        success: true,
        message: format!("Balance for {} is {}.", student_name, balance),
        student_name,
        balance,
    }))
}

/// Create or update a student's billing profile.
#[utoipa::path(
    put,
    path = "/billing/{student_name}",
    params(("student_name" = String, Path, description = "Student whose profile is written.")),
    request_body = UpdateBillingRequest,
    responses(
        (status = 200, description = "Profile written", body = BillingResponse),
        (status = 400, description = "Invalid billing terms", body = OperationReport)
    )
)]
pub async fn update_billing_handler(
    State(app_state): State<Arc<AppState>>,
    Path(student_name): Path<String>,
    Json(payload): Json<UpdateBillingRequest>,
) -> Result<Json<BillingResponse>, Rejection> {
    let terms = billing_terms(&payload.terms)?;
    let profile = app_state
        .ledger
        .update_billing_profile(&student_name, &terms, payload.recalculate)
        .await
        .map_err(reject)?;
    Ok(Json(BillingResponse {
        success: true,
        message: format!("Billing profile for {} saved.", profile.student_name),
        profile: profile.into(),
    }))
}

/// A teacher's pay from recorded classes, with next month's projection.
#[utoipa::path(
    get,
    path = "/payroll/{teacher_name}",
    params(
        ("teacher_name" = String, Path, description = "Teacher name, matched exactly."),
        PayrollQuery
    ),
    responses(
        (status = 200, description = "Pay summary", body = PayrollResponse),
        (status = 400, description = "Share outside 0 to 100", body = OperationReport)
    )
)]
pub async fn teacher_pay_handler(
    State(app_state): State<Arc<AppState>>,
    Path(teacher_name): Path<String>,
    Query(query): Query<PayrollQuery>,
) -> Result<Json<PayrollResponse>, Rejection> {
    let share: Decimal = query
        .share_percent
        .unwrap_or(app_state.config.default_share_percent);
    let pay = app_state
        .ledger
        .teacher_pay(&teacher_name, share)
        .await
        .map_err(reject)?;
    let projection = match app_state.ledger.project_teacher_month(&teacher_name, share).await {
        Ok(projection) => Some(projection),
        Err(DomainError::NotFound(_)) => None,
        Err(e) => return Err(reject(e)),
    };
    Ok(Json(PayrollResponse::new(pay, share, projection)))
}
