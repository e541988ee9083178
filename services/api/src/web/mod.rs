pub mod clock_in;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::state::AppState;

/// Every endpoint of the back-office, without CORS or the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(clock_in::magic_link_handler))
        .route(
            "/sessions",
            post(rest::schedule_class_handler).get(rest::list_sessions_handler),
        )
        .route("/sessions/{session_id}/end", post(rest::end_class_handler))
        .route("/clock-in/code", post(rest::clock_in_code_handler))
        .route(
            "/students",
            post(rest::register_student_handler).get(rest::list_students_handler),
        )
        .route("/students/summary", get(rest::student_summary_handler))
        .route("/students/action-items", get(rest::action_items_handler))
        .route("/teachers", post(rest::register_teacher_handler))
        .route("/reviews", post(rest::add_review_handler))
        .route(
            "/billing/{student_name}/balance",
            get(rest::historical_balance_handler),
        )
        .route("/billing/{student_name}", put(rest::update_billing_handler))
        .route("/payroll/{teacher_name}", get(rest::teacher_pay_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
