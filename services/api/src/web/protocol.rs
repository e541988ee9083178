//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the dashboard and the API server.
//! Every reply carries `success` and a human-readable `message`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tutoring_core::{
    ActionItems, BillingProfile, ClockInOutcome, EndClassOutcome, MonthlyProjection,
    ScheduleOutcome, Session, StudentRecord, StudentSummary, TeacherPay, TeacherRecord,
};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Generic Replies
//=========================================================================================

/// Outcome of an operation that returns no data, and the body of every failure.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct OperationReport {
    pub success: bool,
    pub message: String,
}

impl OperationReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

//=========================================================================================
// Sessions
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct ScheduleClassRequest {
    pub teacher_name: String,
    pub student_name: String,
    pub subject: String,
    pub scheduled_time: String,
    pub meeting_link: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ScheduleClassResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub attendance_code: String,
    pub teacher_link: String,
    pub student_link: String,
    /// False when the clock-in emails failed and the links must be shared by hand.
    pub notifications_sent: bool,
}

impl From<ScheduleOutcome> for ScheduleClassResponse {
    fn from(outcome: ScheduleOutcome) -> Self {
        Self {
            success: true,
            notifications_sent: outcome.notification_error.is_none(),
            message: outcome.message,
            session_id: outcome.session_id,
            attendance_code: outcome.attendance_code,
            teacher_link: outcome.teacher_link,
            student_link: outcome.student_link,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SessionView {
    pub session_id: String,
    pub teacher_name: String,
    pub student_name: String,
    pub subject: String,
    pub scheduled_time: String,
    pub meeting_link: String,
    pub status: String,
    pub teacher_join_time: Option<String>,
    pub student_join_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            teacher_name: session.teacher_name,
            student_name: session.student_name,
            subject: session.subject,
            scheduled_time: session.scheduled_time,
            meeting_link: session.meeting_link,
            status: session.status.as_str().to_string(),
            teacher_join_time: session.teacher_join_time,
            student_join_time: session.student_join_time,
            end_time: session.end_time,
        }
    }
}

/// Query string of a magic link: `?action=clock_in&session_id=<id>&role=<Teacher|Student>`.
#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MagicLinkParams {
    pub action: Option<String>,
    pub session_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CodeClockInRequest {
    pub code: String,
    pub name: String,
    /// `Teacher` or `Student`.
    pub role: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ClockInResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub role: String,
    pub meeting_link: String,
    pub joined_at: String,
}

impl From<ClockInOutcome> for ClockInResponse {
    fn from(outcome: ClockInOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            session_id: outcome.session_id,
            role: outcome.role.as_str().to_string(),
            meeting_link: outcome.meeting_link,
            joined_at: outcome.joined_at,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct EndClassResponse {
    pub success: bool,
    pub message: String,
    pub session_id: String,
    pub ended_at: String,
}

impl From<EndClassOutcome> for EndClassResponse {
    fn from(outcome: EndClassOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message,
            session_id: outcome.session_id,
            ended_at: outcome.ended_at,
        }
    }
}

//=========================================================================================
// Registration and Rosters
//=========================================================================================

#[derive(Deserialize, Debug, ToSchema)]
pub struct BillingTermsPayload {
    /// `Per Hour`, `Per Class` or `Monthly Fixed`.
    pub billing_type: String,
    #[schema(value_type = String, example = "5000")]
    pub rate: Decimal,
    /// `NGN` or `USD`.
    pub currency: String,
    /// `Prepaid` or `Postpaid`.
    pub payment_terms: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterStudentRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub class_times: String,
    #[serde(default)]
    pub subjects: String,
    /// Creates the student's billing profile when present.
    pub billing: Option<BillingTermsPayload>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterTeacherRequest {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub expertise: String,
    /// Comma-separated student names.
    #[serde(default)]
    pub assigned_students: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct StudentView {
    pub name: String,
    pub payment_status: String,
    pub academic_progress: String,
    pub attendance: String,
    pub last_class_date: String,
    pub email: String,
    pub phone: String,
    pub class_times: String,
    pub subjects: String,
}

impl From<StudentRecord> for StudentView {
    fn from(s: StudentRecord) -> Self {
        Self {
            name: s.name,
            payment_status: s.payment_status,
            academic_progress: s.academic_progress,
            attendance: s.attendance,
            last_class_date: s.last_class_date,
            email: s.email,
            phone: s.phone,
            class_times: s.class_times,
            subjects: s.subjects,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct TeacherView {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub expertise: String,
    pub assigned_students: Vec<String>,
}

impl From<TeacherRecord> for TeacherView {
    fn from(t: TeacherRecord) -> Self {
        Self {
            assigned_students: t.assigned_student_names(),
            name: t.name,
            email: t.email,
            phone: t.phone,
            expertise: t.expertise,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct RegistrationResponse {
    pub success: bool,
    pub message: String,
    pub student: Option<StudentView>,
    pub teacher: Option<TeacherView>,
    pub billing: Option<BillingProfileView>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentSearch {
    /// Case-insensitive fragment of the student's name.
    pub search: Option<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct StudentSummaryView {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

impl From<StudentSummary> for StudentSummaryView {
    fn from(s: StudentSummary) -> Self {
        Self {
            total: s.total,
            paid: s.paid,
            pending: s.pending,
            overdue: s.overdue,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ActionItemsView {
    pub overdue_payments: Vec<StudentView>,
    /// Students below 50% attendance.
    pub low_attendance: Vec<StudentView>,
}

impl From<ActionItems> for ActionItemsView {
    fn from(items: ActionItems) -> Self {
        Self {
            overdue_payments: items.overdue_payments.into_iter().map(Into::into).collect(),
            low_attendance: items.low_attendance.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ReviewRequest {
    pub teacher_name: String,
    pub student_name: String,
    pub review: String,
}

//=========================================================================================
// Billing and Payroll
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct BillingProfileView {
    pub student_name: String,
    pub billing_type: String,
    #[schema(value_type = String)]
    pub rate: Decimal,
    pub currency: String,
    pub payment_terms: String,
    #[schema(value_type = String)]
    pub current_balance: Decimal,
    pub last_bill_date: Option<String>,
}

impl From<BillingProfile> for BillingProfileView {
    fn from(p: BillingProfile) -> Self {
        Self {
            student_name: p.student_name,
            billing_type: p.billing_type.as_str().to_string(),
            rate: p.rate,
            currency: p.currency.as_str().to_string(),
            payment_terms: p.payment_terms.as_str().to_string(),
            current_balance: p.current_balance,
            last_bill_date: p.last_bill_date,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateBillingRequest {
    #[serde(flatten)]
    pub terms: BillingTermsPayload,
    /// Replace the balance with one computed from the class history.
    #[serde(default)]
    pub recalculate: bool,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct BillingResponse {
    pub success: bool,
    pub message: String,
    pub profile: BillingProfileView,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    #[param(value_type = String)]
    pub rate: Decimal,
    pub billing_type: String,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct BalanceResponse {
    pub success: bool,
    pub message: String,
    pub student_name: String,
    #[schema(value_type = String)]
    pub balance: Decimal,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PayrollQuery {
    /// Teacher's share of revenue, in percent. Defaults to the configured share.
    #[param(value_type = Option<String>)]
    pub share_percent: Option<Decimal>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProjectionView {
    pub projected_classes: u32,
    #[schema(value_type = Option<String>)]
    pub projected_revenue: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub projected_pay: Option<Decimal>,
    pub unpriced_students: Vec<String>,
}

impl From<MonthlyProjection> for ProjectionView {
    fn from(p: MonthlyProjection) -> Self {
        Self {
            projected_classes: p.projected_classes,
            projected_revenue: p.projected_revenue,
            projected_pay: p.projected_pay,
            unpriced_students: p.unpriced_students,
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct PayrollResponse {
    pub success: bool,
    pub message: String,
    pub teacher_name: String,
    pub class_count: usize,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    #[schema(value_type = String)]
    pub teacher_pay: Decimal,
    #[schema(value_type = String)]
    pub share_percent: Decimal,
    /// Absent when the teacher is not on the roster.
    pub projection: Option<ProjectionView>,
}

impl PayrollResponse {
    pub fn new(pay: TeacherPay, share_percent: Decimal, projection: Option<MonthlyProjection>) -> Self {
        Self {
            success: true,
            message: format!(
                "{} taught {} classes; pay is {} of {} revenue.",
                pay.teacher_name, pay.class_count, pay.teacher_pay, pay.total_revenue
            ),
            teacher_name: pay.teacher_name,
            class_count: pay.class_count,
            total_revenue: pay.total_revenue,
            teacher_pay: pay.teacher_pay,
            share_percent,
            projection: projection.map(Into::into),
        }
    }
}
