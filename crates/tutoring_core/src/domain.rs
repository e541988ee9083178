//! crates/tutoring_core/src/domain.rs
//!
//! Defines the pure, core data structures for the back-office.
//! These structs are independent of the tabular store and of any wire format.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Format used for every timestamp written into the store.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The trimmed text of a cell. Cells past the end of a short row read as empty.
pub(crate) fn cell(row: &[String], index: usize) -> String {
    row.get(index).map(|c| c.trim().to_string()).unwrap_or_default()
}

//=========================================================================================
// Tabs and their column layouts
//=========================================================================================

/// A named table ("worksheet") of the tabular store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Sessions,
    Billing,
    Reviews,
    Students,
    Teachers,
}

impl Tab {
    pub fn name(self) -> &'static str {
        match self {
            Tab::Sessions => "Sessions",
            Tab::Billing => "Billing",
            Tab::Reviews => "Reviews",
            Tab::Students => "Students",
            Tab::Teachers => "Teachers",
        }
    }

    /// Header row of the tab. Column order is significant for range updates.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Tab::Sessions => &[
                "SessionID",
                "TeacherName",
                "StudentName",
                "Subject",
                "ScheduledTime",
                "MeetingLink",
                "Status",
                "AttendanceCode",
                "TeacherJoinTime",
                "StudentJoinTime",
                "EndTime",
            ],
            Tab::Billing => &[
                "StudentName",
                "BillingType",
                "Rate",
                "Currency",
                "PaymentTerms",
                "CurrentBalance",
                "LastBillDate",
            ],
            Tab::Reviews => &["Timestamp", "TeacherName", "StudentName", "Note"],
            Tab::Students => &[
                "Student Name",
                "Payment Status",
                "Academic Progress",
                "Attendance",
                "Last Class Date",
                "Email",
                "Phone",
                "Class Times",
                "Subjects",
            ],
            Tab::Teachers => &["Name", "Email", "Phone", "Expertise", "Assigned Students"],
        }
    }

    pub fn width(self) -> usize {
        self.headers().len()
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column indices of the Sessions tab.
pub mod session_columns {
    pub const SESSION_ID: usize = 0;
    pub const TEACHER_NAME: usize = 1;
    pub const STUDENT_NAME: usize = 2;
    pub const SUBJECT: usize = 3;
    pub const SCHEDULED_TIME: usize = 4;
    pub const MEETING_LINK: usize = 5;
    pub const STATUS: usize = 6;
    pub const ATTENDANCE_CODE: usize = 7;
    pub const TEACHER_JOIN_TIME: usize = 8;
    pub const STUDENT_JOIN_TIME: usize = 9;
    pub const END_TIME: usize = 10;
}

/// Column indices of the Billing tab.
pub mod billing_columns {
    pub const STUDENT_NAME: usize = 0;
    pub const BILLING_TYPE: usize = 1;
    pub const RATE: usize = 2;
    pub const CURRENCY: usize = 3;
    pub const PAYMENT_TERMS: usize = 4;
    pub const CURRENT_BALANCE: usize = 5;
    pub const LAST_BILL_DATE: usize = 6;
}

/// Column indices of the Reviews tab.
pub mod review_columns {
    pub const TIMESTAMP: usize = 0;
    pub const TEACHER_NAME: usize = 1;
    pub const STUDENT_NAME: usize = 2;
    pub const NOTE: usize = 3;
}

/// Column indices of the Students tab.
pub mod student_columns {
    pub const NAME: usize = 0;
    pub const PAYMENT_STATUS: usize = 1;
    pub const ACADEMIC_PROGRESS: usize = 2;
    pub const ATTENDANCE: usize = 3;
    pub const LAST_CLASS_DATE: usize = 4;
    pub const EMAIL: usize = 5;
    pub const PHONE: usize = 6;
    pub const CLASS_TIMES: usize = 7;
    pub const SUBJECTS: usize = 8;
}

/// Column indices of the Teachers tab.
pub mod teacher_columns {
    pub const NAME: usize = 0;
    pub const EMAIL: usize = 1;
    pub const PHONE: usize = 2;
    pub const EXPERTISE: usize = 3;
    pub const ASSIGNED_STUDENTS: usize = 4;
}

//=========================================================================================
// Enumerations stored as text cells
//=========================================================================================

/// Returned when a cell does not hold one of the known values of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Lower-cases and strips separators so "In-Progress", "in progress" and
/// "IN_PROGRESS" all compare equal.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lifecycle state of a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::InProgress => "In-Progress",
            SessionStatus::Completed => "Completed",
        }
    }

    /// True when moving from `self` to `next` does not go backwards.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        next >= self
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "inprogress" => Ok(SessionStatus::InProgress),
            "completed" => Ok(SessionStatus::Completed),
            _ => Err(UnknownVariant {
                kind: "session status",
                value: s.to_string(),
            }),
        }
    }
}

/// Which participant of a session is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(UnknownVariant {
                kind: "role",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingType {
    PerHour,
    PerClass,
    MonthlyFixed,
}

impl BillingType {
    pub fn as_str(self) -> &'static str {
        match self {
            BillingType::PerHour => "Per Hour",
            BillingType::PerClass => "Per Class",
            BillingType::MonthlyFixed => "Monthly Fixed",
        }
    }
}

impl fmt::Display for BillingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "perhour" | "hourly" => Ok(BillingType::PerHour),
            "perclass" => Ok(BillingType::PerClass),
            "monthlyfixed" | "monthly" => Ok(BillingType::MonthlyFixed),
            _ => Err(UnknownVariant {
                kind: "billing type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Ngn,
    Usd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Ngn => "NGN",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "ngn" => Ok(Currency::Ngn),
            "usd" => Ok(Currency::Usd),
            _ => Err(UnknownVariant {
                kind: "currency",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentTerms {
    Prepaid,
    Postpaid,
}

impl PaymentTerms {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentTerms::Prepaid => "Prepaid",
            PaymentTerms::Postpaid => "Postpaid",
        }
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentTerms {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "prepaid" => Ok(PaymentTerms::Prepaid),
            "postpaid" => Ok(PaymentTerms::Postpaid),
            _ => Err(UnknownVariant {
                kind: "payment terms",
                value: s.to_string(),
            }),
        }
    }
}

//=========================================================================================
// Records
//=========================================================================================

/// One scheduled, in-progress or completed class meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,
    pub teacher_name: String,
    pub student_name: String,
    pub subject: String,
    pub scheduled_time: String,
    pub meeting_link: String,
    pub status: SessionStatus,
    pub attendance_code: String,
    pub teacher_join_time: Option<String>,
    pub student_join_time: Option<String>,
    pub end_time: Option<String>,
}

impl Session {
    /// The name the session expects for `role`.
    pub fn participant(&self, role: Role) -> &str {
        match role {
            Role::Teacher => &self.teacher_name,
            Role::Student => &self.student_name,
        }
    }

    pub fn join_time(&self, role: Role) -> Option<&str> {
        match role {
            Role::Teacher => self.teacher_join_time.as_deref(),
            Role::Student => self.student_join_time.as_deref(),
        }
    }

    pub fn set_join_time(&mut self, role: Role, timestamp: String) {
        match role {
            Role::Teacher => self.teacher_join_time = Some(timestamp),
            Role::Student => self.student_join_time = Some(timestamp),
        }
    }
}

/// Append-only evidence that a class took place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub timestamp: String,
    pub teacher_name: String,
    pub student_name: String,
    pub note: String,
}

/// Per-student monetary configuration and running balance.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingProfile {
    pub student_name: String,
    pub billing_type: BillingType,
    pub rate: Decimal,
    pub currency: Currency,
    pub payment_terms: PaymentTerms,
    pub current_balance: Decimal,
    pub last_bill_date: Option<String>,
}

/// A row of the Students roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
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

/// A row of the Teachers roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeacherRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub expertise: String,
    pub assigned_students: String,
}

impl TeacherRecord {
    /// The comma-separated "Assigned Students" cell, split and trimmed.
    pub fn assigned_student_names(&self) -> Vec<String> {
        self.assigned_students
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}
