pub mod billing;
pub mod domain;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod notify;
pub mod ports;
pub mod reviews;
pub mod roster;
pub mod schedule;
pub mod sessions;

pub use billing::{BillingLedger, BillingTerms, MonthlyProjection, TeacherPay};
pub use domain::{
    BillingProfile, BillingType, Currency, PaymentTerms, ReviewRecord, Role, Session,
    SessionStatus, StudentRecord, Tab, TeacherRecord,
};
pub use error::{DomainError, DomainResult};
pub use lifecycle::{
    ClockInOutcome, EndClassOutcome, LifecycleConfig, ScheduleOutcome, ScheduleRequest,
    SessionManager,
};
pub use memory::InMemoryTabularStore;
pub use ports::{CellGuard, NotificationService, PortError, PortResult, TabularStore};
pub use reviews::ReviewLog;
pub use roster::{ActionItems, NewStudent, NewTeacher, Roster, StudentSummary};
pub use sessions::{SessionStore, StoredSession};
