//! crates/tutoring_core/src/lifecycle.rs
//!
//! The session lifecycle: scheduling a class, clocking participants in (by magic
//! link or by attendance code) and ending the class.
//!
//! States only move forward: Scheduled → In-Progress → Completed. A completed
//! session rejects every further clock-in and end request without being touched.

use chrono::Utc;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ReviewRecord, Role, Session, SessionStatus, TIMESTAMP_FORMAT};
use crate::error::{DomainError, DomainResult};
use crate::notify::{dispatch_clock_in_links, magic_link};
use crate::ports::{NotificationService, PortError};
use crate::reviews::ReviewLog;
use crate::roster::Roster;
use crate::sessions::{SessionStore, StoredSession};

/// Note written to the Reviews log when a class is ended.
pub const COMPLETION_NOTE: &str = "Class completed (session clock-out)";

const CODE_ATTEMPTS: usize = 16;

/// Settings the lifecycle needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Base URL that magic links point at.
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub teacher_name: String,
    pub student_name: String,
    pub subject: String,
    pub scheduled_time: String,
    pub meeting_link: String,
}

#[derive(Debug)]
pub struct ScheduleOutcome {
    pub session_id: String,
    pub attendance_code: String,
    pub teacher_link: String,
    pub student_link: String,
    pub message: String,
    /// Set when the session was created but the emails did not go out.
    pub notification_error: Option<PortError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockInOutcome {
    pub session_id: String,
    pub role: Role,
    pub participant: String,
    /// Where the caller should send the participant next.
    pub meeting_link: String,
    pub joined_at: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndClassOutcome {
    pub session_id: String,
    pub ended_at: String,
    pub review: ReviewRecord,
    pub message: String,
}

#[derive(Clone)]
pub struct SessionManager {
    sessions: SessionStore,
    roster: Roster,
    reviews: ReviewLog,
    notifier: Arc<dyn NotificationService>,
    config: LifecycleConfig,
}

fn now_stamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Case-insensitive substring match in either direction. A blank name never matches.
pub fn names_match(supplied: &str, expected: &str) -> bool {
    let supplied = supplied.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    if supplied.is_empty() || expected.is_empty() {
        return false;
    }
    expected.contains(&supplied) || supplied.contains(&expected)
}

/// A random six-digit code not held by any unfinished session, when one can be
/// found in a few draws.
pub fn generate_attendance_code(taken: &HashSet<String>) -> String {
    let mut rng = rand::rng();
    let mut code = String::new();
    for _ in 0..CODE_ATTEMPTS {
        code = format!("{:06}", rng.random_range(0..1_000_000u32));
        if !taken.contains(&code) {
            break;
        }
    }
    code
}

fn transition_error(session_id: &str, err: PortError) -> DomainError {
    match err {
        PortError::Conflict(_) => DomainError::Conflict(session_id.to_string()),
        other => DomainError::Store(other),
    }
}

impl SessionManager {
    pub fn new(
        sessions: SessionStore,
        roster: Roster,
        reviews: ReviewLog,
        notifier: Arc<dyn NotificationService>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            sessions,
            roster,
            reviews,
            notifier,
            config,
        }
    }

    pub async fn list_sessions(&self) -> DomainResult<Vec<Session>> {
        Ok(self
            .sessions
            .list_sessions()
            .await?
            .into_iter()
            .map(|stored| stored.session)
            .collect())
    }

    /// Creates a Scheduled session and emails each participant their magic link.
    ///
    /// Both participants need an email on file, otherwise nothing is written.
    /// A failed email does not undo the session; the outcome carries the error and
    /// the links so they can be shared by hand.
    pub async fn schedule(&self, request: &ScheduleRequest) -> DomainResult<ScheduleOutcome> {
        let teacher_email = self
            .roster
            .find_email(Role::Teacher, &request.teacher_name)
            .await?
            .ok_or_else(|| {
                DomainError::MissingContact(format!(
                    "no email on file for teacher '{}'",
                    request.teacher_name
                ))
            })?;
        let student_email = self
            .roster
            .find_email(Role::Student, &request.student_name)
            .await?
            .ok_or_else(|| {
                DomainError::MissingContact(format!(
                    "no email on file for student '{}'",
                    request.student_name
                ))
            })?;

        let open_codes: HashSet<String> = self
            .sessions
            .list_sessions()
            .await?
            .into_iter()
            .filter(|stored| stored.session.status != SessionStatus::Completed)
            .map(|stored| stored.session.attendance_code)
            .collect();

        let session = Session {
            id: Uuid::new_v4().to_string(),
            teacher_name: request.teacher_name.trim().to_string(),
            student_name: request.student_name.trim().to_string(),
            subject: request.subject.trim().to_string(),
            scheduled_time: request.scheduled_time.trim().to_string(),
            meeting_link: request.meeting_link.trim().to_string(),
            status: SessionStatus::Scheduled,
            attendance_code: generate_attendance_code(&open_codes),
            teacher_join_time: None,
            student_join_time: None,
            end_time: None,
        };
        self.sessions.append_session(&session).await?;
        info!(session_id = %session.id, teacher = %session.teacher_name, student = %session.student_name, "Class scheduled");

        let base_url = &self.config.base_url;
        let notification_error = dispatch_clock_in_links(
            self.notifier.as_ref(),
            base_url,
            &session,
            &teacher_email,
            &student_email,
        )
        .await
        .err();

        let message = match &notification_error {
            None => format!(
                "Class scheduled. Clock-in links sent to {} and {}.",
                teacher_email, student_email
            ),
            Some(e) => {
                warn!(session_id = %session.id, error = %e, "Class scheduled without notifications");
                format!(
                    "Class scheduled, but the emails could not be sent ({}). Share the clock-in links manually.",
                    e
                )
            }
        };

        Ok(ScheduleOutcome {
            teacher_link: magic_link(base_url, &session.id, Role::Teacher),
            student_link: magic_link(base_url, &session.id, Role::Student),
            session_id: session.id,
            attendance_code: session.attendance_code,
            message,
            notification_error,
        })
    }

    /// Clock-in through a magic link. Knowing the session id is the only proof
    /// of identity.
    pub async fn clock_in_by_link(&self, session_id: &str, role: Role) -> DomainResult<ClockInOutcome> {
        let stored = self
            .sessions
            .find_session_by_id(session_id)
            .await
            .map_err(DomainError::from_lookup)?;
        self.record_join(stored, role).await
    }

    /// Clock-in with the attendance code, for participants without their link.
    pub async fn clock_in_by_code(
        &self,
        code: &str,
        name: &str,
        role: Role,
    ) -> DomainResult<ClockInOutcome> {
        let code = code.trim();
        let mut matches: Vec<StoredSession> = self
            .sessions
            .list_sessions()
            .await?
            .into_iter()
            .filter(|stored| !code.is_empty() && stored.session.attendance_code == code)
            .collect();
        if matches.is_empty() {
            return Err(DomainError::InvalidCode(code.to_string()));
        }
        // Codes are only unique among unfinished sessions; prefer an open one.
        let open = matches
            .iter()
            .position(|stored| stored.session.status != SessionStatus::Completed)
            .unwrap_or(0);
        let stored = matches.swap_remove(open);

        if stored.session.status == SessionStatus::Completed {
            return Err(DomainError::AlreadyCompleted(stored.session.id));
        }
        if !names_match(name, stored.session.participant(role)) {
            warn!(session_id = %stored.session.id, %role, supplied = name, "Clock-in name mismatch");
            return Err(DomainError::NameMismatch {
                role,
                supplied: name.trim().to_string(),
            });
        }
        self.record_join(stored, role).await
    }

    async fn record_join(&self, stored: StoredSession, role: Role) -> DomainResult<ClockInOutcome> {
        if stored.session.status == SessionStatus::Completed {
            return Err(DomainError::AlreadyCompleted(stored.session.id));
        }
        let joined_at = now_stamp();
        let mut next = stored.session.clone();
        next.set_join_time(role, joined_at.clone());
        next.status = SessionStatus::InProgress;

        self.sessions
            .apply_transition(&stored, &next)
            .await
            .map_err(|e| transition_error(&next.id, e))?;
        info!(session_id = %next.id, %role, "Participant clocked in");

        Ok(ClockInOutcome {
            message: format!("{} clocked in to {} at {}.", next.participant(role), next.subject, joined_at),
            participant: next.participant(role).to_string(),
            session_id: next.id,
            role,
            meeting_link: next.meeting_link,
            joined_at,
        })
    }

    /// Completes the session and appends its review record.
    ///
    /// Ending an already-completed session fails and writes nothing, so each
    /// session contributes at most one record to billing.
    pub async fn end_class(&self, session_id: &str) -> DomainResult<EndClassOutcome> {
        let stored = self
            .sessions
            .find_session_by_id(session_id)
            .await
            .map_err(DomainError::from_lookup)?;
        if stored.session.status == SessionStatus::Completed {
            return Err(DomainError::AlreadyCompleted(stored.session.id));
        }

        let ended_at = now_stamp();
        let mut next = stored.session.clone();
        next.status = SessionStatus::Completed;
        next.end_time = Some(ended_at.clone());
        self.sessions
            .apply_transition(&stored, &next)
            .await
            .map_err(|e| transition_error(&next.id, e))?;

        // The review lives in another tab; a failure here leaves the session
        // completed without its billing record and is reported to the caller.
        let review = ReviewRecord {
            timestamp: ended_at.clone(),
            teacher_name: next.teacher_name.clone(),
            student_name: next.student_name.clone(),
            note: COMPLETION_NOTE.to_string(),
        };
        self.reviews.append(&review).await?;
        info!(session_id = %next.id, "Class ended");

        Ok(EndClassOutcome {
            message: format!("Class ended at {}. Review recorded for {}.", ended_at, next.student_name),
            session_id: next.id,
            ended_at,
            review,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{session_columns, Tab};
    use crate::memory::InMemoryTabularStore;
    use crate::ports::{MockNotificationService, TabularStore};
    use crate::roster::{NewStudent, NewTeacher};

    const BASE: &str = "https://desk.example.com";

    struct Fixture {
        memory: Arc<InMemoryTabularStore>,
        manager: SessionManager,
        reviews: ReviewLog,
    }

    fn quiet_notifier() -> MockNotificationService {
        let mut notifier = MockNotificationService::new();
        notifier.expect_send_email().returning(|_, _, _| Ok(()));
        notifier
    }

    async fn fixture(notifier: MockNotificationService) -> Fixture {
        let memory = Arc::new(InMemoryTabularStore::new());
        let roster = Roster::new(memory.clone());
        roster
            .register_teacher(&NewTeacher {
                name: "Ada".into(),
                email: "ada@x.com".into(),
                ..NewTeacher::default()
            })
            .await
            .unwrap();
        roster
            .register_student(&NewStudent {
                name: "Bob Smith".into(),
                email: "bob@x.com".into(),
                ..NewStudent::default()
            })
            .await
            .unwrap();
        roster
            .register_student(&NewStudent {
                name: "No Mail".into(),
                ..NewStudent::default()
            })
            .await
            .unwrap();
        let reviews = ReviewLog::new(memory.clone());
        let manager = SessionManager::new(
            SessionStore::new(memory.clone()),
            roster,
            reviews.clone(),
            Arc::new(notifier),
            LifecycleConfig {
                base_url: BASE.to_string(),
            },
        );
        Fixture {
            memory,
            manager,
            reviews,
        }
    }

    fn request(student: &str) -> ScheduleRequest {
        ScheduleRequest {
            teacher_name: "Ada".into(),
            student_name: student.into(),
            subject: "Math".into(),
            scheduled_time: "2026-10-20 16:00".into(),
            meeting_link: "https://meet.example.com/abc".into(),
        }
    }

    async fn session_row(f: &Fixture) -> Vec<String> {
        f.memory.read_rows(Tab::Sessions).await.unwrap().remove(0)
    }

    #[tokio::test]
    async fn schedule_creates_scheduled_session_and_sends_two_links() {
        let mut notifier = MockNotificationService::new();
        notifier
            .expect_send_email()
            .withf(|to, _, body| to == "ada@x.com" && body.contains("role=Teacher"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        notifier
            .expect_send_email()
            .withf(|to, _, body| to == "bob@x.com" && body.contains("role=Student"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let f = fixture(notifier).await;

        let outcome = f.manager.schedule(&request("Bob Smith")).await.unwrap();
        assert!(outcome.notification_error.is_none());
        assert_eq!(outcome.attendance_code.len(), 6);
        assert!(outcome.attendance_code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(
            outcome.student_link,
            format!("{}/?action=clock_in&session_id={}&role=Student", BASE, outcome.session_id)
        );

        let row = session_row(&f).await;
        assert_eq!(row[session_columns::SESSION_ID], outcome.session_id);
        assert_eq!(row[session_columns::STATUS], "Scheduled");
        assert_eq!(row[session_columns::TEACHER_JOIN_TIME], "");
        assert_eq!(row[session_columns::END_TIME], "");
    }

    #[tokio::test]
    async fn schedule_without_contact_writes_nothing() {
        let mut notifier = MockNotificationService::new();
        notifier.expect_send_email().never();
        let f = fixture(notifier).await;

        let err = f.manager.schedule(&request("No Mail")).await.unwrap_err();
        assert!(matches!(err, DomainError::MissingContact(_)));

        let mut unknown_teacher = request("Bob Smith");
        unknown_teacher.teacher_name = "Grace".into();
        let err = f.manager.schedule(&unknown_teacher).await.unwrap_err();
        assert!(matches!(err, DomainError::MissingContact(_)));

        assert!(f.memory.read_rows(Tab::Sessions).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_notification_keeps_the_session() {
        let mut notifier = MockNotificationService::new();
        notifier
            .expect_send_email()
            .returning(|_, _, _| Err(PortError::Unavailable("relay down".into())));
        let f = fixture(notifier).await;

        let outcome = f.manager.schedule(&request("Bob Smith")).await.unwrap();
        assert!(outcome.notification_error.is_some());
        assert!(outcome.message.contains("manually"));
        assert_eq!(f.manager.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn link_clock_in_moves_to_in_progress_and_returns_meeting() {
        let f = fixture(quiet_notifier()).await;
        let scheduled = f.manager.schedule(&request("Bob Smith")).await.unwrap();

        let teacher = f
            .manager
            .clock_in_by_link(&scheduled.session_id, Role::Teacher)
            .await
            .unwrap();
        assert_eq!(teacher.meeting_link, "https://meet.example.com/abc");

        let again = f
            .manager
            .clock_in_by_link(&scheduled.session_id, Role::Teacher)
            .await
            .unwrap();
        assert_eq!(again.role, Role::Teacher);

        let row = session_row(&f).await;
        assert_eq!(row[session_columns::STATUS], "In-Progress");
        assert!(!row[session_columns::TEACHER_JOIN_TIME].is_empty());
        assert_eq!(row[session_columns::STUDENT_JOIN_TIME], "");
    }

    #[tokio::test]
    async fn link_clock_in_for_unknown_session_is_not_found() {
        let f = fixture(quiet_notifier()).await;
        let err = f.manager.clock_in_by_link("missing", Role::Student).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn code_clock_in_matches_names_loosely() {
        let f = fixture(quiet_notifier()).await;
        let scheduled = f.manager.schedule(&request("Bob Smith")).await.unwrap();

        let err = f
            .manager
            .clock_in_by_code(&scheduled.attendance_code, "robert", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NameMismatch { .. }));
        assert_eq!(session_row(&f).await[session_columns::STATUS], "Scheduled");

        let ok = f
            .manager
            .clock_in_by_code(&scheduled.attendance_code, "bob", Role::Student)
            .await
            .unwrap();
        assert_eq!(ok.participant, "Bob Smith");
        assert!(!session_row(&f).await[session_columns::STUDENT_JOIN_TIME].is_empty());
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let f = fixture(quiet_notifier()).await;
        f.manager.schedule(&request("Bob Smith")).await.unwrap();
        let err = f
            .manager
            .clock_in_by_code("not-a-code", "Bob", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCode(_)));
    }

    #[tokio::test]
    async fn end_class_completes_and_logs_one_review() {
        let f = fixture(quiet_notifier()).await;
        let scheduled = f.manager.schedule(&request("Bob Smith")).await.unwrap();
        f.manager
            .clock_in_by_link(&scheduled.session_id, Role::Student)
            .await
            .unwrap();

        let ended = f.manager.end_class(&scheduled.session_id).await.unwrap();
        assert_eq!(ended.review.student_name, "Bob Smith");
        assert_eq!(ended.review.note, COMPLETION_NOTE);

        let row = session_row(&f).await;
        assert_eq!(row[session_columns::STATUS], "Completed");
        assert_eq!(row[session_columns::END_TIME], ended.ended_at);
        assert_eq!(f.reviews.list_reviews().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completed_session_rejects_everything_without_mutation() {
        let f = fixture(quiet_notifier()).await;
        let scheduled = f.manager.schedule(&request("Bob Smith")).await.unwrap();
        f.manager.end_class(&scheduled.session_id).await.unwrap();
        let before = session_row(&f).await;

        let err = f.manager.end_class(&scheduled.session_id).await.unwrap_err();
        assert!(matches!(err, DomainError::AlreadyCompleted(_)));
        let err = f
            .manager
            .clock_in_by_link(&scheduled.session_id, Role::Teacher)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyCompleted(_)));
        let err = f
            .manager
            .clock_in_by_code(&scheduled.attendance_code, "Bob", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyCompleted(_)));

        assert_eq!(session_row(&f).await, before);
        assert_eq!(f.reviews.list_reviews().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hand_typed_status_spelling_still_advances() {
        let f = fixture(quiet_notifier()).await;
        let mut row = vec![String::new(); Tab::Sessions.width()];
        row[session_columns::SESSION_ID] = "s-1".into();
        row[session_columns::TEACHER_NAME] = "Ada".into();
        row[session_columns::STUDENT_NAME] = "Bob Smith".into();
        row[session_columns::MEETING_LINK] = "https://meet.example.com/abc".into();
        row[session_columns::STATUS] = "scheduled".into();
        row[session_columns::ATTENDANCE_CODE] = "424242".into();
        f.memory.append_row(Tab::Sessions, row).await.unwrap();

        let joined = f.manager.clock_in_by_link("s-1", Role::Teacher).await.unwrap();
        assert_eq!(joined.meeting_link, "https://meet.example.com/abc");
        f.manager.end_class("s-1").await.unwrap();

        let row = session_row(&f).await;
        assert_eq!(row[session_columns::STATUS], "Completed");
        assert!(!row[session_columns::TEACHER_JOIN_TIME].is_empty());
        assert_eq!(f.reviews.list_reviews().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn end_class_for_unknown_session_is_not_found() {
        let f = fixture(quiet_notifier()).await;
        let err = f.manager.end_class("missing").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn store_outage_surfaces_untranslated() {
        let f = fixture(quiet_notifier()).await;
        let scheduled = f.manager.schedule(&request("Bob Smith")).await.unwrap();
        f.memory.set_offline(true);
        let err = f.manager.end_class(&scheduled.session_id).await.unwrap_err();
        assert!(matches!(err, DomainError::Store(PortError::Unavailable(_))));
    }

    #[test]
    fn name_matching_is_substring_either_way() {
        assert!(names_match("bob", "Bob Smith"));
        assert!(names_match("Mr Bob Smith", "bob smith"));
        assert!(!names_match("robert", "Bob Smith"));
        assert!(!names_match("  ", "Bob Smith"));
    }

    #[test]
    fn generated_codes_avoid_taken_ones_when_possible() {
        let code = generate_attendance_code(&HashSet::new());
        assert_eq!(code.len(), 6);
        let taken: HashSet<String> = [code.clone()].into_iter().collect();
        let other = generate_attendance_code(&taken);
        assert_eq!(other.len(), 6);
    }
}
