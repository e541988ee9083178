//! crates/tutoring_core/src/notify.rs
//!
//! Magic-link formatting and the clock-in emails sent when a class is scheduled.

use tracing::warn;

use crate::domain::{Role, Session};
use crate::ports::{NotificationService, PortError, PortResult};

/// Builds `<base_url>/?action=clock_in&session_id=<id>&role=<Teacher|Student>`.
///
/// The parameter names are consumed verbatim by the clock-in endpoint.
pub fn magic_link(base_url: &str, session_id: &str, role: Role) -> String {
    format!(
        "{}/?action=clock_in&session_id={}&role={}",
        base_url.trim_end_matches('/'),
        session_id,
        role.as_str()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockInMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// The email for one participant. It carries exactly one link, for `role`.
pub fn compose_clock_in_message(
    base_url: &str,
    session: &Session,
    role: Role,
    recipient: &str,
) -> ClockInMessage {
    let counterpart = match role {
        Role::Teacher => format!("your student {}", session.student_name),
        Role::Student => format!("your teacher {}", session.teacher_name),
    };
    let body = format!(
        "Hello {name},\n\n\
         Your {subject} class with {counterpart} is scheduled for {time}.\n\n\
         When the class starts, clock in with this link:\n{link}\n\n\
         If the link does not work, use attendance code {code} on the check-in page.\n",
        name = session.participant(role),
        subject = session.subject,
        counterpart = counterpart,
        time = session.scheduled_time,
        link = magic_link(base_url, &session.id, role),
        code = session.attendance_code,
    );
    ClockInMessage {
        recipient: recipient.to_string(),
        subject: format!("{} class: {}", session.subject, session.scheduled_time),
        body,
    }
}

/// Sends the teacher and the student their own link. Both sends are attempted
/// even when the first one fails; any failure is reported as one error.
pub async fn dispatch_clock_in_links(
    notifier: &dyn NotificationService,
    base_url: &str,
    session: &Session,
    teacher_email: &str,
    student_email: &str,
) -> PortResult<()> {
    let mut failures = Vec::new();
    for (role, recipient) in [(Role::Teacher, teacher_email), (Role::Student, student_email)] {
        let message = compose_clock_in_message(base_url, session, role, recipient);
        if let Err(e) = notifier
            .send_email(&message.recipient, &message.subject, &message.body)
            .await
        {
            warn!(session_id = %session.id, %role, error = %e, "Clock-in email failed");
            failures.push(format!("{} email: {}", role, e));
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(PortError::Unexpected(failures.join("; ")))
    }
}
