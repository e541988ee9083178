//! crates/tutoring_core/src/sessions.rs
//!
//! The session store adapter: translates `Session` values to and from rows of the
//! Sessions tab. It owns no business rules.

use std::sync::Arc;
use tracing::warn;

use crate::domain::{cell, session_columns as col, Session, SessionStatus, Tab};
use crate::ports::{CellGuard, PortError, PortResult, TabularStore};

/// A session together with the row it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub row: usize,
    pub session: Session,
    /// The Status cell exactly as stored, which may be spelled differently from
    /// `session.status`. Transitions are guarded on this text.
    pub status_cell: String,
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn TabularStore>,
}

//=========================================================================================
// Row Mapping
//=========================================================================================

fn optional_cell(row: &[String], index: usize) -> Option<String> {
    Some(cell(row, index)).filter(|value| !value.is_empty())
}

fn session_from_row(row: &[String]) -> PortResult<Session> {
    let id = cell(row, col::SESSION_ID);
    let status = cell(row, col::STATUS)
        .parse::<SessionStatus>()
        .map_err(|e| PortError::InvalidData(format!("session {}: {}", id, e)))?;
    Ok(Session {
        id,
        teacher_name: cell(row, col::TEACHER_NAME),
        student_name: cell(row, col::STUDENT_NAME),
        subject: cell(row, col::SUBJECT),
        scheduled_time: cell(row, col::SCHEDULED_TIME),
        meeting_link: cell(row, col::MEETING_LINK),
        status,
        attendance_code: cell(row, col::ATTENDANCE_CODE),
        teacher_join_time: optional_cell(row, col::TEACHER_JOIN_TIME),
        student_join_time: optional_cell(row, col::STUDENT_JOIN_TIME),
        end_time: optional_cell(row, col::END_TIME),
    })
}

fn stored(index: usize, row: &[String]) -> PortResult<StoredSession> {
    Ok(StoredSession {
        row: index,
        session: session_from_row(row)?,
        status_cell: row.get(col::STATUS).cloned().unwrap_or_default(),
    })
}

fn session_to_row(session: &Session) -> Vec<String> {
    vec![
        session.id.clone(),
        session.teacher_name.clone(),
        session.student_name.clone(),
        session.subject.clone(),
        session.scheduled_time.clone(),
        session.meeting_link.clone(),
        session.status.as_str().to_string(),
        session.attendance_code.clone(),
        session.teacher_join_time.clone().unwrap_or_default(),
        session.student_join_time.clone().unwrap_or_default(),
        session.end_time.clone().unwrap_or_default(),
    ]
}

//=========================================================================================
// Adapter Operations
//=========================================================================================

impl SessionStore {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// Every readable session. Rows with an unknown status are logged and skipped.
    pub async fn list_sessions(&self) -> PortResult<Vec<StoredSession>> {
        let rows = self.store.read_rows(Tab::Sessions).await?;
        let mut sessions = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match stored(index, row) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(row = index, error = %e, "Skipping unreadable session row"),
            }
        }
        Ok(sessions)
    }

    pub async fn append_session(&self, session: &Session) -> PortResult<()> {
        self.store
            .append_row(Tab::Sessions, session_to_row(session))
            .await
    }

    pub async fn find_session_by_id(&self, session_id: &str) -> PortResult<StoredSession> {
        let wanted = session_id.trim();
        let rows = self.store.read_rows(Tab::Sessions).await?;
        let (index, row) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| cell(row, col::SESSION_ID) == wanted)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", wanted)))?;
        stored(index, row)
    }

    pub async fn update_cell(&self, row: usize, column: usize, value: String) -> PortResult<()> {
        self.store.update_cell(Tab::Sessions, row, column, value).await
    }

    pub async fn update_range(
        &self,
        row: usize,
        start_column: usize,
        end_column: usize,
        values: Vec<String>,
    ) -> PortResult<()> {
        self.store
            .update_range(Tab::Sessions, row, start_column, end_column, values)
            .await
    }

    /// Writes the mutable tail of a session (Status through EndTime) as one
    /// conditional range write, guarded on the status the transition was computed
    /// from. Identity columns are never rewritten.
    pub async fn apply_transition(
        &self,
        current: &StoredSession,
        next: &Session,
    ) -> PortResult<()> {
        if next.id != current.session.id {
            return Err(PortError::InvalidData(format!(
                "session id cannot change ({} -> {})",
                current.session.id, next.id
            )));
        }
        if !current.session.status.can_advance_to(next.status) {
            return Err(PortError::InvalidData(format!(
                "session {} cannot move from {} to {}",
                next.id, current.session.status, next.status
            )));
        }
        let tail = session_to_row(next).split_off(col::STATUS);
        let guard = CellGuard {
            column: col::STATUS,
            expected: current.status_cell.clone(),
        };
        self.store
            .compare_and_update_range(
                Tab::Sessions,
                current.row,
                guard,
                col::STATUS,
                col::END_TIME,
                tail,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTabularStore;

    fn sample(id: &str) -> Session {
        Session {
            id: id.to_string(),
            teacher_name: "Ada".into(),
            student_name: "Bob Smith".into(),
            subject: "Math".into(),
            scheduled_time: "2026-10-20 16:00".into(),
            meeting_link: "https://meet.example.com/abc".into(),
            status: SessionStatus::Scheduled,
            attendance_code: "123456".into(),
            teacher_join_time: None,
            student_join_time: None,
            end_time: None,
        }
    }

    fn adapter() -> (Arc<InMemoryTabularStore>, SessionStore) {
        let memory = Arc::new(InMemoryTabularStore::new());
        (memory.clone(), SessionStore::new(memory))
    }

    #[tokio::test]
    async fn appended_session_is_found_by_id() {
        let (_, sessions) = adapter();
        sessions.append_session(&sample("s-1")).await.unwrap();
        sessions.append_session(&sample("s-2")).await.unwrap();

        let found = sessions.find_session_by_id("s-2").await.unwrap();
        assert_eq!(found.row, 1);
        assert_eq!(found.session, sample("s-2"));
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let (_, sessions) = adapter();
        let err = sessions.find_session_by_id("nope").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreadable_rows_are_skipped_when_listing() {
        let (memory, sessions) = adapter();
        sessions.append_session(&sample("s-1")).await.unwrap();
        memory
            .append_row(Tab::Sessions, vec!["s-bad".into(), "x".into()])
            .await
            .unwrap();

        let listed = sessions.list_sessions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].session.id, "s-1");
    }

    #[tokio::test]
    async fn transition_writes_status_and_timestamps_together() {
        let (memory, sessions) = adapter();
        sessions.append_session(&sample("s-1")).await.unwrap();
        let current = sessions.find_session_by_id("s-1").await.unwrap();

        let mut next = current.session.clone();
        next.status = SessionStatus::Completed;
        next.end_time = Some("2026-10-20 17:00:00".into());
        sessions.apply_transition(&current, &next).await.unwrap();

        let row = &memory.read_rows(Tab::Sessions).await.unwrap()[0];
        assert_eq!(row[col::STATUS], "Completed");
        assert_eq!(row[col::END_TIME], "2026-10-20 17:00:00");
        assert_eq!(row[col::ATTENDANCE_CODE], "123456");
    }

    #[tokio::test]
    async fn stale_transition_is_rejected() {
        let (_, sessions) = adapter();
        sessions.append_session(&sample("s-1")).await.unwrap();
        let stale = sessions.find_session_by_id("s-1").await.unwrap();

        sessions
            .update_cell(stale.row, col::STATUS, "Completed".into())
            .await
            .unwrap();

        let mut next = stale.session.clone();
        next.status = SessionStatus::InProgress;
        let err = sessions.apply_transition(&stale, &next).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn transition_accepts_status_typed_in_another_spelling() {
        let (memory, sessions) = adapter();
        let mut row = session_to_row(&sample("s-1"));
        row[col::STATUS] = "scheduled ".into();
        memory.append_row(Tab::Sessions, row).await.unwrap();

        let current = sessions.find_session_by_id("s-1").await.unwrap();
        assert_eq!(current.session.status, SessionStatus::Scheduled);
        assert_eq!(current.status_cell, "scheduled ");

        let mut next = current.session.clone();
        next.status = SessionStatus::InProgress;
        sessions.apply_transition(&current, &next).await.unwrap();

        let listed = sessions.list_sessions().await.unwrap();
        assert_eq!(listed[0].session.status, SessionStatus::InProgress);
        assert_eq!(listed[0].status_cell, "In-Progress");
    }

    #[tokio::test]
    async fn range_update_rewrites_only_the_given_columns() {
        let (memory, sessions) = adapter();
        sessions.append_session(&sample("s-1")).await.unwrap();

        sessions
            .update_range(
                0,
                col::SCHEDULED_TIME,
                col::MEETING_LINK,
                vec!["2026-10-21 09:00".into(), "https://meet.example.com/new".into()],
            )
            .await
            .unwrap();

        let row = &memory.read_rows(Tab::Sessions).await.unwrap()[0];
        assert_eq!(row[col::SCHEDULED_TIME], "2026-10-21 09:00");
        assert_eq!(row[col::MEETING_LINK], "https://meet.example.com/new");
        assert_eq!(row[col::SUBJECT], "Math");
        assert_eq!(row[col::STATUS], "Scheduled");

        let err = sessions
            .update_range(5, col::SUBJECT, col::SUBJECT, vec!["Physics".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn backwards_transition_is_refused() {
        let (_, sessions) = adapter();
        let mut done = sample("s-1");
        done.status = SessionStatus::Completed;
        sessions.append_session(&done).await.unwrap();
        let current = sessions.find_session_by_id("s-1").await.unwrap();

        let mut next = current.session.clone();
        next.status = SessionStatus::InProgress;
        let err = sessions.apply_transition(&current, &next).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidData(_)));
    }
}
