//! crates/tutoring_core/src/roster.rs
//!
//! Student and teacher registration, contact lookup and the dashboard views over
//! the Students roster.

use std::sync::Arc;
use tracing::info;

use crate::domain::{
    cell, student_columns as scol, teacher_columns as tcol, Role, StudentRecord, Tab,
    TeacherRecord,
};
use crate::error::{DomainError, DomainResult};
use crate::ports::TabularStore;

/// Students whose attendance is below this percentage are flagged.
pub const LOW_ATTENDANCE_THRESHOLD: i64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub class_times: String,
    pub subjects: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub expertise: String,
    pub assigned_students: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudentSummary {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    pub overdue: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionItems {
    pub overdue_payments: Vec<StudentRecord>,
    pub low_attendance: Vec<StudentRecord>,
}

#[derive(Clone)]
pub struct Roster {
    store: Arc<dyn TabularStore>,
}

//=========================================================================================
// Row Mapping
//=========================================================================================

fn student_from_row(row: &[String]) -> StudentRecord {
    StudentRecord {
        name: cell(row, scol::NAME),
        payment_status: cell(row, scol::PAYMENT_STATUS),
        academic_progress: cell(row, scol::ACADEMIC_PROGRESS),
        attendance: cell(row, scol::ATTENDANCE),
        last_class_date: cell(row, scol::LAST_CLASS_DATE),
        email: cell(row, scol::EMAIL),
        phone: cell(row, scol::PHONE),
        class_times: cell(row, scol::CLASS_TIMES),
        subjects: cell(row, scol::SUBJECTS),
    }
}

fn teacher_from_row(row: &[String]) -> TeacherRecord {
    TeacherRecord {
        name: cell(row, tcol::NAME),
        email: cell(row, tcol::EMAIL),
        phone: cell(row, tcol::PHONE),
        expertise: cell(row, tcol::EXPERTISE),
        assigned_students: cell(row, tcol::ASSIGNED_STUDENTS),
    }
}

/// Roster names are matched trimmed and case-insensitively.
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Reads `"90%"` as 90. Anything unparsable counts as 0.
pub fn parse_attendance(value: &str) -> i64 {
    value.trim().replace('%', "").trim().parse().unwrap_or(0)
}

fn required_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("Name is required".to_string()));
    }
    Ok(name.to_string())
}

//=========================================================================================
// Roster Operations
//=========================================================================================

impl Roster {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    /// Adds a student with the defaults of a fresh registration: payment pending,
    /// no progress, no attendance yet.
    pub async fn register_student(&self, student: &NewStudent) -> DomainResult<StudentRecord> {
        let record = StudentRecord {
            name: required_name(&student.name)?,
            payment_status: "Pending".to_string(),
            academic_progress: "0".to_string(),
            attendance: "0%".to_string(),
            last_class_date: String::new(),
            email: student.email.trim().to_string(),
            phone: student.phone.trim().to_string(),
            class_times: student.class_times.trim().to_string(),
            subjects: student.subjects.trim().to_string(),
        };
        self.store
            .append_row(
                Tab::Students,
                vec![
                    record.name.clone(),
                    record.payment_status.clone(),
                    record.academic_progress.clone(),
                    record.attendance.clone(),
                    record.last_class_date.clone(),
                    record.email.clone(),
                    record.phone.clone(),
                    record.class_times.clone(),
                    record.subjects.clone(),
                ],
            )
            .await?;
        info!(student = %record.name, "Student registered");
        Ok(record)
    }

    pub async fn register_teacher(&self, teacher: &NewTeacher) -> DomainResult<TeacherRecord> {
        let record = TeacherRecord {
            name: required_name(&teacher.name)?,
            email: teacher.email.trim().to_string(),
            phone: teacher.phone.trim().to_string(),
            expertise: teacher.expertise.trim().to_string(),
            assigned_students: teacher.assigned_students.trim().to_string(),
        };
        self.store
            .append_row(
                Tab::Teachers,
                vec![
                    record.name.clone(),
                    record.email.clone(),
                    record.phone.clone(),
                    record.expertise.clone(),
                    record.assigned_students.clone(),
                ],
            )
            .await?;
        info!(teacher = %record.name, "Teacher registered");
        Ok(record)
    }

    /// Students whose name contains `search` (case-insensitive), or all of them.
    pub async fn list_students(&self, search: Option<&str>) -> DomainResult<Vec<StudentRecord>> {
        let rows = self.store.read_rows(Tab::Students).await?;
        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        Ok(rows
            .iter()
            .map(|row| student_from_row(row))
            .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn list_teachers(&self) -> DomainResult<Vec<TeacherRecord>> {
        let rows = self.store.read_rows(Tab::Teachers).await?;
        Ok(rows.iter().map(|row| teacher_from_row(row)).collect())
    }

    pub async fn find_student(&self, name: &str) -> DomainResult<Option<StudentRecord>> {
        Ok(self
            .list_students(None)
            .await?
            .into_iter()
            .find(|s| same_name(&s.name, name)))
    }

    pub async fn find_teacher(&self, name: &str) -> DomainResult<Option<TeacherRecord>> {
        Ok(self
            .list_teachers()
            .await?
            .into_iter()
            .find(|t| same_name(&t.name, name)))
    }

    /// The email on file for `name` in the roster of `role`. An empty cell counts
    /// as no email.
    pub async fn find_email(&self, role: Role, name: &str) -> DomainResult<Option<String>> {
        let email = match role {
            Role::Teacher => self.find_teacher(name).await?.map(|t| t.email),
            Role::Student => self.find_student(name).await?.map(|s| s.email),
        };
        Ok(email.filter(|e| !e.is_empty()))
    }

    pub async fn student_summary(&self, search: Option<&str>) -> DomainResult<StudentSummary> {
        let students = self.list_students(search).await?;
        let count = |status: &str| {
            students
                .iter()
                .filter(|s| s.payment_status.eq_ignore_ascii_case(status))
                .count()
        };
        Ok(StudentSummary {
            total: students.len(),
            paid: count("Paid"),
            pending: count("Pending"),
            overdue: count("Overdue"),
        })
    }

    pub async fn action_items(&self) -> DomainResult<ActionItems> {
        let students = self.list_students(None).await?;
        let overdue_payments = students
            .iter()
            .filter(|s| s.payment_status.eq_ignore_ascii_case("Overdue"))
            .cloned()
            .collect();
        let low_attendance = students
            .into_iter()
            .filter(|s| parse_attendance(&s.attendance) < LOW_ATTENDANCE_THRESHOLD)
            .collect();
        Ok(ActionItems {
            overdue_payments,
            low_attendance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTabularStore;

    fn student(name: &str, email: &str) -> NewStudent {
        NewStudent {
            name: name.into(),
            email: email.into(),
            class_times: "Monday (04:00 PM - 05:00 PM)".into(),
            subjects: "Math".into(),
            ..NewStudent::default()
        }
    }

    async fn seeded() -> (Arc<InMemoryTabularStore>, Roster) {
        let memory = Arc::new(InMemoryTabularStore::new());
        let roster = Roster::new(memory.clone());
        roster.register_student(&student("Alice Johnson", "alice@x.com")).await.unwrap();
        roster.register_student(&student("Bob Smith", "")).await.unwrap();
        roster
            .register_teacher(&NewTeacher {
                name: "Ada".into(),
                email: "ada@x.com".into(),
                assigned_students: "Alice Johnson, Bob Smith".into(),
                ..NewTeacher::default()
            })
            .await
            .unwrap();
        (memory, roster)
    }

    #[tokio::test]
    async fn registration_applies_defaults() {
        let (memory, _) = seeded().await;
        let rows = memory.read_rows(Tab::Students).await.unwrap();
        assert_eq!(rows[0][scol::PAYMENT_STATUS], "Pending");
        assert_eq!(rows[0][scol::ACADEMIC_PROGRESS], "0");
        assert_eq!(rows[0][scol::ATTENDANCE], "0%");
        assert_eq!(rows[0][scol::LAST_CLASS_DATE], "");
    }

    #[tokio::test]
    async fn registration_requires_a_name() {
        let (_, roster) = seeded().await;
        let err = roster.register_student(&student("  ", "x@x.com")).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn email_lookup_treats_blank_as_missing() {
        let (_, roster) = seeded().await;
        assert_eq!(
            roster.find_email(Role::Teacher, "ada").await.unwrap(),
            Some("ada@x.com".to_string())
        );
        assert_eq!(roster.find_email(Role::Student, "Bob Smith").await.unwrap(), None);
        assert_eq!(roster.find_email(Role::Student, "Nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let (_, roster) = seeded().await;
        let found = roster.list_students(Some("SMITH")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Bob Smith");
    }

    #[tokio::test]
    async fn summary_and_action_items_read_statuses() {
        let (memory, roster) = seeded().await;
        memory
            .update_cell(Tab::Students, 0, scol::PAYMENT_STATUS, "Overdue".into())
            .await
            .unwrap();
        memory
            .update_cell(Tab::Students, 1, scol::ATTENDANCE, "90%".into())
            .await
            .unwrap();

        let summary = roster.student_summary(None).await.unwrap();
        assert_eq!(
            summary,
            StudentSummary {
                total: 2,
                paid: 0,
                pending: 1,
                overdue: 1
            }
        );

        let items = roster.action_items().await.unwrap();
        assert_eq!(items.overdue_payments.len(), 1);
        assert_eq!(items.overdue_payments[0].name, "Alice Johnson");
        assert_eq!(items.low_attendance.len(), 1);
        assert_eq!(items.low_attendance[0].name, "Alice Johnson");
    }

    #[test]
    fn attendance_parsing_defaults_to_zero() {
        assert_eq!(parse_attendance("90%"), 90);
        assert_eq!(parse_attendance(" 45 "), 45);
        assert_eq!(parse_attendance("n/a"), 0);
        assert_eq!(parse_attendance(""), 0);
    }
}
