//! crates/tutoring_core/src/reviews.rs
//!
//! The append-only Reviews log: proof that a class took place.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::{cell, review_columns as col, ReviewRecord, Tab, TIMESTAMP_FORMAT};
use crate::error::{DomainError, DomainResult};
use crate::ports::{PortResult, TabularStore};

#[derive(Clone)]
pub struct ReviewLog {
    store: Arc<dyn TabularStore>,
}

fn review_from_row(row: &[String]) -> ReviewRecord {
    ReviewRecord {
        timestamp: cell(row, col::TIMESTAMP),
        teacher_name: cell(row, col::TEACHER_NAME),
        student_name: cell(row, col::STUDENT_NAME),
        note: cell(row, col::NOTE),
    }
}

impl ReviewLog {
    pub fn new(store: Arc<dyn TabularStore>) -> Self {
        Self { store }
    }

    pub async fn append(&self, record: &ReviewRecord) -> PortResult<()> {
        self.store
            .append_row(
                Tab::Reviews,
                vec![
                    record.timestamp.clone(),
                    record.teacher_name.clone(),
                    record.student_name.clone(),
                    record.note.clone(),
                ],
            )
            .await
    }

    pub async fn list_reviews(&self) -> PortResult<Vec<ReviewRecord>> {
        let rows = self.store.read_rows(Tab::Reviews).await?;
        Ok(rows.iter().map(|row| review_from_row(row)).collect())
    }

    /// Manual teacher check-in, independent of any session record.
    pub async fn add_review(
        &self,
        teacher_name: &str,
        student_name: &str,
        note: &str,
    ) -> DomainResult<ReviewRecord> {
        let (teacher_name, student_name, note) =
            (teacher_name.trim(), student_name.trim(), note.trim());
        if teacher_name.is_empty() || student_name.is_empty() || note.is_empty() {
            return Err(DomainError::InvalidInput(
                "teacher name, student name and review are all required".to_string(),
            ));
        }
        let record = ReviewRecord {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            teacher_name: teacher_name.to_string(),
            student_name: student_name.to_string(),
            note: note.to_string(),
        };
        self.append(&record).await?;
        info!(teacher = teacher_name, student = student_name, "Check-in review recorded");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTabularStore;

    #[tokio::test]
    async fn manual_check_in_is_appended() {
        let log = ReviewLog::new(Arc::new(InMemoryTabularStore::new()));
        let record = log.add_review(" Ada ", "Bob Smith", "Covered fractions").await.unwrap();
        assert_eq!(record.teacher_name, "Ada");
        assert_eq!(record.timestamp.len(), "2026-01-01 00:00:00".len());

        let all = log.list_reviews().await.unwrap();
        assert_eq!(all, vec![record]);
    }

    #[tokio::test]
    async fn check_in_requires_every_field() {
        let log = ReviewLog::new(Arc::new(InMemoryTabularStore::new()));
        let err = log.add_review("Ada", "Bob Smith", "  ").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(log.list_reviews().await.unwrap().is_empty());
    }
}
