//! crates/tutoring_core/src/memory.rs
//!
//! An in-process `TabularStore`. Backs "mock mode" when no store is configured
//! and every service test.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::domain::{student_columns as scol, Tab};
use crate::ports::{check_range, CellGuard, PortError, PortResult, TabularStore};

#[derive(Default)]
pub struct InMemoryTabularStore {
    tabs: Mutex<HashMap<Tab, Vec<Vec<String>>>>,
    offline: AtomicBool,
}

impl InMemoryTabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose Students tab holds a small demo roster, so the dashboard
    /// views have something to show in mock mode.
    pub fn with_demo_roster() -> Self {
        let demo = [
            ("Alice Johnson", "Paid", "75", "90%"),
            ("Bob Smith", "Pending", "40", "60%"),
            ("Charlie Brown", "Overdue", "10", "20%"),
            ("Diana Prince", "Paid", "95", "100%"),
        ];
        let students = demo
            .iter()
            .map(|(name, payment, progress, attendance)| {
                let mut row = vec![String::new(); Tab::Students.width()];
                row[scol::NAME] = name.to_string();
                row[scol::PAYMENT_STATUS] = payment.to_string();
                row[scol::ACADEMIC_PROGRESS] = progress.to_string();
                row[scol::ATTENDANCE] = attendance.to_string();
                row
            })
            .collect();
        Self {
            tabs: Mutex::new(HashMap::from([(Tab::Students, students)])),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulates a transport failure: every call fails with `Unavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, HashMap<Tab, Vec<Vec<String>>>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PortError::Unavailable("in-memory store is offline".to_string()));
        }
        self.tabs
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

fn row_mut<'a>(
    tabs: &'a mut HashMap<Tab, Vec<Vec<String>>>,
    tab: Tab,
    row: usize,
) -> PortResult<&'a mut Vec<String>> {
    tabs.get_mut(&tab)
        .and_then(|rows| rows.get_mut(row))
        .ok_or_else(|| PortError::NotFound(format!("row {} of {}", row, tab)))
}

fn pad(row: &mut Vec<String>, width: usize) {
    if row.len() < width {
        row.resize(width, String::new());
    }
}

#[async_trait]
impl TabularStore for InMemoryTabularStore {
    async fn read_rows(&self, tab: Tab) -> PortResult<Vec<Vec<String>>> {
        let tabs = self.lock()?;
        Ok(tabs.get(&tab).cloned().unwrap_or_default())
    }

    async fn append_row(&self, tab: Tab, mut row: Vec<String>) -> PortResult<()> {
        let mut tabs = self.lock()?;
        pad(&mut row, tab.width());
        tabs.entry(tab).or_default().push(row);
        Ok(())
    }

    async fn update_cell(
        &self,
        tab: Tab,
        row: usize,
        column: usize,
        value: String,
    ) -> PortResult<()> {
        check_range(tab, column, column, std::slice::from_ref(&value))?;
        let mut tabs = self.lock()?;
        let cells = row_mut(&mut tabs, tab, row)?;
        pad(cells, tab.width());
        cells[column] = value;
        Ok(())
    }

    async fn update_range(
        &self,
        tab: Tab,
        row: usize,
        start_column: usize,
        end_column: usize,
        values: Vec<String>,
    ) -> PortResult<()> {
        check_range(tab, start_column, end_column, &values)?;
        let mut tabs = self.lock()?;
        let cells = row_mut(&mut tabs, tab, row)?;
        pad(cells, tab.width());
        for (offset, value) in values.into_iter().enumerate() {
            cells[start_column + offset] = value;
        }
        Ok(())
    }

    async fn compare_and_update_range(
        &self,
        tab: Tab,
        row: usize,
        guard: CellGuard,
        start_column: usize,
        end_column: usize,
        values: Vec<String>,
    ) -> PortResult<()> {
        check_range(tab, start_column, end_column, &values)?;
        let mut tabs = self.lock()?;
        let cells = row_mut(&mut tabs, tab, row)?;
        pad(cells, tab.width());
        let current = cells.get(guard.column).map(String::as_str).unwrap_or_default();
        if current != guard.expected {
            return Err(PortError::Conflict(format!(
                "row {} of {} column {} is '{}', expected '{}'",
                row, tab, guard.column, current, guard.expected
            )));
        }
        for (offset, value) in values.into_iter().enumerate() {
            cells[start_column + offset] = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;
    use std::sync::Arc;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn appended_rows_are_padded_to_tab_width() {
        let store = InMemoryTabularStore::new();
        store.append_row(Tab::Reviews, row(&["t", "Ada"])).await.unwrap();
        let rows = store.read_rows(Tab::Reviews).await.unwrap();
        assert_eq!(rows, vec![row(&["t", "Ada", "", ""])]);
    }

    #[tokio::test]
    async fn range_update_rejects_wrong_value_count() {
        let store = InMemoryTabularStore::new();
        store.append_row(Tab::Reviews, row(&["t", "Ada", "Bob", "n"])).await.unwrap();
        let err = store
            .update_range(Tab::Reviews, 0, 1, 2, row(&["only one"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidData(_)));
    }

    #[tokio::test]
    async fn guarded_update_detects_concurrent_change() {
        let store = InMemoryTabularStore::new();
        store.append_row(Tab::Reviews, row(&["t", "Ada", "Bob", "n"])).await.unwrap();
        let guard = CellGuard {
            column: 1,
            expected: "Grace".to_string(),
        };
        let err = store
            .compare_and_update_range(Tab::Reviews, 0, guard, 3, 3, row(&["changed"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
        assert_eq!(store.read_rows(Tab::Reviews).await.unwrap()[0][3], "n");
    }

    #[tokio::test]
    async fn demo_roster_feeds_the_dashboard_views() {
        let store = Arc::new(InMemoryTabularStore::with_demo_roster());
        let roster = Roster::new(store.clone());

        let summary = roster.student_summary(None).await.unwrap();
        assert_eq!((summary.total, summary.paid, summary.pending, summary.overdue), (4, 2, 1, 1));

        let items = roster.action_items().await.unwrap();
        assert_eq!(items.overdue_payments[0].name, "Charlie Brown");
        assert_eq!(items.low_attendance.len(), 1);
        assert!(store.read_rows(Tab::Sessions).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = InMemoryTabularStore::new();
        store.set_offline(true);
        let err = store.read_rows(Tab::Sessions).await.unwrap_err();
        assert!(matches!(err, PortError::Unavailable(_)));
    }
}
