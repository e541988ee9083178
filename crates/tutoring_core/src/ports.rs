//! crates/tutoring_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the back-office core.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete spreadsheet store and mail transport.

use async_trait::async_trait;

use crate::domain::Tab;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (store, mail relay).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Transport-level failure: the backing service could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A conditional write found the guarded cell changed underneath it.
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Precondition for [`TabularStore::compare_and_update_range`]: the cell at
/// `column` of the target row must still hold `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellGuard {
    pub column: usize,
    pub expected: String,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// A row-oriented store of text cells, one table per [`Tab`].
///
/// Rows are addressed by their zero-based position among the data rows of a tab
/// (the header is not counted). Rows are never deleted, so a position stays valid
/// once observed. Writes are visible to the next read; there is no caching layer.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Returns every data row of `tab` in insertion order.
    async fn read_rows(&self, tab: Tab) -> PortResult<Vec<Vec<String>>>;

    async fn append_row(&self, tab: Tab, row: Vec<String>) -> PortResult<()>;

    async fn update_cell(&self, tab: Tab, row: usize, column: usize, value: String)
        -> PortResult<()>;

    /// Overwrites columns `start_column..=end_column` of one row.
    async fn update_range(
        &self,
        tab: Tab,
        row: usize,
        start_column: usize,
        end_column: usize,
        values: Vec<String>,
    ) -> PortResult<()>;

    /// Like [`TabularStore::update_range`], applied as a single write and only if
    /// `guard` still holds. Fails with [`PortError::Conflict`] otherwise.
    async fn compare_and_update_range(
        &self,
        tab: Tab,
        row: usize,
        guard: CellGuard,
        start_column: usize,
        end_column: usize,
        values: Vec<String>,
    ) -> PortResult<()>;
}

/// Outbound notification sink (email).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_email(&self, recipient: &str, subject: &str, body: &str) -> PortResult<()>;
}

/// Shared validation for range writes, used by every `TabularStore` implementation.
pub fn check_range(
    tab: Tab,
    start_column: usize,
    end_column: usize,
    values: &[String],
) -> PortResult<()> {
    if start_column > end_column || end_column >= tab.width() {
        return Err(PortError::InvalidData(format!(
            "columns {}..={} are outside the {} tab",
            start_column, end_column, tab
        )));
    }
    let expected = end_column - start_column + 1;
    if values.len() != expected {
        return Err(PortError::InvalidData(format!(
            "range {}..={} of {} needs {} values, got {}",
            start_column,
            end_column,
            tab,
            expected,
            values.len()
        )));
    }
    Ok(())
}
