//! services/api/src/adapters/sheets.rs
//!
//! This module contains the store adapter, the concrete implementation of the
//! `TabularStore` port from the `core` crate. Each tab is kept in PostgreSQL as
//! ordered rows of text cells using `sqlx`.

use async_trait::async_trait;
use sqlx::PgPool;
use tutoring_core::domain::Tab;
use tutoring_core::ports::{check_range, CellGuard, PortError, PortResult, TabularStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A PostgreSQL-backed adapter that implements the `TabularStore` port.
#[derive(Clone)]
pub struct SheetStoreAdapter {
    pool: PgPool,
}

impl SheetStoreAdapter {
    /// Creates a new `SheetStoreAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn row_exists(&self, tab: Tab, row: i32) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sheet_rows WHERE tab = $1 AND row_index = $2)",
        )
        .bind(tab.name())
        .bind(row)
        .fetch_one(&self.pool)
        .await
        .map_err(port_error)
    }
}

//=========================================================================================
// Error and Index Mapping
//=========================================================================================

/// Connection-level failures mean the store is unavailable; everything else is
/// unexpected.
fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(e.to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => PortError::Unavailable(e.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn to_i32(value: usize, what: &str) -> PortResult<i32> {
    i32::try_from(value).map_err(|_| PortError::InvalidData(format!("{} {} is out of range", what, value)))
}

/// Postgres arrays are 1-based.
fn pg_column(column: usize) -> PortResult<i32> {
    to_i32(column + 1, "column")
}

fn padded(tab: Tab, mut row: Vec<String>) -> Vec<String> {
    if row.len() < tab.width() {
        row.resize(tab.width(), String::new());
    }
    row
}

//=========================================================================================
// `TabularStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl TabularStore for SheetStoreAdapter {
    async fn read_rows(&self, tab: Tab) -> PortResult<Vec<Vec<String>>> {
        sqlx::query_scalar::<_, Vec<String>>(
            "SELECT cells FROM sheet_rows WHERE tab = $1 ORDER BY row_index ASC",
        )
        .bind(tab.name())
        .fetch_all(&self.pool)
        .await
        .map_err(port_error)
    }

    async fn append_row(&self, tab: Tab, row: Vec<String>) -> PortResult<()> {
        // Row indices must stay dense, so appends to one tab are serialised.
        let mut tx = self.pool.begin().await.map_err(port_error)?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(tab.name())
            .execute(&mut *tx)
            .await
            .map_err(port_error)?;
        sqlx::query(
            "INSERT INTO sheet_rows (tab, row_index, cells)
             SELECT $1, COALESCE(MAX(row_index) + 1, 0), $2 FROM sheet_rows WHERE tab = $1",
        )
        .bind(tab.name())
        .bind(padded(tab, row))
        .execute(&mut *tx)
        .await
        .map_err(port_error)?;
        tx.commit().await.map_err(port_error)?;
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
        let result = sqlx::query(
            "UPDATE sheet_rows SET cells[$3] = $4, updated_at = now()
             WHERE tab = $1 AND row_index = $2",
        )
        .bind(tab.name())
        .bind(to_i32(row, "row")?)
        .bind(pg_column(column)?)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("row {} of {}", row, tab)));
        }
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
        let result = sqlx::query(
            "UPDATE sheet_rows SET cells[$3:$4] = $5, updated_at = now()
             WHERE tab = $1 AND row_index = $2",
        )
        .bind(tab.name())
        .bind(to_i32(row, "row")?)
        .bind(pg_column(start_column)?)
        .bind(pg_column(end_column)?)
        .bind(values)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("row {} of {}", row, tab)));
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
        let row_index = to_i32(row, "row")?;
        let result = sqlx::query(
            "UPDATE sheet_rows SET cells[$3:$4] = $5, updated_at = now()
             WHERE tab = $1 AND row_index = $2 AND cells[$6] IS NOT DISTINCT FROM $7",
        )
        .bind(tab.name())
        .bind(row_index)
        .bind(pg_column(start_column)?)
        .bind(pg_column(end_column)?)
        .bind(values)
        .bind(pg_column(guard.column)?)
        .bind(&guard.expected)
        .execute(&self.pool)
        .await
        .map_err(port_error)?;
        if result.rows_affected() > 0 {
            return Ok(());
        }
        if self.row_exists(tab, row_index).await? {
            Err(PortError::Conflict(format!(
                "row {} of {} no longer holds '{}' in column {}",
                row, tab, guard.expected, guard.column
            )))
        } else {
            Err(PortError::NotFound(format!("row {} of {}", row, tab)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_are_shifted_to_one_based() {
        assert_eq!(pg_column(0).unwrap(), 1);
        assert_eq!(pg_column(10).unwrap(), 11);
    }

    #[test]
    fn short_rows_are_padded_to_the_tab_width() {
        let row = padded(Tab::Reviews, vec!["2026-10-01 10:00:00".to_string()]);
        assert_eq!(row.len(), Tab::Reviews.width());
        assert_eq!(row[3], "");
    }

    #[test]
    fn connection_failures_map_to_unavailable() {
        assert!(matches!(port_error(sqlx::Error::PoolTimedOut), PortError::Unavailable(_)));
        assert!(matches!(port_error(sqlx::Error::RowNotFound), PortError::NotFound(_)));
    }
}
