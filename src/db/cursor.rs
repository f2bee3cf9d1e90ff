//! Forward-only result cursors.
//!
//! A [`RowCursor`] is what a query hands back: the column names, a way to
//! step to the next row, per-column reads of the current row, and an explicit
//! close. The scanner only talks to this trait, so driver cursors and the
//! in-memory [`MemoryCursor`] are interchangeable.

use crate::db::value::Value;
use crate::error::{DbError, DbResult};

/// A forward-only cursor over query result rows.
pub trait RowCursor {
    /// Column names of the result set, in result order.
    fn columns(&self) -> DbResult<Vec<String>>;

    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> DbResult<bool>;

    /// Read column `index` of the current row.
    fn value(&self, index: usize) -> DbResult<Value>;

    /// Release the rows. Further advances return `false`.
    fn close(&mut self);
}

/// A cursor over rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    current: Option<usize>,
    advances: usize,
    closed: bool,
}

impl MemoryCursor {
    /// Create a cursor with the given column names and no rows.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a row.
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Append several rows.
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Number of `advance` calls made so far.
    pub fn advances(&self) -> usize {
        self.advances
    }

    /// Check if `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drop every row past the first `max_rows`.
    pub fn limit(mut self, max_rows: usize) -> Self {
        self.rows.truncate(max_rows);
        self
    }
}

impl RowCursor for MemoryCursor {
    fn columns(&self) -> DbResult<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> DbResult<bool> {
        self.advances += 1;
        if self.closed {
            return Ok(false);
        }

        let next = self.current.map_or(0, |i| i + 1);
        if next < self.rows.len() {
            self.current = Some(next);
            Ok(true)
        } else {
            self.current = Some(self.rows.len());
            Ok(false)
        }
    }

    fn value(&self, index: usize) -> DbResult<Value> {
        let column = self
            .columns
            .get(index)
            .map(String::as_str)
            .unwrap_or("?");
        let row = self
            .current
            .and_then(|i| self.rows.get(i))
            .ok_or_else(|| DbError::scan(column, "no current row"))?;

        row.get(index)
            .cloned()
            .ok_or_else(|| DbError::scan(column, format!("row has no value at index {}", index)))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
