//! Database connection contract and the in-memory implementation used by
//! tests.
//!
//! Repositories depend only on the [`Connection`] and [`PreparedQuery`]
//! traits; any driver that can prepare a parameterized statement and return
//! name-keyed rows can sit behind them.

mod memory;

pub use memory::*;

use indexmap::IndexMap;

use crate::common::Value;
use crate::errors::OrmResult;

/// One result row: column name to value, preserving select order.
pub type Row = IndexMap<String, Value>;

/// Minimal driver contract the mapping layer is written against.
///
/// # Characteristics
/// - all SQL travels with positional `?` placeholders and a bound argument
///   list, never with inlined values
/// - structured writes (`insert`/`update`/`delete`) exist so drivers can
///   use native facilities instead of rendered SQL
pub trait Connection: Send + Sync + 'static {
    /// Prepares a parameterized statement for fetching.
    fn prepare(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn PreparedQuery>>;

    /// Inserts one row, returning the generated key when the driver
    /// produced one.
    fn insert(&self, table: &str, data: &Row) -> OrmResult<Option<i64>>;

    /// Updates rows matching the equality criteria, returning the affected
    /// row count.
    fn update(&self, table: &str, data: &Row, criteria: &Row) -> OrmResult<u64>;

    /// Deletes rows matching the equality criteria, returning the affected
    /// row count.
    fn delete(&self, table: &str, criteria: &Row) -> OrmResult<u64>;

    /// The most recent generated key, if any.
    fn last_insert_id(&self) -> Option<i64>;
}

/// A prepared, executable fetch.
pub trait PreparedQuery {
    /// Fetches the next row, `None` once exhausted.
    fn fetch(&mut self) -> OrmResult<Option<Row>>;

    /// Fetches all remaining rows.
    fn fetch_all(&mut self) -> OrmResult<Vec<Row>>;

    /// Fetches the first column of every remaining row.
    fn fetch_first_column(&mut self) -> OrmResult<Vec<Value>>;

    /// Fetches a single scalar: first column of the next row.
    fn fetch_one(&mut self) -> OrmResult<Option<Value>>;
}
