use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::Value;
use crate::connection::{Connection, PreparedQuery, Row};
use crate::errors::{ErrorKind, OrmError, OrmResult};

/// Record of one statement the connection executed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Prepared { sql: String, args: Vec<Value> },
    Insert { table: String, data: Row },
    Update { table: String, data: Row, criteria: Row },
    Delete { table: String, criteria: Row },
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    scripted: VecDeque<Vec<Row>>,
    statements: Vec<Statement>,
    next_id: i64,
    last_insert_id: Option<i64>,
    fail_with: Option<String>,
}

/// In-memory [`Connection`] for tests and examples.
///
/// # Behavior
/// Structured writes operate on real per-table row storage with generated
/// integer keys. Prepared fetches do not parse SQL; they pop pre-scripted
/// result sets pushed with [`MemoryConnection::push_result`] (an empty set
/// when none is scripted) and log the statement so tests can assert on the
/// exact SQL and argument order.
#[derive(Debug, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        MemoryConnection::default()
    }

    /// Scripts the result set for the next prepared fetch.
    pub fn push_result(&self, rows: Vec<Row>) {
        self.state.lock().scripted.push_back(rows);
    }

    /// Everything executed so far, in execution order.
    pub fn statements(&self) -> Vec<Statement> {
        self.state.lock().statements.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().statements.clear();
    }

    /// Makes every subsequent operation fail with a driver error carrying
    /// `message`, until called with `None`.
    pub fn inject_failure(&self, message: Option<&str>) {
        self.state.lock().fail_with = message.map(|m| m.to_string());
    }

    /// Rows currently stored for `table` by structured writes.
    pub fn table_rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_failure(state: &MemoryState) -> OrmResult<()> {
        if let Some(message) = &state.fail_with {
            return Err(OrmError::new(message.clone(), ErrorKind::DriverError));
        }
        Ok(())
    }

    fn matches(row: &Row, criteria: &Row) -> bool {
        criteria
            .iter()
            .all(|(key, value)| row.get(key) == Some(value))
    }
}

impl Connection for MemoryConnection {
    fn prepare(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn PreparedQuery>> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;

        log::debug!("prepare: {} {:?}", sql, args);
        state.statements.push(Statement::Prepared {
            sql: sql.to_string(),
            args: args.to_vec(),
        });

        let rows = state.scripted.pop_front().unwrap_or_default();
        Ok(Box::new(MemoryQuery {
            rows: rows.into(),
        }))
    }

    fn insert(&self, table: &str, data: &Row) -> OrmResult<Option<i64>> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;

        state.next_id += 1;
        let id = state.next_id;
        state.last_insert_id = Some(id);

        state.statements.push(Statement::Insert {
            table: table.to_string(),
            data: data.clone(),
        });
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(data.clone());

        Ok(Some(id))
    }

    fn update(&self, table: &str, data: &Row, criteria: &Row) -> OrmResult<u64> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;

        state.statements.push(Statement::Update {
            table: table.to_string(),
            data: data.clone(),
            criteria: criteria.clone(),
        });

        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if Self::matches(row, criteria) {
                    for (key, value) in data {
                        row.insert(key.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    fn delete(&self, table: &str, criteria: &Row) -> OrmResult<u64> {
        let mut state = self.state.lock();
        Self::check_failure(&state)?;

        state.statements.push(Statement::Delete {
            table: table.to_string(),
            criteria: criteria.clone(),
        });

        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|row| !Self::matches(row, criteria));
            affected = (before - rows.len()) as u64;
        }
        Ok(affected)
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.state.lock().last_insert_id
    }
}

struct MemoryQuery {
    rows: VecDeque<Row>,
}

impl PreparedQuery for MemoryQuery {
    fn fetch(&mut self) -> OrmResult<Option<Row>> {
        Ok(self.rows.pop_front())
    }

    fn fetch_all(&mut self) -> OrmResult<Vec<Row>> {
        Ok(self.rows.drain(..).collect())
    }

    fn fetch_first_column(&mut self) -> OrmResult<Vec<Value>> {
        Ok(self
            .rows
            .drain(..)
            .map(|row| row.into_iter().next().map(|(_, v)| v).unwrap_or(Value::Null))
            .collect())
    }

    fn fetch_one(&mut self) -> OrmResult<Option<Value>> {
        Ok(self
            .rows
            .pop_front()
            .and_then(|row| row.into_iter().next().map(|(_, v)| v)))
    }
}
