//! Embedded SQLite engine.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params, Batch, Connection};
use tracing::{debug, info};

use crate::engine::config::IN_MEMORY_DATABASE;
use crate::engine::{ResultSet, SqlEngine};
use crate::error::{PlaygroundError, Result};

/// A SQLite database owned by one playground.
///
/// The connection is driven from blocking tasks; the controller never issues
/// two statements at once, so the mutex is uncontended in practice.
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngine {
    /// Open the database identified by `locator` (`:memory:` for a private one).
    pub async fn open(locator: &str) -> Result<Self> {
        let locator = locator.to_string();
        let conn = tokio::task::spawn_blocking(move || {
            if locator.is_empty() || locator == IN_MEMORY_DATABASE {
                Connection::open_in_memory()
            } else {
                Connection::open(&locator)
            }
        })
        .await
        .map_err(|e| PlaygroundError::Worker(format!("database open panicked: {}", e)))?
        .map_err(|e| PlaygroundError::EngineLoad(format!("failed to open database: {}", e)))?;

        info!("SQLite engine ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| PlaygroundError::Worker("database connection poisoned".to_string()))?;
            work(&conn)
        })
        .await
        .map_err(|e| PlaygroundError::Worker(format!("statement task panicked: {}", e)))?
    }
}

#[async_trait]
impl SqlEngine for SqliteEngine {
    async fn execute_script(&self, script: &str) -> Result<()> {
        let script = script.to_string();
        self.with_connection(move |conn| {
            conn.execute_batch(&script)?;
            Ok(())
        })
        .await
    }

    async fn execute(&self, statement: &str) -> Result<Vec<ResultSet>> {
        let statement = statement.to_string();
        self.with_connection(move |conn| execute_statement(conn, &statement))
            .await
    }
}

/// Run one statement; statements that declare columns yield one result set.
///
/// Text holding only comments or whitespace prepares to no statement at all
/// and succeeds without touching the database.
fn execute_statement(conn: &Connection, statement: &str) -> Result<Vec<ResultSet>> {
    let mut batch = Batch::new(conn, statement);
    let Some(mut stmt) = batch.next()? else {
        debug!("nothing to execute");
        return Ok(Vec::new());
    };
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    if columns.is_empty() {
        let changed = stmt.execute(params![])?;
        debug!(changed, "statement executed");
        return Ok(Vec::new());
    }

    let mut rows = stmt.query(params![])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let mut rendered = Vec::with_capacity(columns.len());
        for index in 0..columns.len() {
            rendered.push(display_value(row.get_ref(index)?));
        }
        values.push(rendered);
    }

    debug!(rows = values.len(), "query returned");
    Ok(vec![ResultSet {
        columns,
        rows: values,
    }])
}

/// Render a column value the way the output panel shows it.
///
/// NULL renders as an empty cell and blobs as comma-separated bytes.
pub fn display_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(bytes) => bytes
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}
