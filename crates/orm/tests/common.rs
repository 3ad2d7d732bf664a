//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tessera_sql::{Connection, DataType, FutureResult, Row, Sqlite};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber once per test binary. Set `RUST_LOG` to see
/// generated SQL.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh private in-memory database.
pub fn sqlite() -> Arc<dyn Connection> {
    init_tracing();
    Arc::new(Sqlite::in_memory().expect("in-memory database"))
}

/// A connection that records every statement it runs.
#[derive(Debug, Clone)]
pub struct Recorder {
    inner: Sqlite,
    statements: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        init_tracing();
        Self {
            inner: Sqlite::in_memory().expect("in-memory database"),
            statements: Arc::default(),
        }
    }

    /// Every statement run so far.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// CREATE and ALTER statements run so far.
    pub fn ddl(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.starts_with("CREATE") || sql.starts_with("ALTER"))
            .collect()
    }

    /// SELECT statements run so far, excluding schema inspection.
    pub fn selects(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|sql| sql.starts_with("SELECT") && !sql.contains("pragma_table_info"))
            .collect()
    }

    pub fn clear(&self) {
        self.statements.lock().clear();
    }
}

impl Connection for Recorder {
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>> {
        self.statements.lock().push(query.clone());
        self.inner.query(query, params)
    }

    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u32> {
        self.statements.lock().push(query.clone());
        self.inner.exec(query, params)
    }
}

/// A connection on which another writer runs `statement` just before this
/// handle's first CREATE TABLE, so that CREATE loses the race.
#[derive(Debug, Clone)]
pub struct Preempted {
    inner: Sqlite,
    statement: Arc<Mutex<Option<String>>>,
}

impl Preempted {
    pub fn new(statement: &str) -> Self {
        init_tracing();
        Self {
            inner: Sqlite::in_memory().expect("in-memory database"),
            statement: Arc::new(Mutex::new(Some(statement.to_string()))),
        }
    }
}

impl Connection for Preempted {
    fn query(&self, query: String, params: Vec<DataType>) -> FutureResult<Vec<Row>> {
        self.inner.query(query, params)
    }

    fn exec(&self, query: String, params: Vec<DataType>) -> FutureResult<u32> {
        let first = if query.starts_with("CREATE") { self.statement.lock().take() } else { None };
        let inner = self.inner.clone();

        async move {
            if let Some(first) = first {
                inner.exec(first, vec![]).await?;
            }
            inner.exec(query, params).await
        }
        .boxed()
    }
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes and normalizing whitespace.
/// Preserves quotes inside string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {}
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Strips identifier quotes and normalizes whitespace so assertions do not
/// depend on ``SeaQuery`` formatting details.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}
