//! Statement execution.

use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqliteConnection, TypeInfo, ValueRef};
use tracing::debug;

use bqlite_dialect::rewrite::normalize_program;

use crate::config::EngineConfig;
use crate::connection::ConnectionManager;
use crate::error::{EngineError, Result};

/// One materialized result row: an ordered column-to-value map.
pub type Row = serde_json::Map<String, Value>;

/// Leading keywords that classify a statement as a write.
const WRITE_KEYWORDS: [&str; 7] = [
    "INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER", "MERGE",
];

/// Executes BigQuery-dialect statements against a single SQLite file.
///
/// The engine runs one statement program at a time, serialized through
/// `&mut self`. Cross-process concurrency is the design target instead:
/// WAL mode plus checkpoint-after-write makes committed data visible to
/// independent reader processes immediately.
///
/// # Example
///
/// ```no_run
/// use bqlite_engine::{Engine, EngineConfig};
///
/// # async fn demo() -> bqlite_engine::Result<()> {
/// let mut engine = Engine::new(EngineConfig::new("/tmp/warehouse.db"));
/// let rows = engine.execute("SELECT 1 AS one", &[]).await?;
/// assert_eq!(rows[0]["one"], 1);
/// engine.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    config: EngineConfig,
    pub(crate) conn: ConnectionManager,
}

impl Engine {
    /// Creates an engine over the configured database file. The
    /// connection opens lazily on first use.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let conn = ConnectionManager::new(&config.db_path);
        Self { config, conn }
    }

    /// Returns the configuration this engine was built with.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes one submitted statement and returns its rows.
    ///
    /// The statement normalizes into an ordered program (length one
    /// except for MERGE). Write statements accumulate affected-row
    /// counts; a write program with no fetched rows returns a single
    /// synthetic `{"affected_rows": n}` row. Any write triggers a
    /// checkpoint so independent readers see the result immediately.
    ///
    /// `params` bind positionally to `?` placeholders and are only
    /// supported for single-statement programs.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        if let Some(rows) = self.resolve_information_schema(sql).await? {
            return Ok(rows);
        }

        let statements = normalize_program(sql, &self.config.default_project);
        let multi = statements.len() > 1;
        if multi && !params.is_empty() {
            return Err(EngineError::Unsupported(
                "positional parameters cannot span a multi-statement program".into(),
            ));
        }

        let conn = self.conn.live().await?;
        if multi {
            // MERGE expands to update+insert; atomicity across the pair
            // lives here, not in the transpiler.
            sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        }
        let outcome = run_program(&mut *conn, &statements, params).await;
        if multi {
            match &outcome {
                Ok(_) => {
                    sqlx::query("COMMIT").execute(&mut *conn).await?;
                }
                Err(_) => {
                    let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                }
            }
        }
        let (rows, affected, wrote) = outcome?;

        if wrote {
            self.conn.checkpoint().await?;
        }
        if wrote && rows.is_empty() {
            let mut synthetic = Row::new();
            synthetic.insert("affected_rows".to_string(), Value::from(affected));
            return Ok(vec![synthetic]);
        }
        Ok(rows)
    }

    /// Checkpoints and releases the connection. Safe to call when the
    /// backing file has already been deleted.
    pub async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }
}

/// Runs each statement in order, classifying writes by leading keyword.
async fn run_program(
    conn: &mut SqliteConnection,
    statements: &[String],
    params: &[Value],
) -> Result<(Vec<Row>, u64, bool)> {
    let mut rows = Vec::new();
    let mut affected = 0u64;
    let mut wrote = false;
    for statement in statements {
        let statement = statement.trim();
        debug!(sql = %statement, "executing statement");
        let mut query = sqlx::query(statement);
        for param in params {
            query = bind_value(query, param);
        }
        if is_write_statement(statement) {
            let result = query.execute(&mut *conn).await?;
            affected += result.rows_affected();
            wrote = true;
        } else {
            let fetched = query.fetch_all(&mut *conn).await?;
            rows.extend(fetched.iter().map(materialize_row));
        }
    }
    Ok((rows, affected, wrote))
}

fn is_write_statement(sql: &str) -> bool {
    sql.split_whitespace().next().is_some_and(|first| {
        WRITE_KEYWORDS
            .iter()
            .any(|kw| first.eq_ignore_ascii_case(kw))
    })
}

/// Binds one JSON value as a positional parameter. Nested values bind as
/// serialized JSON text, matching how they are stored.
pub(crate) fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<i64>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        nested => query.bind(nested.to_string()),
    }
}

/// Materializes one SQLite row into an ordered column-to-value map.
pub(crate) fn materialize_row(row: &SqliteRow) -> Row {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), column_value(row, idx));
    }
    out
}

/// Decodes one column by SQLite storage class.
fn column_value(row: &SqliteRow, idx: usize) -> Value {
    let Ok(raw) = row.try_get_raw(idx) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }
    let type_name = raw.type_info().name().to_string();
    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<i64, _>(idx)
            .map_or(Value::Null, Value::from),
        "REAL" => row
            .try_get::<f64, _>(idx)
            .map_or(Value::Null, Value::from),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map_or(Value::Null, |bytes| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }),
        _ => row
            .try_get::<String, _>(idx)
            .map_or(Value::Null, retype_text),
    }
}

/// Opportunistic JSON re-parse for stored nested values: text starting
/// with `{` or `[` parses back to structure, silently falling back to
/// the raw string.
fn retype_text(text: String) -> Value {
    if text.starts_with('{') || text.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
            return parsed;
        }
    }
    Value::String(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_classification_by_leading_keyword() {
        assert!(is_write_statement("INSERT INTO t VALUES (1)"));
        assert!(is_write_statement("update t set a = 1"));
        assert!(is_write_statement("CREATE TABLE t (a)"));
        assert!(!is_write_statement("SELECT * FROM t"));
        assert!(!is_write_statement("PRAGMA journal_mode"));
    }

    #[test]
    fn retype_text_parses_json_prefixes_only() {
        assert_eq!(
            retype_text(r#"{"a": 1}"#.to_string()),
            serde_json::json!({"a": 1})
        );
        assert_eq!(retype_text("[1, 2]".to_string()), serde_json::json!([1, 2]));
        // Malformed JSON falls back silently to the raw string.
        assert_eq!(
            retype_text("{not json".to_string()),
            Value::String("{not json".to_string())
        );
        assert_eq!(
            retype_text("plain".to_string()),
            Value::String("plain".to_string())
        );
    }
}
