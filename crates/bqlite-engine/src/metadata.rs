//! INFORMATION_SCHEMA resolution.
//!
//! BigQuery scripts enumerate tables through
//! `SELECT ... FROM <dataset>.INFORMATION_SCHEMA.TABLES`. None of that
//! catalog exists physically, so these statements never reach the
//! normalizer: the resolver answers them from `sqlite_master` using the
//! reverse identifier mapping, and everything else falls through.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use bqlite_dialect::reverse_lookup;

use crate::executor::{Engine, Row};
use crate::error::Result;

/// The three surface forms of an INFORMATION_SCHEMA.TABLES reference:
/// fully backticked, backticked project/dataset, and bare.
static FORMS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)FROM\s+`(?:[\w-]+\.)?([\w-]+)\.INFORMATION_SCHEMA\.TABLES`").unwrap(),
        Regex::new(r"(?i)FROM\s+`(?:[\w-]+\.)?([\w-]+)`\.INFORMATION_SCHEMA\.TABLES").unwrap(),
        Regex::new(r"(?i)FROM\s+(?:[\w-]+\.)?([\w-]+)\.INFORMATION_SCHEMA\.TABLES").unwrap(),
    ]
});

/// Extracts the dataset id from an INFORMATION_SCHEMA.TABLES statement,
/// or `None` when the statement is not one.
fn extract_dataset(sql: &str) -> Option<String> {
    if !sql.to_uppercase().contains("INFORMATION_SCHEMA") {
        return None;
    }
    FORMS
        .iter()
        .find_map(|form| form.captures(sql))
        .map(|caps| caps[1].to_string())
}

impl Engine {
    /// Answers an INFORMATION_SCHEMA.TABLES query from the physical
    /// catalog, or returns `None` so the executor falls through.
    pub(crate) async fn resolve_information_schema(
        &mut self,
        sql: &str,
    ) -> Result<Option<Vec<Row>>> {
        let Some(dataset) = extract_dataset(sql) else {
            return Ok(None);
        };
        let conn = self.conn.live().await?;
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&mut *conn)
                .await?;
        let rows = reverse_lookup(&dataset, &names)
            .into_iter()
            .map(|(project, table)| {
                let mut row = Row::new();
                row.insert("table_name".to_string(), Value::String(table));
                row.insert("table_catalog".to_string(), Value::String(project));
                row.insert("table_schema".to_string(), Value::String(dataset.clone()));
                row.insert(
                    "table_type".to_string(),
                    Value::String("BASE TABLE".to_string()),
                );
                row
            })
            .collect();
        Ok(Some(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_dataset_from_all_forms() {
        assert_eq!(
            extract_dataset("SELECT table_name FROM `proj.ds.INFORMATION_SCHEMA.TABLES`"),
            Some("ds".to_string())
        );
        assert_eq!(
            extract_dataset("SELECT table_name FROM `proj.ds`.INFORMATION_SCHEMA.TABLES"),
            Some("ds".to_string())
        );
        assert_eq!(
            extract_dataset("SELECT table_name FROM ds.INFORMATION_SCHEMA.TABLES"),
            Some("ds".to_string())
        );
    }

    #[test]
    fn non_metadata_statements_fall_through() {
        assert_eq!(extract_dataset("SELECT * FROM ds.t"), None);
    }
}
