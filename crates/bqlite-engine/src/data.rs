//! Row-level data API.
//!
//! Thin operations over the executor and schema translator. These return
//! booleans and counts instead of errors: bulk callers iterate over many
//! tables and must continue past a single table's failure, so failures
//! log through `tracing` and report as zero/false.

use serde_json::Value;
use tracing::{debug, warn};

use bqlite_dialect::schema::create_table_sql;
use bqlite_dialect::{sanitize_column_name, SchemaField, TableRef};

use crate::executor::{bind_value, Engine, Row};

impl Engine {
    /// Creates a table for the given schema if it does not exist.
    pub async fn create_table_from_schema(
        &mut self,
        project: &str,
        dataset: &str,
        table: &str,
        schema: &[SchemaField],
    ) -> bool {
        let table_ref = TableRef::new(project, dataset, table);
        let sql = create_table_sql(&table_ref, schema);
        match self.execute(&sql, &[]).await {
            Ok(_) => true,
            Err(err) => {
                warn!(table = %table_ref.physical_name(), error = %err, "table creation failed");
                false
            }
        }
    }

    /// Returns whether the table exists in the physical catalog.
    pub async fn table_exists(&mut self, project: &str, dataset: &str, table: &str) -> bool {
        let name = TableRef::new(project, dataset, table).physical_name();
        let result: crate::error::Result<bool> = async {
            let conn = self.conn.live().await?;
            let row: Option<(i64,)> =
                sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(&name)
                    .fetch_optional(&mut *conn)
                    .await?;
            Ok(row.is_some())
        }
        .await;
        match result {
            Ok(exists) => exists,
            Err(err) => {
                warn!(table = %name, error = %err, "existence check failed");
                false
            }
        }
    }

    /// Inserts rows in one transaction, returning how many were written.
    ///
    /// Values bind in schema column order; nested values serialize to
    /// JSON text. A row that fails logs and is skipped; the rest of the
    /// batch still commits. A checkpoint follows the commit so other
    /// processes see the rows immediately.
    pub async fn insert_rows(
        &mut self,
        project: &str,
        dataset: &str,
        table: &str,
        rows: &[Row],
        schema: &[SchemaField],
    ) -> usize {
        if rows.is_empty() || schema.is_empty() {
            return 0;
        }
        let table_ref = TableRef::new(project, dataset, table);
        let columns: Vec<String> = schema.iter().map(SchemaField::sanitized_name).collect();
        let column_list: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table_ref.quoted_physical_name(),
            column_list.join(", "),
            placeholders
        );

        let mut inserted = 0usize;
        let result: crate::error::Result<()> = async {
            let conn = self.conn.live().await?;
            sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
            for row in rows {
                // Row keys are sanitized the same way as schema names so
                // a BOM-carrying key still finds its column.
                let clean: Row = row
                    .iter()
                    .map(|(k, v)| (sanitize_column_name(k), v.clone()))
                    .collect();
                let mut query = sqlx::query(&sql);
                for column in &columns {
                    query = bind_value(query, clean.get(column).unwrap_or(&Value::Null));
                }
                match query.execute(&mut *conn).await {
                    Ok(_) => inserted += 1,
                    Err(err) => {
                        warn!(table = %table_ref.physical_name(), error = %err, "row insert failed");
                    }
                }
            }
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            warn!(table = %table_ref.physical_name(), error = %err, "insert batch failed");
            return 0;
        }
        if let Err(err) = self.conn.checkpoint().await {
            warn!(error = %err, "checkpoint after insert failed");
        }
        debug!(table = %table_ref.physical_name(), inserted, "rows inserted");
        inserted
    }

    /// Updates rows matching `where_clause` (raw dialect text; empty
    /// updates every row). Returns the affected-row count.
    pub async fn update_rows(
        &mut self,
        project: &str,
        dataset: &str,
        table: &str,
        updates: &Row,
        where_clause: &str,
    ) -> u64 {
        if updates.is_empty() {
            return 0;
        }
        let table_ref = TableRef::new(project, dataset, table);
        let assignments: Vec<String> = updates
            .keys()
            .map(|k| format!("\"{}\" = ?", sanitize_column_name(k)))
            .collect();
        let mut sql = format!(
            "UPDATE {} SET {}",
            table_ref.quoted_physical_name(),
            assignments.join(", ")
        );
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        let params: Vec<Value> = updates.values().cloned().collect();
        self.affected(&sql, &params, &table_ref, "update").await
    }

    /// Deletes rows matching `where_clause` (raw dialect text; empty
    /// deletes every row). Returns the affected-row count.
    pub async fn delete_rows(
        &mut self,
        project: &str,
        dataset: &str,
        table: &str,
        where_clause: &str,
    ) -> u64 {
        let table_ref = TableRef::new(project, dataset, table);
        let mut sql = format!("DELETE FROM {}", table_ref.quoted_physical_name());
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        self.affected(&sql, &[], &table_ref, "delete").await
    }

    /// Returns the row count, or zero when the table is missing.
    pub async fn get_row_count(&mut self, project: &str, dataset: &str, table: &str) -> i64 {
        let table_ref = TableRef::new(project, dataset, table);
        let sql = format!(
            "SELECT COUNT(*) AS c FROM {}",
            table_ref.quoted_physical_name()
        );
        match self.execute(&sql, &[]).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("c"))
                .and_then(Value::as_i64)
                .unwrap_or(0),
            Err(err) => {
                warn!(table = %table_ref.physical_name(), error = %err, "row count failed");
                0
            }
        }
    }

    /// Removes every row from the table.
    pub async fn truncate_table(&mut self, project: &str, dataset: &str, table: &str) -> bool {
        let table_ref = TableRef::new(project, dataset, table);
        let sql = format!("DELETE FROM {}", table_ref.quoted_physical_name());
        match self.execute(&sql, &[]).await {
            Ok(_) => true,
            Err(err) => {
                warn!(table = %table_ref.physical_name(), error = %err, "truncate failed");
                false
            }
        }
    }

    /// Drops the table if it exists.
    pub async fn drop_table(&mut self, project: &str, dataset: &str, table: &str) -> bool {
        let table_ref = TableRef::new(project, dataset, table);
        let sql = format!("DROP TABLE IF EXISTS {}", table_ref.quoted_physical_name());
        match self.execute(&sql, &[]).await {
            Ok(_) => true,
            Err(err) => {
                warn!(table = %table_ref.physical_name(), error = %err, "drop failed");
                false
            }
        }
    }

    /// Runs a write statement through the executor and extracts the
    /// synthetic affected-row count, logging failure instead of raising.
    async fn affected(
        &mut self,
        sql: &str,
        params: &[Value],
        table_ref: &TableRef,
        verb: &str,
    ) -> u64 {
        match self.execute(sql, params).await {
            Ok(rows) => rows
                .first()
                .and_then(|row| row.get("affected_rows"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
            Err(err) => {
                warn!(table = %table_ref.physical_name(), error = %err, "{verb} failed");
                0
            }
        }
    }
}
