//! BigQuery schema to SQLite DDL translation.

use serde::{Deserialize, Serialize};

use crate::ident::TableRef;

/// Column mode, BigQuery's nullability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    /// Column may hold NULL (the default).
    #[default]
    Nullable,
    /// Column is declared NOT NULL.
    Required,
}

/// One column of a BigQuery table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Column name as submitted by the caller.
    pub name: String,
    /// Declared BigQuery type, e.g. `STRING` or `INT64`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Nullability mode.
    #[serde(default)]
    pub mode: FieldMode,
}

impl SchemaField {
    /// Creates a nullable field.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: FieldMode::Nullable,
        }
    }

    /// Marks the field as REQUIRED.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    /// Returns the column name with invisible characters stripped.
    ///
    /// The sanitized name is authoritative for all later reads.
    #[must_use]
    pub fn sanitized_name(&self) -> String {
        sanitize_column_name(&self.name)
    }
}

/// Strips byte-order-marks and zero-width spaces from a column name.
///
/// Schemas exported from spreadsheets and some CSV tooling carry these
/// invisible characters in header names; they would otherwise become part
/// of the physical column name and make the column unaddressable.
#[must_use]
pub fn sanitize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}'))
        .collect()
}

/// Maps a declared BigQuery column type to a SQLite storage type.
///
/// Total: unknown declared types fall back to `TEXT` so table creation
/// never fails on an unrecognized type.
#[must_use]
pub fn physical_type(declared: &str) -> &'static str {
    match declared.trim().to_uppercase().as_str() {
        "INTEGER" | "INT64" => "INTEGER",
        "FLOAT" | "FLOAT64" | "NUMERIC" => "REAL",
        "BOOLEAN" | "BOOL" => "INTEGER",
        "TIMESTAMP" | "DATETIME" | "DATE" | "TIME" => "TEXT",
        "BYTES" => "BLOB",
        // STRING, JSON, and anything unrecognized store as TEXT.
        _ => "TEXT",
    }
}

/// Builds idempotent `CREATE TABLE IF NOT EXISTS` DDL for a table.
///
/// REQUIRED fields gain `NOT NULL`; column names are sanitized and quoted.
#[must_use]
pub fn create_table_sql(table_ref: &TableRef, fields: &[SchemaField]) -> String {
    let mut sql = String::from("CREATE TABLE IF NOT EXISTS ");
    sql.push_str(&table_ref.quoted_physical_name());
    sql.push_str(" (");

    let col_defs: Vec<String> = fields
        .iter()
        .map(|f| {
            let mut def = format!("\"{}\" {}", f.sanitized_name(), physical_type(&f.field_type));
            if f.mode == FieldMode::Required {
                def.push_str(" NOT NULL");
            }
            def
        })
        .collect();
    sql.push_str(&col_defs.join(", "));

    sql.push(')');
    sql
}
