//! # bqlite-dialect
//!
//! Rewrites statements written in the BigQuery SQL dialect into SQLite SQL.
//!
//! The crate is the pure half of the bqlite workspace: it performs no I/O
//! and holds no state. Everything here is a mapping from text to text:
//!
//! - [`ident`] maps three-part `{project}.{dataset}.{table}` references to
//!   flattened physical table names and back.
//! - [`schema`] maps BigQuery column types to SQLite storage types and
//!   builds idempotent `CREATE TABLE` DDL.
//! - [`rewrite`] is the ordered normalization pipeline: function-call
//!   rewriting driven by a quote-aware scanner with per-function dispatch,
//!   literal-constructor collapsing, boolean folding, table-reference
//!   resolution, and the MERGE transpiler.
//!
//! # How BigQuery differs from SQLite
//!
//! - **Table naming**: BigQuery addresses tables as
//!   `project.dataset.table` (optionally backtick-quoted or written as
//!   `project:dataset.table`). SQLite has a flat namespace, so references
//!   flatten to `"{project}_{dataset}_{table}"`.
//! - **Functions**: most BigQuery scalar and aggregate functions have no
//!   SQLite counterpart and rewrite to equivalent expressions
//!   (`IF` to `CASE WHEN`, `COUNTIF` to a summed conditional,
//!   `DATE_ADD` to `date(expr, '+N units')`, and so on).
//! - **Booleans**: SQLite has no boolean storage class; bare `TRUE`/`FALSE`
//!   fold to `1`/`0` outside quoted literals.
//! - **MERGE**: SQLite has no MERGE statement; a supported MERGE transpiles
//!   to an UPDATE followed by an INSERT with matching row-count semantics.
//!
//! # Example
//!
//! ```rust
//! use bqlite_dialect::rewrite::normalize_program;
//!
//! let program = normalize_program("SELECT IF(a > 1, 'big', 'small') FROM ds.t", "proj");
//! assert_eq!(
//!     program,
//!     vec!["SELECT CASE WHEN a > 1 THEN 'big' ELSE 'small' END FROM \"proj_ds_t\"".to_string()]
//! );
//! ```

pub mod ident;
pub mod rewrite;
pub mod schema;

pub use ident::{reverse_lookup, TableRef};
pub use rewrite::normalize_program;
pub use schema::{sanitize_column_name, SchemaField};
