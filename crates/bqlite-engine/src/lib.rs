//! # bqlite-engine
//!
//! Executes BigQuery-dialect SQL against an embedded, single-file SQLite
//! store, so dialect-dependent application code can run disconnected
//! from the real warehouse without behavioral drift.
//!
//! A statement submitted to [`Engine::execute`] flows through:
//!
//! 1. the metadata resolver, which answers `INFORMATION_SCHEMA.TABLES`
//!    enumeration from the physical catalog;
//! 2. the normalization pipeline in [`bqlite_dialect`], which rewrites
//!    dialect syntax to SQLite syntax (expanding MERGE into an
//!    UPDATE+INSERT pair);
//! 3. the connection manager, which owns the single
//!    physical connection, re-checks the backing file's identity before
//!    every use, and checkpoints the write-ahead log after every write so
//!    independent reader processes see committed data immediately.
//!
//! There is no internal concurrency: callers serialize access through
//! `&mut self`, and cross-process visibility is the storage layer's job.
//!
//! ## Example
//!
//! ```no_run
//! use bqlite_engine::{Engine, EngineConfig, SchemaField};
//!
//! # async fn demo() -> bqlite_engine::Result<()> {
//! let mut engine = Engine::new(
//!     EngineConfig::new("/tmp/warehouse.db").default_project("proj"),
//! );
//! let schema = vec![
//!     SchemaField::new("id", "INTEGER").required(),
//!     SchemaField::new("name", "STRING"),
//! ];
//! engine.create_table_from_schema("proj", "ds", "t", &schema).await;
//! let rows = engine.execute("SELECT COUNT(*) AS c FROM ds.t", &[]).await?;
//! assert_eq!(rows[0]["c"], 0);
//! engine.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod data;
mod error;
mod executor;
mod metadata;

pub use bqlite_dialect::{SchemaField, TableRef};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use executor::{Engine, Row};
