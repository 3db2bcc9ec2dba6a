//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_project() -> String {
    String::from("main")
}

/// Configuration for an [`Engine`](crate::Engine).
///
/// # Example
///
/// ```rust
/// use bqlite_engine::EngineConfig;
///
/// let config = EngineConfig::new("/tmp/warehouse.db").default_project("my-proj");
/// assert_eq!(config.default_project, "my-proj");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Path of the single physical database file.
    pub db_path: PathBuf,
    /// Project assumed for two-part `dataset.table` references.
    #[serde(default = "default_project")]
    pub default_project: String,
}

impl EngineConfig {
    /// Creates a configuration for the given database file.
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            default_project: default_project(),
        }
    }

    /// Sets the project assumed for two-part table references.
    #[must_use]
    pub fn default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = project.into();
        self
    }
}
