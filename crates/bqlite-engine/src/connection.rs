//! Connection lifecycle management.
//!
//! The engine owns exactly one SQLite connection, opened lazily and
//! re-checked for freshness before every use. The backing file may be
//! replaced out-of-band between calls (the harness swaps database files
//! wholesale), so a stat mismatch closes and reopens the handle instead
//! of erroring.
//!
//! Writes must become visible to independent reader processes without
//! delay: the connection runs in WAL journal mode so readers are never
//! blocked, and every write batch is followed by a
//! `wal_checkpoint(TRUNCATE)` that flushes the log back into the main
//! file. A reader that opens the file moments later, in another process
//! and without this engine, sees committed data.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Identity snapshot of the backing file, captured on open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FreshnessToken {
    inode: u64,
    mtime: DateTime<Utc>,
    size: u64,
}

impl FreshnessToken {
    fn capture(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let mtime: DateTime<Utc> = meta.modified()?.into();
        #[cfg(unix)]
        let inode = std::os::unix::fs::MetadataExt::ino(&meta);
        #[cfg(not(unix))]
        let inode = 0;
        Ok(Self {
            inode,
            mtime,
            size: meta.len(),
        })
    }

    /// A different inode means the file was replaced; an older mtime
    /// means it was restored from a snapshot. Either way the open handle
    /// no longer describes the file at this path.
    fn is_stale_against(&self, current: &Self) -> bool {
        current.inode != self.inode || current.mtime < self.mtime
    }
}

/// Owns the single physical connection: CLOSED -> OPEN -> (stale or
/// explicit close) -> CLOSED.
pub(crate) struct ConnectionManager {
    path: PathBuf,
    conn: Option<SqliteConnection>,
    token: Option<FreshnessToken>,
}

impl ConnectionManager {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            token: None,
        }
    }

    /// Returns the live connection, opening or reopening as needed.
    ///
    /// The staleness check runs before every use, not only at startup.
    pub(crate) async fn live(&mut self) -> Result<&mut SqliteConnection> {
        if let Some(token) = self.token {
            let fresh = match FreshnessToken::capture(&self.path) {
                Ok(current) => !token.is_stale_against(&current),
                // Missing file: reopen recreates it.
                Err(_) => false,
            };
            if !fresh {
                debug!(path = %self.path.display(), "backing file changed, reopening");
                self.close().await?;
            }
        }
        if self.conn.is_none() {
            self.open().await?;
        }
        self.conn.as_mut().ok_or_else(|| {
            EngineError::Io(std::io::Error::other("connection unavailable after open"))
        })
    }

    async fn open(&mut self) -> Result<()> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let conn = options.connect().await?;
        // The file exists once the connection is up; snapshot it.
        self.token = Some(FreshnessToken::capture(&self.path)?);
        self.conn = Some(conn);
        debug!(path = %self.path.display(), "opened sqlite connection");
        Ok(())
    }

    /// Flushes the write-ahead log into the main database file so other
    /// processes reading the same file see committed writes immediately.
    pub(crate) async fn checkpoint(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.as_mut() {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Checkpoints and releases the handle. Never errors: the backing
    /// file may already be gone, and close must succeed regardless.
    pub(crate) async fn close(&mut self) -> Result<()> {
        if let Some(mut conn) = self.conn.take() {
            if let Err(err) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
                .execute(&mut conn)
                .await
            {
                debug!(error = %err, "checkpoint on close failed");
            }
            if let Err(err) = conn.close().await {
                debug!(error = %err, "connection close failed");
            }
        }
        self.token = None;
        Ok(())
    }
}
