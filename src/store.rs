//! Durable whole-document persistence of the task list.
//!
//! The only persistent state in the system is one JSON file holding the
//! full `Vec<Task>`; it is read and rewritten wholesale, never patched.

use crate::error::{Result, TodoError};
use crate::task::Task;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// JSON-file task store.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the data file (and parent directory) with an empty list if
    /// it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TodoError::Storage(format!("cannot create data dir: {e}")))?;
        }
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => Ok(()),
            Ok(false) => tokio::fs::write(&self.path, "[]")
                .await
                .map_err(|e| TodoError::Storage(format!("cannot seed data file: {e}"))),
            Err(e) => Err(TodoError::Storage(format!("cannot stat data file: {e}"))),
        }
    }

    /// Read the whole task list. A missing or empty file is an empty list.
    pub async fn read_all(&self) -> Result<Vec<Task>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TodoError::Storage(format!("cannot read tasks: {e}"))),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| TodoError::Storage(format!("cannot parse tasks: {e}")))
    }

    /// Replace the whole task list.
    pub async fn write_all(&self, tasks: &[Task]) -> Result<()> {
        self.ensure_exists().await?;
        let json = serde_json::to_string_pretty(tasks)
            .map_err(|e| TodoError::Storage(format!("cannot serialize tasks: {e}")))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| TodoError::Storage(format!("cannot write tasks: {e}")))
    }
}
