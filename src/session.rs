//! Per-run transaction state
//!
//! A [`TransactionSession`] is owned by exactly one run. It records the
//! transaction id handed out by begin and accumulates the download paths and
//! local artifacts produced by later steps. Nothing is ever removed.

use crate::error::{Error, Result};
use crate::types::TransactionId;
use std::path::{Path, PathBuf};

/// Mutable state threaded through the lifecycle steps of one run
#[derive(Debug, Clone, Default)]
pub struct TransactionSession {
    transaction_id: Option<TransactionId>,
    download_paths: Vec<String>,
    file_names: Vec<PathBuf>,
}

impl TransactionSession {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// The transaction id, once begin has completed
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.transaction_id.as_ref()
    }

    /// The transaction id, or an error if begin has not completed
    pub fn require_transaction_id(&self) -> Result<&TransactionId> {
        self.transaction_id
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no transaction has been started".to_string()))
    }

    /// Record the id assigned by begin
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if an id was already recorded; a run
    /// drives exactly one transaction.
    pub fn set_transaction_id(&mut self, id: TransactionId) -> Result<()> {
        if let Some(existing) = &self.transaction_id {
            return Err(Error::InvalidState(format!(
                "transaction id already set to {}, refusing to replace it with {}",
                existing, id
            )));
        }
        self.transaction_id = Some(id);
        Ok(())
    }

    /// Download paths accumulated from every dump so far
    pub fn download_paths(&self) -> &[String] {
        &self.download_paths
    }

    /// Append the paths returned by one dump call
    pub fn extend_download_paths<I>(&mut self, paths: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.download_paths.extend(paths);
    }

    /// Local artifacts retrieved so far, in download order
    pub fn file_names(&self) -> &[PathBuf] {
        &self.file_names
    }

    /// Record a retrieved artifact
    pub fn record_file(&mut self, path: impl AsRef<Path>) {
        self.file_names.push(path.as_ref().to_path_buf());
    }
}
