//! Exclusive ingestion lock per collection.

use mathtutor_core::{AppError, AppResult};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Lock file held for the duration of one ingestion run.
///
/// Rebuilding drops and recreates the collection, so two runs against the
/// same collection would clobber each other. The file is created atomically
/// and removed on drop.
#[derive(Debug)]
pub struct IngestLock {
    path: PathBuf,
}

impl IngestLock {
    pub fn acquire(locks_dir: &Path, collection: &str) -> AppResult<Self> {
        std::fs::create_dir_all(locks_dir)?;
        let path = locks_dir.join(format!("{}.lock", collection));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(AppError::Locked(format!(
                    "Another ingestion holds collection '{}' (remove {:?} if no run is active)",
                    collection, path
                )));
            }
            Err(e) => return Err(e.into()),
        };

        // Owned from here on, so any later failure still removes the file
        let lock = Self { path }.stamp(&mut file)?;
        tracing::debug!("Acquired ingestion lock {:?}", lock.path);
        Ok(lock)
    }

    /// Record the holder's pid in the lock file.
    fn stamp(self, writer: &mut impl Write) -> AppResult<Self> {
        writeln!(writer, "{}", std::process::id())?;
        writer.flush()?;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove ingestion lock {:?}: {}", self.path, e);
        }
    }
}
