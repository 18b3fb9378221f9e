use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use suitcast_core::snapshot::{EngineSnapshot, RestoreReport, SnapshotError};
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state store IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("state store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Engine checkpoint kept as one JSON document, replaced atomically.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or empty file is a fresh start. A file that is not JSON at
    /// all is moved aside and also restores empty.
    pub fn load(&self) -> Result<(EngineSnapshot, RestoreReport), StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                event!(
                    target: "suitcast_relay::store",
                    Level::INFO,
                    path = %self.path.display(),
                    "no saved state; starting fresh"
                );
                return Ok((EngineSnapshot::default(), RestoreReport::default()));
            }
            Err(source) => return Err(self.io_error(source)),
        };
        if raw.trim().is_empty() {
            return Ok((EngineSnapshot::default(), RestoreReport::default()));
        }

        let (snapshot, report) = match EngineSnapshot::from_json(&raw) {
            Ok(restored) => restored,
            Err(err) => return self.set_aside_corrupt(&err),
        };
        if !report.is_clean() {
            event!(
                target: "suitcast_relay::store",
                Level::WARN,
                path = %self.path.display(),
                discarded = ?report.discarded,
                "saved state partially restored"
            );
        }
        Ok((snapshot, report))
    }

    pub fn save(&self, snapshot: &EngineSnapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        let json = snapshot.to_json()?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp_path, &self.path).map_err(|source| self.io_error(source))?;
        event!(
            target: "suitcast_relay::store",
            Level::DEBUG,
            path = %self.path.display(),
            "state saved"
        );
        Ok(())
    }

    fn set_aside_corrupt(
        &self,
        err: &SnapshotError,
    ) -> Result<(EngineSnapshot, RestoreReport), StoreError> {
        let aside = self.path.with_extension("corrupt");
        fs::rename(&self.path, &aside).map_err(|source| self.io_error(source))?;
        event!(
            target: "suitcast_relay::store",
            Level::ERROR,
            path = %self.path.display(),
            moved_to = %aside.display(),
            error = %err,
            "saved state unreadable; starting fresh"
        );
        let mut report = RestoreReport::default();
        report.discarded.push("document");
        Ok((EngineSnapshot::default(), report))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
