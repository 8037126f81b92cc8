//! Save/load persistence for the meta-progression record
//!
//! Features:
//! - Versioned JSON envelope
//! - Atomic-ish writes (tmp file, then rename)
//! - Corruption or absence degrades to a default record

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::meta::MetaProgress;

/// Current envelope version
pub const SAVE_VERSION: u32 = 1;

/// Default save file name
pub const SAVE_FILE: &str = "neon_survivors_save_v1.json";

#[derive(thiserror::Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported save version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// On-disk wrapper around the record
#[derive(Debug, Serialize, Deserialize)]
struct SaveEnvelope {
    version: u32,
    meta: MetaProgress,
}

/// File-backed store for [`MetaProgress`]
#[derive(Debug, Clone)]
pub struct MetaStore {
    path: PathBuf,
}

impl MetaStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the record
    pub fn try_load(&self) -> Result<MetaProgress, PersistenceError> {
        let json = std::fs::read_to_string(&self.path)?;
        let envelope: SaveEnvelope = serde_json::from_str(&json)?;
        if envelope.version != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: envelope.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(envelope.meta.sanitized())
    }

    /// Load the record, degrading to the default on any failure
    pub fn load(&self) -> MetaProgress {
        match self.try_load() {
            Ok(meta) => {
                log::info!(
                    "Loaded meta progress (best {}s, bank {})",
                    meta.best_time,
                    meta.bank
                );
                meta
            }
            Err(PersistenceError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No save found, starting fresh");
                MetaProgress::default()
            }
            Err(e) => {
                log::warn!("Discarding unreadable save {}: {}", self.path.display(), e);
                MetaProgress::default()
            }
        }
    }

    /// Write the record
    pub fn save(&self, meta: &MetaProgress) -> Result<(), PersistenceError> {
        let envelope = SaveEnvelope {
            version: SAVE_VERSION,
            meta: meta.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        log::info!("Meta progress saved to {}", self.path.display());
        Ok(())
    }
}

impl Default for MetaStore {
    fn default() -> Self {
        Self::new(SAVE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::MetaUpgrade;

    fn temp_store(name: &str) -> MetaStore {
        let path = std::env::temp_dir().join(format!(
            "neon_survivors_{}_{}.json",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        MetaStore::new(path)
    }

    #[test]
    fn missing_file_loads_default() {
        let store = temp_store("missing");
        assert_eq!(store.load(), MetaProgress::default());
        assert!(matches!(store.try_load(), Err(PersistenceError::Io(_))));
    }

    #[test]
    fn corrupt_file_loads_default() {
        let store = temp_store("corrupt");
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), MetaProgress::default());
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let store = temp_store("version");
        std::fs::write(
            store.path(),
            r#"{ "version": 99, "meta": { "best_time": 10, "last_time": 5, "bank": 3 } }"#,
        )
        .unwrap();
        assert!(matches!(
            store.try_load(),
            Err(PersistenceError::UnsupportedVersion { found: 99, .. })
        ));
        assert_eq!(store.load(), MetaProgress::default());
        let _ = std::fs::remove_file(store.path());
    }

    #[test]
    fn save_then_load_preserves_record() {
        let store = temp_store("saved");
        let mut meta = MetaProgress {
            best_time: 321,
            last_time: 120,
            bank: 400,
            ..Default::default()
        };
        meta.purchase(MetaUpgrade::Magnet).unwrap();
        store.save(&meta).unwrap();
        assert_eq!(store.load(), meta);
        let _ = std::fs::remove_file(store.path());
    }
}
