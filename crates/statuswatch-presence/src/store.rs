//! Durable last-known-status storage.
//!
//! The file is a flat JSON object mapping entity id strings to status class
//! strings, pretty-printed so it can be inspected and hand-edited:
//!
//! ```json
//! {
//!   "1111": "reachable",
//!   "2222": "unreachable"
//! }
//! ```
//!
//! Saves write a sibling temporary file, flush it to disk, and rename it over
//! the target, so a crash mid-write leaves either the old or the new file.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing;

use statuswatch_core::error::{AppError, ErrorKind};
use statuswatch_core::result::AppResult;
use statuswatch_core::types::UserId;

use crate::status::StatusClass;

/// JSON-file backed map of entity id → last-known status class.
#[derive(Debug)]
pub struct StateStore {
    /// Target file.
    path: PathBuf,
    /// Serializes concurrent saves so renames land in call order.
    write_lock: Mutex<()>,
}

impl StateStore {
    /// Create a store persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted map.
    ///
    /// A missing or unreadable file yields an empty map; entries with an
    /// unparseable id or status are skipped. Startup never fails here.
    pub async fn load(&self) -> HashMap<UserId, StatusClass> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No state file found, starting fresh");
                return HashMap::new();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read state file, starting fresh"
                );
                return HashMap::new();
            }
        };

        let entries: BTreeMap<String, String> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupt state file, starting fresh"
                );
                return HashMap::new();
            }
        };

        let mut map = HashMap::with_capacity(entries.len());
        for (id, status) in entries {
            match (id.parse::<UserId>(), StatusClass::from_str_value(&status)) {
                (Ok(id), Some(status)) => {
                    map.insert(id, status);
                }
                _ => {
                    tracing::warn!(entity = %id, status = %status, "Skipping invalid state entry");
                }
            }
        }

        tracing::info!(path = %self.path.display(), entities = map.len(), "Loaded persisted state");
        map
    }

    /// Persist the full map, replacing the previous file atomically.
    pub async fn save(&self, map: &HashMap<UserId, StatusClass>) -> AppResult<()> {
        let entries: BTreeMap<String, &'static str> = map
            .iter()
            .map(|(id, status)| (id.to_string(), status.as_str()))
            .collect();
        let mut body = serde_json::to_string_pretty(&entries)?;
        body.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Storage,
                        format!("Failed to create state directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let tmp = self.temp_path();
        let mut file = fs::File::create(&tmp).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create {}", tmp.display()),
                e,
            )
        })?;
        file.write_all(body.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!(
                    "Failed to rename {} -> {}",
                    tmp.display(),
                    self.path.display()
                ),
                e,
            )
        })?;

        tracing::trace!(entities = map.len(), "State saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
