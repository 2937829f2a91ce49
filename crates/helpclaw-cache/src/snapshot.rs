//! Durable snapshot persistence.
//!
//! The snapshot file is versioned JSON, written to a temp file and
//! renamed into place so a crash mid-write never leaves a torn file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use helpclaw_core::error::{HelpClawError, Result};
use helpclaw_core::types::{CacheEntry, CacheSnapshot};

/// Current on-disk schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    entries: Vec<CacheEntry>,
    last_refreshed_at: Option<DateTime<Utc>>,
}

/// File-backed snapshot store.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Create a store writing to `<dir>/snapshot.json`.
    pub fn new(dir: &Path) -> Self {
        std::fs::create_dir_all(dir).ok();
        Self {
            path: dir.join("snapshot.json"),
        }
    }

    /// Load the prior snapshot if present and parseable. Stale data is
    /// accepted — age is the caller's concern, not the store's. Parse
    /// failures and unknown schema versions are logged and treated as
    /// "no snapshot".
    pub fn load(&self) -> Option<CacheSnapshot> {
        if !self.path.exists() {
            tracing::info!("No content snapshot found, cache starts empty");
            return None;
        }
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read snapshot file: {e}");
                return None;
            }
        };
        let file: SnapshotFile = match serde_json::from_str(&json) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("⚠️ Failed to parse snapshot file: {e} — starting fresh");
                return None;
            }
        };
        if file.version != SNAPSHOT_VERSION {
            tracing::warn!(
                "⚠️ Snapshot schema version {} not supported (expected {}) — starting fresh",
                file.version,
                SNAPSHOT_VERSION
            );
            return None;
        }

        if let Some(at) = file.last_refreshed_at {
            let age_mins = (Utc::now() - at).num_minutes();
            tracing::info!(
                "✅ Loaded content snapshot ({} entries, age {} min)",
                file.entries.len(),
                age_mins
            );
        }
        Some(CacheSnapshot {
            entries: file.entries,
            last_refreshed_at: file.last_refreshed_at,
        })
    }

    /// Persist a snapshot atomically (write-to-temp-then-rename).
    pub fn save(&self, snapshot: &CacheSnapshot) -> Result<()> {
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            entries: snapshot.entries.clone(),
            last_refreshed_at: snapshot.last_refreshed_at,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| HelpClawError::Cache(format!("Serialize error: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(
            "💾 Saved snapshot ({} entries) to {}",
            snapshot.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Remove the durable file, if any.
    pub fn remove(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("⚠️ Failed to remove snapshot file: {e}");
            }
        }
    }
}
