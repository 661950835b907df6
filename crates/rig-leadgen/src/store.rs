//! File-based profile store
//!
//! One JSON file per enrichment receipt, named `{id}_{yyyyMMddHHmmss}.json`
//! with the receipt time in UTC. Writes go through a per-write temporary file
//! and a rename, so a concurrent reader either sees the whole payload or no
//! file at all.
//!
//! # Directory Structure
//!
//! ```text
//! linkedin_profiles/
//! ├── jane-doe_20240301120000.json
//! ├── jane-doe_20240302094512.json   <- resolved for "jane-doe"
//! └── unknown_20240302100001.json
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::debug;

use crate::error::StoreError;
use crate::extract::payload_reference_id;

/// Timestamp format embedded in entry filenames; sorts lexicographically
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

/// Distinguishes temp files of concurrent writes within this process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Handle to a profile directory.
///
/// Cheap to clone; the orchestrator and the webhook receiver each hold one.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Open (and create if needed) a profile directory
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filename for a receipt of `reference_id` at `received_at`
    pub fn entry_name(reference_id: &str, received_at: DateTime<Utc>) -> String {
        format!("{}_{}.json", reference_id, received_at.format(TIMESTAMP_FORMAT))
    }

    /// Store a callback payload received now; returns the entry filename
    pub async fn save(&self, payload: &Value) -> Result<String, StoreError> {
        self.save_at(payload, Utc::now()).await
    }

    /// Store a callback payload with an explicit receipt time.
    ///
    /// A second receipt for the same id within the same second replaces the
    /// first (last write wins). Concurrent writers never share a temp file.
    pub async fn save_at(
        &self,
        payload: &Value,
        received_at: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let id = payload_reference_id(payload.get("url").and_then(Value::as_str));
        let name = Self::entry_name(id, received_at);
        let path = self.dir.join(&name);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path = self
            .dir
            .join(format!(".{}.{}.{}.tmp", name, std::process::id(), seq));

        let content =
            serde_json::to_string_pretty(payload).map_err(|e| StoreError::Serialization {
                path: path.clone(),
                source: e,
            })?;

        fs::write(&temp_path, content)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        debug!(file = %name, "Stored profile payload");
        Ok(name)
    }

    /// Entry filenames for `reference_id`, oldest first
    pub async fn entries(&self, reference_id: &str) -> Result<Vec<String>, StoreError> {
        if !fs::try_exists(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            return Ok(Vec::new());
        }

        let mut dir = fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if parse_entry_name(&name).is_some_and(|(id, _)| id == reference_id) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Most recent payload stored for `reference_id`
    pub async fn latest(&self, reference_id: &str) -> Result<Option<Value>, StoreError> {
        let Some(name) = self.entries(reference_id).await?.pop() else {
            return Ok(None);
        };

        let path = self.dir.join(&name);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        let payload = serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization { path, source: e })?;

        debug!(reference_id, file = %name, "Resolved stored profile");
        Ok(Some(payload))
    }
}

/// Split `{id}_{timestamp}.json` into its id and timestamp
fn parse_entry_name(name: &str) -> Option<(&str, &str)> {
    let (id, timestamp) = name.strip_suffix(".json")?.rsplit_once('_')?;
    let valid = timestamp.len() == TIMESTAMP_LEN && timestamp.bytes().all(|b| b.is_ascii_digit());
    valid.then_some((id, timestamp))
}
