//! Persistence of quantitative snapshots and baseline history records.
//!
//! Layout: one directory, `{id}.json` for the snapshot and
//! `{id}.results.json` for the detection baseline it was computed from.

use crate::error::ServiceResult;
use async_trait::async_trait;
use minescope_core::QuantitativeSnapshot;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, analysis_id: &str) -> ServiceResult<Option<QuantitativeSnapshot>>;

    async fn persist(&self, analysis_id: &str, snapshot: &QuantitativeSnapshot) -> ServiceResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, analysis_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(analysis_id)))
    }

    pub fn history_path(&self, analysis_id: &str) -> PathBuf {
        self.dir.join(format!("{}.results.json", file_stem(analysis_id)))
    }

    pub async fn load_history(&self, analysis_id: &str) -> ServiceResult<Option<Value>> {
        read_json(&self.history_path(analysis_id)).await
    }

    pub async fn save_history(&self, analysis_id: &str, results: &Value) -> ServiceResult<()> {
        write_atomic(&self.history_path(analysis_id), &serde_json::to_vec_pretty(results)?).await
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self, analysis_id: &str) -> ServiceResult<Option<QuantitativeSnapshot>> {
        let Some(value) = read_json(&self.snapshot_path(analysis_id)).await? else {
            return Ok(None);
        };
        Ok(Some(QuantitativeSnapshot::from_stored(&value)))
    }

    async fn persist(&self, analysis_id: &str, snapshot: &QuantitativeSnapshot) -> ServiceResult<()> {
        let mut stored = snapshot.clone();
        stored.persisted = true;
        if stored.analysis_id.is_none() {
            stored.analysis_id = Some(analysis_id.to_string());
        }
        let path = self.snapshot_path(analysis_id);
        write_atomic(&path, &serde_json::to_vec_pretty(&stored)?).await?;
        log::info!("Saved snapshot for {} to {}", analysis_id, path.display());
        Ok(())
    }
}

/// Analysis ids come from URLs; keep only characters safe in a file name.
fn file_stem(analysis_id: &str) -> String {
    analysis_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

async fn read_json(path: &Path) -> ServiceResult<Option<Value>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> ServiceResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
