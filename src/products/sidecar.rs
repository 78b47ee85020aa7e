//! Sidecar metadata persisted next to every partition file, so the catalog
//! can report row counts without re-reading full CSVs.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub tier: String,
    pub period: String,
    pub row_count: u64,
    pub generated_at: DateTime<Utc>,
}

/// `<name>.csv` -> `<name>.meta.json`.
pub fn meta_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("meta.json")
}

pub fn write(csv_path: &Path, meta: &PartitionMeta) -> Result<()> {
    let path = meta_path(csv_path);
    let tmp = path.with_extension("json.tmp");
    let body = serde_json::to_vec(meta).context("serializing partition metadata")?;
    fs::write(&tmp, body).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, &path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}

pub fn read(csv_path: &Path) -> Result<PartitionMeta> {
    let path = meta_path(csv_path);
    let body = fs::read(&path).with_context(|| format!("reading {:?}", path))?;
    serde_json::from_slice(&body).with_context(|| format!("parsing {:?}", path))
}
