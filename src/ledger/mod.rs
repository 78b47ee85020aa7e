//! Run status ledger: a small JSON record of what the last pipeline run
//! added, plus the total size of the product tree.
//!
//! Strictly advisory. Every failure in here is logged and swallowed so an
//! unwritable or corrupt status file can never block partitioning or the
//! catalog.

use chrono::Utc;
use glob::glob;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::warn;

pub const STATUS_FILE: &str = "status.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusLedger {
    /// Wall-clock timestamp of the run, e.g. "2025-08-05 14:02:11 UTC".
    pub last_update: String,
    /// Total size of every CSV under the data dir after the run.
    pub total_data_size_bytes: u64,
    /// Sum of positive per-file growth this run.
    pub total_added_bytes: u64,
    /// Per-file growth, relative path -> bytes added.
    pub details: BTreeMap<String, u64>,
}

/// Sizes of every CSV under `data_dir`, keyed by path relative to it.
/// Unreadable entries are skipped; an unreadable tree is an empty snapshot.
pub fn snapshot_sizes(data_dir: &Path) -> HashMap<String, u64> {
    let mut sizes = HashMap::new();
    let pattern = format!("{}/**/*.csv", data_dir.display());
    let entries = match glob(&pattern) {
        Ok(e) => e,
        Err(e) => {
            warn!("invalid snapshot pattern {}: {}", pattern, e);
            return sizes;
        }
    };
    for path in entries.filter_map(|e| e.ok()) {
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        let key = path
            .strip_prefix(data_dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();
        sizes.insert(key, meta.len());
    }
    sizes
}

/// Compute the growth delta between two size snapshots and persist the
/// ledger, overwriting prior state. Files that shrank are excluded from the
/// total without comment. Returns the ledger that was written, or `None` if
/// writing failed (which is logged, never propagated).
pub fn record_run(
    data_dir: &Path,
    before: &HashMap<String, u64>,
    after: &HashMap<String, u64>,
) -> Option<StatusLedger> {
    let mut details = BTreeMap::new();
    let mut total_added = 0u64;
    for (file, &new_size) in after {
        let old_size = before.get(file).copied().unwrap_or(0);
        if new_size > old_size {
            let diff = new_size - old_size;
            total_added += diff;
            details.insert(file.clone(), diff);
        }
    }

    let ledger = StatusLedger {
        last_update: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        total_data_size_bytes: after.values().sum(),
        total_added_bytes: total_added,
        details,
    };

    let path = data_dir.join(STATUS_FILE);
    let tmp = data_dir.join(format!("{}.tmp", STATUS_FILE));
    let body = match serde_json::to_vec_pretty(&ledger) {
        Ok(b) => b,
        Err(e) => {
            warn!("serializing status ledger failed: {}", e);
            return None;
        }
    };
    if let Err(e) = fs::write(&tmp, body).and_then(|_| fs::rename(&tmp, &path)) {
        warn!("writing {:?} failed: {}", path, e);
        return None;
    }
    Some(ledger)
}

/// Load the last persisted ledger, if one exists and parses.
pub fn load(data_dir: &Path) -> Option<StatusLedger> {
    let path = data_dir.join(STATUS_FILE);
    let body = fs::read(&path).ok()?;
    match serde_json::from_slice(&body) {
        Ok(l) => Some(l),
        Err(e) => {
            warn!("corrupt status ledger {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn only_positive_deltas_count() {
        let tmp = tempdir().unwrap();
        let before = HashMap::from([
            ("a.csv".to_string(), 100),
            ("b.csv".to_string(), 500),
        ]);
        let after = HashMap::from([
            ("a.csv".to_string(), 150),
            ("b.csv".to_string(), 400),
            ("c.csv".to_string(), 30),
        ]);

        let ledger = record_run(tmp.path(), &before, &after).unwrap();
        assert_eq!(ledger.total_added_bytes, 80);
        assert_eq!(ledger.details.len(), 2);
        assert_eq!(ledger.details["a.csv"], 50);
        assert_eq!(ledger.details["c.csv"], 30);
        assert!(!ledger.details.contains_key("b.csv"));
        assert_eq!(ledger.total_data_size_bytes, 580);
    }

    #[test]
    fn ledger_round_trips_through_disk() {
        let tmp = tempdir().unwrap();
        let after = HashMap::from([("a.csv".to_string(), 42)]);
        record_run(tmp.path(), &HashMap::new(), &after).unwrap();

        let loaded = load(tmp.path()).unwrap();
        assert_eq!(loaded.total_added_bytes, 42);
        assert_eq!(loaded.total_data_size_bytes, 42);
    }

    #[test]
    fn snapshot_covers_nested_tier_dirs() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("yearly")).unwrap();
        fs::write(tmp.path().join("yearly/x_2025.csv"), "h\n1\n").unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let sizes = snapshot_sizes(tmp.path());
        assert_eq!(sizes.len(), 1);
        assert!(sizes.contains_key("yearly/x_2025.csv"));
    }

    #[test]
    fn unwritable_ledger_is_swallowed() {
        // point the ledger at a directory that cannot exist as a file target
        let tmp = tempdir().unwrap();
        let bogus = tmp.path().join("missing").join("deeper");
        let after = HashMap::from([("a.csv".to_string(), 1)]);
        assert!(record_run(&bogus, &HashMap::new(), &after).is_none());
    }

    #[test]
    fn corrupt_ledger_loads_as_none() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join(STATUS_FILE), b"{not json").unwrap();
        assert!(load(tmp.path()).is_none());
    }
}
