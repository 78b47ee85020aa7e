//! Assemble the UI-facing product catalog from materialized partition files.
//!
//! The catalog is a read model over the on-disk state, never over in-memory
//! results of the current run, so a catalog-only request after a process
//! restart sees exactly what is downloadable.

use anyhow::Result;
use glob::glob;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::pricing::price;
use super::sidecar;
use super::{describe, Tier};
use crate::generate::Vertical;

/// Rough lower bound on bytes per CSV record, used to estimate row counts
/// when a partition has no sidecar. Deliberately high so the estimate (and
/// hence the price) errs low.
const EST_BYTES_PER_ROW: u64 = 256;

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub filename: String,
    pub tier: Tier,
    pub period: String,
    pub rows: u64,
    pub size_bytes: u64,
    pub price: u64,
    pub description: String,
    pub download_url: String,
}

static BUNDLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9_]+)_FULL\.csv$").unwrap());
static YEARLY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9_]+)_(\d{4})\.csv$").unwrap());
static QUARTERLY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9_]+)_(\d{4})_Q([1-4])\.csv$").unwrap());
static MONTHLY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z0-9_]+)_(\d{4})_(\d{2})\.csv$").unwrap());

/// Parse the period label out of a partition filename. Returns `None` for
/// files that do not follow the tier's naming scheme.
fn period_of(tier: Tier, filename: &str) -> Option<String> {
    match tier {
        Tier::Bundle => BUNDLE_NAME.captures(filename).map(|_| "All Time".to_string()),
        Tier::Yearly => YEARLY_NAME
            .captures(filename)
            .map(|c| c[2].to_string()),
        Tier::Quarterly => QUARTERLY_NAME
            .captures(filename)
            .map(|c| format!("{}-Q{}", &c[2], &c[3])),
        Tier::Monthly => MONTHLY_NAME
            .captures(filename)
            .map(|c| format!("{}-{}", &c[2], &c[3])),
    }
}

/// Scan the tier directories under `data_dir` and build the sorted catalog.
/// Files that do not match the naming scheme are skipped with a warning; a
/// data dir with no products yields an empty catalog, not an error.
pub fn build_catalog(data_dir: &Path) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();

    for tier in Tier::ALL {
        let pattern = format!("{}/*.csv", data_dir.join(tier.dir_name()).display());
        for path in glob(&pattern)?.filter_map(|e| e.ok()) {
            let filename = match path.file_name().and_then(|f| f.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            let period = match period_of(tier, &filename) {
                Some(p) => p,
                None => {
                    warn!(tier = tier.label(), file = %filename, "unrecognized partition filename, skipping");
                    continue;
                }
            };
            let size_bytes = match fs::metadata(&path) {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!("cannot stat {:?}: {}", path, e);
                    continue;
                }
            };
            let rows = match sidecar::read(&path) {
                Ok(meta) => meta.row_count,
                Err(e) => {
                    debug!("no sidecar for {:?} ({:#}), estimating rows", path, e);
                    size_bytes / EST_BYTES_PER_ROW
                }
            };

            entries.push(CatalogEntry {
                download_url: format!("/download/{}", filename),
                description: describe(tier, &period),
                price: price(tier, rows),
                filename,
                tier,
                period,
                rows,
                size_bytes,
            });
        }
    }

    entries.sort_by(|a, b| (a.tier, &a.period).cmp(&(b.tier, &b.period)));
    Ok(entries)
}

/// Bucket catalog entries by vertical via filename-prefix matching. Entries
/// matching no known slug stay in the flat catalog but are omitted here.
pub fn group_by_vertical(entries: &[CatalogEntry]) -> BTreeMap<&'static str, Vec<CatalogEntry>> {
    let mut groups: BTreeMap<&'static str, Vec<CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        let vertical = Vertical::ALL
            .iter()
            .find(|v| entry.filename.starts_with(&format!("{}_", v.slug())));
        if let Some(v) = vertical {
            groups.entry(v.slug()).or_default().push(entry.clone());
        }
    }
    groups
}

static SAFE_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+\.csv$").unwrap());

/// True when `name` could only have been produced by this engine's naming
/// scheme: one path component, no separators, no traversal.
pub fn is_safe_product_filename(name: &str) -> bool {
    SAFE_FILENAME.is_match(name)
}

/// Resolve a requested product filename to its on-disk path. The name is
/// validated before any filesystem lookup; an invalid or missing name is a
/// clean `None`, never an error.
pub fn resolve_download(data_dir: &Path, name: &str) -> Option<PathBuf> {
    if !is_safe_product_filename(name) {
        warn!(name, "rejected unsafe download name");
        return None;
    }
    Tier::ALL
        .iter()
        .map(|t| data_dir.join(t.dir_name()).join(name))
        .find(|p| p.is_file())
}
