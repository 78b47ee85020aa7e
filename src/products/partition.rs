//! Re-derive every date-bounded partition of a master table and materialize
//! each as an independent CSV file with a metadata sidecar.
//!
//! Partitions are views, not logs: each run recomputes the full set from the
//! master snapshot and replaces what is on disk, so partition files can never
//! drift from the source of truth. Files whose period no longer exists in the
//! fresh set are swept afterwards.

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use glob::glob;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use super::sidecar::{self, PartitionMeta};
use super::{describe, Tier};
use crate::generate::Vertical;
use crate::store::Table;

/// A concrete (tier, period) pair. Variant order mirrors tier rank and the
/// fields sort chronologically, so the derived `Ord` is catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    Bundle,
    Year(i32),
    Quarter(i32, u32),
    Month(i32, u32),
}

impl PeriodKey {
    pub fn tier(self) -> Tier {
        match self {
            PeriodKey::Bundle => Tier::Bundle,
            PeriodKey::Year(_) => Tier::Yearly,
            PeriodKey::Quarter(..) => Tier::Quarterly,
            PeriodKey::Month(..) => Tier::Monthly,
        }
    }

    /// Human period label. Zero-padded so lexical order is chronological.
    pub fn label(self) -> String {
        match self {
            PeriodKey::Bundle => "All Time".to_string(),
            PeriodKey::Year(y) => format!("{}", y),
            PeriodKey::Quarter(y, q) => format!("{}-Q{}", y, q),
            PeriodKey::Month(y, m) => format!("{}-{:02}", y, m),
        }
    }

    /// On-disk filename for this period of `slug`.
    pub fn file_name(self, slug: &str) -> String {
        match self {
            PeriodKey::Bundle => format!("{}_FULL.csv", slug),
            PeriodKey::Year(y) => format!("{}_{}.csv", slug, y),
            PeriodKey::Quarter(y, q) => format!("{}_{}_Q{}.csv", slug, y, q),
            PeriodKey::Month(y, m) => format!("{}_{}_{:02}.csv", slug, y, m),
        }
    }

    pub fn description(self) -> String {
        describe(self.tier(), &self.label())
    }
}

pub fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

/// Group a master snapshot into its full partition hierarchy. Every record
/// lands in the bundle, exactly one year, one quarter and one month; only
/// periods with at least one record appear.
pub fn partition(table: &Table) -> BTreeMap<PeriodKey, Vec<usize>> {
    let mut groups: BTreeMap<PeriodKey, Vec<usize>> = BTreeMap::new();
    for i in 0..table.len() {
        let d = table.date_at(i);
        groups.entry(PeriodKey::Bundle).or_default().push(i);
        groups.entry(PeriodKey::Year(d.year())).or_default().push(i);
        groups
            .entry(PeriodKey::Quarter(d.year(), quarter_of(d.month())))
            .or_default()
            .push(i);
        groups
            .entry(PeriodKey::Month(d.year(), d.month()))
            .or_default()
            .push(i);
    }
    groups
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionReport {
    pub written: usize,
    pub failed: usize,
    pub swept: usize,
}

/// Write the complete partition set for one vertical under `data_dir`,
/// replacing prior files, then sweep files of this vertical whose period is
/// no longer present. Individual write failures are logged and do not stop
/// the remaining partitions.
#[instrument(level = "info", skip(data_dir, table), fields(vertical = vertical.slug(), rows = table.len()))]
pub fn write_partitions(
    data_dir: &Path,
    vertical: Vertical,
    table: &Table,
) -> Result<PartitionReport> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
        .ok();

    for tier in Tier::ALL {
        let dir = data_dir.join(tier.dir_name());
        fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    }

    let slug = vertical.slug();
    let groups: Vec<(PeriodKey, Vec<usize>)> = partition(table).into_iter().collect();

    let results: Vec<(PeriodKey, Result<PathBuf>)> = groups
        .par_iter()
        .map(|(key, indices)| {
            let path = data_dir
                .join(key.tier().dir_name())
                .join(key.file_name(slug));
            let res = write_one(&path, *key, table, indices);
            (*key, res.map(|_| path))
        })
        .collect();

    let mut report = PartitionReport::default();
    let mut fresh: HashSet<PathBuf> = HashSet::new();
    for (key, res) in results {
        match res {
            Ok(path) => {
                report.written += 1;
                fresh.insert(path);
            }
            Err(e) => {
                report.failed += 1;
                error!(vertical = slug, period = %key.label(), "partition write failed: {:#}", e);
            }
        }
    }

    report.swept = sweep_stale(data_dir, slug, &fresh);
    info!(
        written = report.written,
        failed = report.failed,
        swept = report.swept,
        "partition set materialized"
    );
    Ok(report)
}

fn write_one(path: &Path, key: PeriodKey, table: &Table, indices: &[usize]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating temporary file {:?}", tmp))?;
        wtr.write_record(table.headers())
            .with_context(|| format!("writing header to {:?}", tmp))?;
        for &i in indices {
            wtr.write_record(&table.records()[i])
                .with_context(|| format!("writing record to {:?}", tmp))?;
        }
        wtr.flush().with_context(|| format!("flushing {:?}", tmp))?;
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;

    let meta = PartitionMeta {
        tier: key.tier().label().to_string(),
        period: key.label(),
        row_count: indices.len() as u64,
        generated_at: Utc::now(),
    };
    // metadata is advisory; the catalog falls back to an estimate without it
    if let Err(e) = sidecar::write(path, &meta) {
        warn!("sidecar write failed for {:?}: {:#}", path, e);
    }
    Ok(())
}

/// Delete partition files for `slug` that are not part of the fresh set,
/// along with their sidecars. Returns how many files were removed.
fn sweep_stale(data_dir: &Path, slug: &str, fresh: &HashSet<PathBuf>) -> usize {
    let mut swept = 0;
    for tier in Tier::ALL {
        let pattern = format!(
            "{}/{}_*.csv",
            data_dir.join(tier.dir_name()).display(),
            slug
        );
        let entries = match glob(&pattern) {
            Ok(e) => e,
            Err(e) => {
                warn!("invalid sweep pattern {}: {}", pattern, e);
                continue;
            }
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if fresh.contains(&entry) {
                continue;
            }
            match fs::remove_file(&entry) {
                Ok(()) => {
                    swept += 1;
                    let _ = fs::remove_file(sidecar::meta_path(&entry));
                    info!("swept stale partition {:?}", entry);
                }
                Err(e) => warn!("failed to sweep {:?}: {}", entry, e),
            }
        }
    }
    swept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn table_with_dates(dates: &[&str]) -> Table {
        let headers = vec!["company".to_string(), "date".to_string()];
        let records = dates
            .iter()
            .map(|d| vec!["acme".to_string(), d.to_string()])
            .collect();
        Table::new(headers, records).unwrap()
    }

    #[test]
    fn every_row_lands_in_exactly_one_partition_per_tier() {
        let table = table_with_dates(&[
            "2024-12-31",
            "2025-01-15",
            "2025-02-01",
            "2025-04-01",
            "2025-12-31",
        ]);
        let groups = partition(&table);

        let count_for = |tier: Tier| -> usize {
            groups
                .iter()
                .filter(|(k, _)| k.tier() == tier)
                .map(|(_, v)| v.len())
                .sum()
        };
        assert_eq!(groups[&PeriodKey::Bundle].len(), table.len());
        assert_eq!(count_for(Tier::Yearly), table.len());
        assert_eq!(count_for(Tier::Quarterly), table.len());
        assert_eq!(count_for(Tier::Monthly), table.len());

        // spanned periods only
        assert!(groups.contains_key(&PeriodKey::Year(2024)));
        assert!(groups.contains_key(&PeriodKey::Year(2025)));
        assert!(groups.contains_key(&PeriodKey::Quarter(2025, 1)));
        assert!(groups.contains_key(&PeriodKey::Quarter(2025, 2)));
        assert!(!groups.contains_key(&PeriodKey::Quarter(2025, 3)));
        assert!(groups.contains_key(&PeriodKey::Month(2024, 12)));
        assert!(!groups.contains_key(&PeriodKey::Month(2025, 3)));
    }

    #[test]
    fn empty_table_produces_no_partitions() {
        let table = table_with_dates(&[]);
        assert!(partition(&table).is_empty());
    }

    #[test]
    fn partitioning_is_deterministic() {
        let table = table_with_dates(&["2025-01-01", "2025-06-30", "2025-07-01"]);
        assert_eq!(partition(&table), partition(&table));
    }

    #[test]
    fn quarters_follow_the_calendar() {
        assert_eq!(quarter_of(1), 1);
        assert_eq!(quarter_of(3), 1);
        assert_eq!(quarter_of(4), 2);
        assert_eq!(quarter_of(12), 4);
    }

    #[test]
    fn filenames_encode_slug_and_period() {
        assert_eq!(PeriodKey::Bundle.file_name("x"), "x_FULL.csv");
        assert_eq!(PeriodKey::Year(2025).file_name("x"), "x_2025.csv");
        assert_eq!(PeriodKey::Quarter(2025, 3).file_name("x"), "x_2025_Q3.csv");
        assert_eq!(PeriodKey::Month(2025, 7).file_name("x"), "x_2025_07.csv");
    }

    #[test]
    fn write_partitions_materializes_files_and_sidecars() {
        let tmp = tempdir().unwrap();
        let table = table_with_dates(&["2025-01-10", "2025-01-20", "2025-05-01"]);

        let report = write_partitions(tmp.path(), Vertical::Fintech, &table).unwrap();
        assert_eq!(report.failed, 0);
        // bundle + 1 year + 2 quarters + 2 months
        assert_eq!(report.written, 6);

        let slug = Vertical::Fintech.slug();
        let jan = tmp
            .path()
            .join("monthly")
            .join(format!("{}_2025_01.csv", slug));
        assert!(jan.is_file());
        let meta = sidecar::read(&jan).unwrap();
        assert_eq!(meta.row_count, 2);
        assert_eq!(meta.period, "2025-01");
        assert!(tmp
            .path()
            .join("bundles")
            .join(format!("{}_FULL.csv", slug))
            .is_file());
    }

    #[test]
    fn stale_partitions_are_swept() {
        let tmp = tempdir().unwrap();
        let slug = Vertical::Fintech.slug();
        let yearly = tmp.path().join("yearly");
        fs::create_dir_all(&yearly).unwrap();
        let stale = yearly.join(format!("{}_1999.csv", slug));
        fs::write(&stale, "company,date\n").unwrap();

        let table = table_with_dates(&["2025-01-10"]);
        let report = write_partitions(tmp.path(), Vertical::Fintech, &table).unwrap();
        assert_eq!(report.swept, 1);
        assert!(!stale.exists());
        assert!(yearly.join(format!("{}_2025.csv", slug)).is_file());
    }

    #[test]
    fn sweep_leaves_other_verticals_alone() {
        let tmp = tempdir().unwrap();
        let other = tmp.path().join("yearly");
        fs::create_dir_all(&other).unwrap();
        let foreign = other.join("esg_sentiment_tracker_2024.csv");
        fs::write(&foreign, "company,date\n").unwrap();

        let table = table_with_dates(&["2025-01-10"]);
        write_partitions(tmp.path(), Vertical::Fintech, &table).unwrap();
        assert!(foreign.exists());
    }

    #[test]
    fn one_failed_partition_does_not_stop_the_rest() {
        let tmp = tempdir().unwrap();
        let slug = Vertical::Fintech.slug();
        // occupy the monthly target path with a directory so its rename fails
        let monthly = tmp.path().join("monthly");
        fs::create_dir_all(monthly.join(format!("{}_2025_01.csv", slug))).unwrap();

        let table = table_with_dates(&["2025-01-10"]);
        let report = write_partitions(tmp.path(), Vertical::Fintech, &table).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.written, 3);
        assert!(tmp
            .path()
            .join("yearly")
            .join(format!("{}_2025.csv", slug))
            .is_file());
    }
}
