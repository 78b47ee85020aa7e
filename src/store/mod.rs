//! Master store: the single writable source of truth per vertical.
//!
//! One CSV file per vertical, replaced atomically on every merge so a failed
//! run can never leave a half-written store behind.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::generate::{date_range, RowGenerator, Vertical};

pub mod table;

pub use table::{Table, TableError, DATE_COLUMNS};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o: {0:#}")]
    Io(anyhow::Error),
    #[error(transparent)]
    Schema(#[from] TableError),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("row generation failed for {date}: {cause:#}")]
    Generation {
        date: NaiveDate,
        cause: anyhow::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence boundary for master tables. The pipeline only talks to this
/// trait, so tests can run against a temp-dir store and the production CSV
/// layout stays an implementation detail.
pub trait MasterStore: Sync {
    fn exists(&self, vertical: Vertical) -> bool;
    fn load(&self, vertical: Vertical) -> Result<Table, StoreError>;
    fn save(&self, vertical: Vertical, table: &Table) -> Result<(), StoreError>;
}

/// CSV-on-disk master store: `<data_dir>/master/<slug>.csv`.
pub struct CsvMasterStore {
    master_dir: PathBuf,
}

impl CsvMasterStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let master_dir = data_dir.as_ref().join("master");
        fs::create_dir_all(&master_dir)
            .with_context(|| format!("creating master directory {:?}", master_dir))?;
        Ok(Self { master_dir })
    }

    pub fn path_for(&self, vertical: Vertical) -> PathBuf {
        self.master_dir.join(format!("{}.csv", vertical.slug()))
    }
}

impl MasterStore for CsvMasterStore {
    fn exists(&self, vertical: Vertical) -> bool {
        self.path_for(vertical).is_file()
    }

    fn load(&self, vertical: Vertical) -> Result<Table, StoreError> {
        let path = self.path_for(vertical);
        let (headers, records) = read_csv(&path).map_err(StoreError::Io)?;
        Ok(Table::new(headers, records)?)
    }

    fn save(&self, vertical: Vertical, table: &Table) -> Result<(), StoreError> {
        let path = self.path_for(vertical);
        write_csv_atomic(&path, table.headers(), table.records()).map_err(StoreError::Io)
    }
}

/// Read a headered CSV file into (headers, records).
pub fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {:?}", path))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {:?}", path))?
        .iter()
        .map(String::from)
        .collect();
    let mut records = Vec::new();
    for rec in rdr.records() {
        let rec = rec.with_context(|| format!("reading record from {:?}", path))?;
        records.push(rec.iter().map(String::from).collect());
    }
    Ok((headers, records))
}

/// Write a headered CSV to `path` via a sibling `.tmp` file and an atomic
/// rename, so readers never observe a partial file.
pub fn write_csv_atomic(path: &Path, headers: &[String], records: &[Vec<String>]) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)
            .with_context(|| format!("creating temporary file {:?}", tmp))?;
        wtr.write_record(headers)
            .with_context(|| format!("writing header to {:?}", tmp))?;
        for rec in records {
            wtr.write_record(rec)
                .with_context(|| format!("writing record to {:?}", tmp))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {:?}", tmp))?;
    }
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}

/// What one `merge_day` call did to a vertical's master table.
#[derive(Debug, Clone, Copy)]
pub struct MergeOutcome {
    /// True when no store existed and the historical window was generated.
    pub backfilled: bool,
    /// Records merged in by this run.
    pub rows_merged: usize,
    /// Same-day records replaced (overwrite-on-regenerate).
    pub rows_replaced: usize,
    /// Store size after the merge.
    pub total_rows: usize,
}

/// Merge one day's generated rows into a vertical's master table.
///
/// First run (no store): the generator is called once per day across the
/// backfill window, inclusive of `as_of`. Subsequent runs regenerate `as_of`
/// only, replacing any rows already recorded for that date, so re-running the
/// same day is idempotent. Either way the result is deduplicated by event key
/// (the generator's id column when declared, else (entity, date), last merge
/// wins) and persisted atomically before this returns.
pub fn merge_day(
    store: &dyn MasterStore,
    generator: &dyn RowGenerator,
    vertical: Vertical,
    as_of: NaiveDate,
    backfill_days: u32,
) -> Result<MergeOutcome, MergeError> {
    let generate = |date: NaiveDate| {
        generator
            .generate(date)
            .map_err(|cause| MergeError::Generation { date, cause })
    };

    let headers: Vec<String> = generator.headers().iter().map(|h| h.to_string()).collect();

    let (mut table, backfilled, rows_merged, rows_replaced) = if !store.exists(vertical) {
        let dates = date_range(as_of, backfill_days);
        info!(
            vertical = vertical.slug(),
            days = dates.len(),
            "no master store, backfilling"
        );
        let mut records = Vec::new();
        for date in dates {
            records.extend(generate(date)?);
        }
        let merged = records.len();
        let table = Table::new(headers, records).map_err(StoreError::from)?;
        (table, true, merged, 0)
    } else {
        let mut table = store.load(vertical)?;
        let fresh = generate(as_of)?;
        let replaced = table.remove_date(as_of);
        let merged = table.append(fresh).map_err(StoreError::from)?;
        debug!(
            vertical = vertical.slug(),
            merged, replaced, "daily merge applied"
        );
        (table, false, merged, replaced)
    };

    let keys = event_key_columns(&table, generator).map_err(StoreError::from)?;
    let dropped = table.dedup_last(&keys);
    if dropped > 0 {
        debug!(vertical = vertical.slug(), dropped, "dropped duplicate event keys");
    }

    store.save(vertical, &table)?;

    Ok(MergeOutcome {
        backfilled,
        rows_merged,
        rows_replaced,
        total_rows: table.len(),
    })
}

/// Column indices forming the event key for this generator's schema.
pub fn event_key_columns(
    table: &Table,
    generator: &dyn RowGenerator,
) -> Result<Vec<usize>, TableError> {
    if let Some(id) = generator.id_column() {
        let idx = table
            .column_index(id)
            .ok_or_else(|| TableError::UnknownColumn(id.to_string()))?;
        return Ok(vec![idx]);
    }
    let entity = generator.entity_column();
    let entity_idx = table
        .column_index(entity)
        .ok_or_else(|| TableError::UnknownColumn(entity.to_string()))?;
    Ok(vec![entity_idx, table.date_column()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Scripted generator: every call emits one row per entity with a value
    /// that identifies the generation batch, so overwrite semantics are
    /// observable.
    struct ScriptedGenerator {
        batch: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new() -> Self {
            Self {
                batch: AtomicUsize::new(0),
            }
        }
    }

    impl RowGenerator for ScriptedGenerator {
        fn headers(&self) -> &'static [&'static str] {
            &["company", "date", "value"]
        }

        fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
            let batch = self.batch.fetch_add(1, Ordering::SeqCst);
            Ok(["alpha", "beta"]
                .iter()
                .map(|e| {
                    vec![
                        e.to_string(),
                        date.format("%Y-%m-%d").to_string(),
                        format!("batch{}", batch),
                    ]
                })
                .collect())
        }
    }

    struct FailingGenerator;

    impl RowGenerator for FailingGenerator {
        fn headers(&self) -> &'static [&'static str] {
            &["company", "date"]
        }

        fn generate(&self, _date: NaiveDate) -> Result<Vec<Vec<String>>> {
            Err(anyhow!("upstream unavailable"))
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cold_start_backfills_window_plus_one_days() {
        let tmp = tempdir().unwrap();
        let store = CsvMasterStore::new(tmp.path()).unwrap();
        let gen = ScriptedGenerator::new();

        let outcome =
            merge_day(&store, &gen, Vertical::Fintech, day(2025, 6, 30), 10).unwrap();
        assert!(outcome.backfilled);
        // 11 dates x 2 entities
        assert_eq!(outcome.total_rows, 22);

        let table = store.load(Vertical::Fintech).unwrap();
        assert_eq!(table.len(), 22);
    }

    #[test]
    fn same_day_rerun_replaces_rather_than_duplicates() {
        let tmp = tempdir().unwrap();
        let store = CsvMasterStore::new(tmp.path()).unwrap();
        let gen = ScriptedGenerator::new();
        let as_of = day(2025, 6, 30);

        merge_day(&store, &gen, Vertical::Fintech, as_of, 3).unwrap();
        let first = store.load(Vertical::Fintech).unwrap();
        assert_eq!(first.len(), 8);

        let outcome = merge_day(&store, &gen, Vertical::Fintech, as_of, 3).unwrap();
        assert!(!outcome.backfilled);
        assert_eq!(outcome.rows_replaced, 2);
        assert_eq!(outcome.total_rows, 8);

        // the as_of rows must come from the most recent generation batch
        let table = store.load(Vertical::Fintech).unwrap();
        let last_batch: Vec<_> = table
            .records()
            .iter()
            .filter(|r| r[1] == "2025-06-30")
            .map(|r| r[2].clone())
            .collect();
        assert_eq!(last_batch.len(), 2);
        assert!(last_batch.iter().all(|v| v == "batch4"));
    }

    #[test]
    fn no_duplicate_event_keys_after_any_merge_sequence() {
        let tmp = tempdir().unwrap();
        let store = CsvMasterStore::new(tmp.path()).unwrap();
        let gen = ScriptedGenerator::new();

        merge_day(&store, &gen, Vertical::Esg, day(2025, 6, 29), 5).unwrap();
        merge_day(&store, &gen, Vertical::Esg, day(2025, 6, 30), 5).unwrap();
        merge_day(&store, &gen, Vertical::Esg, day(2025, 6, 30), 5).unwrap();

        let table = store.load(Vertical::Esg).unwrap();
        let keys = event_key_columns(&table, &gen).unwrap();
        assert_eq!(table.distinct_keys(&keys), table.len());
        // 6 backfill dates + 1 new day
        assert_eq!(table.len(), 14);
    }

    #[test]
    fn generation_failure_leaves_existing_store_untouched() {
        let tmp = tempdir().unwrap();
        let store = CsvMasterStore::new(tmp.path()).unwrap();
        let gen = ScriptedGenerator::new();

        merge_day(&store, &gen, Vertical::Fintech, day(2025, 6, 29), 2).unwrap();
        let before = store.load(Vertical::Fintech).unwrap().len();

        let err = merge_day(
            &store,
            &FailingGenerator,
            Vertical::Fintech,
            day(2025, 6, 30),
            2,
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::Generation { .. }));

        let after = store.load(Vertical::Fintech).unwrap().len();
        assert_eq!(before, after);
    }

    #[test]
    fn explicit_id_column_wins_over_entity_date() {
        struct IdGenerator;
        impl RowGenerator for IdGenerator {
            fn headers(&self) -> &'static [&'static str] {
                &["event_id", "company", "date"]
            }
            fn id_column(&self) -> Option<&'static str> {
                Some("event_id")
            }
            fn generate(&self, date: NaiveDate) -> Result<Vec<Vec<String>>> {
                // two rows sharing (company, date) but with distinct ids
                Ok(vec![
                    vec![
                        "e1".into(),
                        "alpha".into(),
                        date.format("%Y-%m-%d").to_string(),
                    ],
                    vec![
                        "e2".into(),
                        "alpha".into(),
                        date.format("%Y-%m-%d").to_string(),
                    ],
                ])
            }
        }

        let tmp = tempdir().unwrap();
        let store = CsvMasterStore::new(tmp.path()).unwrap();
        let outcome =
            merge_day(&store, &IdGenerator, Vertical::Fintech, day(2025, 6, 30), 0).unwrap();
        // both rows survive because their ids differ
        assert_eq!(outcome.total_rows, 2);
    }

    #[test]
    fn csv_round_trip_preserves_records() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("t.csv");
        let headers = vec!["a".to_string(), "b".to_string()];
        let records = vec![
            vec!["1".to_string(), "with, comma".to_string()],
            vec!["2".to_string(), "plain".to_string()],
        ];
        write_csv_atomic(&path, &headers, &records).unwrap();
        let (h, r) = read_csv(&path).unwrap();
        assert_eq!(h, headers);
        assert_eq!(r, records);
        // no stray tmp file left behind
        assert!(!path.with_extension("csv.tmp").exists());
    }
}
