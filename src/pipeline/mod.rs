//! One pipeline run: per-vertical generate -> merge -> partition on bounded
//! parallel workers, then a ledger record of what the run added.
//!
//! Verticals are independent; a failure in one is classified, logged and
//! reported without touching the others. Concurrent runs over the same data
//! dir are not safe (overwrite-on-regenerate would race), so a run takes a
//! best-effort lock file for its duration.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::generate::{RowGenerator, Vertical};
use crate::ledger::{self, StatusLedger};
use crate::products::partition::{write_partitions, PartitionReport};
use crate::store::{merge_day, CsvMasterStore, MasterStore, MergeError, MergeOutcome, StoreError, TableError};

/// Which stage a vertical failed in. Mirrors the failure isolation rules:
/// generation and merge failures leave the previous store state in place,
/// schema failures skip partitioning only, partition failures are already
/// per-file and only surface here when the whole set could not be attempted.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("row generation failed: {0:#}")]
    Generation(anyhow::Error),
    #[error("master store merge failed: {0:#}")]
    Merge(anyhow::Error),
    #[error("master table schema invalid: {0}")]
    Schema(#[source] TableError),
    #[error("partitioning failed: {0:#}")]
    Partition(anyhow::Error),
}

impl From<MergeError> for StageError {
    fn from(e: MergeError) -> Self {
        match e {
            MergeError::Generation { date, cause } => {
                StageError::Generation(cause.context(format!("for {}", date)))
            }
            MergeError::Store(StoreError::Schema(e)) => StageError::Schema(e),
            MergeError::Store(StoreError::Io(e)) => StageError::Merge(e),
        }
    }
}

impl From<StoreError> for StageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Schema(e) => StageError::Schema(e),
            StoreError::Io(e) => StageError::Merge(e),
        }
    }
}

#[derive(Debug)]
pub struct VerticalReport {
    pub vertical: Vertical,
    pub merge: Option<MergeOutcome>,
    pub partitions: Option<PartitionReport>,
    pub error: Option<StageError>,
}

impl VerticalReport {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub as_of: NaiveDate,
    pub verticals: Vec<VerticalReport>,
    pub ledger: Option<StatusLedger>,
}

/// Process one vertical end to end: merge the day's rows into the master
/// store, then re-derive its partition set from the durably written result.
pub fn run_vertical(
    store: &dyn MasterStore,
    generator: &dyn RowGenerator,
    data_dir: &Path,
    vertical: Vertical,
    as_of: NaiveDate,
    backfill_days: u32,
) -> VerticalReport {
    let mut report = VerticalReport {
        vertical,
        merge: None,
        partitions: None,
        error: None,
    };

    let outcome = match merge_day(store, generator, vertical, as_of, backfill_days) {
        Ok(o) => o,
        Err(e) => {
            report.error = Some(e.into());
            return report;
        }
    };
    report.merge = Some(outcome);

    // partition from the persisted store, not the in-memory table, so what
    // the catalog sees is exactly what survived the durable write
    let table = match store.load(vertical) {
        Ok(t) => t,
        Err(e) => {
            report.error = Some(e.into());
            return report;
        }
    };

    match write_partitions(data_dir, vertical, &table) {
        Ok(p) => report.partitions = Some(p),
        Err(e) => report.error = Some(StageError::Partition(e)),
    }
    report
}

/// Exclusive-run marker: created with `create_new` so a second concurrent
/// run fails fast instead of racing the first one's overwrites. Removed on
/// drop.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(".run.lock");
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                bail!("another pipeline run holds {:?}", path)
            }
            Err(e) => Err(e).with_context(|| format!("acquiring run lock {:?}", path)),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Run the whole pipeline once for `as_of`: snapshot sizes, process every
/// vertical on bounded workers, snapshot again, record the delta.
pub async fn run_pipeline(config: &PipelineConfig, as_of: NaiveDate) -> Result<PipelineReport> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {:?}", config.data_dir))?;
    let _lock = RunLock::acquire(&config.data_dir)?;

    let before = ledger::snapshot_sizes(&config.data_dir);
    let store = Arc::new(CsvMasterStore::new(&config.data_dir)?);
    let sem = Arc::new(Semaphore::new(config.workers));

    let mut handles = Vec::with_capacity(Vertical::ALL.len());
    for vertical in Vertical::ALL {
        let store = Arc::clone(&store);
        let sem = Arc::clone(&sem);
        let data_dir = config.data_dir.clone();
        let backfill_days = config.backfill_days;

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire().await.expect("semaphore closed");
            tokio::task::spawn_blocking(move || {
                run_vertical(
                    store.as_ref(),
                    vertical.generator(),
                    &data_dir,
                    vertical,
                    as_of,
                    backfill_days,
                )
            })
            .await
            .expect("vertical worker panicked")
        }));
    }

    let mut verticals = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle.await.context("joining vertical task")?;
        match &report.error {
            None => {
                let merge = report.merge.as_ref().expect("merge outcome present on success");
                info!(
                    vertical = report.vertical.slug(),
                    backfilled = merge.backfilled,
                    rows = merge.total_rows,
                    "vertical complete"
                );
            }
            Some(e) => {
                error!(vertical = report.vertical.slug(), "vertical failed: {:#}", e);
            }
        }
        verticals.push(report);
    }

    let after = ledger::snapshot_sizes(&config.data_dir);
    let ledger = ledger::record_run(&config.data_dir, &before, &after);

    Ok(PipelineReport {
        as_of,
        verticals,
        ledger,
    })
}
