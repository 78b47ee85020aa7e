use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup.
///
/// Everything is environment-driven with sane defaults so the binary can run
/// bare in a container: `DATA_DIR`, `BACKFILL_DAYS`, `PIPELINE_WORKERS`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the on-disk product tree (master store, tier dirs, status file).
    pub data_dir: PathBuf,
    /// Historical window generated when a vertical has no master store yet.
    /// The window is inclusive of the run date, so a value of 365 yields 366
    /// distinct dates.
    pub backfill_days: u32,
    /// Upper bound on verticals processed concurrently.
    pub workers: usize,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let backfill_days = env::var("BACKFILL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(365);
        let workers = env::var("PIPELINE_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&w| w > 0)
            .unwrap_or(5);

        Self {
            data_dir: PathBuf::from(data_dir),
            backfill_days,
            workers,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backfill_days: 365,
            workers: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.backfill_days, 365);
        assert_eq!(cfg.workers, 5);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }
}
