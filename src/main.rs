use anyhow::Result;
use chrono::Utc;
use dataforge::{config::PipelineConfig, pipeline, products::catalog};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) configure ────────────────────────────────────────────────
    let config = PipelineConfig::from_env();
    info!(
        data_dir = %config.data_dir.display(),
        backfill_days = config.backfill_days,
        workers = config.workers,
        "configured"
    );

    // ─── 3) run the pipeline once ────────────────────────────────────
    let as_of = Utc::now().date_naive();
    let report = pipeline::run_pipeline(&config, as_of).await?;

    let failed = report.verticals.iter().filter(|r| !r.ok()).count();
    if failed > 0 {
        warn!(failed, "run finished with failed verticals");
    }
    match &report.ledger {
        Some(l) => info!(
            added_bytes = l.total_added_bytes,
            total_bytes = l.total_data_size_bytes,
            "ledger recorded"
        ),
        None => warn!("ledger not recorded this run"),
    }

    // ─── 4) summarize the resulting catalog ──────────────────────────
    let entries = catalog::build_catalog(&config.data_dir)?;
    info!(products = entries.len(), "catalog ready");

    Ok(())
}
