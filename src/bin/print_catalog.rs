use anyhow::Result;
use dataforge::config::PipelineConfig;
use dataforge::products::catalog::{build_catalog, group_by_vertical};

/// Render the current on-disk catalog as a table, grouped by vertical.
fn main() -> Result<()> {
    let config = PipelineConfig::from_env();
    let entries = build_catalog(&config.data_dir)?;
    if entries.is_empty() {
        println!("no products under {:?}", config.data_dir);
        return Ok(());
    }

    let groups = group_by_vertical(&entries);
    for (slug, products) in &groups {
        println!("\n{}", slug);
        println!("{:-<78}", "");
        println!(
            "{: <38} {: <10} {:>10} {:>8} {:>8}",
            "file", "period", "rows", "size", "price"
        );
        for p in products {
            println!(
                "{: <38} {: <10} {:>10} {:>7}K {:>7}$",
                p.filename,
                p.period,
                p.rows,
                p.size_bytes / 1024,
                p.price
            );
        }
    }

    let grouped: usize = groups.values().map(Vec::len).sum();
    if grouped < entries.len() {
        println!("\n({} entries matched no known vertical)", entries.len() - grouped);
    }
    Ok(())
}
