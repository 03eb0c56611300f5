use anyhow::{Context, Result};
use mapdex_etl::{spawn_scan, Config, ImportError};
use std::path::PathBuf;

pub async fn run_scan(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let songs_dir = path.or_else(|| config.songs_dir.clone()).context(
        "No levels directory given.\n\nPass a path or set songs_dir with 'mapdex config set songs_dir <path>'.",
    )?;
    if !songs_dir.is_dir() {
        anyhow::bail!("Not a directory: {}", songs_dir.display());
    }

    let catalog = super::open_catalog(config);
    let before = catalog.stats().records;

    println!("  ⏳ Scanning {}...", songs_dir.display());
    let handle = spawn_scan(&catalog, songs_dir).ok_or(ImportError::Busy)?;
    let summary = handle.await.context("Scan task failed")??;

    println!("  ✓ Scan complete\n");
    println!("  Levels found:     {}", summary.found);
    println!("  Added:            {}", summary.added);
    println!("  Relocated:        {}", summary.relocated);
    println!("  Already known:    {}", summary.skipped);
    if summary.failed > 0 {
        println!("  Unreadable:       {}", summary.failed);
    }
    if summary.malformed > 0 {
        println!("  Malformed:        {}", summary.malformed);
    }
    println!(
        "\n  Catalog: {} records ({} before)",
        catalog.stats().records,
        before
    );

    super::close_catalog(&catalog, config);
    Ok(())
}
