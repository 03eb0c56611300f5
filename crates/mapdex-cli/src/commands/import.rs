use anyhow::{Context, Result};
use mapdex_etl::{ingest_query_result, Config};
use std::path::Path;

pub fn run_import(config: &Config, file: &Path, query: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let result: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let catalog = super::open_catalog(config);
    let before = catalog.stats().records;

    let hits = ingest_query_result(&catalog, &result, query.unwrap_or_default())?;
    println!(
        "✓ Imported {}: catalog now has {} records ({} before)",
        file.display(),
        catalog.stats().records,
        before
    );

    if let Some(query) = query {
        println!("\n{} results for {:?}:", hits.len(), query);
        for record in &hits {
            println!("  {}", super::search::summary_line(record));
        }
    }

    super::close_catalog(&catalog, config);
    Ok(())
}
