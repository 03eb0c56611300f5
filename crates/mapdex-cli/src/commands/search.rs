use anyhow::Result;
use mapdex_core::{Field, Record};
use mapdex_etl::Config;

/// One-line description of a record for listings.
pub fn summary_line(record: &Record) -> String {
    let mut parts = vec![format!("[{}] {}", record.catalog_id(), record.display_name())];

    if let Some(author) = record.text(Field::AuthorName).filter(|a| !a.is_empty()) {
        parts.push(format!("- {author}"));
    }
    if let Some(mapper) = record.text(Field::LevelAuthor).filter(|m| !m.is_empty()) {
        parts.push(format!("(mapped by {mapper})"));
    }
    if let Some(length) = record.text(Field::SongLength) {
        parts.push(length);
    }
    if record.has_score() {
        parts.push(format!("{:.0}pp", record.score()));
    }
    parts.join(" ")
}

pub fn run_search(config: &Config, query: &str, limit: usize, json: bool) -> Result<()> {
    let catalog = super::open_catalog(config);
    let hits = catalog.search(query)?;

    if hits.is_empty() {
        println!("No matches for {:?}", query);
        return Ok(());
    }

    if json {
        let documents: Vec<serde_json::Value> = hits
            .iter()
            .take(limit)
            .map(|record| serde_json::Value::Object(record.attributes().clone()))
            .collect();
        println!("{}", serde_json::to_string_pretty(&documents)?);
        return Ok(());
    }

    println!("{} results for {:?}:\n", hits.len(), query);
    for record in hits.iter().take(limit) {
        println!("  {}", summary_line(record));
    }
    if hits.len() > limit {
        println!("\n  ... {} more (use --limit to show them)", hits.len() - limit);
    }

    Ok(())
}

pub fn run_lookup(config: &Config, key: &str) -> Result<()> {
    let catalog = super::open_catalog(config);
    let key = key.trim().to_lowercase();

    let Some(record) = catalog.lookup(&key).or_else(|| catalog.lookup_hash(&key)) else {
        anyhow::bail!("No record with id, version or hash {:?}", key);
    };

    println!("{}\n", summary_line(&record));
    println!("  Catalog id: {}", record.catalog_id());
    println!("  Version:    {}", record.version());
    if let Some(path) = record.local_path() {
        println!("  Location:   {}", path.display());
    }
    println!(
        "\n{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(record.attributes().clone()))?
    );

    Ok(())
}
