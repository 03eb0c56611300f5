use anyhow::Result;
use mapdex_etl::Config;

pub fn show_status(config: &Config) -> Result<()> {
    let catalog = super::open_catalog(config);
    let stats = catalog.stats();

    println!("\n📊 mapdex Status\n");
    match catalog.snapshot_path() {
        Some(path) if path.exists() => println!("  Snapshot: {}", path.display()),
        Some(path) => println!("  Snapshot: {} (not yet written)", path.display()),
        None => println!("  Snapshot: <in memory>"),
    }
    println!("  Records:        {}", stats.records);
    println!("  Catalog keys:   {}", stats.store_keys);
    println!("  Index keys:     {}", stats.index_keys);
    println!("  Index entries:  {}", stats.index_entries);

    if stats.records == 0 {
        println!("\n  Run `mapdex scan <path>` to add your levels");
    }

    Ok(())
}
