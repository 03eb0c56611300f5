use anyhow::{Context, Result};
use mapdex_etl::{config, Config};
use toml_edit::{value, DocumentMut};

const VALID_KEYS: &str = "data_dir, songs_dir, autosave";

/// Show the current effective configuration.
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Settings:");
    println!("  data_dir: {}", config.data_dir.display());
    println!(
        "  songs_dir: {}",
        config
            .songs_dir
            .as_ref()
            .map_or_else(|| String::from("<not set>"), |p| p.display().to_string())
    );
    println!("  autosave: {}", config.autosave);

    println!("\nPriority: CLI args > ENV vars (MAPDEX_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        let config = Config::load()?;

        match key.as_str() {
            "data_dir" => println!("{}", config.data_dir.display()),
            "songs_dir" => match config.songs_dir {
                Some(dir) => println!("{}", dir.display()),
                None => println!("<not set>"),
            },
            "autosave" => println!("{}", config.autosave),
            _ => {
                anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS);
            }
        }
    } else {
        // No key provided, show entire config file contents
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'mapdex config init' to create it.");
        }
    }

    Ok(())
}

/// Apply `key = value` to a config document, keeping its comments and
/// layout.
fn apply_setting(document: &mut DocumentMut, key: &str, raw: &str) -> Result<()> {
    match key {
        "data_dir" | "songs_dir" => document[key] = value(raw),
        "autosave" => {
            let enabled: bool = raw
                .parse()
                .with_context(|| format!("autosave must be true or false, got {:?}", raw))?;
            document[key] = value(enabled);
        }
        _ => {
            anyhow::bail!("Unknown config key: {}\n\nValid keys: {}", key, VALID_KEYS);
        }
    }
    Ok(())
}

/// Set a config value.
pub fn set_config(key: &str, raw: &str) -> Result<()> {
    let config_path = config::config_file_path();

    // Ensure config file exists
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let mut document: DocumentMut = contents.parse().context("Failed to parse config file")?;

    apply_setting(&mut document, key, raw)?;

    std::fs::write(&config_path, document.to_string()).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, raw);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure mapdex.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
