use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for mapdex.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (MAPDEX_* prefix)
/// 3. Config file (~/.config/mapdex/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the catalog snapshot.
    ///
    /// Can be set via:
    /// - CLI: --data-dir /path/to/dir
    /// - ENV: MAPDEX_DATA_DIR
    /// - Config: data_dir = "/path/to/dir"
    /// - Default: ~/.local/share/mapdex
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory of downloaded levels, scanned by `mapdex scan` when no
    /// path is given.
    ///
    /// Can be set via:
    /// - ENV: MAPDEX_SONGS_DIR
    /// - Config: songs_dir = "/path/to/CustomLevels"
    #[serde(default)]
    pub songs_dir: Option<PathBuf>,

    /// Save the snapshot after every command that changes the catalog.
    #[serde(default = "default_autosave")]
    pub autosave: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            songs_dir: None,
            autosave: default_autosave(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/mapdex/config.toml
    /// Reads environment variables with MAPDEX_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("mapdex");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration, overriding the data directory.
    ///
    /// This is used when the --data-dir CLI flag is provided.
    pub fn load_with_data_dir(data_dir: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.data_dir = data_dir;
        Ok(config)
    }
}

/// Get the default data directory.
///
/// Returns: ~/.local/share/mapdex (or platform equivalent)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapdex")
}

const fn default_autosave() -> bool {
    true
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/mapdex/config.toml
/// - macOS: ~/Library/Application Support/mapdex/config.toml
/// - Windows: %APPDATA%\mapdex\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mapdex")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# mapdex Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (MAPDEX_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Directory holding the catalog snapshot (SongDatabase.dat)
#
# Can also be set via:
# - CLI: mapdex --data-dir /custom/dir search levels
# - Environment: MAPDEX_DATA_DIR=/custom/dir
#
# Default: Platform-specific data directory
#data_dir = "/path/to/mapdex"

# Directory of downloaded levels, used by `mapdex scan` without a path
#
# Can also be set via:
# - Environment: MAPDEX_SONGS_DIR=/path/to/CustomLevels
#songs_dir = "/path/to/CustomLevels"

# Save the catalog snapshot after commands that change it
autosave = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
