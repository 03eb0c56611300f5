use anyhow::Result;
use clap::Parser;
use mapdex_etl::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "mapdex", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding the catalog snapshot (default: ~/.local/share/mapdex)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Scan a directory of downloaded levels into the catalog
    ///
    /// Recursively walks the directory looking for level info documents
    /// (info.dat / info.json). For each level found:
    ///
    /// - Derives the catalog id from the folder name (`2a`, `77-42`,
    ///   `2a (Song - Mapper)`), or allocates a temporary id
    /// - Reads song, artist and mapper names from the info document
    /// - Hashes the difficulty files to recognize levels that moved
    /// - Indexes the level for prefix search
    ///
    /// Levels already in the catalog are skipped, or have their location
    /// updated if they moved. Unreadable and malformed levels are reported
    /// in the summary but do not stop the scan.
    Scan {
        /// Path to the levels directory (default: songs_dir from config)
        path: Option<PathBuf>,
    },
    /// Import a saved query result from the level site
    Import {
        /// JSON file holding a `{"docs": [...]}` page or a single map
        file: PathBuf,

        /// Query to answer from the catalog after importing
        #[arg(long, short)]
        query: Option<String>,
    },
    /// Search the catalog
    ///
    /// Every word must match the start of a word in the song name,
    /// subtitle, artist, mapper or map type, and must be at least three
    /// characters long to match as a prefix. A query that reads as an id
    /// (`2a`, `77-42`) is looked up directly.
    Search {
        /// Search terms
        #[arg(required = true)]
        terms: Vec<String>,

        /// Maximum number of results to print
        #[arg(long, short, default_value_t = 25)]
        limit: usize,

        /// Print full attribute documents as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record by catalog id, version or content hash
    Lookup {
        key: String,
    },
    /// Show catalog statistics
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print a config value, or the whole config file
    Get {
        key: Option<String>,
    },
    /// Set a config value in the config file
    Set {
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if it does not exist
    Init,
}

fn load_config(data_dir: Option<PathBuf>) -> Result<Config> {
    match data_dir {
        Some(dir) => Config::load_with_data_dir(dir),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { path } => {
            let config = load_config(cli.data_dir)?;
            commands::run_scan(&config, path).await?;
        }
        Commands::Import { file, query } => {
            let config = load_config(cli.data_dir)?;
            commands::run_import(&config, &file, query.as_deref())?;
        }
        Commands::Search { terms, limit, json } => {
            let config = load_config(cli.data_dir)?;
            commands::run_search(&config, &terms.join(" "), limit, json)?;
        }
        Commands::Lookup { key } => {
            let config = load_config(cli.data_dir)?;
            commands::run_lookup(&config, &key)?;
        }
        Commands::Status => {
            let config = load_config(cli.data_dir)?;
            commands::show_status(&config)?;
        }
        Commands::Config { command } => match command {
            ConfigCommand::Show => commands::config::show_config()?,
            ConfigCommand::Get { key } => commands::config::get_config(key)?,
            ConfigCommand::Set { key, value } => commands::config::set_config(&key, &value)?,
            ConfigCommand::Path => commands::config::show_path(),
            ConfigCommand::Example => commands::config::show_example(),
            ConfigCommand::Init => commands::config::init_config()?,
        },
    }

    Ok(())
}
