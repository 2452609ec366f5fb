mod config;
mod entry;
mod icons;
mod import;
mod output;
mod store;
mod totp;

use crate::config::Config;
use crate::entry::Credential;
use crate::icons::IconCache;
use crate::output::{Item, Items, OutputFormat, format_item};
use crate::store::Store;
use crate::totp::{Secret, TotpError, current_and_next, now_since_epoch};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ente-totp", version, about = "TOTP codes from an Ente Auth export")]
struct Cli {
    /// Database file (overrides ENTE_TOTP_DB and config.json)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import otpauth:// URIs from a text export, replacing the database
    ///
    /// Examples:
    ///   ente-totp import ente_auth.txt
    Import {
        /// Exported file, one otpauth:// URI per line
        file: PathBuf,
    },

    /// Print current and next codes for matching services
    ///
    /// Examples:
    ///   ente-totp get git
    ///   ente-totp get github -o alfred
    Get {
        /// Case-insensitive part of the service name
        query: String,
        /// Data output format
        #[arg(short = 'o', long = "output", value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,
        /// Do not download missing service icons
        #[arg(long)]
        no_icons: bool,
    },

    /// List stored services and accounts (no secrets)
    List {
        /// Optional part of the service name
        query: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.db) {
        Ok(config) => config,
        // Launcher consumers always get a JSON document back from `get`.
        Err(e) if matches!(cli.command, Commands::Get { .. }) => {
            println!("{}", Items::failed(&e).to_json()?);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    tracing::debug!(
        db = %config.db_path.display(),
        icons = %config.icons_dir.display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Import { file } => cmd_import(&config, &file)?,
        Commands::Get {
            query,
            output,
            no_icons,
        } => cmd_get(&config, &query, output, !no_icons)?,
        Commands::List { query } => cmd_list(&config, query.as_deref().unwrap_or(""))?,
    }

    Ok(())
}

fn load_config(db: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Some(db) = db {
        config.db_path = db;
    }
    Ok(config)
}

/// Logs go to stderr, stdout is reserved for JSON output.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_import(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let creds = import::parse_file(file)?;
    let store = Store::from_credentials(creds);
    if store.is_empty() {
        tracing::warn!(file = %file.display(), "no otpauth://totp entries found");
    }
    store.save(&config.db_path)?;

    tracing::info!(path = %config.db_path.display(), "database written");
    println!("Database created.");
    println!(
        "Imported {} accounts for {} services into {}",
        store.credential_count(),
        store.len(),
        config.db_path.display()
    );
    Ok(())
}

fn cmd_get(config: &Config, query: &str, format: OutputFormat, fetch_icons: bool) -> anyhow::Result<()> {
    let icons = IconCache::new(&config.icons_dir, config.logo_api_key.clone());

    let (items, services) = match run_query(config, query, format, &icons) {
        Ok((items, services)) => (items, services),
        Err(e) => {
            tracing::error!("query failed: {e:#}");
            (Items::failed(&e), Vec::new())
        }
    };

    println!("{}", items.to_json()?);

    // Icons fetched now show up on the next query.
    if fetch_icons && !services.is_empty() {
        icons.download_all(services.iter().map(String::as_str));
    }
    Ok(())
}

fn run_query(
    config: &Config,
    query: &str,
    format: OutputFormat,
    icons: &IconCache,
) -> anyhow::Result<(Items, Vec<String>)> {
    let store = Store::load(&config.db_path)?;
    let matches = store.lookup_by_substring(query);
    let now = now_since_epoch()?;

    let items = collect_items(&matches, now, format, icons)?;

    let mut services: Vec<String> = Vec::new();
    for c in &matches {
        if !services.contains(&c.service) {
            services.push(c.service.clone());
        }
    }

    Ok((Items { items, error: None }, services))
}

/// Codes for every match at `now`. Entries with a bad secret are skipped.
fn collect_items(
    matches: &[Credential],
    now: Duration,
    format: OutputFormat,
    icons: &IconCache,
) -> Result<Vec<Item>, TotpError> {
    let mut items = Vec::with_capacity(matches.len());

    for cred in matches {
        let window = match Secret::from_base32(&cred.secret).and_then(|s| current_and_next(&s, now)) {
            Ok(w) => w,
            Err(TotpError::InvalidSecret(reason)) => {
                tracing::warn!(service = %cred.service, account = %cred.account, "skipping entry: {reason}");
                continue;
            }
            Err(e) => return Err(e),
        };

        let icon = icons.icon_path(&cred.service);
        items.push(format_item(cred, &window, &icon, format));
    }

    Ok(items)
}

fn cmd_list(config: &Config, query: &str) -> anyhow::Result<()> {
    let store = Store::load(&config.db_path)?;
    for cred in store.lookup_by_substring(query) {
        println!("{}", cred.display_name());
    }
    Ok(())
}
