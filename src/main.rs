//! Notedesk - terminal knowledge-base workspace
//!
//! Run with `notedesk [VAULT]` or `notedesk --help` for usage.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use notedesk::{
    APP_NAME, VERSION,
    config::{AppState, Config},
    tui::App,
    vault,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "A terminal knowledge-base workspace with tabs, panes, and an embedded terminal")]
#[command(long_about = None)]
struct Cli {
    /// Vault directory to open (default: last opened, then current dir)
    vault: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search vault content and print the hits
    Search {
        /// Query string
        query: String,

        /// Vault directory (default: last opened, then current dir)
        #[arg(short = 'd', long)]
        vault: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Initialize config file with defaults
        #[arg(long)]
        init: bool,
    },
}

fn setup_logging(config: &Config, debug: bool, to_file: bool) -> Result<()> {
    let filter = if debug || config.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info").add_directive("tokio=warn".parse()?)
    };

    if to_file {
        // Log to file when running the TUI (so logs don't interfere with
        // the display)
        let path = config
            .log_file_path()
            .unwrap_or_else(|_| PathBuf::from("/tmp/notedesk.log"));
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(file).with_target(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }

    Ok(())
}

/// Resolve the vault root: CLI arg → config → last opened → current dir
fn resolve_vault_root(
    cli_vault: Option<PathBuf>,
    config: &Config,
    state: &AppState,
) -> PathBuf {
    cli_vault
        .or_else(|| config.vault.clone())
        .or_else(|| state.last_vault.clone())
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    });

    // Ensure required directories exist
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Failed to create directories: {}", e);
    }

    match cli.command {
        None => {
            setup_logging(&config, cli.debug, true)?;

            info!("Starting Notedesk v{}", VERSION);

            // A malformed state file abandons the restore wholesale in
            // favor of a fresh workspace
            let app_state = AppState::load().unwrap_or_else(|e| {
                info!("state file unusable, starting fresh: {}", e);
                AppState::new()
            });

            let vault_root = resolve_vault_root(cli.vault, &config, &app_state);
            if !vault_root.is_dir() {
                eprintln!("Vault directory does not exist: {}", vault_root.display());
                std::process::exit(1);
            }

            let mut app = App::new(config, app_state, vault_root);
            app.run().await?;
        }

        Some(Commands::Search { query, vault }) => {
            setup_logging(&config, cli.debug, false)?;

            let app_state = AppState::load().unwrap_or_else(|_| AppState::new());
            let root = resolve_vault_root(vault, &config, &app_state);

            let hits = vault::search(root, &query).await?;
            if hits.is_empty() {
                println!("No matches for '{}'", query);
                return Ok(());
            }

            for hit in hits {
                println!("{}", hit.entry.path.display());
                println!("    {}", hit.snippet);
            }
        }

        Some(Commands::Config { init }) => {
            setup_logging(&config, cli.debug, false)?;

            if init {
                config.save()?;
                println!(
                    "Configuration initialized at {:?}",
                    Config::config_file_path()?
                );
            } else {
                println!("Configuration:");
                println!("{}", toml::to_string_pretty(&config)?);
                println!("\nConfig file: {:?}", Config::config_file_path()?);
                println!("Data dir: {:?}", Config::data_dir()?);
                println!("State file: {:?}", Config::state_file_path()?);
            }
        }
    }

    Ok(())
}
