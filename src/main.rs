//! layerconf CLI
//!
//! Entry point for the `layerconf` command-line tool.

use clap::{Parser, Subcommand};
use layerconf::config::StandardLoader;
use layerconf::{Configuration, FileStore};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layerconf")]
#[command(about = "Inspect and update layered configuration", version)]
struct Cli {
    /// Extra locators to load (repeatable, or `;`-separated)
    #[arg(long, short = 'l', global = true)]
    locator: Vec<String>,

    /// Path to the dynamic store document
    #[arg(long, short = 's', global = true)]
    store: Option<PathBuf>,

    /// Directory for relative locators (default: current directory)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Do not load the locators listed in `config.loaded_files`
    #[arg(long, global = true)]
    no_predefined: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single key
    Get {
        key: String,

        /// Print the full resolution record
        #[arg(long)]
        extended: bool,
    },

    /// List visible keys
    Keys {
        /// Only keys starting with this prefix
        #[arg(long, short = 'p')]
        prefix: Option<String>,

        /// Only stable keys
        #[arg(long)]
        stable: bool,
    },

    /// Dump resolved keys as JSON
    Dump {
        /// Include non-stable keys
        #[arg(long)]
        all: bool,
    },

    /// Report non-stable overrides and misconfigured keys
    Audit,

    /// Show every layer in load order
    Layers,

    /// Write a key to the dynamic store
    Set {
        key: String,
        value: String,

        /// Expiration (e.g. "1h", "30m"); default: config.default_ttl
        #[arg(long)]
        ttl: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match build_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Get { key, extended } => run_get(&config, &key, extended),
        Commands::Keys { prefix, stable } => {
            for key in config.keys(prefix.as_deref(), stable) {
                println!("{}", key);
            }
        }
        Commands::Dump { all } => print_json(&config.dump_all(!all)),
        Commands::Audit => print_json(&config.audit()),
        Commands::Layers => print_json(&config.loaded_layers()),
        Commands::Set { key, value, ttl } => run_set(&mut config, &key, &value, ttl.as_deref()),
    }
}

fn build_config(cli: &Cli) -> Result<Configuration, layerconf::ConfigError> {
    let mut loader = StandardLoader::new();
    if let Some(dir) = &cli.base_dir {
        loader = loader.with_base_dir(dir);
    }

    let mut builder = Configuration::builder()
        .loader(loader)
        .with_predefined_configuration(!cli.no_predefined);
    for locator in &cli.locator {
        builder = builder.locator(locator);
    }
    if let Some(path) = &cli.store {
        builder = builder.store(
            Arc::new(FileStore::open(path)),
            path.display().to_string(),
        );
    }
    builder.build()
}

fn run_get(config: &Configuration, key: &str, extended: bool) {
    if extended {
        let resolved = config.get_extended(key);
        let success = resolved.success;
        print_json(&resolved);
        if !success {
            process::exit(1);
        }
        return;
    }
    match config.get(key) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

fn run_set(config: &mut Configuration, key: &str, value: &str, ttl: Option<&str>) {
    let ttl = match ttl.map(layerconf::parse::parse_duration).transpose() {
        Ok(ttl) => ttl,
        Err(e) => {
            eprintln!("Invalid --ttl: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.set(key, value, ttl) {
        eprintln!("Error writing '{}': {}", key, e);
        process::exit(1);
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
