//! Binary entry point for refiler.
//!
//! This binary provides the CLI for the organize pipeline.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr/print_stdout in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use refiler::config::RefilerConfig;
use refiler::library::{LibraryClient, ZoteroClient};
use refiler::llm::GeminiClient;
use refiler::models::{CollectionPath, RunSummary};
use refiler::services::{CollectionCache, Organizer, PathResolver, load_profile};
use refiler::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::process::ExitCode;

/// Refiler - AI-assisted organizer for Zotero-style reference libraries.
#[derive(Parser)]
#[command(name = "refiler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Classify items and file them into collections.
    Organize {
        /// Apply mutations instead of previewing them.
        #[arg(long)]
        commit: bool,

        /// Collection subtree to process (path like "Archive/Hazards");
        /// omit to sweep the whole library.
        #[arg(long)]
        collection: Option<String>,

        /// Items classified per batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Upper bound on items fetched this run.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Inspect or clear the collection-key cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show configuration and remote connectivity.
    Status,
}

/// Cache subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// List cached collection paths.
    Show,
    /// Delete the cache file, forcing a rebuild on the next run.
    Clear,
}

fn main() -> ExitCode {
    // Load .env before reading any configuration.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        },
    };

    let result = match cli.command {
        Commands::Organize {
            commit,
            collection,
            batch_size,
            limit,
        } => cmd_organize(config, commit, collection, batch_size, limit),
        Commands::Cache { action } => cmd_cache(&config, &action),
        Commands::Status => cmd_status(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "refiler=debug" } else { "refiler=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("REFILER_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<RefilerConfig> {
    path.map_or_else(RefilerConfig::load_default, RefilerConfig::load_from_file)
}

fn cmd_organize(
    mut config: RefilerConfig,
    commit: bool,
    collection: Option<String>,
    batch_size: Option<usize>,
    limit: Option<usize>,
) -> Result<()> {
    if commit {
        config.organize.commit = true;
    }
    if let Some(collection) = collection {
        config.organize.scope = Some(CollectionPath::parse(&collection));
    }
    if let Some(batch_size) = batch_size {
        config.organize.batch_size = batch_size;
    }
    if let Some(limit) = limit {
        config.organize.item_limit = limit;
    }
    config.validate()?;

    let library = build_library(&config)?;
    library.verify_connectivity().map_err(|e| {
        Error::Configuration(format!("reference-manager API unreachable: {e}"))
    })?;
    let classifier = build_classifier(&config)?;

    if let Some(parent) = config.cache_file.parent() {
        // Best effort; a failed mkdir only costs the cache flush.
        let _ = std::fs::create_dir_all(parent);
    }
    let resolver = PathResolver::from_file(config.cache_file.clone());
    let profile = load_profile(&config.profile_file);

    let mode = if config.organize.commit { "commit" } else { "preview" };
    println!(
        "organizing {} (mode: {mode}, batch size: {})",
        config
            .organize
            .scope
            .as_ref()
            .map_or_else(|| "entire library".to_string(), ToString::to_string),
        config.organize.batch_size
    );

    let mut organizer = Organizer::new(
        &library,
        &classifier,
        resolver,
        config.taxonomy.clone(),
        profile,
        config.organize.clone(),
    );
    let summary = organizer.run()?;
    print_summary(&summary, config.organize.commit);

    // Per-item skips are reported, not escalated; the sweep itself succeeded.
    Ok(())
}

fn cmd_cache(config: &RefilerConfig, action: &CacheAction) -> Result<()> {
    match action {
        CacheAction::Show => {
            let cache = CollectionCache::load(&config.cache_file);
            println!(
                "{} cached collection paths in {}",
                cache.len(),
                config.cache_file.display()
            );
            for (path, key) in cache.entries() {
                println!("  {path} -> {key}");
            }
        },
        CacheAction::Clear => {
            match std::fs::remove_file(&config.cache_file) {
                Ok(()) => println!("deleted {}", config.cache_file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    println!("no cache file at {}", config.cache_file.display());
                },
                Err(e) => {
                    return Err(Error::Configuration(format!(
                        "cannot delete {}: {e}",
                        config.cache_file.display()
                    )));
                },
            }
        },
    }
    Ok(())
}

fn cmd_status(config: &RefilerConfig) -> Result<()> {
    config.validate()?;
    println!("library: {} ({:?})", config.library_id, config.library_type);
    println!(
        "scope: {}",
        config
            .organize
            .scope
            .as_ref()
            .map_or_else(|| "entire library".to_string(), ToString::to_string)
    );
    println!(
        "mode: {}",
        if config.organize.commit { "commit" } else { "preview" }
    );
    println!("completion tag: {}", config.organize.completion_tag);
    println!("cache file: {}", config.cache_file.display());

    let library = build_library(config)?;
    library.verify_connectivity().map_err(|e| {
        Error::Configuration(format!("reference-manager API unreachable: {e}"))
    })?;
    println!("remote library: reachable");
    Ok(())
}

fn build_library(config: &RefilerConfig) -> Result<ZoteroClient> {
    let api_key: SecretString = config
        .library_api_key
        .clone()
        .ok_or_else(|| Error::Configuration("library API key not configured".to_string()))?;
    let mut client = ZoteroClient::new(&config.library_id, config.library_type, api_key)
        .with_http_config(config.http)
        .with_retry(config.retry.clone());
    if let Some(endpoint) = &config.library_endpoint {
        client = client.with_endpoint(endpoint.clone());
    }
    Ok(client)
}

fn build_classifier(config: &RefilerConfig) -> Result<GeminiClient> {
    let api_key = config
        .llm_api_key
        .clone()
        .ok_or_else(|| Error::Configuration("LLM API key not configured".to_string()))?;
    let mut client = GeminiClient::new(api_key)
        .with_http_config(config.http)
        .with_retry(config.retry.clone());
    if let Some(model) = &config.llm_model {
        client = client.with_model(model.clone());
    }
    if let Some(endpoint) = &config.llm_endpoint {
        client = client.with_endpoint(endpoint.clone());
    }
    Ok(client)
}

fn print_summary(summary: &RunSummary, commit: bool) {
    println!();
    println!("classified:   {}", summary.classified);
    if commit {
        println!("committed:    {}", summary.committed);
    }
    println!("skipped:      {}", summary.skipped);
    println!("already done: {}", summary.already_done);

    if !commit {
        println!();
        if summary.planned.is_empty() {
            println!("nothing to file");
        } else {
            println!("planned placements (re-run with --commit to apply):");
            for planned in &summary.planned {
                let targets = if planned.paths.is_empty() {
                    "no placement (unclassified)".to_string()
                } else {
                    planned
                        .paths
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                println!("  {} -> {targets}", planned.title);
            }
        }
    }
}
