//! CLI entry point for the Usenet indexer.

use anyhow::Result;
use clap::Parser;
use indexer_core::{Catalog, Database, Indexer};
use tracing::{debug, info};

mod cli;
mod config;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let loaded = config::load_config(cli.config.as_deref())?;
    if let (Some(path), Some(_)) = (&loaded.path, &loaded.config) {
        debug!(path = %path.display(), "Loaded config file");
    }
    let settings = config::resolve_settings(&cli, loaded.config.as_ref())?;

    let db = Database::new_with_options(&settings.database_path, &settings.db_options).await?;
    let catalog = Catalog::new(db.clone());

    match cli.command {
        Command::CreateDb => {
            info!(path = %settings.database_path.display(), "Database ready");
        }
        Command::MakeBinaries => {
            let indexer = Indexer::with_nzb(catalog, settings.threshold);
            let stats = indexer.group_binaries().await?;
            println!(
                "Grouped {} of {} parts into {} binaries ({} skipped)",
                stats.grouped, stats.parts_seen, stats.binaries, stats.skipped
            );
        }
        Command::MakeReleases(_) => {
            let indexer = Indexer::with_nzb(catalog, settings.threshold);
            let stats = indexer.promote_ready_binaries().await?;
            println!(
                "Created {} releases from {} ready binaries ({} duplicates, {} failed)",
                stats.promoted, stats.candidates, stats.duplicates, stats.failed
            );
        }
        Command::Process(_) => {
            let indexer = Indexer::with_nzb(catalog, settings.threshold);
            let grouping = indexer.group_binaries().await?;
            let promotion = indexer.promote_ready_binaries().await?;
            println!(
                "Grouped {} parts into {} binaries; created {} releases ({} duplicates, {} failed)",
                grouping.grouped,
                grouping.binaries,
                promotion.promoted,
                promotion.duplicates,
                promotion.failed
            );
        }
        Command::ListParts { json } => {
            let parts = catalog.part_summaries().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&parts)?);
            } else {
                for part in &parts {
                    println!(
                        "{}\t{}/{}\t{}",
                        part.id, part.available_segments, part.total_segments, part.subject
                    );
                }
            }
        }
        Command::ListGroups => {
            for group in catalog.active_groups().await? {
                println!("{}\t{}", group.id, group.name);
            }
        }
    }

    db.close().await;
    Ok(())
}
