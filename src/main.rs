//! Content migration CLI: fetch every content family from the legacy API,
//! normalize, and upsert into the target row store. With no flags the rows
//! land in the configured remote collection via the external query tool;
//! `--db <path>` switches to a local SQLite file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use studio_migrate::config::MigrationConfig;
use studio_migrate::content::fetch::{ContentClient, FetchOutcome};
use studio_migrate::content::mapping::{self, ImageMapping};
use studio_migrate::content::schema::{ContentTypeDescriptor, CONTENT_TYPES};
use studio_migrate::error::{report, MigrateError};
use studio_migrate::store::remote::RemoteStore;
use studio_migrate::store::sqlite::SqliteStore;
use studio_migrate::store::{ContentStore, UpsertStats};
use studio_migrate::tracing::init_tracing;
use studio_migrate::util::env::init_env;

#[derive(Parser, Debug)]
#[command(
    name = "migrate",
    about = "Migrate legacy CMS content into the target row store"
)]
struct Cli {
    /// Use a local SQLite row-store file instead of the remote collection.
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

struct TypeSummary {
    key: &'static str,
    source_count: usize,
    migrated_count: usize,
    stats: UpsertStats,
    mappings: Vec<ImageMapping>,
}

#[tokio::main]
async fn main() {
    init_env();
    init_tracing("info,sqlx=warn");
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = MigrationConfig::load()?;
    let client = ContentClient::new(&config.api_base, &config.target_base);

    // Fetch everything first, in the fixed family order; any fetch failure
    // aborts before a single row is written.
    let mut outcomes: Vec<(&ContentTypeDescriptor, FetchOutcome)> = Vec::new();
    for desc in &CONTENT_TYPES {
        outcomes.push((desc, client.fetch_content(desc).await?));
    }

    let summaries = match cli.db {
        Some(path) => upsert_local(&path, &outcomes).await?,
        None => upsert_remote(&config, &outcomes).await?,
    };

    print_summary(&summaries);
    Ok(())
}

async fn upsert_local(
    path: &std::path::Path,
    outcomes: &[(&ContentTypeDescriptor, FetchOutcome)],
) -> Result<Vec<TypeSummary>> {
    let store = SqliteStore::connect(path).await?;
    let mut summaries = Vec::new();
    for (desc, outcome) in outcomes {
        let stats = store.upsert(desc, &outcome.rows).await?;
        summaries.push(summarize(desc, outcome, stats));
    }
    Ok(summaries)
}

async fn upsert_remote(
    config: &MigrationConfig,
    outcomes: &[(&ContentTypeDescriptor, FetchOutcome)],
) -> Result<Vec<TypeSummary>> {
    let database = config.d1_database.clone().ok_or_else(|| MigrateError::Config {
        field: "d1_database".into(),
    })?;
    let store = RemoteStore::new(&config.wrangler_bin, database);
    let batches: Vec<(&ContentTypeDescriptor, Vec<_>)> = outcomes
        .iter()
        .map(|(desc, outcome)| (*desc, outcome.rows.clone()))
        .collect();
    let results = store.upsert_all(&batches).await?;

    let mut summaries = Vec::new();
    for ((desc, outcome), (_, stats)) in outcomes.iter().zip(results) {
        summaries.push(summarize(desc, outcome, stats));
    }
    Ok(summaries)
}

fn summarize(
    desc: &ContentTypeDescriptor,
    outcome: &FetchOutcome,
    stats: UpsertStats,
) -> TypeSummary {
    TypeSummary {
        key: desc.key,
        source_count: outcome.source_count,
        migrated_count: outcome.migrated_count,
        stats,
        mappings: mapping::collect(&outcome.raw, &outcome.rows),
    }
}

fn print_summary(summaries: &[TypeSummary]) {
    let total: usize = summaries.iter().map(|s| s.migrated_count).sum();
    if total == 0 {
        println!("nothing to migrate");
        return;
    }
    for summary in summaries {
        println!(
            "{}: {} source, {} migrated, {} inserted, {} updated",
            summary.key,
            summary.source_count,
            summary.migrated_count,
            summary.stats.inserted,
            summary.stats.updated
        );
        for mapping in &summary.mappings {
            println!("  {} -> {}", mapping.source, mapping.target);
        }
    }
    let inserted: u64 = summaries.iter().map(|s| s.stats.inserted).sum();
    let updated: u64 = summaries.iter().map(|s| s.stats.updated).sum();
    println!("done: {inserted} inserted, {updated} updated across {} types", summaries.len());
}
