//! Media migration CLI: download every image referenced by the legacy
//! content sets and upload it to the target bucket, printing the resulting
//! source -> target mapping.

use anyhow::Result;

use studio_migrate::config::{MigrationConfig, StorageCredentials};
use studio_migrate::error::report;
use studio_migrate::images::engine::ImageMigrator;
use studio_migrate::images::sources::resolve_sources;
use studio_migrate::tracing::init_tracing;
use studio_migrate::util::env::init_env;

#[tokio::main]
async fn main() {
    init_env();
    init_tracing("info");
    if let Err(err) = run().await {
        report(&err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = MigrationConfig::load()?;
    // Credential resolution happens before any network activity; a missing
    // field fails here, naming the field.
    let credentials = StorageCredentials::resolve(&config.file)?;
    let sources = resolve_sources(&config.file, &config.api_base);

    let migrator = ImageMigrator::new(&credentials)?;
    let mappings = migrator.migrate(&sources).await?;

    if mappings.is_empty() {
        println!("nothing to migrate");
        return Ok(());
    }
    for entry in &mappings {
        match &entry.public_url {
            Some(public) => println!("[{}] {} -> {} ({})", entry.family, entry.source, entry.key, public),
            None => println!("[{}] {} -> {}", entry.family, entry.source, entry.key),
        }
    }
    println!("migrated {} images", mappings.len());
    Ok(())
}
