//! Remote row store driven through an external query-execution CLI
//! (a `wrangler d1 execute`-compatible tool with `--json` output).
//!
//! The multi-table run concatenates every row-level upsert statement for
//! every content type into one SQL script and executes it as a single
//! external batch. Existence checks are issued first, in slug chunks of
//! 100, so no single query carries an unbounded IN list.

use std::collections::HashSet;

use anyhow::Result;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

use crate::content::normalize::NormalizedRow;
use crate::content::schema::ContentTypeDescriptor;
use crate::error::MigrateError;
use crate::store::{dedup_by_slug, ContentStore, UpsertStats};

pub const SLUG_CHUNK: usize = 100;

pub struct RemoteStore {
    /// Whitespace-separated command line for the query tool, so both a
    /// launcher form ("npx wrangler") and a direct binary path work.
    wrangler_bin: String,
    database: String,
}

impl RemoteStore {
    pub fn new(wrangler_bin: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            wrangler_bin: wrangler_bin.into(),
            database: database.into(),
        }
    }

    /// Upsert batches for several content types as one external script.
    /// Returns per-type stats in input order.
    pub async fn upsert_all(
        &self,
        batches: &[(&ContentTypeDescriptor, Vec<NormalizedRow>)],
    ) -> Result<Vec<(String, UpsertStats)>> {
        let mut script = String::new();
        let mut results = Vec::with_capacity(batches.len());

        for (desc, rows) in batches {
            let rows = dedup_by_slug(rows);
            let slugs: Vec<String> = rows.iter().map(|r| r.slug.clone()).collect();
            let existing = self.existing_slugs(desc.table, &slugs).await?;
            let (statements, stats) = build_statements(desc, &existing, &rows);
            for stmt in statements {
                script.push_str(&stmt);
                script.push_str(";\n");
            }
            results.push((desc.key.to_string(), stats));
        }

        if script.is_empty() {
            info!("no upsert statements generated; skipping external batch");
            return Ok(results);
        }

        self.execute_script(&script).await?;
        Ok(results)
    }

    /// Which of `slugs` already exist in `table`, checked in chunks.
    pub async fn existing_slugs(
        &self,
        table: &str,
        slugs: &[String],
    ) -> Result<HashSet<String>> {
        let mut existing = HashSet::new();
        for chunk in slugs.chunks(SLUG_CHUNK) {
            let list = chunk
                .iter()
                .map(|s| sql_quote(s))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("SELECT slug FROM {table} WHERE slug IN ({list})");
            let output = self.execute_command(&sql).await?;
            for slug in parse_slug_results(&output)? {
                existing.insert(slug);
            }
        }
        Ok(existing)
    }

    fn base_command(&self) -> Command {
        let (program, args) = tool_invocation(&self.wrangler_bin);
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }

    async fn execute_command(&self, sql: &str) -> Result<Value> {
        debug!(database = %self.database, "executing remote query");
        let output = self
            .base_command()
            .args([
                "d1", "execute", self.database.as_str(),
                "--remote", "--json", "--command", sql,
            ])
            .output()
            .await?;
        self.parse_output(output)
    }

    async fn execute_script(&self, script: &str) -> Result<()> {
        let path = std::env::temp_dir().join(format!(
            "studio-migrate-{}.sql",
            std::process::id()
        ));
        tokio::fs::write(&path, script).await?;
        debug!(file = %path.display(), bytes = script.len(), "executing remote batch");
        let output = self
            .base_command()
            .args([
                "d1", "execute", self.database.as_str(),
                "--remote", "--json", "--file",
            ])
            .arg(&path)
            .output()
            .await;
        let _ = tokio::fs::remove_file(&path).await;
        self.parse_output(output?)?;
        Ok(())
    }

    fn parse_output(&self, output: std::process::Output) -> Result<Value> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MigrateError::ExternalTool {
                detail: stderr.trim().lines().last().unwrap_or("exit failure").to_string(),
            }
            .into());
        }
        let parsed: Value = serde_json::from_slice(&output.stdout).map_err(|_| {
            MigrateError::ExternalTool {
                detail: "unparseable output".into(),
            }
        })?;
        if !parsed.is_array() {
            return Err(MigrateError::ExternalTool {
                detail: "unexpected response".into(),
            }
            .into());
        }
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl ContentStore for RemoteStore {
    async fn upsert(
        &self,
        desc: &ContentTypeDescriptor,
        rows: &[NormalizedRow],
    ) -> Result<UpsertStats> {
        let results = self.upsert_all(&[(desc, rows.to_vec())]).await?;
        Ok(results.into_iter().next().map(|(_, s)| s).unwrap_or_default())
    }
}

/// Split the configured tool command line into program and leading args.
/// "npx wrangler" invokes wrangler through the launcher; a bare path
/// invokes the binary directly.
fn tool_invocation(bin: &str) -> (&str, Vec<&str>) {
    let mut parts = bin.split_whitespace();
    let program = parts.next().unwrap_or("npx");
    (program, parts.collect())
}

/// Pull the slug column out of the tool's `[{results: [{slug}, ...]}]`
/// reply; any other shape is a hard failure.
fn parse_slug_results(output: &Value) -> Result<Vec<String>> {
    let results = output
        .get(0)
        .and_then(|batch| batch.get("results"))
        .and_then(|r| r.as_array())
        .ok_or_else(|| MigrateError::ExternalTool {
            detail: "unexpected response".into(),
        })?;
    Ok(results
        .iter()
        .filter_map(|row| row.get("slug").and_then(|s| s.as_str()))
        .map(|s| s.to_string())
        .collect())
}

/// One INSERT or UPDATE per row, chosen against the pre-fetched existence
/// set; counts each outcome. Rows must already be slug-deduplicated.
pub fn build_statements(
    desc: &ContentTypeDescriptor,
    existing: &HashSet<String>,
    rows: &[NormalizedRow],
) -> (Vec<String>, UpsertStats) {
    let mut statements = Vec::with_capacity(rows.len());
    let mut stats = UpsertStats::default();
    for row in rows {
        if existing.contains(&row.slug) {
            statements.push(update_statement(desc, row));
            stats.updated += 1;
        } else {
            statements.push(insert_statement(desc, row));
            stats.inserted += 1;
        }
    }
    (statements, stats)
}

fn insert_statement(desc: &ContentTypeDescriptor, row: &NormalizedRow) -> String {
    let mut columns = vec![
        "slug", "status", "kind", "title", "content",
        "featured_image", "featured_images",
    ];
    let mut values = vec![
        sql_quote(&row.slug),
        sql_quote(&row.status),
        sql_quote(&row.kind),
        sql_quote(&row.title),
        quote_opt(row.content.as_deref()),
        quote_opt(row.featured_image.as_deref()),
        quote_opt(images_json(row).as_deref()),
    ];
    if let Some(extra) = desc.extra {
        columns.push(extra.column);
        values.push(quote_opt(row.extra.as_deref()));
    }
    columns.extend(["created_at", "modified_at"]);
    values.push(sql_quote(&row.created.to_rfc3339()));
    values.push(sql_quote(&row.modified.to_rfc3339()));
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        desc.table,
        columns.join(", "),
        values.join(", ")
    )
}

fn update_statement(desc: &ContentTypeDescriptor, row: &NormalizedRow) -> String {
    let mut assignments = vec![
        format!("status = {}", sql_quote(&row.status)),
        format!("kind = {}", sql_quote(&row.kind)),
        format!("title = {}", sql_quote(&row.title)),
        format!("content = {}", quote_opt(row.content.as_deref())),
        format!("featured_image = {}", quote_opt(row.featured_image.as_deref())),
        format!(
            "featured_images = {}",
            quote_opt(images_json(row).as_deref())
        ),
    ];
    if let Some(extra) = desc.extra {
        assignments.push(format!("{} = {}", extra.column, quote_opt(row.extra.as_deref())));
    }
    assignments.push(format!("modified_at = {}", sql_quote(&row.modified.to_rfc3339())));
    assignments.push("updated_at = datetime('now')".to_string());
    format!(
        "UPDATE {} SET {} WHERE slug = {}",
        desc.table,
        assignments.join(", "),
        sql_quote(&row.slug)
    )
}

fn images_json(row: &NormalizedRow) -> Option<String> {
    row.featured_images
        .as_ref()
        .and_then(|v| serde_json::to_string(v).ok())
}

/// Single-quoted SQL string literal with quote doubling.
pub fn sql_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_opt(s: Option<&str>) -> String {
    match s {
        Some(v) => sql_quote(v),
        None => "NULL".to_string(),
    }
}
