//! Local-file row store for the `--db` variant of the pipeline.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

use crate::content::normalize::NormalizedRow;
use crate::content::schema::{ContentTypeDescriptor, CONTENT_TYPES};
use crate::store::{dedup_by_slug, ContentStore, UpsertStats};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool (tests use `sqlite::memory:` here).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// One table per content family, created idempotently. `updated_at` is
    /// the store-maintained timestamp, refreshed on every update.
    async fn ensure_schema(&self) -> Result<()> {
        for desc in &CONTENT_TYPES {
            let extra_column = match desc.extra {
                Some(e) => format!("{} TEXT,\n                ", e.column),
                None => String::new(),
            };
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                content TEXT,
                featured_image TEXT,
                featured_images TEXT,
                {extra_column}created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
                table = desc.table,
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn find_id(&self, table: &str, slug: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT id FROM {table} WHERE slug = ?1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_row(&self, desc: &ContentTypeDescriptor, row: &NormalizedRow) -> Result<()> {
        let images = images_json(row)?;
        match desc.extra {
            Some(e) => {
                let sql = format!(
                    "INSERT INTO {table} (slug, status, kind, title, content, featured_image, \
                     featured_images, {extra}, created_at, modified_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    table = desc.table,
                    extra = e.column,
                );
                sqlx::query(&sql)
                    .bind(&row.slug)
                    .bind(&row.status)
                    .bind(&row.kind)
                    .bind(&row.title)
                    .bind(&row.content)
                    .bind(&row.featured_image)
                    .bind(&images)
                    .bind(&row.extra)
                    .bind(row.created.to_rfc3339())
                    .bind(row.modified.to_rfc3339())
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                let sql = format!(
                    "INSERT INTO {table} (slug, status, kind, title, content, featured_image, \
                     featured_images, created_at, modified_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    table = desc.table,
                );
                sqlx::query(&sql)
                    .bind(&row.slug)
                    .bind(&row.status)
                    .bind(&row.kind)
                    .bind(&row.title)
                    .bind(&row.content)
                    .bind(&row.featured_image)
                    .bind(&images)
                    .bind(row.created.to_rfc3339())
                    .bind(row.modified.to_rfc3339())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_row(
        &self,
        desc: &ContentTypeDescriptor,
        id: i64,
        row: &NormalizedRow,
    ) -> Result<()> {
        let images = images_json(row)?;
        match desc.extra {
            Some(e) => {
                let sql = format!(
                    "UPDATE {table} SET status = ?1, kind = ?2, title = ?3, content = ?4, \
                     featured_image = ?5, featured_images = ?6, {extra} = ?7, modified_at = ?8, \
                     updated_at = datetime('now') WHERE id = ?9",
                    table = desc.table,
                    extra = e.column,
                );
                sqlx::query(&sql)
                    .bind(&row.status)
                    .bind(&row.kind)
                    .bind(&row.title)
                    .bind(&row.content)
                    .bind(&row.featured_image)
                    .bind(&images)
                    .bind(&row.extra)
                    .bind(row.modified.to_rfc3339())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                let sql = format!(
                    "UPDATE {table} SET status = ?1, kind = ?2, title = ?3, content = ?4, \
                     featured_image = ?5, featured_images = ?6, modified_at = ?7, \
                     updated_at = datetime('now') WHERE id = ?8",
                    table = desc.table,
                );
                sqlx::query(&sql)
                    .bind(&row.status)
                    .bind(&row.kind)
                    .bind(&row.title)
                    .bind(&row.content)
                    .bind(&row.featured_image)
                    .bind(&images)
                    .bind(row.modified.to_rfc3339())
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }
}

fn images_json(row: &NormalizedRow) -> Result<Option<String>> {
    Ok(row
        .featured_images
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?)
}

#[async_trait]
impl ContentStore for SqliteStore {
    /// Sequential, one row at a time; a failure partway through leaves
    /// prior rows committed and aborts the remainder. Safe to re-run.
    async fn upsert(
        &self,
        desc: &ContentTypeDescriptor,
        rows: &[NormalizedRow],
    ) -> Result<UpsertStats> {
        let rows = dedup_by_slug(rows);
        let mut stats = UpsertStats::default();
        for row in &rows {
            match self.find_id(desc.table, &row.slug).await? {
                Some(id) => {
                    self.update_row(desc, id, row).await?;
                    stats.updated += 1;
                }
                None => {
                    self.insert_row(desc, row).await?;
                    stats.inserted += 1;
                }
            }
        }
        debug!(
            table = desc.table,
            inserted = stats.inserted,
            updated = stats.updated,
            "upsert batch done"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::normalize::normalize;
    use serde_json::json;

    const BASE: &str = "https://media.studiosite.dev";

    async fn memory_store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStore::from_pool(pool).await.unwrap()
    }

    fn pages() -> &'static ContentTypeDescriptor {
        ContentTypeDescriptor::by_key("pages").unwrap()
    }

    fn sample_rows() -> Vec<NormalizedRow> {
        [
            json!({ "slug": "a", "title": { "rendered": "<p>A</p>" },
                    "featuredImage": "https://old/media/pic.webp",
                    "status": "publish", "type": "post" }),
            json!({ "slug": "b", "title": "B" }),
        ]
        .iter()
        .filter_map(|r| normalize(r, pages(), BASE))
        .collect()
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = memory_store().await;
        let rows = sample_rows();

        let first = store.upsert(pages(), &rows).await.unwrap();
        assert_eq!(first, UpsertStats { inserted: 2, updated: 0 });

        let second = store.upsert(pages(), &rows).await.unwrap();
        assert_eq!(second, UpsertStats { inserted: 0, updated: 2 });

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let stored: String =
            sqlx::query_scalar("SELECT featured_image FROM pages WHERE slug = 'a'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(stored, "https://media.studiosite.dev/pages/pic.webp");
    }

    #[tokio::test]
    async fn duplicate_slugs_count_once() {
        let store = memory_store().await;
        let rows: Vec<_> = [
            json!({ "slug": "a", "title": "first" }),
            json!({ "slug": "a", "title": "second" }),
            json!({ "slug": "b", "title": "B" }),
        ]
        .iter()
        .filter_map(|r| normalize(r, pages(), BASE))
        .collect();

        let stats = store.upsert(pages(), &rows).await.unwrap();
        assert_eq!(stats.total(), 2);

        let title: String = sqlx::query_scalar("SELECT title FROM pages WHERE slug = 'a'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(title, "first");
    }

    #[tokio::test]
    async fn empty_batch_touches_nothing() {
        let store = memory_store().await;
        let stats = store.upsert(pages(), &[]).await.unwrap();
        assert_eq!(stats, UpsertStats::default());
    }

    #[tokio::test]
    async fn extra_column_round_trips() {
        let store = memory_store().await;
        let blocks = ContentTypeDescriptor::by_key("building-blocks").unwrap();
        let rows: Vec<_> = [json!({
            "slug": "hero", "title": "Hero", "reactComponent": "HeroBlock"
        })]
        .iter()
        .filter_map(|r| normalize(r, blocks, BASE))
        .collect();

        store.upsert(blocks, &rows).await.unwrap();
        let component: String =
            sqlx::query_scalar("SELECT component FROM building_blocks WHERE slug = 'hero'")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(component, "HeroBlock");
    }

    #[tokio::test]
    async fn gallery_is_stored_as_json_text() {
        let store = memory_store().await;
        let rows: Vec<_> = [json!({
            "slug": "g", "title": "G",
            "featuredImages": ["https://old/m/1.png", "https://old/m/2.png"]
        })]
        .iter()
        .filter_map(|r| normalize(r, pages(), BASE))
        .collect();

        store.upsert(pages(), &rows).await.unwrap();
        let raw: String = sqlx::query_scalar("SELECT featured_images FROM pages WHERE slug = 'g'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed[0].starts_with("https://media.studiosite.dev/pages/"));
    }
}
