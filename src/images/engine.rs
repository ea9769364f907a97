//! Media asset migration: collect referenced image URLs, download each
//! exactly once, upload under a deterministic key, emit a mapping artifact.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions};
use serde_json::Value;
use tracing::info;

use crate::config::StorageCredentials;
use crate::content::fetch::ensure_list;
use crate::content::normalize::{FEATURED_IMAGES_ALIASES, FEATURED_IMAGE_ALIASES};
use crate::content::rewrite::filename_from_url;
use crate::content::schema::{extract_field, extract_url_list};
use crate::error::MigrateError;
use crate::images::sources::MigrationSource;

/// One mapping entry per processed image, tagged with the content family
/// that first referenced it.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImageRecord {
    pub family: String,
    pub source: String,
    pub key: String,
    pub public_url: Option<String>,
}

/// Run-scoped caches. `downloads` keys by source URL so an image shared
/// across sources is fetched once; `uploaded` keys by target key so two
/// URLs resolving to the same filename do not upload twice.
#[derive(Default)]
pub struct RunCache {
    processed: HashSet<String>,
    downloads: HashMap<String, Bytes>,
    uploaded: HashSet<String>,
}

impl RunCache {
    #[cfg(test)]
    pub fn with_downloads(downloads: HashMap<String, Bytes>) -> Self {
        Self {
            downloads,
            ..Default::default()
        }
    }
}

pub struct ImageMigrator {
    http: reqwest::Client,
    store: Arc<dyn ObjectStore>,
    public_base: Option<String>,
}

impl ImageMigrator {
    pub fn new(creds: &StorageCredentials) -> Result<Self> {
        let store = AmazonS3Builder::new()
            .with_bucket_name(&creds.bucket)
            .with_endpoint(&creds.endpoint)
            .with_region(&creds.region)
            .with_access_key_id(&creds.access_key_id)
            .with_secret_access_key(&creds.secret_access_key)
            .build()?;
        Ok(Self::with_store(Arc::new(store), creds.public_base.clone()))
    }

    pub fn with_store(store: Arc<dyn ObjectStore>, public_base: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            store,
            public_base,
        }
    }

    /// Run the full image pipeline over the resolved sources, in order.
    pub async fn migrate(&self, sources: &[MigrationSource]) -> Result<Vec<ImageRecord>> {
        let mut cache = RunCache::default();
        let mut mappings = Vec::new();
        for source in sources {
            let records = self.fetch_records(&source.endpoint).await?;
            info!(family = %source.key, records = records.len(), "scanning source for images");
            let batch = self.process_records(source, &records, &mut cache).await?;
            mappings.extend(batch);
        }
        info!(
            images = mappings.len(),
            uploads = cache.uploaded.len(),
            "image migration complete"
        );
        Ok(mappings)
    }

    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<Value>> {
        let response = self.http.get(endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrateError::Fetch {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown status").into(),
            }
            .into());
        }
        ensure_list(response.json().await?)
    }

    /// Handle one source's record batch. An image URL with no derivable
    /// filename is fatal here, unlike the normalizer's rewrite path.
    pub async fn process_records(
        &self,
        source: &MigrationSource,
        records: &[Value],
        cache: &mut RunCache,
    ) -> Result<Vec<ImageRecord>> {
        let mut mappings = Vec::new();
        for url in collect_image_urls(records) {
            if !cache.processed.insert(url.clone()) {
                continue;
            }
            let filename = filename_from_url(&url)
                .ok_or_else(|| MigrateError::BadImageUrl { url: url.clone() })?;
            let key = format!("{}/{}", source.prefix, filename);
            let body = self.download(&url, cache).await?;
            if cache.uploaded.insert(key.clone()) {
                self.upload(&key, &filename, body).await?;
            }
            mappings.push(ImageRecord {
                family: source.key.clone(),
                source: url,
                public_url: self
                    .public_base
                    .as_ref()
                    .map(|base| format!("{base}/{key}")),
                key,
            });
        }
        Ok(mappings)
    }

    async fn download(&self, url: &str, cache: &mut RunCache) -> Result<Bytes> {
        if let Some(cached) = cache.downloads.get(url) {
            return Ok(cached.clone());
        }
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MigrateError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }
        let body = response.bytes().await?;
        cache.downloads.insert(url.to_string(), body.clone());
        Ok(body)
    }

    async fn upload(&self, key: &str, filename: &str, body: Bytes) -> Result<()> {
        let mut attributes = Attributes::new();
        if let Some(content_type) = content_type_for(filename) {
            attributes.insert(Attribute::ContentType, content_type.into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        let path = ObjectPath::from(key);
        self.store
            .put_opts(&path, body.into(), options)
            .await
            .map_err(|source| MigrateError::Upload {
                key: key.to_string(),
                source,
            })?;
        Ok(())
    }
}

/// All image URLs referenced by a batch, in first-reference order,
/// deduplicated within the batch.
pub fn collect_image_urls(records: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for record in records {
        let mut push = |url: String| {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        };
        if let Some(single) = extract_field(record, &FEATURED_IMAGE_ALIASES) {
            push(single);
        }
        for url in extract_url_list(record, &FEATURED_IMAGES_ALIASES).unwrap_or_default() {
            push(url);
        }
    }
    urls
}

/// Declared upload content type, inferred from the file extension.
/// Unknown extensions upload with no declared type.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit('.').next()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use serde_json::json;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.jpg"), Some("image/jpeg"));
        assert_eq!(content_type_for("b.JPEG"), Some("image/jpeg"));
        assert_eq!(content_type_for("c.png"), Some("image/png"));
        assert_eq!(content_type_for("d.webp"), Some("image/webp"));
        assert_eq!(content_type_for("e.svg"), Some("image/svg+xml"));
        assert_eq!(content_type_for("f.bin"), None);
    }

    #[test]
    fn collects_unique_urls_in_reference_order() {
        let records = vec![
            json!({ "featuredImage": "https://old/m/a.png",
                    "featuredImages": ["https://old/m/b.png", "https://old/m/a.png"] }),
            json!({ "featured_image": "https://old/m/c.png" }),
        ];
        assert_eq!(
            collect_image_urls(&records),
            vec![
                "https://old/m/a.png",
                "https://old/m/b.png",
                "https://old/m/c.png"
            ]
        );
    }

    fn source(key: &str, prefix: &str) -> MigrationSource {
        MigrationSource {
            key: key.into(),
            endpoint: format!("https://cms.test/{key}"),
            prefix: prefix.into(),
        }
    }

    fn seeded_cache(urls: &[&str]) -> RunCache {
        RunCache::with_downloads(
            urls.iter()
                .map(|u| (u.to_string(), Bytes::from_static(b"img")))
                .collect(),
        )
    }

    #[tokio::test]
    async fn uploads_once_per_key_and_maps_every_image() {
        let store = Arc::new(InMemory::new());
        let migrator = ImageMigrator::with_store(store.clone(), Some("https://pub.test".into()));
        let mut cache = seeded_cache(&["https://old/m/a.png", "https://old/x/a.png"]);

        // Two different source URLs resolving to the same filename: the
        // second hits the uploaded-key guard but still gets a mapping.
        let records = vec![
            json!({ "featuredImage": "https://old/m/a.png" }),
            json!({ "featuredImage": "https://old/x/a.png" }),
        ];
        let mappings = migrator
            .process_records(&source("pages", "pages"), &records, &mut cache)
            .await
            .unwrap();

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].key, "pages/a.png");
        assert_eq!(mappings[0].public_url.as_deref(), Some("https://pub.test/pages/a.png"));
        assert_eq!(cache.uploaded.len(), 1);
        assert!(store
            .get(&ObjectPath::from("pages/a.png"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn cross_source_urls_are_processed_once() {
        let store = Arc::new(InMemory::new());
        let migrator = ImageMigrator::with_store(store, None);
        let mut cache = seeded_cache(&["https://old/m/a.png"]);
        let records = vec![json!({ "featuredImage": "https://old/m/a.png" })];

        let first = migrator
            .process_records(&source("pages", "pages"), &records, &mut cache)
            .await
            .unwrap();
        let second = migrator
            .process_records(&source("animations", "animations"), &records, &mut cache)
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn underivable_filename_is_fatal() {
        let store = Arc::new(InMemory::new());
        let migrator = ImageMigrator::with_store(store, None);
        let mut cache = seeded_cache(&[]);
        let records = vec![json!({ "featuredImage": "https://host/" })];

        let err = migrator
            .process_records(&source("pages", "pages"), &records, &mut cache)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MigrateError>(),
            Some(MigrateError::BadImageUrl { .. })
        ));
    }
}
