//! Raw legacy record -> canonical row shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::content::rewrite::{rewrite, rewrite_all};
use crate::content::sanitize::normalize_title;
use crate::content::schema::{extract_field, extract_url_list, ContentTypeDescriptor};

pub const FEATURED_IMAGE_ALIASES: [&str; 3] =
    ["featuredImage", "featured_image", "featured_media_url"];
pub const FEATURED_IMAGES_ALIASES: [&str; 3] = ["featuredImages", "featured_images", "gallery"];

/// Canonical per-type projection of one remote record. `extra` is the
/// type-specific column named by the descriptor, when the type has one.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub slug: String,
    pub status: String,
    pub kind: String,
    pub title: String,
    pub content: Option<String>,
    pub featured_image: Option<String>,
    pub featured_images: Option<Vec<String>>,
    pub extra: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Normalize one raw record. Records without a slug cannot be keyed and
/// are skipped with a warning.
pub fn normalize(
    record: &Value,
    desc: &ContentTypeDescriptor,
    target_base: &str,
) -> Option<NormalizedRow> {
    let slug = match record.get("slug").and_then(|s| s.as_str()) {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            warn!(kind = desc.key, "skipping record without a slug");
            return None;
        }
    };

    let title = extract_field(record, &["title"])
        .map(|t| normalize_title(&t))
        .unwrap_or_default();
    let content = extract_field(record, &["content"]);

    let featured_image = extract_field(record, &FEATURED_IMAGE_ALIASES);
    let featured_image = rewrite(featured_image.as_deref(), target_base, desc.folder);
    let featured_images = extract_url_list(record, &FEATURED_IMAGES_ALIASES);
    let featured_images = rewrite_all(featured_images.as_deref(), target_base, desc.folder);

    let extra = desc.extra.and_then(|e| {
        let raw = extract_field(record, e.aliases)?;
        // Non-rich extras carry through unmodified; extract_field already
        // unwraps {rendered} objects, which is all rich-text needs.
        Some(raw)
    });

    Some(NormalizedRow {
        slug,
        status: string_field(record, "status").unwrap_or_else(|| "publish".into()),
        kind: string_field(record, "type").unwrap_or_else(|| desc.key.into()),
        title,
        content,
        featured_image,
        featured_images,
        extra,
        // Prefer the upstream GMT timestamps; a record missing one gets
        // "now", so re-running against such a record moves `modified`
        // forward each run. Known quirk, kept on purpose.
        created: timestamp_field(record, &["date_gmt", "date"]),
        modified: timestamp_field(record, &["modified_gmt", "modified"]),
    })
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

fn timestamp_field(record: &Value, aliases: &[&str]) -> DateTime<Utc> {
    aliases
        .iter()
        .filter_map(|key| string_field(record, key))
        .filter_map(|raw| parse_timestamp(&raw))
        .next()
        .unwrap_or_else(Utc::now)
}

/// The legacy API emits `2021-03-04T10:11:12`; tolerate full RFC 3339 too.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
