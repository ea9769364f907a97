//! Declarative table of the migrated content families.
//!
//! Everything the pipeline needs to know about a content type lives in one
//! descriptor: where to fetch it, which table it lands in, which media
//! folder its images move to, and how its extra field is extracted from the
//! legacy payload. The fetcher, normalizer and upsert engine iterate this
//! table instead of hard-coding five pipelines.

use serde_json::Value;

/// One optional type-specific column, extracted by trying candidate field
/// names in priority order; first non-empty wins. `rich_text` fields are
/// `{rendered: ...}` objects upstream and are unwrapped to their rendered
/// text.
#[derive(Debug, Clone, Copy)]
pub struct ExtraField {
    pub column: &'static str,
    pub aliases: &'static [&'static str],
    pub rich_text: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ContentTypeDescriptor {
    /// Stable family key, also the REST route segment ("building-blocks").
    pub key: &'static str,
    /// Target table in the row store.
    pub table: &'static str,
    /// Media folder under the target URL base.
    pub folder: &'static str,
    pub extra: Option<ExtraField>,
}

impl ContentTypeDescriptor {
    pub fn endpoint(&self, api_base: &str, page_size: u32) -> String {
        format!(
            "{}/wp/v2/{}?per_page={}&_embed=1",
            api_base.trim_end_matches('/'),
            self.key,
            page_size
        )
    }

    pub fn by_key(key: &str) -> Option<&'static ContentTypeDescriptor> {
        CONTENT_TYPES.iter().find(|d| d.key == key)
    }
}

/// Fixed migration order: pages, building-blocks, animations,
/// creative-coding, audio-projects.
pub const CONTENT_TYPES: [ContentTypeDescriptor; 5] = [
    ContentTypeDescriptor {
        key: "pages",
        table: "pages",
        folder: "pages",
        extra: None,
    },
    ContentTypeDescriptor {
        key: "building-blocks",
        table: "building_blocks",
        folder: "building-blocks",
        extra: Some(ExtraField {
            column: "component",
            aliases: &["reactComponent", "react_component"],
            rich_text: false,
        }),
    },
    ContentTypeDescriptor {
        key: "animations",
        table: "animations",
        folder: "animations",
        extra: Some(ExtraField {
            column: "video_url",
            aliases: &["videoUrl", "video_url"],
            rich_text: false,
        }),
    },
    ContentTypeDescriptor {
        key: "creative-coding",
        table: "creative_coding",
        folder: "creative-coding",
        extra: Some(ExtraField {
            column: "project_url",
            aliases: &["projectUrl", "project_url", "link"],
            rich_text: false,
        }),
    },
    ContentTypeDescriptor {
        key: "audio-projects",
        table: "audio_projects",
        folder: "audio-projects",
        extra: Some(ExtraField {
            column: "audio_url",
            aliases: &["audioUrl", "audio_url"],
            rich_text: false,
        }),
    },
];

/// Try candidate field names in order; first non-empty string wins.
/// Rich-text values arrive as either a bare string or `{rendered: ...}`.
pub fn extract_field(record: &Value, aliases: &[&str]) -> Option<String> {
    for alias in aliases {
        match record.get(alias) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Object(o)) => {
                if let Some(Value::String(s)) = o.get("rendered") {
                    if !s.trim().is_empty() {
                        return Some(s.clone());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Like [`extract_field`] but for URL-list fields: accepts an array of
/// strings or an array of `{url: ...}` objects; empty entries are dropped.
pub fn extract_url_list(record: &Value, aliases: &[&str]) -> Option<Vec<String>> {
    for alias in aliases {
        if let Some(Value::Array(items)) = record.get(alias) {
            let urls: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                    Value::Object(o) => o
                        .get("url")
                        .and_then(|u| u.as_str())
                        .filter(|u| !u.trim().is_empty())
                        .map(|u| u.to_string()),
                    _ => None,
                })
                .collect();
            return Some(urls);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_priority_first_non_empty_wins() {
        let record = json!({ "reactComponent": "", "react_component": "HeroBlock" });
        assert_eq!(
            extract_field(&record, &["reactComponent", "react_component"]),
            Some("HeroBlock".to_string())
        );
        let record = json!({ "reactComponent": "Canonical", "react_component": "Legacy" });
        assert_eq!(
            extract_field(&record, &["reactComponent", "react_component"]),
            Some("Canonical".to_string())
        );
    }

    #[test]
    fn rendered_objects_are_unwrapped() {
        let record = json!({ "title": { "rendered": "Hello" } });
        assert_eq!(extract_field(&record, &["title"]), Some("Hello".into()));
    }

    #[test]
    fn url_lists_accept_strings_and_objects() {
        let record = json!({
            "featuredImages": ["https://a/1.png", { "url": "https://a/2.png" }, ""]
        });
        let urls = extract_url_list(&record, &["featuredImages", "featured_images"]).unwrap();
        assert_eq!(urls, vec!["https://a/1.png", "https://a/2.png"]);
    }

    #[test]
    fn fixed_type_order() {
        let keys: Vec<&str> = CONTENT_TYPES.iter().map(|d| d.key).collect();
        assert_eq!(
            keys,
            [
                "pages",
                "building-blocks",
                "animations",
                "creative-coding",
                "audio-projects"
            ]
        );
    }
}
