//! Source -> target image mapping, produced per run for the migration
//! summary. Built positionally between the raw records' original image
//! fields and the normalized records' rewritten fields.

use serde_json::Value;

use crate::content::normalize::{
    NormalizedRow, FEATURED_IMAGES_ALIASES, FEATURED_IMAGE_ALIASES,
};
use crate::content::schema::{extract_field, extract_url_list};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageMapping {
    pub source: String,
    pub target: String,
}

/// One entry per image reference that survived rewriting. Raw and
/// normalized lists are paired by index; an index with no counterpart on
/// either side is skipped, not an error.
pub fn collect(raw: &[Value], rows: &[NormalizedRow]) -> Vec<ImageMapping> {
    let mut mappings = Vec::new();
    for (record, row) in raw.iter().zip(rows.iter()) {
        let source = extract_field(record, &FEATURED_IMAGE_ALIASES);
        if let (Some(source), Some(target)) = (source, row.featured_image.as_ref()) {
            mappings.push(ImageMapping {
                source,
                target: target.clone(),
            });
        }

        let sources = extract_url_list(record, &FEATURED_IMAGES_ALIASES).unwrap_or_default();
        let targets = row.featured_images.as_deref().unwrap_or_default();
        for (source, target) in sources.iter().zip(targets.iter()) {
            mappings.push(ImageMapping {
                source: source.clone(),
                target: target.clone(),
            });
        }
    }
    mappings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::normalize::normalize;
    use crate::content::schema::ContentTypeDescriptor;
    use serde_json::json;

    const BASE: &str = "https://media.studiosite.dev";

    #[test]
    fn cardinality_single_plus_pairable_gallery_entries() {
        // One featured image that rewrites, plus 3 gallery entries of
        // which 2 rewrite: expect exactly 1 + 2 = 3 mappings.
        let raw = vec![json!({
            "slug": "a",
            "title": "A",
            "featuredImage": "https://old/m/pic.webp",
            "featuredImages": [
                "https://old/m/1.png",
                "https://old/bad/",
                "https://old/m/2.png"
            ]
        })];
        let desc = ContentTypeDescriptor::by_key("pages").unwrap();
        let rows: Vec<_> = raw
            .iter()
            .filter_map(|r| normalize(r, desc, BASE))
            .collect();
        let mappings = collect(&raw, &rows);
        assert_eq!(mappings.len(), 3);
        assert_eq!(
            mappings[0],
            ImageMapping {
                source: "https://old/m/pic.webp".into(),
                target: "https://media.studiosite.dev/pages/pic.webp".into()
            }
        );
    }

    #[test]
    fn missing_counterpart_indexes_are_skipped() {
        let raw = vec![
            json!({ "slug": "a", "title": "A", "featuredImage": "https://old/m/p.png" }),
            json!({ "slug": "b", "title": "B", "featuredImage": "https://old/m/q.png" }),
        ];
        let desc = ContentTypeDescriptor::by_key("pages").unwrap();
        // Normalized batch shorter than the raw batch.
        let rows = vec![normalize(&raw[0], desc, BASE).unwrap()];
        let mappings = collect(&raw, &rows);
        assert_eq!(mappings.len(), 1);
    }

    #[test]
    fn no_mapping_when_rewrite_failed() {
        let raw = vec![json!({
            "slug": "a", "title": "A", "featuredImage": "https://old/trailing/"
        })];
        let desc = ContentTypeDescriptor::by_key("pages").unwrap();
        let rows: Vec<_> = raw
            .iter()
            .filter_map(|r| normalize(r, desc, BASE))
            .collect();
        assert!(collect(&raw, &rows).is_empty());
    }
}
