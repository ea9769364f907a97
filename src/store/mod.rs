//! Row persistence behind a narrow upsert-by-slug contract.

pub mod remote;
pub mod sqlite;

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::content::normalize::NormalizedRow;
use crate::content::schema::ContentTypeDescriptor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertStats {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Insert-or-update rows keyed by slug, sequentially, in input order.
///
/// The lookup-then-write per slug is not safe against a concurrent run on
/// the same collection; the tool assumes a single active migration.
#[async_trait]
pub trait ContentStore {
    async fn upsert(
        &self,
        desc: &ContentTypeDescriptor,
        rows: &[NormalizedRow],
    ) -> Result<UpsertStats>;
}

/// Keep only the first occurrence of each slug; later duplicates within a
/// batch are discarded before persistence.
pub fn dedup_by_slug(rows: &[NormalizedRow]) -> Vec<NormalizedRow> {
    let mut seen: HashSet<&str> = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.slug.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::normalize::normalize;
    use crate::content::schema::ContentTypeDescriptor;
    use serde_json::json;

    #[test]
    fn first_seen_slug_wins() {
        let desc = ContentTypeDescriptor::by_key("pages").unwrap();
        let rows: Vec<_> = [
            json!({ "slug": "a", "title": "first" }),
            json!({ "slug": "b", "title": "other" }),
            json!({ "slug": "a", "title": "second" }),
        ]
        .iter()
        .filter_map(|r| normalize(r, desc, "https://media.test"))
        .collect();

        let deduped = dedup_by_slug(&rows);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].slug, "a");
        assert_eq!(deduped[0].title, "first");
        assert_eq!(deduped[1].slug, "b");
    }
}
