//! Image-pipeline source resolution.
//!
//! An explicit source list in the config file overrides everything.
//! Otherwise each of the five content families resolves its endpoint and
//! target-folder prefix independently: per-family file override, then
//! environment override, then hard default — first non-empty wins.

use crate::config::{first_non_empty, ConfigFile};
use crate::content::fetch::PAGE_SIZE;
use crate::content::schema::CONTENT_TYPES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSource {
    pub key: String,
    pub endpoint: String,
    pub prefix: String,
}

pub fn resolve_sources(file: &ConfigFile, api_base: &str) -> Vec<MigrationSource> {
    resolve_with(file, api_base, crate::util::env::env_opt)
}

pub fn resolve_with(
    file: &ConfigFile,
    api_base: &str,
    env: impl Fn(&str) -> Option<String>,
) -> Vec<MigrationSource> {
    if let Some(explicit) = file.sources.as_ref().filter(|s| !s.is_empty()) {
        return explicit
            .iter()
            .map(|s| MigrationSource {
                key: s.key.clone(),
                endpoint: s.endpoint.clone(),
                prefix: s.prefix.clone(),
            })
            .collect();
    }

    CONTENT_TYPES
        .iter()
        .map(|desc| {
            let env_stem = desc.key.to_uppercase().replace('-', "_");
            let endpoint = first_non_empty([
                file.endpoints.get(desc.key).cloned(),
                env(&format!("MIGRATE_{env_stem}_ENDPOINT")),
            ])
            .unwrap_or_else(|| desc.endpoint(api_base, PAGE_SIZE));
            let prefix = first_non_empty([
                file.prefixes.get(desc.key).cloned(),
                env(&format!("MIGRATE_{env_stem}_PREFIX")),
            ])
            .unwrap_or_else(|| desc.folder.to_string());
            MigrationSource {
                key: desc.key.to_string(),
                endpoint,
                prefix,
            }
        })
        .collect()
}
