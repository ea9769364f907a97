//! Startup configuration: one merge at process start, injected values
//! everywhere else. Resolution order for every knob is config file >
//! environment > hard default; nothing deeper in the pipeline reads the
//! environment directly.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::error::MigrateError;
use crate::util::env::{env_opt, init_env};

pub const DEFAULT_CONFIG_PATH: &str = "migrate.config.json";

const DEFAULT_API_BASE: &str = "https://legacy.studiosite.dev/wp-json";
const DEFAULT_TARGET_BASE: &str = "https://media.studiosite.dev";
const DEFAULT_WRANGLER_BIN: &str = "npx wrangler";

/// Raw, optional-everything shape of `migrate.config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub api_base: Option<String>,
    pub target_base: Option<String>,
    pub d1_database: Option<String>,
    pub wrangler_bin: Option<String>,

    // Object-store credentials (R2 / S3-compatible).
    pub bucket: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_base: Option<String>,

    // Image pipeline: explicit source list beats everything below.
    pub sources: Option<Vec<SourceEntry>>,
    // Per-family overrides, keyed by content family ("pages", ...).
    pub endpoints: HashMap<String, String>,
    pub prefixes: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub key: String,
    pub endpoint: String,
    pub prefix: String,
}

impl ConfigFile {
    /// Read the config file if present; a missing file is an empty config,
    /// a malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let parsed: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "loaded migration config file");
        Ok(parsed)
    }
}

/// Resolved values for the content migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub api_base: String,
    pub target_base: String,
    pub d1_database: Option<String>,
    pub wrangler_bin: String,
    pub file: ConfigFile,
}

impl MigrationConfig {
    pub fn load() -> Result<Self> {
        init_env();
        let path = env_opt("MIGRATE_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_PATH.into());
        let file = ConfigFile::load(Path::new(&path))?;
        Ok(Self::from_parts(file, env_opt))
    }

    /// Pure merge, parameterized over the env lookup so tests never touch
    /// process state.
    pub fn from_parts(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let api_base = first_non_empty([
            file.api_base.clone(),
            env("MIGRATE_API_BASE"),
            Some(DEFAULT_API_BASE.into()),
        ])
        .unwrap_or_default();
        let target_base = first_non_empty([
            file.target_base.clone(),
            env("MIGRATE_TARGET_BASE"),
            Some(DEFAULT_TARGET_BASE.into()),
        ])
        .unwrap_or_default();
        let d1_database = first_non_empty([file.d1_database.clone(), env("D1_DATABASE")]);
        let wrangler_bin = first_non_empty([
            file.wrangler_bin.clone(),
            env("WRANGLER_BIN"),
            Some(DEFAULT_WRANGLER_BIN.into()),
        ])
        .unwrap_or_default();

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            target_base: target_base.trim_end_matches('/').to_string(),
            d1_database,
            wrangler_bin,
            file,
        }
    }
}

/// Credentials for the media bucket. All fields except `region` and
/// `public_base` are required; a missing one is a startup hard failure
/// naming the field.
#[derive(Debug, Clone)]
pub struct StorageCredentials {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_base: Option<String>,
}

impl StorageCredentials {
    pub fn resolve(file: &ConfigFile) -> Result<Self> {
        init_env();
        Self::from_parts(file, env_opt)
    }

    pub fn from_parts(
        file: &ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let required = |file_val: &Option<String>, env_key: &str, field: &str| {
            first_non_empty([file_val.clone(), env(env_key)])
                .ok_or_else(|| MigrateError::Config { field: field.into() })
        };
        Ok(Self {
            bucket: required(&file.bucket, "R2_BUCKET", "bucket")?,
            endpoint: required(&file.endpoint, "R2_ENDPOINT", "endpoint")?,
            region: first_non_empty([file.region.clone(), env("R2_REGION")])
                .unwrap_or_else(|| "auto".into()),
            access_key_id: required(&file.access_key_id, "R2_ACCESS_KEY_ID", "access_key_id")?,
            secret_access_key: required(
                &file.secret_access_key,
                "R2_SECRET_ACCESS_KEY",
                "secret_access_key",
            )?,
            public_base: first_non_empty([file.public_base.clone(), env("R2_PUBLIC_BASE")])
                .map(|b| b.trim_end_matches('/').to_string()),
        })
    }
}

/// First candidate that is present and non-blank.
pub fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn file_beats_env_beats_default() {
        let file = ConfigFile {
            api_base: Some("https://file.example/wp-json".into()),
            ..Default::default()
        };
        let cfg = MigrationConfig::from_parts(file, |k| {
            (k == "MIGRATE_API_BASE").then(|| "https://env.example/wp-json".to_string())
        });
        assert_eq!(cfg.api_base, "https://file.example/wp-json");

        let cfg = MigrationConfig::from_parts(ConfigFile::default(), |k| {
            (k == "MIGRATE_API_BASE").then(|| "https://env.example/wp-json".to_string())
        });
        assert_eq!(cfg.api_base, "https://env.example/wp-json");

        let cfg = MigrationConfig::from_parts(ConfigFile::default(), no_env);
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn blank_values_are_skipped() {
        let file = ConfigFile {
            target_base: Some("   ".into()),
            ..Default::default()
        };
        let cfg = MigrationConfig::from_parts(file, no_env);
        assert_eq!(cfg.target_base, DEFAULT_TARGET_BASE);
    }

    #[test]
    fn missing_credential_names_the_field() {
        let file = ConfigFile {
            bucket: Some("media".into()),
            endpoint: Some("https://acct.r2.example".into()),
            access_key_id: Some("ak".into()),
            ..Default::default()
        };
        let err = StorageCredentials::from_parts(&file, no_env).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("secret_access_key"), "got: {msg}");
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let file = ConfigFile {
            api_base: Some("https://cms.example/wp-json/".into()),
            public_base: Some("https://pub.example/".into()),
            bucket: Some("b".into()),
            endpoint: Some("e".into()),
            access_key_id: Some("a".into()),
            secret_access_key: Some("s".into()),
            ..Default::default()
        };
        let cfg = MigrationConfig::from_parts(file.clone(), no_env);
        assert_eq!(cfg.api_base, "https://cms.example/wp-json");
        let creds = StorageCredentials::from_parts(&file, no_env).unwrap();
        assert_eq!(creds.public_base.as_deref(), Some("https://pub.example"));
        assert_eq!(creds.region, "auto");
    }
}
