//! Legacy media URL rewriting.
//!
//! Maps a legacy URL onto `<target_base>/<folder>/<filename>`, keeping the
//! original filename and extension. Already-rewritten URLs pass through
//! unchanged, so re-running a migration is a no-op for these fields.

use url::Url;

/// Final path segment of a URL, percent-decoded. None for malformed input
/// or a trailing slash.
pub fn filename_from_url(raw: &str) -> Option<String> {
    let segment = match Url::parse(raw) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|segments| segments.last().map(|s| s.to_string()))?,
        // Relative or otherwise unparseable: fall back to a plain path scan.
        Err(_) => {
            let path = raw.split(['?', '#']).next().unwrap_or("");
            path.rsplit('/').next().unwrap_or("").to_string()
        }
    };
    if segment.is_empty() {
        return None;
    }
    match urlencoding::decode(&segment) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(segment),
    }
}

/// Rewrite one media URL into the target namespace. None in, None out;
/// a URL with no extractable filename is dropped (None), not an error.
pub fn rewrite(url: Option<&str>, target_base: &str, folder: &str) -> Option<String> {
    let url = url?.trim();
    if url.is_empty() {
        return None;
    }
    let prefix = format!("{}/{}/", target_base.trim_end_matches('/'), folder);
    if url.starts_with(&prefix) {
        return Some(url.to_string());
    }
    let filename = filename_from_url(url)?;
    Some(format!("{prefix}{filename}"))
}

/// Rewrite each element independently, dropping unrewritable entries.
/// An all-empty result collapses to None, never an empty vec.
pub fn rewrite_all(
    urls: Option<&[String]>,
    target_base: &str,
    folder: &str,
) -> Option<Vec<String>> {
    let rewritten: Vec<String> = urls?
        .iter()
        .filter_map(|u| rewrite(Some(u), target_base, folder))
        .collect();
    if rewritten.is_empty() {
        None
    } else {
        Some(rewritten)
    }
}
