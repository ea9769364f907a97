use std::io::Write;

/// Hard-failure taxonomy for the migration pipelines.
///
/// Everything here aborts the run. Binaries catch once at the top and use
/// [`report`] to turn the error into a short prefixed line (plus the
/// underlying cause when one exists) before exiting non-zero.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Non-2xx status or non-list payload from the remote content API.
    #[error("content fetch failed: {status} {reason}")]
    Fetch { status: u16, reason: String },

    /// A required credential or identifier was missing at startup.
    #[error("missing required configuration: {field}")]
    Config { field: String },

    /// Non-success response while fetching an image body.
    #[error("image download failed ({status}): {url}")]
    Download { url: String, status: u16 },

    /// Object-store put failed for a derived key.
    #[error("image upload failed for key {key}")]
    Upload {
        key: String,
        #[source]
        source: object_store::Error,
    },

    /// No filename could be derived from an image URL. Fatal in the image
    /// pipeline (the normalizer's rewrite path degrades to null instead).
    #[error("cannot derive a filename from image url: {url}")]
    BadImageUrl { url: String },

    /// The external query-execution tool returned something we cannot read.
    #[error("unexpected response from external query tool: {detail}")]
    ExternalTool { detail: String },
}

/// Print a caught top-level failure on stderr. Tagged migration errors get
/// the short prefixed form; anything else gets the generic message with the
/// raw error. Summaries stay on stdout, diagnostics never mix into them.
pub fn report(err: &anyhow::Error) {
    let _ = write_report(&mut std::io::stderr().lock(), err);
}

fn write_report(out: &mut impl Write, err: &anyhow::Error) -> std::io::Result<()> {
    if let Some(tagged) = err.downcast_ref::<MigrateError>() {
        writeln!(out, "migration failed: {tagged}")?;
        if let Some(cause) = std::error::Error::source(tagged) {
            writeln!(out, "caused by: {cause}")?;
        }
    } else {
        writeln!(out, "migration failed unexpectedly: {err:#}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(err: &anyhow::Error) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, err).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn tagged_errors_get_the_prefixed_form() {
        let err = anyhow::Error::from(MigrateError::Fetch {
            status: 500,
            reason: "Internal Server Error".into(),
        });
        assert_eq!(
            rendered(&err),
            "migration failed: content fetch failed: 500 Internal Server Error\n"
        );
    }

    #[test]
    fn untagged_errors_get_the_generic_form() {
        let err = anyhow::anyhow!("disk full");
        let out = rendered(&err);
        assert!(out.starts_with("migration failed unexpectedly: disk full"));
    }
}
