//! Turning catalog locators into bytes.
//!
//! Locators are opaque strings; the only interpretation is where to fetch
//! them from. Reachability is discovered by trying.

use std::path::PathBuf;

use super::output::OutputError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Http(String),
}

/// Resolve `locator` against the catalog origin.
///
/// Root-relative locators (`/uploads/audio/a.mp3`) are served by the catalog
/// when `base_url` is set and are plain paths otherwise.
pub fn resolve(locator: &str, base_url: Option<&str>) -> Source {
    let locator = locator.trim();
    if locator.starts_with("http://") || locator.starts_with("https://") {
        return Source::Http(locator.to_string());
    }
    if let Some(path) = locator.strip_prefix("file://") {
        return Source::File(PathBuf::from(path));
    }
    match base_url {
        Some(base) if locator.starts_with('/') => {
            Source::Http(format!("{}{}", base.trim_end_matches('/'), locator))
        }
        _ => Source::File(PathBuf::from(locator)),
    }
}

/// Read the whole source into memory. Runs off the audio thread.
pub fn fetch(
    source: &Source,
    client: &reqwest::blocking::Client,
    locator: &str,
) -> Result<Vec<u8>, OutputError> {
    match source {
        Source::File(path) => std::fs::read(path).map_err(|source| OutputError::Io {
            locator: locator.to_string(),
            source,
        }),
        Source::Http(url) => {
            let http_err = |source| OutputError::Http {
                locator: locator.to_string(),
                source,
            };
            let response = client
                .get(url)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?;
            let bytes = response.bytes().map_err(http_err)?;
            Ok(bytes.to_vec())
        }
    }
}
