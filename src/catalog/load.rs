use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

use super::CatalogError;

pub(super) const SONGS_FILE: &str = "songs.json";
pub(super) const PLAYLISTS_FILE: &str = "playlists.json";

/// Read a JSON array of records. A missing file is an empty catalog section.
pub(super) fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CatalogError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(CatalogError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
