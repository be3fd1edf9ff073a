//! Read-only view of the song/playlist catalog.
//!
//! The catalog is either the JSON storage written by the catalog service
//! (`songs.json` + `playlists.json`) or, when those are absent, a scan of a
//! local music directory.

mod load;
mod model;
mod scan;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::CatalogSettings;

pub use model::*;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    playlists: Vec<Playlist>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>, playlists: Vec<Playlist>) -> Self {
        Self { tracks, playlists }
    }

    /// Open `dir` as JSON storage when it holds a `songs.json`, otherwise scan
    /// it for audio files.
    pub fn open(dir: &Path, settings: &CatalogSettings) -> Result<Self, CatalogError> {
        if dir.join(load::SONGS_FILE).is_file() {
            Self::load_json(dir)
        } else {
            Ok(Self::scan(dir, settings))
        }
    }

    pub fn load_json(dir: &Path) -> Result<Self, CatalogError> {
        let tracks = load::read_records(&dir.join(load::SONGS_FILE))?;
        let playlists = load::read_records(&dir.join(load::PLAYLISTS_FILE))?;
        tracing::info!(
            tracks = tracks.len(),
            playlists = playlists.len(),
            dir = %dir.display(),
            "loaded catalog"
        );
        Ok(Self::new(tracks, playlists))
    }

    pub fn scan(dir: &Path, settings: &CatalogSettings) -> Self {
        let tracks = scan::scan(dir, settings);
        tracing::info!(tracks = tracks.len(), dir = %dir.display(), "scanned music directory");
        Self::new(tracks, Vec::new())
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// Catalog index of the track with `id`.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn playlist(&self, id: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    /// Catalog indices of a playlist's songs, in playlist order.
    ///
    /// Ids that no longer resolve (deleted songs) are skipped.
    pub fn playlist_indices(&self, playlist_id: &str) -> Vec<usize> {
        let Some(playlist) = self.playlist(playlist_id) else {
            return Vec::new();
        };
        playlist
            .song_ids
            .iter()
            .filter_map(|id| self.index_of(id))
            .collect()
    }

    /// Case-insensitive substring search over title, artist and album.
    ///
    /// Returns catalog indices in catalog order; a blank query matches
    /// everything.
    pub fn search(&self, query: &str) -> Vec<usize> {
        let query = query.trim().to_lowercase();
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                query.is_empty()
                    || t.title.to_lowercase().contains(&query)
                    || t.artist.to_lowercase().contains(&query)
                    || t.album.to_lowercase().contains(&query)
            })
            .map(|(i, _)| i)
            .collect()
    }
}
