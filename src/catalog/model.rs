use serde::{Deserialize, Serialize};

/// A playable item as published by the catalog.
///
/// `duration` is whole seconds and is what the seek bar ranges over; the
/// decoded stream may be slightly longer or shorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub duration: u32,
    pub audio_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
}

impl Track {
    /// "Artist - Title", or just the title when the artist is blank.
    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", artist, self.title)
        }
    }
}

/// An ordered list of track ids owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub song_ids: Vec<String>,
}
