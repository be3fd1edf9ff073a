use std::path::Path;

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use walkdir::WalkDir;

use crate::config::CatalogSettings;

use super::model::Track;

fn is_audio_file(path: &Path, settings: &CatalogSettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Stable id for a scanned file: its path relative to the scan root, with
/// `/` separators so ids don't change between platforms.
fn track_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn non_blank(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_track(root: &Path, path: &Path) -> Track {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = String::new();
    let mut album = String::new();
    let mut duration = 0;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            duration = tagged.properties().duration().as_secs() as u32;

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = non_blank(tag.title()) {
                    title = v;
                }
                if let Some(v) = non_blank(tag.artist()) {
                    artist = v;
                }
                if let Some(v) = non_blank(tag.album()) {
                    album = v;
                }
            }
        }
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    Track {
        id: track_id(root, path),
        title,
        artist,
        album,
        duration,
        audio_url: path.display().to_string(),
        cover_url: None,
    }
}

pub(super) fn scan(dir: &Path, settings: &CatalogSettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            tracks.push(read_track(dir, path));
        }
    }

    tracks.sort_by_key(|t| t.display().to_lowercase());
    tracks
}
