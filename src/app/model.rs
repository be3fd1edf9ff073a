//! Application model: the browsing context, selection and filter, plus the
//! last playback snapshot received from the player.

use crate::audio::PlaybackSnapshot;
use crate::catalog::{Catalog, Track};

/// What the track list is showing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Context {
    Library,
    /// Index into `Catalog::playlists`.
    Playlist(usize),
    /// Catalog-wide search results for `App::search_query`. Playing from
    /// here plays the track alone.
    Search,
}

/// The main application model.
pub struct App {
    pub catalog: Catalog,
    pub context: Context,
    /// Catalog index of the highlighted track.
    pub selected: usize,
    pub snapshot: PlaybackSnapshot,

    lower_titles: Option<Vec<String>>,

    pub follow_playback: bool,
    pub filter_mode: bool,
    pub filter_query: String,
    pub search_mode: bool,
    pub search_query: String,
    pub current_dir: Option<String>,
    pub metadata_window: bool,
}

impl App {
    /// Create a new `App` browsing the whole library of `catalog`.
    pub fn new(catalog: Catalog) -> Self {
        // For larger libraries, precompute lowercase titles to speed up fuzzy
        // filtering (avoid per-char lowercase conversions on every redraw/keystroke).
        let lower_titles = if catalog.tracks().len() > 100 {
            Some(
                catalog
                    .tracks()
                    .iter()
                    .map(|t| t.display().to_ascii_lowercase())
                    .collect(),
            )
        } else {
            None
        };

        Self {
            catalog,
            context: Context::Library,
            selected: 0,
            snapshot: PlaybackSnapshot::default(),
            lower_titles,
            follow_playback: true,
            filter_mode: false,
            filter_query: String::new(),
            search_mode: false,
            search_query: String::new(),
            current_dir: None,
            metadata_window: false,
        }
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }
    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn context_name(&self) -> String {
        match self.context {
            Context::Library => "Library".to_string(),
            Context::Playlist(i) => self
                .catalog
                .playlists()
                .get(i)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Library".to_string()),
            Context::Search => format!("Search \"{}\"", self.search_query.trim()),
        }
    }

    /// Switch between the library and each playlist, in catalog order.
    pub fn cycle_context(&mut self, forward: bool) {
        let playlists = self.catalog.playlists().len();
        // 0 = library, 1..=n = playlists
        let total = playlists + 1;
        let cur = match self.context {
            Context::Library | Context::Search => 0,
            Context::Playlist(i) => i + 1,
        };
        let next = if forward {
            (cur + 1) % total
        } else {
            (cur + total - 1) % total
        };
        self.context = if next == 0 {
            Context::Library
        } else {
            Context::Playlist(next - 1)
        };
        self.search_mode = false;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }

    /// Catalog indices of the active context, before filtering.
    pub fn context_indices(&self) -> Vec<usize> {
        match self.context {
            Context::Library => (0..self.catalog.tracks().len()).collect(),
            Context::Playlist(i) => match self.catalog.playlists().get(i) {
                Some(p) => self.catalog.playlist_indices(&p.id),
                None => Vec::new(),
            },
            Context::Search => self.catalog.search(&self.search_query),
        }
    }

    /// Return the visible track indices: the active context narrowed by the
    /// fuzzy filter.
    pub fn display_indices(&self) -> Vec<usize> {
        let base = self.context_indices();

        let query = self.filter_query.trim();
        if query.is_empty() {
            return base;
        }
        match self.lower_titles.as_deref() {
            Some(lower_titles) => {
                let query_lower = query.to_ascii_lowercase();
                base.into_iter()
                    .filter(|&i| {
                        Self::fuzzy_match_positions_lower(&lower_titles[i], &query_lower).is_some()
                    })
                    .collect()
            }
            None => base
                .into_iter()
                .filter(|&i| {
                    Self::fuzzy_match_positions(&self.catalog.tracks()[i].display(), query)
                        .is_some()
                })
                .collect(),
        }
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.catalog.tracks().get(self.selected)
    }

    /// The queue to hand the player when the selection is activated: every
    /// visible track, plus the one to start with.
    pub fn queue_for_selection(&self) -> Option<(Vec<Track>, Track)> {
        let display = self.display_indices();
        if !display.contains(&self.selected) {
            return None;
        }
        let start = self.catalog.tracks().get(self.selected)?.clone();
        let queue = display
            .into_iter()
            .map(|i| self.catalog.tracks()[i].clone())
            .collect();
        Some((queue, start))
    }

    /// Catalog index of the track bound to the player.
    pub fn playing_index(&self) -> Option<usize> {
        self.catalog.index_of(&self.snapshot.track.as_ref()?.id)
    }

    /// Store a fresh snapshot and, when following playback, move the cursor
    /// onto the playing track if it is visible.
    pub fn apply_snapshot(&mut self, snapshot: PlaybackSnapshot) {
        self.snapshot = snapshot;
        if !self.follow_playback || self.filter_mode || self.search_mode {
            return;
        }
        if let Some(idx) = self.playing_index() {
            if self.selected != idx && self.display_indices().contains(&idx) {
                self.selected = idx;
            }
        }
    }

    pub fn uses_lower_titles(&self) -> bool {
        self.lower_titles.is_some()
    }

    /// Fuzzy-match `query_lower` against a specific track by index.
    ///
    /// Returns the character positions that match, or `None` when there is no match.
    pub fn fuzzy_match_positions_for_track_lower(
        &self,
        track_index: usize,
        query_lower: &str,
    ) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }

        match self.lower_titles.as_deref() {
            Some(lower_titles) => {
                Self::fuzzy_match_positions_lower(&lower_titles[track_index], query_lower)
            }
            None => Self::fuzzy_match_positions(
                &self.catalog.tracks()[track_index].display(),
                query_lower,
            ),
        }
    }

    /// Return the next visible index after `current`, wrapping to the first.
    pub fn next_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(p) => Some(display[(p + 1) % display.len()]),
            None => Some(display[0]),
        }
    }

    /// Return the previous visible index before `current`, wrapping to the last.
    pub fn prev_in_view_from(&self, current: usize) -> Option<usize> {
        let display = self.display_indices();
        if display.is_empty() {
            return None;
        }

        let pos = display.iter().position(|&i| i == current);
        match pos {
            Some(0) => Some(display[display.len() - 1]),
            Some(p) => Some(display[p - 1]),
            None => Some(display[display.len() - 1]),
        }
    }

    /// Set the selected track index and ensure it is visible in the display.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx;
        self.ensure_selected_visible();
    }
    pub fn has_tracks(&self) -> bool {
        !self.display_indices().is_empty()
    }

    /// Fuzzy/subsequence match: return the character positions in `title`
    /// that match `query`, or `None` if not matched.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        if query.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title.chars().enumerate();

        for qc in query.chars() {
            let qc_low = qc.to_ascii_lowercase();
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc.to_ascii_lowercase() == qc_low => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    fn fuzzy_match_positions_lower(title_lower: &str, query_lower: &str) -> Option<Vec<usize>> {
        if query_lower.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title_lower.chars().enumerate();

        for qc in query_lower.chars() {
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc == qc => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    /// Open the catalog-wide search prompt, replacing the current view.
    pub fn enter_search_mode(&mut self) {
        self.search_mode = true;
        self.context = Context::Search;
        self.filter_query.clear();
        self.filter_mode = false;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }
    /// Stop editing the query; the results stay on screen.
    pub fn exit_search_mode(&mut self) {
        self.search_mode = false;
    }
    pub fn cancel_search(&mut self) {
        self.search_mode = false;
        self.search_query.clear();
        self.context = Context::Library;
        self.ensure_selected_visible();
    }
    pub fn push_search_char(&mut self, c: char) {
        self.search_query.push(c);
        self.ensure_selected_visible();
    }
    pub fn pop_search_char(&mut self) {
        self.search_query.pop();
        self.ensure_selected_visible();
    }

    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.follow_playback_off();
        self.ensure_selected_visible();
    }
    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }
    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.ensure_selected_visible();
    }
    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Ensure that `selected` is part of the current view, otherwise move
    /// selection to the first visible track.
    fn ensure_selected_visible(&mut self) {
        let display = self.display_indices();
        if display.is_empty() {
            self.selected = 0;
            return;
        }

        if !display.contains(&self.selected) {
            self.selected = display[0];
        }
    }
    /// Move selection to the next visible track.
    pub fn next(&mut self) {
        if let Some(next) = self.next_in_view_from(self.selected) {
            self.selected = next;
        }
    }

    /// Move selection to the previous visible track.
    pub fn prev(&mut self) {
        if let Some(prev) = self.prev_in_view_from(self.selected) {
            self.selected = prev;
        }
    }
}
