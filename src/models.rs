//! Core data models for library transfer.
//!
//! Source-side descriptors, destination-side candidates, match results,
//! and the per-run bookkeeping (failure ledger, statistics).

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source Models
// ============================================================================

/// A track as described by the source catalog, immutable for one match attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub name: String,
    /// Credited artists in the source's credited order
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl TrackDescriptor {
    pub fn new(name: &str, artists: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album: None,
            duration_ms: None,
        }
    }

    pub fn with_album(mut self, album: &str) -> Self {
        self.album = Some(album.to_string());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// All credited artists joined the way the matcher and reports see them.
    pub fn artist_string(&self) -> String {
        self.artists.join(", ")
    }

    /// First credited artist, used for console lines.
    pub fn lead_artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or("")
    }
}

/// One entry of a liked-songs or playlist listing.
/// Non-track entries (podcast episodes, removed tracks) are skipped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LibraryEntry {
    Track(TrackDescriptor),
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceArtist {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceAlbum {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
}

impl SourceAlbum {
    pub fn artist_string(&self) -> String {
        self.artists.join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourcePlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub track_count: usize,
}

// ============================================================================
// Destination Models
// ============================================================================

/// Track returned by the destination search. Only these fields are read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: String,
    pub name: String,
    pub artist_name: String,
    #[serde(default)]
    pub album_name: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArtistCandidate {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlbumCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artist_name: Option<String>,
}

/// Result of one destination search call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchResults {
    pub tracks: Vec<MatchCandidate>,
    pub artists: Vec<ArtistCandidate>,
    pub albums: Vec<AlbumCandidate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DestinationPlaylist {
    pub id: String,
    pub name: String,
}

// ============================================================================
// Match Results
// ============================================================================

/// Accepted match: the candidate, its confidence in [0, 1] and the query
/// that surfaced it. Consumed immediately by the orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult<C = MatchCandidate> {
    pub candidate: C,
    pub confidence: f64,
    pub query_used: String,
}

// ============================================================================
// Failure Tracking
// ============================================================================

/// Entity category of a transfer; also the ledger partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Songs,
    Artists,
    Albums,
    PlaylistTracks,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Songs,
        Category::Artists,
        Category::Albums,
        Category::PlaylistTracks,
    ];

    /// Identifier used in report file names
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Songs => "songs",
            Category::Artists => "artists",
            Category::Albums => "albums",
            Category::PlaylistTracks => "playlist_tracks",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item that could not be transferred. Never mutated after append.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureRecord {
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub playlist: Option<String>,
    pub reason: String,
}

impl FailureRecord {
    pub fn track(track: &TrackDescriptor, reason: impl Into<String>) -> Self {
        Self {
            name: track.name.clone(),
            artist: track.artist_string(),
            album: track.album.clone(),
            playlist: None,
            reason: reason.into(),
        }
    }

    pub fn playlist_track(
        track: &TrackDescriptor,
        playlist: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            playlist: Some(playlist.to_string()),
            ..Self::track(track, reason)
        }
    }

    pub fn artist(artist: &SourceArtist, reason: impl Into<String>) -> Self {
        Self {
            name: artist.name.clone(),
            artist: artist.name.clone(),
            album: None,
            playlist: None,
            reason: reason.into(),
        }
    }

    pub fn album(album: &SourceAlbum, reason: impl Into<String>) -> Self {
        Self {
            name: album.name.clone(),
            artist: album.artist_string(),
            album: None,
            playlist: None,
            reason: reason.into(),
        }
    }
}

/// Ordered failure records, one sequence per category, for one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FailureLedger {
    songs: Vec<FailureRecord>,
    artists: Vec<FailureRecord>,
    albums: Vec<FailureRecord>,
    playlist_tracks: Vec<FailureRecord>,
}

impl FailureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, category: Category) -> &mut Vec<FailureRecord> {
        match category {
            Category::Songs => &mut self.songs,
            Category::Artists => &mut self.artists,
            Category::Albums => &mut self.albums,
            Category::PlaylistTracks => &mut self.playlist_tracks,
        }
    }

    pub fn push(&mut self, category: Category, record: FailureRecord) {
        self.slot_mut(category).push(record);
    }

    pub fn extend(&mut self, category: Category, records: impl IntoIterator<Item = FailureRecord>) {
        self.slot_mut(category).extend(records);
    }

    pub fn get(&self, category: Category) -> &[FailureRecord] {
        match category {
            Category::Songs => &self.songs,
            Category::Artists => &self.artists,
            Category::Albums => &self.albums,
            Category::PlaylistTracks => &self.playlist_tracks,
        }
    }

    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|&c| self.get(c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for one run; monotonically incremented, reset by a full session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub songs_imported: usize,
    pub artists_imported: usize,
    pub albums_imported: usize,
    pub playlists_created: usize,
    pub total_failed: usize,
}

impl TransferStats {
    pub fn total_imported(&self) -> usize {
        self.songs_imported + self.artists_imported + self.albums_imported
    }

    /// Overall success rate as a percentage, None when nothing was processed
    pub fn success_rate(&self) -> Option<f64> {
        success_rate(self.total_imported(), self.total_failed)
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// `imported / (imported + failed)` as a percentage
pub fn success_rate(imported: usize, failed: usize) -> Option<f64> {
    let total = imported + failed;
    if total == 0 {
        None
    } else {
        Some(100.0 * imported as f64 / total as f64)
    }
}
