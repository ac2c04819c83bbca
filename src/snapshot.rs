//! File-backed catalogs.
//!
//! `JsonLibrary` serves a library export as the source side.
//! `SnapshotCatalog` serves a catalog dump as the destination side: search
//! runs over the dumped tracks/artists/albums, and writes (favorites,
//! playlists) are applied in memory and can be saved back to disk.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{DestinationCatalog, Page, SourceCatalog};
use crate::error::{CatalogError, Result};
use crate::models::{
    AlbumCandidate, ArtistCandidate, DestinationPlaylist, LibraryEntry, MatchCandidate,
    SearchResults, SourceAlbum, SourceArtist, SourcePlaylist,
};

/// A quoted phrase or a bare word.
static QUERY_TERM: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)"|(\S+)"#).unwrap());

fn slice_page<T: Clone>(items: &[T], offset: usize, limit: usize) -> Page<T> {
    let start = offset.min(items.len());
    let end = offset.saturating_add(limit).min(items.len());
    Page::new(items[start..end].to_vec(), end < items.len())
}

// ============================================================================
// Source: library export
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
struct ExportedPlaylist {
    id: String,
    name: String,
    #[serde(default)]
    tracks: Vec<LibraryEntry>,
}

fn default_source_service() -> String {
    "Spotify".to_string()
}

/// Library export as read from disk.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonLibrary {
    #[serde(default = "default_source_service")]
    service: String,
    #[serde(default)]
    liked_tracks: Vec<LibraryEntry>,
    #[serde(default)]
    followed_artists: Vec<SourceArtist>,
    #[serde(default)]
    saved_albums: Vec<SourceAlbum>,
    #[serde(default)]
    playlists: Vec<ExportedPlaylist>,
}

impl JsonLibrary {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let library = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            liked = library.liked_tracks.len(),
            artists = library.followed_artists.len(),
            albums = library.saved_albums.len(),
            playlists = library.playlists.len(),
            "Loaded library export"
        );
        Ok(library)
    }
}

impl SourceCatalog for JsonLibrary {
    fn name(&self) -> &str {
        &self.service
    }

    fn list_liked_tracks(&self, offset: usize, limit: usize) -> Result<Page<LibraryEntry>> {
        Ok(slice_page(&self.liked_tracks, offset, limit))
    }

    fn list_followed_artists(&self, after: Option<&str>, limit: usize) -> Result<Page<SourceArtist>> {
        let start = match after {
            None => 0,
            Some(id) => self
                .followed_artists
                .iter()
                .position(|a| a.id == id)
                .map(|i| i + 1)
                .ok_or_else(|| CatalogError::NotFound(format!("artist cursor {}", id)))?,
        };
        Ok(slice_page(&self.followed_artists, start, limit))
    }

    fn list_saved_albums(&self, offset: usize, limit: usize) -> Result<Page<SourceAlbum>> {
        Ok(slice_page(&self.saved_albums, offset, limit))
    }

    fn list_playlists(&self, offset: usize, limit: usize) -> Result<Page<SourcePlaylist>> {
        let summaries: Vec<SourcePlaylist> = self
            .playlists
            .iter()
            .map(|p| SourcePlaylist {
                id: p.id.clone(),
                name: p.name.clone(),
                track_count: p.tracks.len(),
            })
            .collect();
        Ok(slice_page(&summaries, offset, limit))
    }

    fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<LibraryEntry>> {
        let playlist = self
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| CatalogError::NotFound(format!("playlist {}", playlist_id)))?;
        Ok(slice_page(&playlist.tracks, offset, limit))
    }
}

// ============================================================================
// Destination: catalog snapshot
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub track_ids: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Favorites {
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub albums: Vec<String>,
}

fn default_destination_service() -> String {
    "TIDAL".to_string()
}

/// On-disk layout of a destination snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default = "default_destination_service")]
    service: String,
    #[serde(default)]
    tracks: Vec<MatchCandidate>,
    #[serde(default)]
    artists: Vec<ArtistCandidate>,
    #[serde(default)]
    albums: Vec<AlbumCandidate>,
    #[serde(default)]
    playlists: Vec<StoredPlaylist>,
    #[serde(default)]
    favorites: Favorites,
}

/// User-owned state that writes mutate.
#[derive(Debug, Default)]
struct UserState {
    playlists: Vec<StoredPlaylist>,
    favorites: Favorites,
}

#[derive(Debug)]
pub struct SnapshotCatalog {
    service: String,
    tracks: Vec<MatchCandidate>,
    artists: Vec<ArtistCandidate>,
    albums: Vec<AlbumCandidate>,
    state: RefCell<UserState>,
}

/// Lowercased search terms; quoted phrases stay whole.
pub fn query_terms(query: &str) -> Vec<String> {
    QUERY_TERM
        .captures_iter(query)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Every term must appear somewhere in the haystack fields.
fn matches_terms(terms: &[String], fields: &[&str]) -> bool {
    if terms.is_empty() {
        return false;
    }
    let haystack = fields.join(" ").to_lowercase();
    terms.iter().all(|term| haystack.contains(term.as_str()))
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

impl SnapshotCatalog {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(content)?;
        Ok(Self {
            service: file.service,
            tracks: file.tracks,
            artists: file.artists,
            albums: file.albums,
            state: RefCell::new(UserState {
                playlists: file.playlists,
                favorites: file.favorites,
            }),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        debug!(
            path = %path.display(),
            tracks = catalog.tracks.len(),
            artists = catalog.artists.len(),
            albums = catalog.albums.len(),
            "Loaded destination snapshot"
        );
        Ok(catalog)
    }

    /// Serialize the catalog together with all applied writes.
    pub fn to_json_string(&self) -> Result<String> {
        let state = self.state.borrow();
        let file = SnapshotFile {
            service: self.service.clone(),
            tracks: self.tracks.clone(),
            artists: self.artists.clone(),
            albums: self.albums.clone(),
            playlists: state.playlists.clone(),
            favorites: state.favorites.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn favorites(&self) -> Favorites {
        self.state.borrow().favorites.clone()
    }

    pub fn playlists(&self) -> Vec<StoredPlaylist> {
        self.state.borrow().playlists.clone()
    }

    fn next_playlist_id(playlists: &[StoredPlaylist]) -> String {
        let mut n = playlists.len() + 1;
        loop {
            let id = format!("pl-{}", n);
            if !playlists.iter().any(|p| p.id == id) {
                return id;
            }
            n += 1;
        }
    }
}

impl DestinationCatalog for SnapshotCatalog {
    fn name(&self) -> &str {
        &self.service
    }

    fn search(&self, query: &str, limit: usize) -> Result<SearchResults> {
        let terms = query_terms(query);
        let tracks = self
            .tracks
            .iter()
            .filter(|t| {
                matches_terms(
                    &terms,
                    &[t.name.as_str(), t.artist_name.as_str(), t.album_name.as_deref().unwrap_or("")],
                )
            })
            .take(limit)
            .cloned()
            .collect();
        let artists = self
            .artists
            .iter()
            .filter(|a| matches_terms(&terms, &[a.name.as_str()]))
            .take(limit)
            .cloned()
            .collect();
        let albums = self
            .albums
            .iter()
            .filter(|a| matches_terms(&terms, &[a.name.as_str(), a.artist_name.as_deref().unwrap_or("")]))
            .take(limit)
            .cloned()
            .collect();
        Ok(SearchResults {
            tracks,
            artists,
            albums,
        })
    }

    fn add_favorite_track(&self, id: &str) -> Result<()> {
        if !self.tracks.iter().any(|t| t.id == id) {
            return Err(CatalogError::NotFound(format!("track {}", id)));
        }
        push_unique(&mut self.state.borrow_mut().favorites.tracks, id);
        Ok(())
    }

    fn add_favorite_artist(&self, id: &str) -> Result<()> {
        if !self.artists.iter().any(|a| a.id == id) {
            return Err(CatalogError::NotFound(format!("artist {}", id)));
        }
        push_unique(&mut self.state.borrow_mut().favorites.artists, id);
        Ok(())
    }

    fn add_favorite_album(&self, id: &str) -> Result<()> {
        if !self.albums.iter().any(|a| a.id == id) {
            return Err(CatalogError::NotFound(format!("album {}", id)));
        }
        push_unique(&mut self.state.borrow_mut().favorites.albums, id);
        Ok(())
    }

    fn list_user_playlists(&self) -> Result<Vec<DestinationPlaylist>> {
        Ok(self
            .state
            .borrow()
            .playlists
            .iter()
            .map(|p| DestinationPlaylist {
                id: p.id.clone(),
                name: p.name.clone(),
            })
            .collect())
    }

    fn create_playlist(&self, name: &str, description: &str) -> Result<DestinationPlaylist> {
        let mut state = self.state.borrow_mut();
        let id = Self::next_playlist_id(&state.playlists);
        state.playlists.push(StoredPlaylist {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            track_ids: Vec::new(),
        });
        Ok(DestinationPlaylist {
            id,
            name: name.to_string(),
        })
    }

    fn add_tracks_to_playlist(&self, playlist_id: &str, ids: &[String]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let playlist = state
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| CatalogError::NotFound(format!("playlist {}", playlist_id)))?;
        playlist.track_ids.extend(ids.iter().cloned());
        Ok(())
    }
}
