//! Capabilities the transfer needs from the two streaming services.
//!
//! Both sides are handed in already authenticated. Calls are blocking;
//! write methods take `&self` like a network client would, so in-memory
//! implementations keep their state behind interior mutability.

use crate::error::Result;
use crate::models::{
    DestinationPlaylist, LibraryEntry, SearchResults, SourceAlbum, SourceArtist, SourcePlaylist,
};

/// One page of a paginated listing.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Server-side indication that further pages exist
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    /// Whether another page should be requested after this one.
    /// An empty page always ends pagination; otherwise either the server
    /// says there is more, or a full page came back.
    pub fn continues(&self, limit: usize) -> bool {
        !self.items.is_empty() && (self.has_more || self.items.len() >= limit)
    }
}

/// Read side: the catalog the library is migrated from.
pub trait SourceCatalog {
    /// Display name used in console output and playlist descriptions
    fn name(&self) -> &str;

    fn list_liked_tracks(&self, offset: usize, limit: usize) -> Result<Page<LibraryEntry>>;

    /// Cursor pagination: `after` is the id of the last artist already seen
    fn list_followed_artists(&self, after: Option<&str>, limit: usize) -> Result<Page<SourceArtist>>;

    fn list_saved_albums(&self, offset: usize, limit: usize) -> Result<Page<SourceAlbum>>;

    fn list_playlists(&self, offset: usize, limit: usize) -> Result<Page<SourcePlaylist>>;

    fn list_playlist_tracks(
        &self,
        playlist_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Page<LibraryEntry>>;
}

/// Write side: the catalog the library is migrated to.
pub trait DestinationCatalog {
    /// Display name used in console output and failure reasons
    fn name(&self) -> &str;

    fn search(&self, query: &str, limit: usize) -> Result<SearchResults>;

    fn add_favorite_track(&self, id: &str) -> Result<()>;
    fn add_favorite_artist(&self, id: &str) -> Result<()>;
    fn add_favorite_album(&self, id: &str) -> Result<()>;

    fn list_user_playlists(&self) -> Result<Vec<DestinationPlaylist>>;
    fn create_playlist(&self, name: &str, description: &str) -> Result<DestinationPlaylist>;
    fn add_tracks_to_playlist(&self, playlist_id: &str, ids: &[String]) -> Result<()>;
}
