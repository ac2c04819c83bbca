//! Transfer orchestration.
//!
//! A `Transfer` walks one source category to exhaustion, matches each item
//! against the destination and writes accepted matches. Failures are values
//! at every level:
//! - a failed search query is skipped inside the matcher;
//! - a failed item becomes an `ItemOutcome::Failed` record;
//! - a failed listing ends the category with `CategoryOutcome::aborted`.
//!
//! Counters and the failure ledger live in a `TransferSession` owned by the
//! caller, so nothing is shared between runs implicitly.

use std::time::Instant;

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::catalog::{DestinationCatalog, Page, SourceCatalog};
use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::matcher::{self, DirectMatch};
use crate::models::{
    Category, DestinationPlaylist, FailureLedger, FailureRecord, LibraryEntry, MatchResult,
    SourceAlbum, SourceArtist, SourcePlaylist, TrackDescriptor, TransferStats,
};
use crate::progress::{self, format_duration, print_line, LOG_INTERVAL};
use crate::report::{self, confidence_marker, ReportScope};

// ============================================================================
// Outcomes
// ============================================================================

/// Result of transferring one item.
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome {
    Imported { confidence: f64 },
    Failed(FailureRecord),
}

/// Result of one category run. Counts cover only items processed before an
/// abort, if any.
#[derive(Debug)]
pub struct CategoryOutcome {
    pub category: Category,
    pub imported: usize,
    /// Newly created destination playlists; reused ones are not counted
    pub playlists_created: usize,
    pub failures: Vec<FailureRecord>,
    /// Listing error that ended the category early
    pub aborted: Option<CatalogError>,
}

impl CategoryOutcome {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            imported: 0,
            playlists_created: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn add(&mut self, item: ItemOutcome) {
        match item {
            ItemOutcome::Imported { .. } => self.imported += 1,
            ItemOutcome::Failed(record) => self.failures.push(record),
        }
    }
}

/// Counters and failure ledger for one run.
#[derive(Debug, Default)]
pub struct TransferSession {
    pub stats: TransferStats,
    pub ledger: FailureLedger,
}

impl TransferSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold a category outcome into the counters and ledger.
    /// Playlist tracks count as imported songs.
    pub fn record(&mut self, outcome: &CategoryOutcome) {
        match outcome.category {
            Category::Songs => self.stats.songs_imported += outcome.imported,
            Category::Artists => self.stats.artists_imported += outcome.imported,
            Category::Albums => self.stats.albums_imported += outcome.imported,
            Category::PlaylistTracks => {
                self.stats.songs_imported += outcome.imported;
                self.stats.playlists_created += outcome.playlists_created;
            }
        }
        self.stats.total_failed += outcome.failed();
        self.ledger
            .extend(outcome.category, outcome.failures.iter().cloned());
    }
}

// ============================================================================
// Failure reasons
// ============================================================================

pub fn error_reason(err: &CatalogError) -> String {
    format!("Error: {}", err)
}

pub fn below_threshold_reason(best_score: f64) -> String {
    format!("No good match found (best score: {:.0}%)", best_score * 100.0)
}

// ============================================================================
// Pagination
// ============================================================================

/// Walk an offset-paginated listing to exhaustion, visiting items in order.
/// The first listing or visit error stops the walk.
fn for_each_page<T>(
    limit: usize,
    mut fetch: impl FnMut(usize, usize) -> Result<Page<T>>,
    mut visit: impl FnMut(&T) -> Result<()>,
) -> Result<()> {
    let limit = limit.max(1);
    let mut offset = 0;
    loop {
        let page = fetch(offset, limit)?;
        debug!(offset, count = page.items.len(), has_more = page.has_more, "Fetched page");
        for item in &page.items {
            visit(item)?;
        }
        if !page.continues(limit) {
            return Ok(());
        }
        offset += limit;
    }
}

fn category_title(category: Category) -> (&'static str, &'static str) {
    match category {
        Category::Songs => ("🎵 TRANSFERRING LIKED SONGS", "liked songs"),
        Category::Artists => ("👨‍🎤 TRANSFERRING FOLLOWED ARTISTS", "followed artists"),
        Category::Albums => ("💿 TRANSFERRING SAVED ALBUMS", "saved albums"),
        Category::PlaylistTracks => ("📋 TRANSFERRING PLAYLISTS", "playlists"),
    }
}

fn print_item(pb: &ProgressBar, indent: &str, label: &str, item: &ItemOutcome, high_confidence: f64) {
    let line = match item {
        ItemOutcome::Imported { confidence } => format!(
            "{}{} {} ({:.0}%)",
            indent,
            confidence_marker(*confidence, high_confidence),
            label,
            confidence * 100.0
        ),
        ItemOutcome::Failed(record) => format!("{}❌ {} ({})", indent, label, record.reason),
    };
    print_line(pb, &line);
}

fn track_label(track: &TrackDescriptor) -> String {
    format!("{} - {}", track.name, track.lead_artist())
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Moves a library from `source` to `destination`.
pub struct Transfer<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    destination: &'a D,
    config: &'a Config,
}

impl<'a, S, D> Transfer<'a, S, D>
where
    S: SourceCatalog + ?Sized,
    D: DestinationCatalog + ?Sized,
{
    pub fn new(source: &'a S, destination: &'a D, config: &'a Config) -> Self {
        Self {
            source,
            destination,
            config,
        }
    }

    fn no_match_reason(&self) -> String {
        format!("No match found on {}", self.destination.name())
    }

    fn not_found_reason(&self) -> String {
        format!("Not found on {}", self.destination.name())
    }

    /// Progressive track match against the destination's search.
    pub fn match_track(&self, track: &TrackDescriptor) -> Option<MatchResult> {
        matcher::match_track(track, &self.config.matching, |query, limit| {
            self.destination.search(query, limit).map(|results| results.tracks)
        })
    }

    /// Write an accepted direct match, or explain why nothing was written.
    fn apply_direct<C>(
        &self,
        found: Result<DirectMatch<C>>,
        write: impl FnOnce(&C) -> Result<()>,
    ) -> std::result::Result<f64, String> {
        match found {
            Ok(DirectMatch::Accepted(result)) => write(&result.candidate)
                .map(|()| result.confidence)
                .map_err(|e| error_reason(&e)),
            Ok(DirectMatch::BelowThreshold { best_score }) => Err(below_threshold_reason(best_score)),
            Ok(DirectMatch::NoMatch) => Err(self.no_match_reason()),
            Ok(DirectMatch::NotFound) => Err(self.not_found_reason()),
            Err(e) => Err(error_reason(&e)),
        }
    }

    // ------------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------------

    pub fn transfer_song(&self, track: &TrackDescriptor) -> ItemOutcome {
        let Some(found) = self.match_track(track) else {
            return ItemOutcome::Failed(FailureRecord::track(track, self.no_match_reason()));
        };
        match self.destination.add_favorite_track(&found.candidate.id) {
            Ok(()) => ItemOutcome::Imported {
                confidence: found.confidence,
            },
            Err(e) => ItemOutcome::Failed(FailureRecord::track(track, error_reason(&e))),
        }
    }

    pub fn transfer_artist(&self, artist: &SourceArtist) -> ItemOutcome {
        let found = matcher::match_artist(artist, &self.config.matching, |query, limit| {
            self.destination.search(query, limit).map(|results| results.artists)
        });
        match self.apply_direct(found, |c| self.destination.add_favorite_artist(&c.id)) {
            Ok(confidence) => ItemOutcome::Imported { confidence },
            Err(reason) => ItemOutcome::Failed(FailureRecord::artist(artist, reason)),
        }
    }

    pub fn transfer_album(&self, album: &SourceAlbum) -> ItemOutcome {
        let found = matcher::match_album(album, &self.config.matching, |query, limit| {
            self.destination.search(query, limit).map(|results| results.albums)
        });
        match self.apply_direct(found, |c| self.destination.add_favorite_album(&c.id)) {
            Ok(confidence) => ItemOutcome::Imported { confidence },
            Err(reason) => ItemOutcome::Failed(FailureRecord::album(album, reason)),
        }
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    /// Liked songs into destination favorites. Non-track entries are skipped.
    pub fn transfer_songs(&self) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(Category::Songs);
        let high = self.config.matching.track_high_confidence;
        let pb = progress::create_spinner("🎵 Liked songs");

        let listed = for_each_page(
            self.config.transfer.songs_page_size,
            |offset, limit| self.source.list_liked_tracks(offset, limit),
            |entry| {
                let LibraryEntry::Track(track) = entry else {
                    return Ok(());
                };
                let item = self.transfer_song(track);
                print_item(&pb, "  ", &track_label(track), &item, high);
                outcome.add(item);
                pb.inc(1);
                progress::log_progress("songs", pb.position(), None, LOG_INTERVAL);
                Ok(())
            },
        );

        pb.finish_and_clear();
        outcome.aborted = listed.err();
        outcome
    }

    /// Followed artists into destination favorites (cursor pagination).
    pub fn transfer_artists(&self) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(Category::Artists);
        let pb = progress::create_spinner("👨‍🎤 Followed artists");
        outcome.aborted = self.walk_artists(&mut outcome, &pb).err();
        pb.finish_and_clear();
        outcome
    }

    fn walk_artists(&self, outcome: &mut CategoryOutcome, pb: &ProgressBar) -> Result<()> {
        let limit = self.config.transfer.artists_page_size.max(1);
        let high = self.config.matching.artist_high_confidence;
        let mut after: Option<String> = None;

        loop {
            let page = self.source.list_followed_artists(after.as_deref(), limit)?;
            debug!(after = ?after, count = page.items.len(), "Fetched artists page");

            for artist in &page.items {
                let item = self.transfer_artist(artist);
                print_item(pb, "  ", &artist.name, &item, high);
                outcome.add(item);
                pb.inc(1);
                progress::log_progress("artists", pb.position(), None, LOG_INTERVAL);
            }

            if !page.continues(limit) {
                return Ok(());
            }
            match page.items.last() {
                Some(last) => after = Some(last.id.clone()),
                None => return Ok(()),
            }
        }
    }

    /// Saved albums into destination favorites.
    pub fn transfer_albums(&self) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(Category::Albums);
        let high = self.config.matching.album_high_confidence;
        let pb = progress::create_spinner("💿 Saved albums");

        let listed = for_each_page(
            self.config.transfer.albums_page_size,
            |offset, limit| self.source.list_saved_albums(offset, limit),
            |album| {
                let item = self.transfer_album(album);
                let label = format!("{} - {}", album.name, album.artist_string());
                print_item(&pb, "  ", &label, &item, high);
                outcome.add(item);
                pb.inc(1);
                progress::log_progress("albums", pb.position(), None, LOG_INTERVAL);
                Ok(())
            },
        );

        pb.finish_and_clear();
        outcome.aborted = listed.err();
        outcome
    }

    /// Recreate every source playlist on the destination. A failure inside
    /// one playlist abandons that playlist only.
    pub fn transfer_playlists(&self) -> CategoryOutcome {
        let mut outcome = CategoryOutcome::new(Category::PlaylistTracks);

        let listed = for_each_page(
            self.config.transfer.playlists_page_size,
            |offset, limit| self.source.list_playlists(offset, limit),
            |playlist| {
                if let Err(e) = self.transfer_playlist(playlist, &mut outcome) {
                    warn!(playlist = %playlist.name, error = %e, "Playlist abandoned");
                    println!("  ❌ Error processing playlist '{}': {}", playlist.name, e);
                }
                Ok(())
            },
        );

        outcome.aborted = listed.err();
        outcome
    }

    fn transfer_playlist(&self, playlist: &SourcePlaylist, outcome: &mut CategoryOutcome) -> Result<()> {
        println!("\n📂 Processing: {} ({} tracks)", playlist.name, playlist.track_count);
        let target = self.resolve_playlist(&playlist.name, outcome)?;

        let imported_before = outcome.imported;
        let failed_before = outcome.failed();
        let pb = progress::create_progress_bar(playlist.track_count as u64, &playlist.name);
        let filled = self.fill_playlist(playlist, &target, outcome, &pb);
        pb.finish_and_clear();
        filled?;

        println!(
            "  📊 Playlist complete: {} imported, {} failed",
            outcome.imported - imported_before,
            outcome.failed() - failed_before
        );
        Ok(())
    }

    /// Reuse the first destination playlist with exactly this name, or create one.
    fn resolve_playlist(&self, name: &str, outcome: &mut CategoryOutcome) -> Result<DestinationPlaylist> {
        let existing = self.destination.list_user_playlists()?;
        if let Some(found) = existing.into_iter().find(|p| p.name == name) {
            println!("  ℹ️ Using existing {} playlist: {}", self.destination.name(), name);
            return Ok(found);
        }

        let description = self
            .config
            .transfer
            .playlist_description_for(self.source.name());
        let created = self.destination.create_playlist(name, &description)?;
        outcome.playlists_created += 1;
        info!(playlist = %name, id = %created.id, "Created playlist");
        println!("  ➕ Created {} playlist: {}", self.destination.name(), name);
        Ok(created)
    }

    /// Match every track of `playlist` and append matches to `target` in
    /// fixed-size batches. Tracks count as imported once their batch is
    /// written. If the playlist is abandoned, every matched but unwritten
    /// track is recorded as failed with the error that stopped it.
    fn fill_playlist(
        &self,
        playlist: &SourcePlaylist,
        target: &DestinationPlaylist,
        outcome: &mut CategoryOutcome,
        pb: &ProgressBar,
    ) -> Result<()> {
        let batch_size = self.config.transfer.playlist_batch_size.max(1);
        let high = self.config.matching.track_high_confidence;
        let mut batch: Vec<(String, TrackDescriptor)> = Vec::with_capacity(batch_size);

        let mut filled = for_each_page(
            self.config.transfer.playlist_tracks_page_size,
            |offset, limit| self.source.list_playlist_tracks(&playlist.id, offset, limit),
            |entry| {
                let LibraryEntry::Track(track) = entry else {
                    return Ok(());
                };
                pb.inc(1);
                progress::log_progress(
                    &playlist.name,
                    pb.position(),
                    Some(playlist.track_count as u64),
                    LOG_INTERVAL,
                );

                match self.match_track(track) {
                    Some(found) => {
                        let item = ItemOutcome::Imported {
                            confidence: found.confidence,
                        };
                        print_item(pb, "    ", &track_label(track), &item, high);
                        batch.push((found.candidate.id, track.clone()));
                        if batch.len() >= batch_size {
                            self.flush_batch(target, &mut batch, outcome)?;
                        }
                    }
                    None => {
                        let record =
                            FailureRecord::playlist_track(track, &playlist.name, self.no_match_reason());
                        let item = ItemOutcome::Failed(record);
                        print_item(pb, "    ", &track_label(track), &item, high);
                        outcome.add(item);
                    }
                }
                Ok(())
            },
        );
        if filled.is_ok() && !batch.is_empty() {
            filled = self.flush_batch(target, &mut batch, outcome);
        }

        if let Err(e) = &filled {
            let reason = error_reason(e);
            for (_, track) in batch.drain(..) {
                let item = ItemOutcome::Failed(FailureRecord::playlist_track(&track, &playlist.name, &reason));
                print_item(pb, "    ", &track_label(&track), &item, high);
                outcome.add(item);
            }
        }
        filled
    }

    /// Append the buffered ids to `target`. On error the batch is left intact.
    fn flush_batch(
        &self,
        target: &DestinationPlaylist,
        batch: &mut Vec<(String, TrackDescriptor)>,
        outcome: &mut CategoryOutcome,
    ) -> Result<()> {
        let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
        self.destination.add_tracks_to_playlist(&target.id, &ids)?;
        debug!(playlist = %target.name, count = ids.len(), "Flushed playlist batch");
        outcome.imported += ids.len();
        batch.clear();
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------------

    /// Run one category, fold it into `session`, print its summary and, if
    /// anything failed, the failure summary and report.
    pub fn run(&self, category: Category, session: &mut TransferSession) -> CategoryOutcome {
        let (heading, noun) = category_title(category);
        println!("\n{}", heading);
        println!("{:=<40}", "");
        println!("📥 Fetching your {} from {}...", noun, self.source.name());

        let started = Instant::now();
        let outcome = match category {
            Category::Songs => self.transfer_songs(),
            Category::Artists => self.transfer_artists(),
            Category::Albums => self.transfer_albums(),
            Category::PlaylistTracks => self.transfer_playlists(),
        };

        if let Some(e) = &outcome.aborted {
            warn!(category = %category, error = %e, "Category aborted");
            println!("❌ Error during {} transfer: {}", noun, e);
        }

        session.record(&outcome);
        print!(
            "{}",
            report::render_category_summary(
                category,
                outcome.imported,
                outcome.failed(),
                outcome.playlists_created
            )
        );
        info!(
            category = %category,
            imported = outcome.imported,
            failed = outcome.failed(),
            elapsed = %format_duration(started.elapsed()),
            "Category finished"
        );

        if outcome.failed() > 0 {
            self.report_failures(session, ReportScope::Only(category));
        }
        outcome
    }

    /// Reset the session, then run songs, artists, albums and playlists in
    /// that order. A failed category never blocks the next.
    pub fn run_everything(&self, session: &mut TransferSession) -> Vec<CategoryOutcome> {
        println!("\n🚀 TRANSFERRING EVERYTHING");
        println!("{:=<40}", "");
        session.reset();

        let total = Category::ALL.len();
        let mut outcomes = Vec::with_capacity(total);
        for (i, category) in Category::ALL.into_iter().enumerate() {
            println!("\n{}/{} Transferring {}...", i + 1, total, category_title(category).1);
            outcomes.push(self.run(category, session));
        }

        self.show_stats(session);
        outcomes
    }

    /// Print run-wide statistics plus the combined failure summary and report.
    pub fn show_stats(&self, session: &TransferSession) {
        print!("{}", report::render_stats(&session.stats));
        if !session.ledger.is_empty() {
            self.report_failures(session, ReportScope::All);
        }
        println!("{:=<60}", "");
    }

    fn report_failures(&self, session: &TransferSession, scope: ReportScope) {
        print!("{}", report::render_summary(&session.ledger, scope));
        match report::save_report(
            &session.ledger,
            scope,
            self.destination.name(),
            &self.config.transfer.output_dir,
        ) {
            Ok(Some(path)) => println!("📝 Failed items report saved: {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Could not save failure report");
                println!("⚠️ Could not save failed items report: {}", e);
            }
        }
    }
}
