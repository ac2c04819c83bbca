//! Failure reporting and statistics display.
//!
//! Everything here formats the ledger or counters into text; only
//! `save_report` touches the filesystem.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rustc_hash::FxHashSet;
use tracing::info;

use crate::matcher::clears;
use crate::models::{success_rate, Category, FailureLedger, FailureRecord, TransferStats};

/// Console summary shows at most this many songs
const SONGS_PREVIEW: usize = 5;
/// ...and this many artists or albums
const OTHERS_PREVIEW: usize = 3;

const RULE_WIDTH: usize = 70;

/// Which part of the ledger a summary or report covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Only(Category),
}

impl ReportScope {
    /// Identifier used in report file names
    pub fn label(self) -> &'static str {
        match self {
            ReportScope::All => "all",
            ReportScope::Only(category) => category.as_str(),
        }
    }

    pub fn includes(self, category: Category) -> bool {
        match self {
            ReportScope::All => true,
            ReportScope::Only(only) => only == category,
        }
    }

    fn categories(self) -> impl Iterator<Item = Category> {
        Category::ALL.into_iter().filter(move |&c| self.includes(c))
    }

    fn record_count(self, ledger: &FailureLedger) -> usize {
        self.categories().map(|c| ledger.get(c).len()).sum()
    }
}

impl From<Category> for ReportScope {
    fn from(category: Category) -> Self {
        ReportScope::Only(category)
    }
}

/// ✅ when `confidence` reaches the category's high-confidence marker, else ⚠️
pub fn confidence_marker(confidence: f64, high_confidence: f64) -> &'static str {
    if clears(confidence, high_confidence) {
        "✅"
    } else {
        "⚠️"
    }
}

/// "Name - Artist", or just the name when the artist is the name itself.
fn display_item(record: &FailureRecord) -> String {
    if record.artist.is_empty() || record.artist == record.name {
        record.name.clone()
    } else {
        format!("{} - {}", record.name, record.artist)
    }
}

// ============================================================================
// Console Summary
// ============================================================================

fn write_preview(out: &mut String, heading: &str, records: &[FailureRecord], cap: usize) {
    let _ = writeln!(out, "{}: {}", heading, records.len());
    for record in records.iter().take(cap) {
        let _ = writeln!(out, "  • {}", display_item(record));
    }
    if records.len() > cap {
        let _ = writeln!(out, "  ... and {} more", records.len() - cap);
    }
}

/// Abridged console summary of the failures in `scope`.
pub fn render_summary(ledger: &FailureLedger, scope: ReportScope) -> String {
    if scope.record_count(ledger) == 0 {
        return "✅ No failed items to report!\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n🚫 FAILED ITEMS SUMMARY");
    let _ = writeln!(out, "{:=<30}", "");

    for category in scope.categories() {
        let records = ledger.get(category);
        if records.is_empty() {
            continue;
        }
        match category {
            Category::Songs => write_preview(&mut out, "🎵 Songs", records, SONGS_PREVIEW),
            Category::Artists => write_preview(&mut out, "👨‍🎤 Artists", records, OTHERS_PREVIEW),
            Category::Albums => write_preview(&mut out, "💿 Albums", records, OTHERS_PREVIEW),
            Category::PlaylistTracks => {
                let playlists: FxHashSet<Option<&str>> =
                    records.iter().map(|r| r.playlist.as_deref()).collect();
                let _ = writeln!(out, "📋 Playlist tracks: {}", records.len());
                let _ = writeln!(out, "  Across {} playlists", playlists.len());
            }
        }
    }

    let _ = writeln!(out, "\n💡 Full details will be saved to a report file");
    out
}

// ============================================================================
// Report File
// ============================================================================

fn section_heading(category: Category) -> &'static str {
    match category {
        Category::Songs => "🎵 FAILED SONGS",
        Category::Artists => "👨‍🎤 FAILED ARTISTS",
        Category::Albums => "💿 FAILED ALBUMS",
        Category::PlaylistTracks => "📋 FAILED PLAYLIST TRACKS",
    }
}

/// Full failure report. Records keep ledger order; playlist tracks get a
/// new `Playlist:` heading whenever the playlist changes.
pub fn render_report(
    ledger: &FailureLedger,
    scope: ReportScope,
    destination_name: &str,
    generated_at: &DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "🚫 FAILED ITEMS REPORT - {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "{:=<width$}\n", "", width = RULE_WIDTH);

    for category in scope.categories() {
        let records = ledger.get(category);
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{} ({}):", section_heading(category), records.len());
        let _ = writeln!(out, "{:-<40}", "");

        if category == Category::PlaylistTracks {
            let mut current: Option<Option<&str>> = None;
            for record in records {
                let playlist = record.playlist.as_deref();
                if current != Some(playlist) {
                    current = Some(playlist);
                    let _ = writeln!(out, "\n📂 Playlist: {}", playlist.unwrap_or("(unknown)"));
                }
                let _ = writeln!(out, "  • {}", display_item(record));
                let _ = writeln!(out, "    Reason: {}", record.reason);
            }
        } else {
            for record in records {
                let _ = writeln!(out, "• {}", display_item(record));
                if let Some(album) = &record.album {
                    let _ = writeln!(out, "  Album: {}", album);
                }
                let _ = writeln!(out, "  Reason: {}\n", record.reason);
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{:=<width$}", "", width = RULE_WIDTH);
    let _ = writeln!(out, "💡 TIP: You can manually search for these items in {}", destination_name);
    let _ = writeln!(out, "🔍 Some tracks might be available under different names or artists");
    out
}

/// `failed_items_<scope>_<YYYYMMDD_HHMMSS>.txt`
pub fn report_file_name(scope: ReportScope, generated_at: &DateTime<Local>) -> String {
    format!(
        "failed_items_{}_{}.txt",
        scope.label(),
        generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Write the report for `scope` into `output_dir`, creating it if needed.
/// The skip is per scope: returns None without touching the filesystem when
/// `scope` has no failures, even if other categories in the ledger do.
pub fn save_report(
    ledger: &FailureLedger,
    scope: ReportScope,
    destination_name: &str,
    output_dir: &Path,
) -> io::Result<Option<PathBuf>> {
    if scope.record_count(ledger) == 0 {
        return Ok(None);
    }

    let now = Local::now();
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(report_file_name(scope, &now));
    fs::write(&path, render_report(ledger, scope, destination_name, &now))?;

    info!(path = %path.display(), records = scope.record_count(ledger), "Saved failure report");
    Ok(Some(path))
}

// ============================================================================
// Statistics
// ============================================================================

/// Counts printed after one category finishes.
pub fn render_category_summary(
    category: Category,
    imported: usize,
    failed: usize,
    playlists_created: usize,
) -> String {
    let mut out = String::new();
    let title = match category {
        Category::Songs => "SONGS",
        Category::Artists => "ARTISTS",
        Category::Albums => "ALBUMS",
        Category::PlaylistTracks => "PLAYLISTS",
    };
    let _ = writeln!(out, "\n📊 {} TRANSFER COMPLETE", title);

    if category == Category::PlaylistTracks {
        let _ = writeln!(out, "📂 Playlists created: {}", playlists_created);
        let _ = writeln!(out, "✅ Total tracks imported: {}", imported);
        let _ = writeln!(out, "❌ Total failed: {}", failed);
    } else {
        let _ = writeln!(out, "✅ Successfully imported: {}", imported);
        let _ = writeln!(out, "❌ Failed: {}", failed);
    }

    if let Some(rate) = success_rate(imported, failed) {
        let _ = writeln!(out, "📈 Success rate: {:.1}%", rate);
    }
    out
}

/// Run-wide counters and the overall success rate.
pub fn render_stats(stats: &TransferStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{:=<60}", "");
    let _ = writeln!(out, "📊 COMPLETE TRANSFER STATISTICS");
    let _ = writeln!(out, "{:=<60}", "");
    let _ = writeln!(out, "🎵 Songs imported: {}", stats.songs_imported);
    let _ = writeln!(out, "👨‍🎤 Artists imported: {}", stats.artists_imported);
    let _ = writeln!(out, "💿 Albums imported: {}", stats.albums_imported);
    let _ = writeln!(out, "📂 Playlists created: {}", stats.playlists_created);
    let _ = writeln!(out, "❌ Total failed: {}", stats.total_failed);
    if let Some(rate) = stats.success_rate() {
        let _ = writeln!(out, "📈 Overall success rate: {:.1}%", rate);
    }
    out
}
