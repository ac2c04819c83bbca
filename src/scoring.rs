//! Scoring functions for cross-catalog matching.
//!
//! This module contains:
//! - Artist similarity (also reused for album titles)
//! - Weighted track candidate scoring
//! - Album candidate blend scoring

use rustc_hash::FxHashSet;

use crate::config::MatchConfig;
use crate::models::{AlbumCandidate, ArtistCandidate, MatchCandidate};
use crate::normalize::{extract_primary_artist, normalize};

// ============================================================================
// Artist Similarity
// ============================================================================

/// Similarity between two artist names (0.0 to 1.0).
///
/// First matching rule wins:
/// exact (case/whitespace-insensitive) 1.0, containment 0.9,
/// same primary artist 0.85, otherwise word overlap scaled to 0.7.
pub fn artist_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a == b {
        return 1.0;
    }

    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        return 0.9;
    }

    // "artist feat. other" vs "artist, someone"
    if extract_primary_artist(&a) == extract_primary_artist(&b) {
        return 0.85;
    }

    let words_a: FxHashSet<&str> = a.split_whitespace().collect();
    let words_b: FxHashSet<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let overlap = words_a.intersection(&words_b).count();
    (overlap as f64 / words_a.len().max(words_b.len()) as f64) * 0.7
}

// ============================================================================
// Track Scoring
// ============================================================================

/// Source-side view of a track, prepared once per match attempt.
#[derive(Debug, Clone)]
pub struct TrackTarget<'a> {
    /// Normalized source title
    pub name_norm: &'a str,
    /// Original (non-normalized) joined artist string
    pub artist: &'a str,
    pub album: Option<&'a str>,
    pub duration_ms: Option<u64>,
}

/// Per-factor contributions of one candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackScore {
    pub artist: f64,
    pub album: f64,
    pub duration: f64,
    pub name: f64,
}

impl TrackScore {
    pub fn total(&self) -> f64 {
        self.artist + self.album + self.duration + self.name
    }
}

/// Duration bonus. Missing data on either side earns the neutral bonus so
/// it never penalizes a candidate.
pub fn duration_bonus(source_ms: Option<u64>, candidate_sec: Option<u32>, cfg: &MatchConfig) -> f64 {
    let source_ms = source_ms.filter(|&ms| ms > 0);
    let candidate_ms = candidate_sec.filter(|&s| s > 0).map(|s| u64::from(s) * 1000);

    match (source_ms, candidate_ms) {
        (Some(src), Some(cand)) => {
            let diff = src.abs_diff(cand);
            if diff < cfg.close_duration_ms {
                cfg.close_duration_bonus
            } else if diff < cfg.near_duration_ms {
                cfg.near_duration_bonus
            } else {
                0.0
            }
        }
        _ => cfg.unknown_duration_bonus,
    }
}

/// True when one normalized title contains the other (case-insensitive).
pub fn names_overlap(source_norm: &str, candidate_name: &str) -> bool {
    let source = source_norm.to_lowercase();
    let candidate = normalize(candidate_name).to_lowercase();
    candidate.contains(source.as_str()) || source.contains(candidate.as_str())
}

/// Weighted score of a destination track against the source track.
pub fn score_track_candidate(
    target: &TrackTarget<'_>,
    candidate: &MatchCandidate,
    cfg: &MatchConfig,
) -> TrackScore {
    let artist = artist_similarity(target.artist, &candidate.artist_name) * cfg.artist_weight;

    let album = match (target.album, candidate.album_name.as_deref()) {
        (Some(source), Some(dest)) if !source.is_empty() => {
            artist_similarity(source, dest) * cfg.album_weight
        }
        _ => 0.0,
    };

    let duration = duration_bonus(target.duration_ms, candidate.duration_seconds, cfg);

    let name = if names_overlap(target.name_norm, &candidate.name) {
        cfg.name_containment_bonus
    } else {
        0.0
    };

    TrackScore {
        artist,
        album,
        duration,
        name,
    }
}

// ============================================================================
// Artist / Album Scoring
// ============================================================================

pub fn score_artist_candidate(source_name: &str, candidate: &ArtistCandidate) -> f64 {
    artist_similarity(source_name, &candidate.name)
}

/// Blend of album-title and artist similarity.
pub fn score_album_candidate(
    album_name: &str,
    artist: &str,
    candidate: &AlbumCandidate,
    cfg: &MatchConfig,
) -> f64 {
    let album_score = artist_similarity(album_name, &candidate.name);
    let artist_score = artist_similarity(artist, candidate.artist_name.as_deref().unwrap_or(""));
    album_score * cfg.album_name_blend + artist_score * cfg.album_artist_blend
}
