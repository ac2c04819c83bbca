//! Candidate matching against the destination catalog.
//!
//! Tracks go through a ladder of progressively less specific queries,
//! scored across all queries tried so far. Artists and albums use a single
//! query and a simpler score.

use std::thread;

use tracing::{debug, warn};

use crate::config::MatchConfig;
use crate::error::Result;
use crate::models::{
    AlbumCandidate, ArtistCandidate, MatchCandidate, MatchResult, SourceAlbum, SourceArtist,
    TrackDescriptor,
};
use crate::normalize::{extract_primary_artist, normalize};
use crate::scoring::{score_album_candidate, score_artist_candidate, score_track_candidate, TrackTarget};

// ============================================================================
// Best-so-far tracking
// ============================================================================

/// Slack for threshold comparisons; weighted sums like 0.6 + 0.1 + 0.1
/// land just under 0.8 in floating point.
const SCORE_EPSILON: f64 = 1e-9;

/// Whether `score` reaches `threshold`, within `SCORE_EPSILON`.
pub fn clears(score: f64, threshold: f64) -> bool {
    score + SCORE_EPSILON >= threshold
}

/// Highest-scoring candidate seen so far. Ties keep the earlier candidate.
#[derive(Debug)]
struct Best<C> {
    candidate: Option<C>,
    score: f64,
    query: String,
}

impl<C> Best<C> {
    fn new() -> Self {
        Self {
            candidate: None,
            score: 0.0,
            query: String::new(),
        }
    }

    fn offer(&mut self, candidate: C, score: f64, query: &str) {
        if score > self.score {
            self.candidate = Some(candidate);
            self.score = score;
            self.query = query.to_string();
        }
    }

    /// Accept if the best candidate clears `threshold`. Confidence is capped at 1.0.
    fn accept(self, threshold: f64) -> Option<MatchResult<C>> {
        let candidate = self.candidate?;
        clears(self.score, threshold).then(|| MatchResult {
            candidate,
            confidence: self.score.min(1.0),
            query_used: self.query,
        })
    }
}

// ============================================================================
// Track Matching
// ============================================================================

/// Fallback queries from most to least specific, skipping any built from
/// an empty component.
pub fn build_track_queries(name_norm: &str, artist_norm: &str, primary_artist: &str) -> Vec<String> {
    let mut queries = Vec::with_capacity(4);
    if !primary_artist.is_empty() {
        queries.push(format!("\"{}\" \"{}\"", name_norm, primary_artist));
        queries.push(format!("{} {}", name_norm, primary_artist));
    }
    if !artist_norm.is_empty() && artist_norm != primary_artist {
        queries.push(format!("{} {}", name_norm, artist_norm));
    }
    queries.push(name_norm.to_string());
    queries
}

/// Find the best destination track for `track`.
///
/// `search` is called with each fallback query and the track search limit.
/// A failing query is logged and skipped. Returns None when the title
/// normalizes to nothing (no search is made) or no candidate clears the
/// track threshold.
pub fn match_track<F>(track: &TrackDescriptor, cfg: &MatchConfig, mut search: F) -> Option<MatchResult>
where
    F: FnMut(&str, usize) -> Result<Vec<MatchCandidate>>,
{
    let name_norm = normalize(&track.name);
    if name_norm.is_empty() {
        debug!(name = %track.name, "Title normalizes to nothing, skipping search");
        return None;
    }

    let artist_raw = track.artist_string();
    let artist_norm = normalize(&artist_raw);
    let primary_artist = extract_primary_artist(&artist_norm);

    let target = TrackTarget {
        name_norm: &name_norm,
        artist: &artist_raw,
        album: track.album.as_deref(),
        duration_ms: track.duration_ms,
    };

    let queries = build_track_queries(&name_norm, &artist_norm, &primary_artist);
    let delay = cfg.query_delay();
    let mut best = Best::new();

    for (attempt, query) in queries.iter().take(cfg.max_queries).enumerate() {
        if attempt > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }

        let candidates = match search(query, cfg.track_search_limit) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed, trying next query");
                continue;
            }
        };

        if candidates.is_empty() {
            debug!(query = %query, "No candidates");
            continue;
        }

        for candidate in candidates {
            let score = score_track_candidate(&target, &candidate, cfg);
            debug!(
                query = %query,
                candidate = %candidate.name,
                artist = score.artist,
                album = score.album,
                duration = score.duration,
                name = score.name,
                total = score.total(),
                "Scored candidate"
            );
            best.offer(candidate, score.total(), query);
        }

        if clears(best.score, cfg.early_stop_score) {
            break;
        }
    }

    best.accept(cfg.track_threshold)
}

// ============================================================================
// Artist / Album Matching
// ============================================================================

/// Outcome of a single-query artist or album match.
#[derive(Clone, Debug, PartialEq)]
pub enum DirectMatch<C> {
    Accepted(MatchResult<C>),
    /// Best candidate scored below the category threshold
    BelowThreshold { best_score: f64 },
    /// Candidates came back but none scored above zero
    NoMatch,
    /// The search returned no candidates
    NotFound,
}

fn decide<C>(best: Best<C>, threshold: f64) -> DirectMatch<C> {
    if best.candidate.is_none() {
        return DirectMatch::NoMatch;
    }
    let best_score = best.score;
    match best.accept(threshold) {
        Some(result) => DirectMatch::Accepted(result),
        None => DirectMatch::BelowThreshold { best_score },
    }
}

/// Match a followed artist by searching its raw name once.
/// Search errors propagate; they are per-item failures.
pub fn match_artist<F>(artist: &SourceArtist, cfg: &MatchConfig, search: F) -> Result<DirectMatch<ArtistCandidate>>
where
    F: FnOnce(&str, usize) -> Result<Vec<ArtistCandidate>>,
{
    let query = artist.name.as_str();
    let candidates = search(query, cfg.artist_search_limit)?;
    if candidates.is_empty() {
        return Ok(DirectMatch::NotFound);
    }

    let mut best = Best::new();
    for candidate in candidates {
        let score = score_artist_candidate(&artist.name, &candidate);
        best.offer(candidate, score, query);
    }
    Ok(decide(best, cfg.artist_threshold))
}

/// Search query for a saved album: title followed by all credited artists.
pub fn album_query(album: &SourceAlbum) -> String {
    format!("{} {}", album.name, album.artist_string()).trim().to_string()
}

/// Match a saved album with one search and the title/artist blend score.
pub fn match_album<F>(album: &SourceAlbum, cfg: &MatchConfig, search: F) -> Result<DirectMatch<AlbumCandidate>>
where
    F: FnOnce(&str, usize) -> Result<Vec<AlbumCandidate>>,
{
    let query = album_query(album);
    let candidates = search(&query, cfg.album_search_limit)?;
    if candidates.is_empty() {
        return Ok(DirectMatch::NotFound);
    }

    let artist = album.artist_string();
    let mut best = Best::new();
    for candidate in candidates {
        let score = score_album_candidate(&album.name, &artist, &candidate, cfg);
        best.offer(candidate, score, &query);
    }
    Ok(decide(best, cfg.album_threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;

    fn cfg() -> MatchConfig {
        MatchConfig::default().without_delay()
    }

    fn candidate(id: &str, name: &str, artist: &str, album: Option<&str>, secs: Option<u32>) -> MatchCandidate {
        MatchCandidate {
            id: id.to_string(),
            name: name.to_string(),
            artist_name: artist.to_string(),
            album_name: album.map(str::to_string),
            duration_seconds: secs,
        }
    }

    fn hello() -> TrackDescriptor {
        TrackDescriptor::new("Hello", &["Adele"])
            .with_album("25")
            .with_duration_ms(295_000)
    }

    #[test]
    fn test_build_track_queries_multi_artist() {
        let queries = build_track_queries("Song", "A, B", "A");
        assert_eq!(queries, vec!["\"Song\" \"A\"", "Song A", "Song A, B", "Song"]);
    }

    #[test]
    fn test_build_track_queries_single_artist_skips_full_artist_form() {
        let queries = build_track_queries("Hello", "Adele", "Adele");
        assert_eq!(queries, vec!["\"Hello\" \"Adele\"", "Hello Adele", "Hello"]);
    }

    #[test]
    fn test_build_track_queries_without_artist() {
        assert_eq!(build_track_queries("Song", "", ""), vec!["Song"]);
    }

    #[test]
    fn test_empty_name_performs_no_search() {
        let mut calls = 0;
        let track = TrackDescriptor::new("(Live)", &["Adele"]).with_album("25");
        let result = match_track(&track, &cfg(), |_, _| {
            calls += 1;
            Ok(vec![candidate("1", "Hello", "Adele", None, None)])
        });
        assert!(result.is_none());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_leading_credit_word_title_is_searched() {
        let mut queries = Vec::new();
        let track = TrackDescriptor::new("Featuring Rain", &["Adele"]);
        let result = match_track(&track, &cfg(), |query, _| {
            queries.push(query.to_string());
            Ok(vec![candidate("t-rain", "Rain", "Adele", None, None)])
        })
        .unwrap();
        assert_eq!(queries[0], "\"Rain\" \"Adele\"");
        assert_eq!(result.candidate.id, "t-rain");
    }

    #[test]
    fn test_exact_match_stops_after_first_query() {
        let mut queries = Vec::new();
        let result = match_track(&hello(), &cfg(), |query, limit| {
            assert_eq!(limit, 10);
            queries.push(query.to_string());
            Ok(vec![candidate("t-hello", "Hello", "Adele", Some("25"), Some(295))])
        })
        .unwrap();

        assert_eq!(queries, vec!["\"Hello\" \"Adele\""]);
        assert_eq!(result.candidate.id, "t-hello");
        assert!(result.confidence >= 0.9);
        assert_eq!(result.query_used, "\"Hello\" \"Adele\"");
    }

    #[test]
    fn test_full_marks_sum_to_capped_confidence() {
        // 0.6 artist + 0.2 album + 0.2 duration + 0.1 name
        let result = match_track(&hello(), &cfg(), |_, _| {
            Ok(vec![candidate("t", "Hello", "Adele", Some("25"), Some(292))])
        })
        .unwrap();
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_no_candidates_tries_every_query() {
        let mut calls = 0;
        let track = TrackDescriptor::new("Song", &["A", "B"]);
        let result = match_track(&track, &cfg(), |_, _| {
            calls += 1;
            Ok(vec![])
        });
        assert!(result.is_none());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_never_more_than_max_queries() {
        let mut calls = 0;
        let track = TrackDescriptor::new("Song", &["A", "B"]);
        let weak = candidate("x", "Other", "Nobody", None, None);
        let _ = match_track(&track, &cfg(), |_, _| {
            calls += 1;
            Ok(vec![weak.clone()])
        });
        assert_eq!(calls, 4);

        let mut calls = 0;
        let limited = MatchConfig {
            max_queries: 2,
            ..cfg()
        };
        let _ = match_track(&track, &limited, |_, _| {
            calls += 1;
            Ok(vec![])
        });
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_failed_query_is_skipped() {
        let mut calls = 0;
        let result = match_track(&hello(), &cfg(), |query, _| {
            calls += 1;
            if calls == 1 {
                Err(CatalogError::Transport("connection reset".to_string()))
            } else {
                assert_eq!(query, "Hello Adele");
                Ok(vec![candidate("t", "Hello", "Adele", Some("25"), Some(295))])
            }
        })
        .unwrap();
        assert_eq!(calls, 2);
        assert_eq!(result.query_used, "Hello Adele");
    }

    #[test]
    fn test_best_persists_across_queries() {
        // First query: artist-only match (0.6 + 0.1 neutral duration) = 0.7,
        // below early stop; later queries return nothing.
        let track = TrackDescriptor::new("Song", &["Artist"]);
        let mut calls = 0;
        let result = match_track(&track, &cfg(), |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(vec![candidate("first", "Different", "Artist", None, None)])
            } else {
                Ok(vec![])
            }
        })
        .unwrap();
        assert_eq!(calls, 3);
        assert_eq!(result.candidate.id, "first");
        assert_eq!(result.query_used, "\"Song\" \"Artist\"");
        assert!((result.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_later_query_can_improve_best() {
        let track = TrackDescriptor::new("Song", &["Artist"]);
        let mut calls = 0;
        let result = match_track(&track, &cfg(), |_, _| {
            calls += 1;
            match calls {
                1 => Ok(vec![candidate("weak", "Different", "Artist", None, None)]),
                _ => Ok(vec![candidate("strong", "Song", "Artist", None, None)]),
            }
        })
        .unwrap();
        // 0.6 + 0.1 + 0.1 = 0.8 on the second query triggers early stop
        assert_eq!(calls, 2);
        assert_eq!(result.candidate.id, "strong");
        assert_eq!(result.query_used, "Song Artist");
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let track = TrackDescriptor::new("Song", &["Artist"]);
        let result = match_track(&track, &cfg(), |_, _| {
            Ok(vec![
                candidate("first", "Song", "Artist", None, None),
                candidate("second", "Song", "Artist", None, None),
            ])
        })
        .unwrap();
        assert_eq!(result.candidate.id, "first");
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        let track = TrackDescriptor::new("Song", &["Artist"]);
        // Unrelated artist: 0 + neutral 0.1 + name 0.1 = 0.2
        let result = match_track(&track, &cfg(), |_, _| {
            Ok(vec![candidate("x", "Song", "Somebody Else", None, None)])
        });
        assert!(result.is_none());
    }

    #[test]
    fn test_artist_scored_against_original_string() {
        // Normalization would drop "feat. Future"; the score must still see it
        let track = TrackDescriptor::new("Life Is Good", &["Drake feat. Future"]);
        let mut queries = Vec::new();
        let result = match_track(&track, &cfg(), |query, _| {
            queries.push(query.to_string());
            Ok(vec![candidate("t", "Life Is Good", "Drake feat. Future", None, None)])
        })
        .unwrap();
        assert_eq!(queries[0], "\"Life Is Good\" \"Drake\"");
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_match_artist() {
        let artist = SourceArtist {
            id: "s1".to_string(),
            name: "Radiohead".to_string(),
        };
        let found = match_artist(&artist, &cfg(), |query, limit| {
            assert_eq!(query, "Radiohead");
            assert_eq!(limit, 5);
            Ok(vec![
                ArtistCandidate {
                    id: "a0".to_string(),
                    name: "Radiohead Tribute".to_string(),
                },
                ArtistCandidate {
                    id: "a1".to_string(),
                    name: "Radiohead".to_string(),
                },
            ])
        })
        .unwrap();
        match found {
            DirectMatch::Accepted(result) => {
                assert_eq!(result.candidate.id, "a1");
                assert_eq!(result.confidence, 1.0);
            }
            other => panic!("expected accepted match, got {:?}", other),
        }
    }

    #[test]
    fn test_match_artist_outcomes() {
        let artist = SourceArtist {
            id: "s1".to_string(),
            name: "The Black Keys".to_string(),
        };
        assert_eq!(
            match_artist(&artist, &cfg(), |_, _| Ok(vec![])).unwrap(),
            DirectMatch::NotFound
        );
        assert_eq!(
            match_artist(&artist, &cfg(), |_, _| Ok(vec![ArtistCandidate {
                id: "x".to_string(),
                name: "Metallica".to_string(),
            }]))
            .unwrap(),
            DirectMatch::NoMatch
        );
        match match_artist(&artist, &cfg(), |_, _| {
            Ok(vec![ArtistCandidate {
                id: "x".to_string(),
                name: "Black Keys Band".to_string(),
            }])
        })
        .unwrap()
        {
            DirectMatch::BelowThreshold { best_score } => assert!(best_score < 0.7),
            other => panic!("expected below threshold, got {:?}", other),
        }
        assert!(match_artist(&artist, &cfg(), |_, _| Err(CatalogError::NotFound("search".to_string()))).is_err());
    }

    #[test]
    fn test_match_album() {
        let album = SourceAlbum {
            id: "al".to_string(),
            name: "Random Access Memories".to_string(),
            artists: vec!["Daft Punk".to_string()],
        };
        assert_eq!(album_query(&album), "Random Access Memories Daft Punk");

        let found = match_album(&album, &cfg(), |query, limit| {
            assert_eq!(query, "Random Access Memories Daft Punk");
            assert_eq!(limit, 5);
            Ok(vec![AlbumCandidate {
                id: "d1".to_string(),
                name: "Random Access Memories".to_string(),
                artist_name: Some("Daft Punk".to_string()),
            }])
        })
        .unwrap();
        assert!(matches!(found, DirectMatch::Accepted(ref r) if r.candidate.id == "d1"));

        // Title only matches (0.7) without artist still clears 0.6
        let title_only = match_album(&album, &cfg(), |_, _| {
            Ok(vec![AlbumCandidate {
                id: "d2".to_string(),
                name: "Random Access Memories".to_string(),
                artist_name: None,
            }])
        })
        .unwrap();
        assert!(matches!(title_only, DirectMatch::Accepted(_)));
    }
}
