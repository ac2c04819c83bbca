//! Tunable constants for matching and transfer.
//!
//! The weights and thresholds are empirical. Defaults reproduce the values
//! the tool has always shipped with; a TOML file may override any subset.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Matching
// ============================================================================

/// Weights, windows and thresholds used by the matcher and scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Multiplier applied to artist similarity
    pub artist_weight: f64,
    /// Multiplier applied to album similarity (only when both sides expose an album)
    pub album_weight: f64,
    /// Bonus when durations differ by less than `close_duration_ms`
    pub close_duration_bonus: f64,
    /// Bonus when durations differ by less than `near_duration_ms`
    pub near_duration_bonus: f64,
    /// Flat bonus when either side lacks a duration
    pub unknown_duration_bonus: f64,
    pub close_duration_ms: u64,
    pub near_duration_ms: u64,
    /// Bonus when one normalized title contains the other
    pub name_containment_bonus: f64,

    pub track_threshold: f64,
    pub artist_threshold: f64,
    pub album_threshold: f64,
    /// Stop issuing fallback queries once the best score reaches this
    pub early_stop_score: f64,

    /// Album score = album similarity * name weight + artist similarity * artist weight
    pub album_name_blend: f64,
    pub album_artist_blend: f64,

    pub track_search_limit: usize,
    pub artist_search_limit: usize,
    pub album_search_limit: usize,
    pub max_queries: usize,

    /// Pause between consecutive fallback queries
    pub query_delay_ms: u64,

    /// Console markers: confidence at or above these prints as a sure match
    pub track_high_confidence: f64,
    pub artist_high_confidence: f64,
    pub album_high_confidence: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            artist_weight: 0.6,
            album_weight: 0.2,
            close_duration_bonus: 0.2,
            near_duration_bonus: 0.1,
            unknown_duration_bonus: 0.1,
            close_duration_ms: 5_000,
            near_duration_ms: 15_000,
            name_containment_bonus: 0.1,
            track_threshold: 0.5,
            artist_threshold: 0.7,
            album_threshold: 0.6,
            early_stop_score: 0.8,
            album_name_blend: 0.7,
            album_artist_blend: 0.3,
            track_search_limit: 10,
            artist_search_limit: 5,
            album_search_limit: 5,
            max_queries: 4,
            query_delay_ms: 100,
            track_high_confidence: 0.8,
            artist_high_confidence: 0.9,
            album_high_confidence: 0.8,
        }
    }
}

impl MatchConfig {
    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.query_delay_ms)
    }

    /// Same weights with throttling disabled.
    pub fn without_delay(mut self) -> Self {
        self.query_delay_ms = 0;
        self
    }
}

// ============================================================================
// Transfer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub songs_page_size: usize,
    pub artists_page_size: usize,
    pub albums_page_size: usize,
    pub playlists_page_size: usize,
    pub playlist_tracks_page_size: usize,
    /// Matched playlist tracks are written in batches of this size
    pub playlist_batch_size: usize,
    /// `{source}` is replaced with the source catalog's display name
    pub playlist_description: String,
    /// Failure reports are written here; created on first use
    pub output_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            songs_page_size: 50,
            artists_page_size: 50,
            albums_page_size: 50,
            playlists_page_size: 50,
            playlist_tracks_page_size: 100,
            playlist_batch_size: 50,
            playlist_description: "Imported from {source}".to_string(),
            output_dir: PathBuf::from("exports"),
        }
    }
}

impl TransferConfig {
    pub fn playlist_description_for(&self, source_name: &str) -> String {
        self.playlist_description.replace("{source}", source_name)
    }
}

// ============================================================================
// File config
// ============================================================================

/// Top-level TOML layout:
///
/// ```toml
/// [matching]
/// track_threshold = 0.55
///
/// [transfer]
/// output_dir = "reports"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matching: MatchConfig,
    pub transfer: TransferConfig,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_constants() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.artist_weight, 0.6);
        assert_eq!(cfg.track_threshold, 0.5);
        assert_eq!(cfg.artist_threshold, 0.7);
        assert_eq!(cfg.album_threshold, 0.6);
        assert_eq!(cfg.early_stop_score, 0.8);
        assert_eq!(cfg.max_queries, 4);
        assert_eq!(cfg.query_delay(), Duration::from_millis(100));
        assert_eq!(cfg.without_delay().query_delay(), Duration::ZERO);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [matching]
            track_threshold = 0.55
            query_delay_ms = 0

            [transfer]
            output_dir = "reports"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.matching.track_threshold, 0.55);
        assert_eq!(cfg.matching.query_delay_ms, 0);
        assert_eq!(cfg.matching.album_threshold, 0.6);
        assert_eq!(cfg.transfer.output_dir, PathBuf::from("reports"));
        assert_eq!(cfg.transfer.playlist_batch_size, 50);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml_str("[matching]\ntrack_threshold = \"high\"").is_err());
    }

    #[test]
    fn test_playlist_description_template() {
        let cfg = TransferConfig::default();
        assert_eq!(cfg.playlist_description_for("Spotify"), "Imported from Spotify");
    }
}
