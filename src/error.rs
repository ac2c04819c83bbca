//! Error types for catalog capabilities.

use thiserror::Error;

/// Failure of a single source or destination catalog call.
///
/// Every collaborator capability returns this type. The orchestrator never
/// propagates it past the unit of work it belongs to (query, item, playlist
/// or category); it is recorded and reported instead.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Connection error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
