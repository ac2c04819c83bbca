//! Library transfer - matching engine and orchestration shared by the CLI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod safety;
pub mod scoring;
pub mod snapshot;
pub mod transfer;
