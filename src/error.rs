//! # Error Types
//!
//! This module defines error types used throughout the placard library.

use thiserror::Error;

/// Main error type for placard operations
#[derive(Debug, Error)]
pub enum PlacardError {
    /// Empty or unusable record source; the batch never starts
    #[error("Input error: {0}")]
    Input(String),

    /// Template is missing pages, references a bad page, or is malformed
    #[error("Template error: {0}")]
    Template(String),

    /// Network or feed failure while producing a record
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Image asset could not be downloaded or decoded
    #[error("Asset error: {0}")]
    Asset(String),

    /// Rasterization or encoding failure
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid runtime configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Work was abandoned because the batch was cancelled
    #[error("Cancelled")]
    Cancelled,

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
