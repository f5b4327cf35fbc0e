/// Error types for the editor.
///
/// Decode failures and unknown ids degrade visually and are only logged.
/// Export failures are the one class surfaced to the user.

use std::path::PathBuf;
use thiserror::Error;

/// The source image could not be rasterized.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decode task failed: {0}")]
    Join(String),
}

/// Single-photo export failure.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Could not load source for export: {0}")]
    Decode(#[from] DecodeError),

    #[error("Failed to encode {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export task failed: {0}")]
    Join(String),
}

/// Batch export stopped at the first failing photo.
#[derive(Error, Debug)]
#[error("Export of item {index} ({name}) failed: {source}")]
pub struct BatchExportError {
    /// Position of the failing photo in the batch (0-based)
    pub index: usize,
    /// Display name of the failing photo
    pub name: String,
    #[source]
    pub source: ExportError,
}

/// Catalog (SQLite) persistence errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to prepare catalog directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
