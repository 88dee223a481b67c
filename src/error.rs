//! Error types for the gallery
//!
//! Asset failures never leave the image component: they are turned into
//! state transitions. The other errors surface at startup or in views.

use std::path::PathBuf;

/// Failure while fetching or decoding one image asset.
///
/// Carried inside UI messages, so it must stay `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// Nothing exists at the resolved location
    #[error("asset not found: {0}")]
    NotFound(String),

    /// The reference cannot be mapped onto the asset root
    #[error("invalid asset url: {0}")]
    InvalidUrl(String),

    /// Reading the asset failed
    #[error("failed to read {url}: {message}")]
    Io { url: String, message: String },

    /// The bytes are not a decodable image
    #[error("failed to decode {url}: {message}")]
    Decode { url: String, message: String },

    /// The blocking worker died before answering
    #[error("task join error: {0}")]
    Join(String),
}

/// Configuration could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Key-value store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare store location {path}: {source}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stored value for {key}: {source}")]
    Value {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Catalog could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("asset root does not exist: {0}")]
    MissingRoot(PathBuf),
}

/// A view that refused to build
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("product {id} has no name")]
    MissingName { id: String },

    #[error("product {id} has a negative price")]
    NegativePrice { id: String },
}
