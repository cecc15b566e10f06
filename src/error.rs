use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OdcError {
    #[error(
        "Unable to find package.json in {} or any of its parent directories",
        .start.display()
    )]
    ManifestNotFound { start: PathBuf },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid package name: '{0}'")]
    InvalidPackageName(String),

    #[error("Package not found in registry: {0}")]
    PackageNotFound(String),

    #[error("Registry lookup failed for '{package}': {message}")]
    Registry { package: String, message: String },

    #[error("Network error while looking up '{package}': {source}")]
    Network {
        package: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OdcError>;
