// Error types shared by the library modules. Every kind here is recovered at
// the command-dispatch boundary and rendered to the user; `anyhow` is only
// used by the binary and the terminal flows.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning user input into a local filesystem path.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("converted path does not exist: {original} -> {}", .converted.display())]
    ConversionFailed { original: String, converted: PathBuf },
}

/// Failures reported by the storage collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("signing error: {0}")]
    Signing(String),
}

/// Errors produced by the upload orchestration flow.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("storage is not configured, run 'qu config init' first")]
    NotConfigured,

    #[error("file does not exist: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("rejected: {0}")]
    PolicyRejected(String),

    #[error("path conversion failed: {original} -> {}", .converted.display())]
    PathConversionFailed { original: String, converted: PathBuf },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload failed: {0}")]
    RemoteUploadFailed(StoreError),

    #[error("listing failed: {0}")]
    ListFailed(StoreError),
}

impl From<PathError> for UploadError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Empty => UploadError::InvalidInput("empty path".to_string()),
            PathError::NotFound(path) => UploadError::FileMissing(path),
            PathError::ConversionFailed { original, converted } => {
                UploadError::PathConversionFailed { original, converted }
            }
        }
    }
}

/// Errors loading or saving the YAML configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot determine home directory")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
