//! # Error Module
//!
//! User-friendly error types for the enrollment pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Contain per-image failures** - one bad photo must never abort a batch
//! - **User-friendly messages** - non-technical users should understand

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum EnrollError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that occur while discovering enrollment photos
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Enrollment directory not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Enrollment path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No identity subdirectories found in {path}. Create one folder per person.")]
    NoLabelDirectories { path: PathBuf },

    #[error("No image files found in the identity subdirectories of {path}")]
    NoImagesFound { path: PathBuf },
}

/// Per-image errors during face detection and encoding.
///
/// These are recoverable: the offending image is skipped and the
/// batch continues.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Failed to open image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Image is empty or corrupted: {path}")]
    EmptyImage { path: PathBuf },

    #[error("No face found in {path} (tried both fast and accurate locators)")]
    NoFaceFound { path: PathBuf },

    #[error("Signature for {path} contains non-finite values. Skipping this image.")]
    NonFiniteSignature { path: PathBuf },

    #[error("Face model file not found: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("Face model inference failed: {0}")]
    Inference(String),
}

/// Errors starting or running the parallel worker pool
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to start worker pool: {0}")]
    PoolStart(String),
}

/// Errors reading or writing the encoding store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write encoding store to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read encoding store from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize encoding store: {0}")]
    Serialize(String),

    #[error("Encoding store at {path} is corrupted. Re-run enrollment to rebuild it.")]
    Corrupted { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, EnrollError>;
