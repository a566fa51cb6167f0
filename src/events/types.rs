//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the enrollment pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Encoding phase events
    Encode(EncodeEvent),
    /// Store persistence events
    Store(StoreEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the scanning phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// An identity subdirectory was discovered
    LabelFound { label: String },
    /// An enrollment photo was found
    PhotoFound { path: PathBuf, label: String },
    /// An error occurred but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed {
        total_photos: usize,
        total_labels: usize,
    },
}

/// Events during the encoding phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EncodeEvent {
    /// Encoding has started
    Started { total_photos: usize },
    /// Progress update, emitted once per completed unit regardless of outcome
    Progress(EncodeProgress),
    /// A face was successfully encoded
    FaceEncoded { path: PathBuf, label: String },
    /// An image was skipped but encoding continues
    Skipped { path: PathBuf, message: String },
    /// Encoding completed
    Completed { encoded: usize, skipped: usize },
}

/// Progress information during encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeProgress {
    /// Number of photos processed so far (success or skip)
    pub completed: usize,
    /// Total number of photos to process
    pub total: usize,
    /// Photo that just finished
    pub current_path: PathBuf,
}

/// Events during store persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreEvent {
    /// The store is being written
    Writing { path: PathBuf, records: usize },
    /// The store was written successfully
    Written { path: PathBuf, records: usize },
    /// Nothing was encoded, so no store was written
    NothingToWrite,
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Encoding,
    Writing,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total photos discovered
    pub total_photos: usize,
    /// Faces successfully encoded
    pub encoded: usize,
    /// Photos skipped (no face, decode failure, invalid signature)
    pub skipped: usize,
    /// Distinct identities with at least one encoded face
    pub identities: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Encoding => write!(f, "Encoding"),
            PipelinePhase::Writing => write!(f, "Writing"),
        }
    }
}
