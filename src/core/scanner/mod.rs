//! # Scanner Module
//!
//! Discovers labeled enrollment photos.
//!
//! ## Directory Layout
//! Each immediate subdirectory of the enrollment root is one identity;
//! the subdirectory name is used verbatim as the label:
//!
//! ```text
//! Enrollment/
//!   Alice/
//!     beach.jpg
//!     portrait.png
//!   Bob/
//!     IMG_0042.heic
//! ```
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - HEIC (.heic, .heif) - iPhone photos
//! - TIFF (.tiff)

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{LabelDirScanner, ScanConfig};

use crate::error::ScanError;
use crate::events::EventSender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One unit of enrollment work: a photo and the identity it belongs to.
///
/// Created by the scanner, consumed exactly once by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentUnit {
    /// Path to the photo file
    pub image_path: PathBuf,
    /// Identity label, taken from the containing subdirectory name
    pub label: String,
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered enrollment units
    pub units: Vec<EnrollmentUnit>,
    /// Labels discovered (including ones with no usable photos)
    pub labels: Vec<String>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for enrollment scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait EnrollmentScanner: Send + Sync {
    /// Scan the enrollment root and return discovered units.
    ///
    /// Fails when the root is missing or inaccessible, when it contains
    /// no identity subdirectories, or when no matching image files exist.
    fn scan(&self, root: &Path) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(&self, root: &Path, events: &EventSender)
        -> Result<ScanResult, ScanError>;
}
