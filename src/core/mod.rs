//! # Core Module
//!
//! The UI-agnostic enrollment engine.
//!
//! ## Modules
//! - `scanner` - Discovers labeled enrollment photos
//! - `face` - Face location and signature encoding capabilities
//! - `worker` - Per-image decode/locate/encode orchestration
//! - `dispatcher` - Fans work out across parallel workers
//! - `store` - The persisted encoding store
//! - `pipeline` - Orchestrates the full workflow

pub mod dispatcher;
pub mod face;
pub mod pipeline;
pub mod scanner;
pub mod store;
pub mod worker;

// Re-export commonly used types
pub use face::{FaceEncoder, FaceLocator, FaceRegion, Signature};
pub use scanner::EnrollmentUnit;
pub use store::EncodingStore;
pub use worker::{EnrollWorker, EnrolledFace, WorkerConfig};
