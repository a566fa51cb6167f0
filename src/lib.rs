//! # Face Gallery
//!
//! Builds a persisted gallery of facial identity signatures from labeled
//! reference photos, for consumption by a downstream matching process.
//!
//! ## How It Works
//! Each immediate subdirectory of the enrollment root names one identity;
//! every supported image inside it is decoded, searched for a face (fast
//! locator first, accurate locator as fallback), encoded into a
//! fixed-length signature, and validated before entering the store.
//!
//! ## Architecture
//! The library is split into a core engine (UI-agnostic) and presentation layers:
//! - `core` - The enrollment engine
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - User-friendly error types
//! - `cli` - Command-line interface

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{EnrollError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
