//! # face-enroll CLI
//!
//! Command-line interface for the face gallery enroller.
//!
//! ## Usage
//! ```bash
//! face-enroll enroll ./Enrollment --output face_encodings.bin
//! face-enroll enroll ./Enrollment --jitter 100 --verbose
//! face-enroll inspect face_encodings.bin
//! ```

mod cli;

use face_gallery::Result;

fn main() -> Result<()> {
    face_gallery::init_tracing();
    cli::run()
}
