//! # Worker Module
//!
//! Orchestrates the per-image enrollment steps: decode, bounded downscale,
//! two-tier face location, signature encoding, numeric validation.
//!
//! ## Failure Policy
//! Everything that can go wrong for one photo surfaces as an [`EncodeError`]
//! from [`EnrollWorker::process`]. The dispatcher turns those into warnings
//! and moves on; a single bad image never aborts the batch.

pub mod decode;
pub mod resize;

use crate::core::face::{FaceEncoder, FaceLocator, Signature};
use crate::core::scanner::EnrollmentUnit;
use crate::error::EncodeError;

/// Tuning knobs for the per-image pipeline
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cap on the longest image dimension before detection/encoding
    pub max_image_side: u32,
    /// Number of randomized encoding passes averaged into one signature.
    /// Higher values trade one-time enrollment latency for robustness.
    pub jitter_count: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_image_side: 1600,
            jitter_count: 70,
        }
    }
}

/// One successfully enrolled face
#[derive(Debug, Clone)]
pub struct EnrolledFace {
    pub label: String,
    pub signature: Signature,
}

/// Creates per-thread workers for the dispatcher.
///
/// The detection/encoding backends are not shareable across threads, so
/// every parallel execution context builds its own worker through this
/// factory.
pub trait WorkerFactory: Send + Sync {
    fn create(&self) -> Result<EnrollWorker, EncodeError>;
}

impl<F> WorkerFactory for F
where
    F: Fn() -> Result<EnrollWorker, EncodeError> + Send + Sync,
{
    fn create(&self) -> Result<EnrollWorker, EncodeError> {
        (self)()
    }
}

/// Processes one enrollment unit at a time.
///
/// Owns its locator and encoder instances outright; nothing in here is
/// shared with other workers.
pub struct EnrollWorker {
    fast_locator: Box<dyn FaceLocator>,
    slow_locator: Box<dyn FaceLocator>,
    encoder: Box<dyn FaceEncoder>,
    config: WorkerConfig,
}

impl EnrollWorker {
    /// Create a worker from a fast locator, a slow fallback locator,
    /// and an encoder.
    pub fn new(
        fast_locator: Box<dyn FaceLocator>,
        slow_locator: Box<dyn FaceLocator>,
        encoder: Box<dyn FaceEncoder>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            fast_locator,
            slow_locator,
            encoder,
            config,
        }
    }

    /// Replace this worker's configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full per-image pipeline for one unit.
    ///
    /// The fast locator runs first; the slow one only when the fast one
    /// finds nothing. Most reference photos are easy frontal shots, so the
    /// expensive model is reserved for the hard cases.
    pub fn process(&mut self, unit: &EnrollmentUnit) -> Result<EnrolledFace, EncodeError> {
        let path = &unit.image_path;

        let image = decode::decode_rgb(path)?;
        let image = resize::downscale_to_max_side(image, self.config.max_image_side, path)?;

        let mut regions = self.fast_locator.locate(&image)?;
        if regions.is_empty() {
            tracing::debug!(
                path = %path.display(),
                fallback = self.slow_locator.name(),
                "fast locator found no face, trying fallback"
            );
            regions = self.slow_locator.locate(&image)?;
        }

        // Enrollment photos are assumed to contain exactly one face;
        // additional regions are ignored.
        let Some(region) = regions.first().copied() else {
            return Err(EncodeError::NoFaceFound {
                path: path.clone(),
            });
        };

        let signature = self
            .encoder
            .encode(&image, &region, self.config.jitter_count)?;

        if !signature.is_finite() {
            return Err(EncodeError::NonFiniteSignature {
                path: path.clone(),
            });
        }

        Ok(EnrolledFace {
            label: unit.label.clone(),
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::face::FaceRegion;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Locator stub that returns a fixed region list and records calls
    struct StubLocator {
        regions: Vec<FaceRegion>,
        calls: Arc<AtomicUsize>,
        seen_dims: Arc<Mutex<Option<(u32, u32)>>>,
    }

    impl StubLocator {
        fn new(regions: Vec<FaceRegion>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    regions,
                    calls: calls.clone(),
                    seen_dims: Arc::new(Mutex::new(None)),
                },
                calls,
            )
        }

        fn with_dim_probe(mut self) -> (Self, Arc<Mutex<Option<(u32, u32)>>>) {
            let probe = Arc::new(Mutex::new(None));
            self.seen_dims = probe.clone();
            (self, probe)
        }
    }

    impl FaceLocator for StubLocator {
        fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, EncodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_dims.lock().unwrap() = Some(image.dimensions());
            Ok(self.regions.clone())
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    /// Encoder stub that returns a fixed signature and records the region
    struct StubEncoder {
        output: Vec<f32>,
        seen_region: Arc<Mutex<Option<FaceRegion>>>,
    }

    impl StubEncoder {
        fn new(output: Vec<f32>) -> (Self, Arc<Mutex<Option<FaceRegion>>>) {
            let seen = Arc::new(Mutex::new(None));
            (
                Self {
                    output,
                    seen_region: seen.clone(),
                },
                seen,
            )
        }
    }

    impl FaceEncoder for StubEncoder {
        fn encode(
            &mut self,
            _image: &RgbImage,
            region: &FaceRegion,
            _jitter: u32,
        ) -> Result<Signature, EncodeError> {
            *self.seen_region.lock().unwrap() = Some(*region);
            Ok(Signature::new(self.output.clone()))
        }
    }

    fn face_at(x: u32, y: u32) -> FaceRegion {
        FaceRegion {
            x,
            y,
            width: 16,
            height: 16,
        }
    }

    fn write_photo(dir: &TempDir, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.path().join(name);
        let img: RgbImage =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 251) as u8, (y % 241) as u8, 7]));
        img.save(&path).unwrap();
        path
    }

    fn unit(path: PathBuf, label: &str) -> EnrollmentUnit {
        EnrollmentUnit {
            image_path: path,
            label: label.to_string(),
        }
    }

    #[test]
    fn happy_path_returns_labeled_signature() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "alice.png", 64, 64);

        let (fast, _) = StubLocator::new(vec![face_at(4, 4)]);
        let (slow, slow_calls) = StubLocator::new(vec![]);
        let (encoder, _) = StubEncoder::new(vec![0.5; 128]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        let face = worker.process(&unit(path, "Alice")).unwrap();
        assert_eq!(face.label, "Alice");
        assert_eq!(face.signature.len(), 128);
        assert!(face.signature.is_finite());
        // Fast locator succeeded, fallback must stay cold
        assert_eq!(slow_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn fallback_runs_only_when_fast_locator_finds_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "hard.png", 64, 64);

        let (fast, fast_calls) = StubLocator::new(vec![]);
        let (slow, slow_calls) = StubLocator::new(vec![face_at(10, 10)]);
        let (encoder, _) = StubEncoder::new(vec![1.0; 128]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        let face = worker.process(&unit(path, "Bob")).unwrap();
        assert_eq!(face.label, "Bob");
        assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_face_under_either_locator_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "landscape.png", 64, 64);

        let (fast, _) = StubLocator::new(vec![]);
        let (slow, _) = StubLocator::new(vec![]);
        let (encoder, _) = StubEncoder::new(vec![1.0; 128]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        let result = worker.process(&unit(path, "Alice"));
        assert!(matches!(result, Err(EncodeError::NoFaceFound { .. })));
    }

    #[test]
    fn corrupt_image_is_a_contained_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let (fast, fast_calls) = StubLocator::new(vec![face_at(0, 0)]);
        let (slow, _) = StubLocator::new(vec![]);
        let (encoder, _) = StubEncoder::new(vec![1.0; 128]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        let result = worker.process(&unit(path, "Alice"));
        assert!(matches!(result, Err(EncodeError::Decode { .. })));
        // Decode failed, so the locators never ran
        assert_eq!(fast_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn non_finite_signature_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "weird.png", 64, 64);

        let (fast, _) = StubLocator::new(vec![face_at(0, 0)]);
        let (slow, _) = StubLocator::new(vec![]);
        let (encoder, _) = StubEncoder::new(vec![0.5, f32::NAN, 0.5]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        let result = worker.process(&unit(path, "Alice"));
        assert!(matches!(
            result,
            Err(EncodeError::NonFiniteSignature { .. })
        ));
    }

    #[test]
    fn oversized_image_is_downscaled_before_location() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "huge.png", 100, 50);

        let (fast, _) = StubLocator::new(vec![face_at(0, 0)]);
        let (fast, dims) = fast.with_dim_probe();
        let (slow, _) = StubLocator::new(vec![]);
        let (encoder, _) = StubEncoder::new(vec![1.0; 128]);

        let config = WorkerConfig {
            max_image_side: 40,
            ..Default::default()
        };
        let mut worker =
            EnrollWorker::new(Box::new(fast), Box::new(slow), Box::new(encoder), config);

        worker.process(&unit(path, "Alice")).unwrap();
        assert_eq!(*dims.lock().unwrap(), Some((40, 20)));
    }

    #[test]
    fn only_first_region_is_encoded() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_photo(&temp_dir, "group.png", 64, 64);

        let (fast, _) = StubLocator::new(vec![face_at(2, 2), face_at(30, 30)]);
        let (slow, _) = StubLocator::new(vec![]);
        let (encoder, seen_region) = StubEncoder::new(vec![1.0; 128]);

        let mut worker = EnrollWorker::new(
            Box::new(fast),
            Box::new(slow),
            Box::new(encoder),
            WorkerConfig::default(),
        );

        worker.process(&unit(path, "Alice")).unwrap();
        assert_eq!(seen_region.lock().unwrap().unwrap(), face_at(2, 2));
    }
}
