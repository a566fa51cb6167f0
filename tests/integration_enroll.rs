//! Integration tests for the enrollment pipeline.
//!
//! These tests verify end-to-end behavior with stubbed face capabilities:
//! - labeled discovery through store persistence
//! - two-tier locator fallback
//! - per-image failure containment
//! - determinism of the enrolled set across runs

use assert_fs::prelude::*;
use face_gallery::core::face::{FaceEncoder, FaceLocator, FaceRegion, Signature};
use face_gallery::core::pipeline::Pipeline;
use face_gallery::core::store::EncodingStore;
use face_gallery::core::worker::{EnrollWorker, WorkerConfig, WorkerFactory};
use face_gallery::error::{EncodeError, EnrollError, ScanError};
use face_gallery::events::{EncodeEvent, Event, EventChannel};
use image::{ImageBuffer, Rgb, RgbImage};
use predicates::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const SIGNATURE_DIM: usize = 128;

/// Locator stub that finds a face only when the image is bright enough,
/// and counts how often it ran.
struct BrightnessLocator {
    min_mean: f32,
    calls: Arc<AtomicUsize>,
}

impl FaceLocator for BrightnessLocator {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if mean_pixel(image) >= self.min_mean {
            Ok(vec![FaceRegion {
                x: 0,
                y: 0,
                width: image.width().min(8),
                height: image.height().min(8),
            }])
        } else {
            Ok(vec![])
        }
    }

    fn name(&self) -> &'static str {
        "brightness-stub"
    }
}

/// Deterministic encoder: the signature depends only on pixel content.
struct ContentEncoder;

impl FaceEncoder for ContentEncoder {
    fn encode(
        &mut self,
        image: &RgbImage,
        _region: &FaceRegion,
        _jitter: u32,
    ) -> Result<Signature, EncodeError> {
        Ok(Signature::new(vec![mean_pixel(image); SIGNATURE_DIM]))
    }
}

fn mean_pixel(image: &RgbImage) -> f32 {
    let sum: u64 = image.as_raw().iter().map(|&b| b as u64).sum();
    sum as f32 / image.as_raw().len() as f32
}

/// Factory building workers whose fast locator needs a bright image and
/// whose slow fallback accepts anything non-dark.
struct StubFactory {
    fast_threshold: f32,
    slow_threshold: f32,
    fast_calls: Arc<AtomicUsize>,
    slow_calls: Arc<AtomicUsize>,
}

impl StubFactory {
    fn new(fast_threshold: f32, slow_threshold: f32) -> Self {
        Self {
            fast_threshold,
            slow_threshold,
            fast_calls: Arc::new(AtomicUsize::new(0)),
            slow_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl WorkerFactory for StubFactory {
    fn create(&self) -> Result<EnrollWorker, EncodeError> {
        Ok(EnrollWorker::new(
            Box::new(BrightnessLocator {
                min_mean: self.fast_threshold,
                calls: self.fast_calls.clone(),
            }),
            Box::new(BrightnessLocator {
                min_mean: self.slow_threshold,
                calls: self.slow_calls.clone(),
            }),
            Box::new(ContentEncoder),
            WorkerConfig::default(),
        ))
    }
}

fn write_photo(dir: &Path, name: &str, shade: u8) {
    let img: RgbImage = ImageBuffer::from_pixel(24, 24, Rgb([shade, shade, shade]));
    img.save(dir.join(name)).unwrap();
}

#[test]
fn enrollment_scenario_with_corrupt_photo() {
    // Alice: 2 valid photos. Bob: 1 valid photo, 1 corrupt file.
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    root.child("Bob").create_dir_all().unwrap();
    write_photo(&root.path().join("Alice"), "one.png", 200);
    write_photo(&root.path().join("Alice"), "two.png", 210);
    write_photo(&root.path().join("Bob"), "one.png", 220);
    root.child("Bob/broken.jpg")
        .write_binary(b"this is not a valid image file")
        .unwrap();

    let output = temp.child("gallery.bin");
    let factory = Arc::new(StubFactory::new(100.0, 0.0));

    let (sender, receiver) = EventChannel::new();
    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(2))
        .worker_factory(factory)
        .build()
        .unwrap();

    let report = pipeline.run_with_events(&sender).unwrap();
    drop(sender);

    assert_eq!(report.total_photos, 4);
    assert_eq!(report.encoded, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.identities, 2);

    // A warning event was emitted for Bob's corrupt photo
    let skipped: Vec<_> = receiver
        .iter()
        .filter_map(|e| match e {
            Event::Encode(EncodeEvent::Skipped { path, .. }) => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].ends_with("broken.jpg"));

    // The persisted store has exactly the three survivors
    let store = EncodingStore::load(output.path()).unwrap();
    assert_eq!(store.len(), 3);
    let alice = store.labels().iter().filter(|l| *l == "Alice").count();
    let bob = store.labels().iter().filter(|l| *l == "Bob").count();
    assert_eq!(alice, 2);
    assert_eq!(bob, 1);
}

#[test]
fn every_signature_has_expected_shape() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    write_photo(&root.path().join("Alice"), "a.png", 180);
    write_photo(&root.path().join("Alice"), "b.png", 190);

    let output = temp.child("gallery.bin");
    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(2))
        .worker_factory(Arc::new(StubFactory::new(100.0, 0.0)))
        .build()
        .unwrap();

    pipeline.run().unwrap();

    let store = EncodingStore::load(output.path()).unwrap();
    for (_, signature) in store.iter() {
        assert_eq!(signature.len(), SIGNATURE_DIM);
        assert!(signature.is_finite());
    }
}

#[test]
fn fallback_locator_rescues_hard_photos() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    // Too dim for the fast locator, bright enough for the slow one
    write_photo(&root.path().join("Alice"), "dim.png", 80);

    let output = temp.child("gallery.bin");
    let factory = Arc::new(StubFactory::new(150.0, 50.0));
    let fast_calls = factory.fast_calls.clone();
    let slow_calls = factory.slow_calls.clone();

    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(1))
        .worker_factory(factory)
        .build()
        .unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.encoded, 1);
    // Both tiers ran: the fast locator came up empty, the fallback hit
    assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn fallback_stays_cold_for_easy_photos() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    write_photo(&root.path().join("Alice"), "bright.png", 220);

    let output = temp.child("gallery.bin");
    let factory = Arc::new(StubFactory::new(150.0, 50.0));
    let slow_calls = factory.slow_calls.clone();

    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(1))
        .worker_factory(factory)
        .build()
        .unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.encoded, 1);
    assert_eq!(slow_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn faceless_photos_leave_no_trace_in_the_store() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    write_photo(&root.path().join("Alice"), "face.png", 220);
    // Too dark for either locator
    write_photo(&root.path().join("Alice"), "night.png", 10);

    let output = temp.child("gallery.bin");
    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(2))
        .worker_factory(Arc::new(StubFactory::new(150.0, 50.0)))
        .build()
        .unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.encoded, 1);
    assert_eq!(report.skipped, 1);

    let store = EncodingStore::load(output.path()).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn empty_label_directories_abort_without_writing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    root.child("Bob").create_dir_all().unwrap();

    let output = temp.child("gallery.bin");
    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .worker_factory(Arc::new(StubFactory::new(100.0, 0.0)))
        .build()
        .unwrap();

    let result = pipeline.run();

    assert!(matches!(
        result,
        Err(EnrollError::Scan(ScanError::NoImagesFound { .. }))
    ));
    output.assert(predicate::path::missing());
}

#[test]
fn repeated_runs_enroll_the_same_set() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    for (label, count) in [("Alice", 4), ("Bob", 3), ("Carol", 5)] {
        root.child(label).create_dir_all().unwrap();
        for i in 0..count {
            write_photo(
                &root.path().join(label),
                &format!("photo_{i}.png"),
                120 + (i * 11) as u8,
            );
        }
    }

    let mut runs: Vec<HashSet<(String, String)>> = Vec::new();
    for run in 0..2 {
        let output = temp.child(format!("gallery_{run}.bin"));
        let pipeline = Pipeline::builder()
            .root(root.path())
            .output(output.path())
            .concurrency(Some(4))
            .worker_factory(Arc::new(StubFactory::new(100.0, 0.0)))
            .build()
            .unwrap();

        pipeline.run().unwrap();

        let store = EncodingStore::load(output.path()).unwrap();
        // Compare as a set: record order is completion order and may
        // legitimately differ between runs.
        runs.push(
            store
                .iter()
                .map(|(label, sig)| (label.to_string(), format!("{:?}", sig.values())))
                .collect(),
        );
    }

    assert_eq!(runs[0], runs[1]);
}

#[test]
fn store_round_trip_preserves_pairing() {
    let temp = assert_fs::TempDir::new().unwrap();
    let root = temp.child("enrollment");
    root.child("Alice").create_dir_all().unwrap();
    root.child("Bob").create_dir_all().unwrap();
    write_photo(&root.path().join("Alice"), "a.png", 150);
    write_photo(&root.path().join("Bob"), "b.png", 250);

    let output = temp.child("gallery.bin");
    let pipeline = Pipeline::builder()
        .root(root.path())
        .output(output.path())
        .concurrency(Some(2))
        .worker_factory(Arc::new(StubFactory::new(100.0, 0.0)))
        .build()
        .unwrap();

    pipeline.run().unwrap();

    let store = EncodingStore::load(output.path()).unwrap();
    assert_eq!(store.signatures().len(), store.labels().len());

    // The Bob photo is brighter, so its signature mean must be higher;
    // pairing survived serialization if labels still line up.
    for (label, signature) in store.iter() {
        let value = signature.values()[0];
        match label {
            "Alice" => assert!((value - 150.0).abs() < 1.0),
            "Bob" => assert!((value - 250.0).abs() < 1.0),
            other => panic!("unexpected label {other}"),
        }
    }
}

#[test]
fn missing_root_is_a_fatal_error() {
    let pipeline = Pipeline::builder()
        .root("/nonexistent/enrollment/tree")
        .worker_factory(Arc::new(StubFactory::new(100.0, 0.0)))
        .build()
        .unwrap();

    let result = pipeline.run();
    assert!(matches!(
        result,
        Err(EnrollError::Scan(ScanError::RootNotFound { .. }))
    ));
}
