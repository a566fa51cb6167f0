//! # Face Module
//!
//! Face location and signature encoding capabilities.
//!
//! ## Design
//! The detection and encoding models are opaque capabilities behind the
//! [`FaceLocator`] and [`FaceEncoder`] traits, so backends can be swapped
//! or mocked independently. The two-tier locate policy (fast model first,
//! accurate model only when the fast one finds nothing) lives in the
//! worker, not here.
//!
//! The `onnx` feature provides production implementations backed by ONNX
//! Runtime: an UltraFace-style detector in fast and accurate variants, and
//! an ArcFace-style embedder.

#[cfg(feature = "onnx")]
mod detector;
#[cfg(feature = "onnx")]
mod embedder;

#[cfg(feature = "onnx")]
pub use detector::{DetectorVariant, OnnxFaceLocator};
#[cfg(feature = "onnx")]
pub use embedder::OnnxFaceEncoder;

use crate::error::EncodeError;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Rectangular bounding box of a detected face, in pixel coordinates
/// of the image it was located in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    /// Clamp this region to the bounds of a `width` x `height` image.
    ///
    /// Detectors may return boxes that extend slightly past the frame.
    pub fn clamped(&self, width: u32, height: u32) -> FaceRegion {
        let x = self.x.min(width.saturating_sub(1));
        let y = self.y.min(height.saturating_sub(1));
        FaceRegion {
            x,
            y,
            width: self.width.min(width - x).max(1),
            height: self.height.min(height - y).max(1),
        }
    }
}

/// A fixed-length numeric signature for one face.
///
/// The length is decided by the encoder that produced it. Signatures
/// with non-finite elements are rejected before they reach the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(Vec<f32>);

impl Signature {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every element is a finite number (no NaN, no infinity).
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// A face-location capability: given pixel data, returns zero or more
/// bounding regions.
///
/// Implementations are not required to be shareable across threads;
/// each worker owns its own instances.
pub trait FaceLocator: Send {
    /// Locate faces in the image, best match first.
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, EncodeError>;

    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;
}

/// A signature-encoding capability: given pixel data and a face region,
/// returns a fixed-length signature.
pub trait FaceEncoder: Send {
    /// Encode the face inside `region`.
    ///
    /// `jitter` is the number of randomized encoding passes to average;
    /// zero or one means a single pass. Higher values trade one-time
    /// latency for a more stable signature.
    fn encode(
        &mut self,
        image: &RgbImage,
        region: &FaceRegion,
        jitter: u32,
    ) -> Result<Signature, EncodeError>;
}
