//! UltraFace face detector via ONNX Runtime.
//!
//! Runs the slim UltraFace RFB models, whose graphs already decode
//! anchors internally: the outputs are per-candidate confidence scores
//! and normalized corner boxes. Two variants share one decode path:
//! a 320-wide fast model and a 640-wide accurate model used as the
//! fallback for hard shots.

use crate::core::face::{FaceLocator, FaceRegion};
use crate::error::EncodeError;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

const DETECTOR_MEAN: f32 = 127.0;
const DETECTOR_STD: f32 = 128.0;
const DETECTOR_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DETECTOR_NMS_THRESHOLD: f32 = 0.5;

/// Which UltraFace model this locator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorVariant {
    /// RFB-320: fast, handles easy frontal shots
    Fast,
    /// RFB-640: slower, more accurate, used as fallback
    Accurate,
}

impl DetectorVariant {
    /// Model input size as (width, height)
    fn input_size(&self) -> (u32, u32) {
        match self {
            DetectorVariant::Fast => (320, 240),
            DetectorVariant::Accurate => (640, 480),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            DetectorVariant::Fast => "ultraface-320",
            DetectorVariant::Accurate => "ultraface-640",
        }
    }
}

/// UltraFace-based face locator.
pub struct OnnxFaceLocator {
    session: Session,
    variant: DetectorVariant,
}

impl OnnxFaceLocator {
    /// Load an UltraFace ONNX model from the given path.
    pub fn load(model_path: &Path, variant: DetectorVariant) -> Result<Self, EncodeError> {
        if !model_path.exists() {
            return Err(EncodeError::ModelNotFound {
                path: model_path.to_path_buf(),
            });
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(ort_err)?;

        tracing::info!(
            path = %model_path.display(),
            variant = variant.name(),
            "loaded face detection model"
        );

        Ok(Self { session, variant })
    }

    /// Resize to the model input size and normalize into a NCHW tensor.
    fn preprocess(image: &RgbImage, input_width: u32, input_height: u32) -> Array4<f32> {
        let resized = image::imageops::resize(
            image,
            input_width,
            input_height,
            image::imageops::FilterType::Triangle,
        );

        let (w, h) = (input_width as usize, input_height as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, h, w));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - DETECTOR_MEAN) / DETECTOR_STD;
            }
        }

        tensor
    }
}

impl FaceLocator for OnnxFaceLocator {
    fn locate(&mut self, image: &RgbImage) -> Result<Vec<FaceRegion>, EncodeError> {
        let (orig_width, orig_height) = image.dimensions();
        let (input_width, input_height) = self.variant.input_size();

        let input = Self::preprocess(image, input_width, input_height);

        let outputs = self
            .session
            .run(ort::inputs![
                TensorRef::from_array_view(input.view()).map_err(ort_err)?
            ])
            .map_err(ort_err)?;

        // UltraFace exports two tensors: scores [1, N, 2] and boxes [1, N, 4]
        // with corner coordinates normalized to [0, 1].
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncodeError::Inference(format!("detector scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncodeError::Inference(format!("detector boxes: {e}")))?;

        let candidates = scores.len() / 2;
        let mut detections: Vec<(f32, [f32; 4])> = Vec::new();

        for i in 0..candidates {
            let confidence = scores[i * 2 + 1];
            if confidence < DETECTOR_CONFIDENCE_THRESHOLD {
                continue;
            }
            detections.push((
                confidence,
                [
                    boxes[i * 4],
                    boxes[i * 4 + 1],
                    boxes[i * 4 + 2],
                    boxes[i * 4 + 3],
                ],
            ));
        }

        let kept = non_max_suppression(detections, DETECTOR_NMS_THRESHOLD);

        Ok(kept
            .into_iter()
            .map(|(_, b)| to_region(&b, orig_width, orig_height))
            .collect())
    }

    fn name(&self) -> &'static str {
        self.variant.name()
    }
}

fn ort_err(e: ort::Error) -> EncodeError {
    EncodeError::Inference(e.to_string())
}

/// Intersection-over-union of two normalized corner boxes.
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy NMS, highest confidence first.
fn non_max_suppression(
    mut detections: Vec<(f32, [f32; 4])>,
    threshold: f32,
) -> Vec<(f32, [f32; 4])> {
    detections.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut kept: Vec<(f32, [f32; 4])> = Vec::new();
    for (score, bbox) in detections {
        if kept.iter().all(|(_, k)| iou(k, &bbox) <= threshold) {
            kept.push((score, bbox));
        }
    }
    kept
}

/// Map a normalized corner box back to pixel coordinates of the
/// original image.
fn to_region(bbox: &[f32; 4], width: u32, height: u32) -> FaceRegion {
    let x1 = (bbox[0].clamp(0.0, 1.0) * width as f32) as u32;
    let y1 = (bbox[1].clamp(0.0, 1.0) * height as f32) as u32;
    let x2 = (bbox[2].clamp(0.0, 1.0) * width as f32) as u32;
    let y2 = (bbox[3].clamp(0.0, 1.0) * height as f32) as u32;

    FaceRegion {
        x: x1,
        y: y1,
        width: x2.saturating_sub(x1).max(1),
        height: y2.saturating_sub(y1).max(1),
    }
    .clamped(width, height)
}
