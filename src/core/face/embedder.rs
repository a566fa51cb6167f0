//! ArcFace face embedder via ONNX Runtime.
//!
//! Extracts 512-dimensional face signatures from face crops using a
//! w600k-style ArcFace model. Jitter is implemented here: each pass
//! re-encodes a randomly perturbed crop of the same region and the
//! passes are averaged before L2 normalization.

use crate::core::face::{FaceEncoder, FaceRegion, Signature};
use crate::error::EncodeError;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

const EMBED_INPUT_SIZE: u32 = 112;
const EMBED_MEAN: f32 = 127.5;
const EMBED_STD: f32 = 127.5; // ArcFace uses symmetric normalization
const EMBED_DIM: usize = 512;
/// Jitter passes shift and scale the crop by at most this fraction
const JITTER_MAX_SHIFT: f32 = 0.05;

/// ArcFace-based signature encoder.
pub struct OnnxFaceEncoder {
    session: Session,
    rng: StdRng,
}

impl OnnxFaceEncoder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, EncodeError> {
        if !model_path.exists() {
            return Err(EncodeError::ModelNotFound {
                path: model_path.to_path_buf(),
            });
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(2))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| EncodeError::Inference(e.to_string()))?;

        tracing::info!(path = %model_path.display(), "loaded face encoding model");

        Ok(Self {
            session,
            rng: StdRng::from_entropy(),
        })
    }

    /// Crop one region, resize to the model input, normalize to NCHW.
    fn preprocess(image: &RgbImage, region: &FaceRegion) -> Array4<f32> {
        let clamped = region.clamped(image.width(), image.height());
        let crop = image::imageops::crop_imm(
            image,
            clamped.x,
            clamped.y,
            clamped.width,
            clamped.height,
        )
        .to_image();

        let resized = image::imageops::resize(
            &crop,
            EMBED_INPUT_SIZE,
            EMBED_INPUT_SIZE,
            image::imageops::FilterType::Triangle,
        );

        let size = EMBED_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - EMBED_MEAN) / EMBED_STD;
            }
        }

        tensor
    }

    /// One inference pass over a prepared tensor.
    fn run_pass(&mut self, input: &Array4<f32>) -> Result<Vec<f32>, EncodeError> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())
                .map_err(|e| EncodeError::Inference(e.to_string()))?])
            .map_err(|e| EncodeError::Inference(e.to_string()))?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncodeError::Inference(format!("embedding extraction: {e}")))?;

        if raw.len() != EMBED_DIM {
            return Err(EncodeError::Inference(format!(
                "expected {EMBED_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(raw.to_vec())
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(
        &mut self,
        image: &RgbImage,
        region: &FaceRegion,
        jitter: u32,
    ) -> Result<Signature, EncodeError> {
        let passes = jitter.max(1);
        let mut accumulated = vec![0.0f32; EMBED_DIM];

        for pass in 0..passes {
            // First pass encodes the region as detected; later passes
            // perturb it so the average is stable under small misalignments.
            let crop_region = if pass == 0 {
                *region
            } else {
                perturb_region(region, JITTER_MAX_SHIFT, &mut self.rng)
            };

            let input = Self::preprocess(image, &crop_region);
            let raw = self.run_pass(&input)?;

            for (acc, value) in accumulated.iter_mut().zip(raw.iter()) {
                *acc += value;
            }
        }

        for value in accumulated.iter_mut() {
            *value /= passes as f32;
        }

        l2_normalize(&mut accumulated);

        Ok(Signature::new(accumulated))
    }
}

/// Randomly shift and rescale a region by at most `max_frac` of its size.
fn perturb_region(region: &FaceRegion, max_frac: f32, rng: &mut StdRng) -> FaceRegion {
    let dx = rng.gen_range(-max_frac..=max_frac) * region.width as f32;
    let dy = rng.gen_range(-max_frac..=max_frac) * region.height as f32;
    let scale = 1.0 + rng.gen_range(-max_frac..=max_frac);

    let width = ((region.width as f32 * scale) as u32).max(1);
    let height = ((region.height as f32 * scale) as u32).max(1);
    let x = (region.x as f32 + dx).max(0.0) as u32;
    let y = (region.y as f32 + dy).max(0.0) as u32;

    FaceRegion {
        x,
        y,
        width,
        height,
    }
}

/// Scale a vector to unit length. Zero vectors are left untouched.
fn l2_normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in values.iter_mut() {
            *value /= norm;
        }
    }
}
