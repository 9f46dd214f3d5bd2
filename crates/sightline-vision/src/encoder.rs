//! CLIP image/text embedding via paired ONNX graphs.
//!
//! The visual and text towers of CLIP ViT-B/32 are exported as separate
//! ONNX files and share one embedding space. Image inputs are resized
//! to a 224 square and normalized with the CLIP channel statistics;
//! text inputs are BPE-tokenized and padded to the model's 77-token
//! context window.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use sightline_models::Embedding;

use crate::error::{VisionError, VisionResult};
use crate::session::create_session;

/// CLIP normalization statistics (RGB channel means and stds).
const CLIP_MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const CLIP_STD: [f32; 3] = [0.26862954, 0.26130258, 0.27577711];

/// Embeds images and text prompts into a shared vector space.
pub trait EmbeddingEncoder: Send + Sync {
    fn encode_image(&self, image: &RgbImage) -> VisionResult<Embedding>;
    fn encode_text(&self, text: &str) -> VisionResult<Embedding>;
}

/// Configuration for the CLIP encoder.
#[derive(Debug, Clone)]
pub struct ClipConfig {
    /// Path to the visual tower ONNX file
    pub visual_model_path: String,
    /// Path to the text tower ONNX file
    pub text_model_path: String,
    /// Path to the tokenizer definition (tokenizer.json)
    pub tokenizer_path: String,
    /// Square input size for the visual tower
    pub image_size: u32,
    /// Token context window of the text tower
    pub context_length: usize,
    /// Output tensor name of the visual graph
    pub visual_output: String,
    /// Output tensor name of the text graph
    pub text_output: String,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            visual_model_path: "models/clip/visual.onnx".to_string(),
            text_model_path: "models/clip/textual.onnx".to_string(),
            tokenizer_path: "models/clip/tokenizer.json".to_string(),
            image_size: 224,
            context_length: 77,
            visual_output: "image_embeds".to_string(),
            text_output: "text_embeds".to_string(),
        }
    }
}

/// CLIP ViT-B/32 encoder backed by ONNX Runtime.
pub struct ClipEncoder {
    visual: Mutex<Session>,
    textual: Mutex<Session>,
    tokenizer: Tokenizer,
    config: ClipConfig,
}

impl ClipEncoder {
    /// Create an encoder from config.
    ///
    /// Returns an error if either model file or the tokenizer is
    /// missing or cannot be loaded.
    pub fn new(config: ClipConfig) -> VisionResult<Self> {
        for path in [
            &config.visual_model_path,
            &config.text_model_path,
            &config.tokenizer_path,
        ] {
            if !Path::new(path).exists() {
                return Err(VisionError::model_not_found(path));
            }
        }

        let visual = Mutex::new(create_session(Path::new(&config.visual_model_path))?);
        let textual = Mutex::new(create_session(Path::new(&config.text_model_path))?);
        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| VisionError::Tokenizer(e.to_string()))?;

        info!(
            visual = %config.visual_model_path,
            textual = %config.text_model_path,
            "CLIP encoder initialized"
        );

        Ok(Self {
            visual,
            textual,
            tokenizer,
            config,
        })
    }

    pub fn config(&self) -> &ClipConfig {
        &self.config
    }

    /// Resize to the CLIP input square and normalize to NCHW floats.
    fn preprocess(&self, image: &RgbImage) -> VisionResult<Value> {
        let size = self.config.image_size;
        let resized =
            image::imageops::resize(image, size, size, image::imageops::FilterType::Triangle);

        let chw_data = normalize_clip_pixels(&resized);
        let shape = vec![1usize, 3, size as usize, size as usize];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference(format!("Failed to create tensor: {}", e)))
    }
}

impl EmbeddingEncoder for ClipEncoder {
    fn encode_image(&self, image: &RgbImage) -> VisionResult<Embedding> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidImage("zero-sized image".to_string()));
        }

        let input = self.preprocess(image)?;
        let mut session = self
            .visual
            .lock()
            .map_err(|_| VisionError::inference("Visual session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("CLIP image inference failed: {}", e)))?;

        let output = outputs
            .get(&self.config.visual_output)
            .ok_or_else(|| {
                VisionError::inference(format!("Missing {} tensor", self.config.visual_output))
            })?;
        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("Failed to extract tensor: {}", e)))?;

        let embedding = Embedding::new(tensor.1.to_vec());
        debug!(dim = embedding.dim(), "Image embedded");
        Ok(embedding)
    }

    fn encode_text(&self, text: &str) -> VisionResult<Embedding> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(VisionError::EmptyText);
        }

        let encoding = self
            .tokenizer
            .encode(trimmed, true)
            .map_err(|e| VisionError::Tokenizer(e.to_string()))?;
        let token_count = encoding.get_ids().len();
        let ids = pad_token_ids(encoding.get_ids(), self.config.context_length);
        let mask = attention_mask(token_count, self.config.context_length);

        let shape = vec![1usize, self.config.context_length];
        let ids_tensor = Tensor::from_array((shape.clone(), ids.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference(format!("Failed to create tensor: {}", e)))?;
        let mask_tensor = Tensor::from_array((shape, mask.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference(format!("Failed to create tensor: {}", e)))?;

        let mut session = self
            .textual
            .lock()
            .map_err(|_| VisionError::inference("Text session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs!["input_ids" => ids_tensor, "attention_mask" => mask_tensor])
            .map_err(|e| VisionError::inference(format!("CLIP text inference failed: {}", e)))?;

        let output = outputs.get(&self.config.text_output).ok_or_else(|| {
            VisionError::inference(format!("Missing {} tensor", self.config.text_output))
        })?;
        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("Failed to extract tensor: {}", e)))?;

        let embedding = Embedding::new(tensor.1.to_vec());
        debug!(dim = embedding.dim(), tokens = token_count, "Text embedded");
        Ok(embedding)
    }
}

/// HWC u8 -> CHW f32 with CLIP channel normalization.
fn normalize_clip_pixels(image: &RgbImage) -> Vec<f32> {
    let (w, h) = image.dimensions();
    let mut chw_data = Vec::with_capacity(3 * (w * h) as usize);
    for c in 0..3 {
        for y in 0..h {
            for x in 0..w {
                let value = image.get_pixel(x, y)[c] as f32 / 255.0;
                chw_data.push((value - CLIP_MEAN[c]) / CLIP_STD[c]);
            }
        }
    }
    chw_data
}

/// Pad (or truncate) token ids to the context window. When truncating,
/// the final id of the full encoding is kept so the closing special
/// token survives.
fn pad_token_ids(ids: &[u32], context_length: usize) -> Vec<i64> {
    let mut out = vec![0i64; context_length];
    if ids.len() <= context_length {
        for (slot, id) in out.iter_mut().zip(ids) {
            *slot = *id as i64;
        }
    } else {
        for (slot, id) in out.iter_mut().zip(&ids[..context_length]) {
            *slot = *id as i64;
        }
        out[context_length - 1] = ids[ids.len() - 1] as i64;
    }
    out
}

/// 1 for real token positions, 0 for padding.
fn attention_mask(token_count: usize, context_length: usize) -> Vec<i64> {
    let real = token_count.min(context_length);
    (0..context_length)
        .map(|i| if i < real { 1 } else { 0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_config_default() {
        let config = ClipConfig::default();
        assert_eq!(config.image_size, 224);
        assert_eq!(config.context_length, 77);
    }

    #[test]
    fn missing_model_is_reported() {
        let config = ClipConfig {
            visual_model_path: "/nonexistent/visual.onnx".to_string(),
            ..ClipConfig::default()
        };
        assert!(matches!(
            ClipEncoder::new(config),
            Err(VisionError::ModelNotFound(_))
        ));
    }

    #[test]
    fn normalization_applies_channel_statistics() {
        let white = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let values = normalize_clip_pixels(&white);
        assert_eq!(values.len(), 12);

        // First 4 values are the R channel, then G, then B.
        let expected_r = (1.0 - CLIP_MEAN[0]) / CLIP_STD[0];
        let expected_g = (1.0 - CLIP_MEAN[1]) / CLIP_STD[1];
        let expected_b = (1.0 - CLIP_MEAN[2]) / CLIP_STD[2];
        assert!((values[0] - expected_r).abs() < 1e-6);
        assert!((values[4] - expected_g).abs() < 1e-6);
        assert!((values[8] - expected_b).abs() < 1e-6);
    }

    #[test]
    fn black_pixels_normalize_negative() {
        let black = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));
        let values = normalize_clip_pixels(&black);
        for (c, value) in values.iter().enumerate() {
            let expected = (0.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            assert!((value - expected).abs() < 1e-6);
            assert!(*value < 0.0);
        }
    }

    #[test]
    fn short_prompts_are_zero_padded() {
        let ids = pad_token_ids(&[49406, 320, 49407], 8);
        assert_eq!(ids, vec![49406, 320, 49407, 0, 0, 0, 0, 0]);
        assert_eq!(attention_mask(3, 8), vec![1, 1, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn long_prompts_truncate_but_keep_terminator() {
        let ids: Vec<u32> = (0..10).chain(std::iter::once(49407)).collect();
        let padded = pad_token_ids(&ids, 8);
        assert_eq!(padded.len(), 8);
        assert_eq!(padded[7], 49407);
        assert_eq!(&padded[..7], &[0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(attention_mask(11, 8), vec![1; 8]);
    }
}
