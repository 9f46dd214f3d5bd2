//! Person detection using a YOLOv8 ONNX model.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::Array;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use sightline_models::{BoundingBox, Detection};

use crate::error::{VisionError, VisionResult};
use crate::session::create_session;

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Bbox coords plus per-class scores in the model output layout.
const NUM_FEATURES: usize = 4 + COCO_CLASSES.len();

/// Detects people (and other COCO classes) in decoded frames.
///
/// Implementations return every candidate above their internal floor;
/// the processing pipeline applies the person-class acceptance
/// threshold on top.
pub trait PersonDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> VisionResult<Vec<Detection>>;
}

/// Configuration for the ONNX detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Raw candidate floor applied before NMS
    pub confidence_floor: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/detector/yolov8n.onnx".to_string(),
            confidence_floor: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 detector backed by ONNX Runtime.
pub struct OnnxPersonDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl OnnxPersonDetector {
    /// Create a detector from config.
    ///
    /// Returns an error if the model file doesn't exist or cannot be
    /// loaded.
    pub fn new(config: DetectorConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            "Person detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Resize to the model input square, normalize to [0, 1], NCHW.
    fn preprocess(&self, image: &RgbImage) -> VisionResult<Value> {
        let input_size = self.config.input_size;
        let resized = image::imageops::resize(
            image,
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let (w, h) = (input_size as usize, input_size as usize);
        let mut chw_data: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    chw_data.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw_data.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::inference(format!("Failed to create tensor: {}", e)))
    }

    /// Run ONNX inference, returning the flattened [1, 84, N] output.
    fn run_inference(&self, input: Value) -> VisionResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::inference("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::inference("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl PersonDetector for OnnxPersonDetector {
    fn detect(&self, frame: &RgbImage) -> VisionResult<Vec<Detection>> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidImage("zero-sized frame".to_string()));
        }

        let input = self.preprocess(frame)?;
        let raw = self.run_inference(input)?;
        let candidates = decode_predictions(
            &raw,
            self.config.confidence_floor,
            self.config.input_size,
            width,
            height,
        )?;
        let detections = non_maximum_suppression(candidates, self.config.nms_threshold);

        debug!(count = detections.len(), "Detection completed");
        Ok(detections)
    }
}

/// Decode raw YOLOv8 output into pixel-space detections.
///
/// The model emits [1, 84, N]: per candidate a center-format box in
/// model coordinates plus 80 class scores. Boxes are converted to
/// corner format, scaled back to source pixels, and clamped to the
/// frame.
pub fn decode_predictions(
    raw: &[f32],
    confidence_floor: f32,
    input_size: u32,
    orig_width: u32,
    orig_height: u32,
) -> VisionResult<Vec<Detection>> {
    if raw.is_empty() || raw.len() % NUM_FEATURES != 0 {
        return Err(VisionError::inference(format!(
            "Unexpected output size: {} is not a multiple of {}",
            raw.len(),
            NUM_FEATURES
        )));
    }
    let num_boxes = raw.len() / NUM_FEATURES;

    // Output is [84, N]; transpose to iterate per candidate.
    let output_array = Array::from_shape_vec((NUM_FEATURES, num_boxes), raw.to_vec())
        .map_err(|e| VisionError::inference(format!("Failed to reshape output: {}", e)))?;
    let transposed = output_array.t();

    let scale_w = orig_width as f32 / input_size as f32;
    let scale_h = orig_height as f32 / input_size as f32;

    let mut candidates = Vec::new();
    for i in 0..num_boxes {
        let cx = transposed[[i, 0]];
        let cy = transposed[[i, 1]];
        let w = transposed[[i, 2]];
        let h = transposed[[i, 3]];

        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for (c, class_offset) in (4..NUM_FEATURES).enumerate() {
            let score = transposed[[i, class_offset]];
            if score > best_score {
                best_score = score;
                best_class = c;
            }
        }

        if best_score < confidence_floor {
            continue;
        }

        let bbox = BoundingBox::new(
            (cx - w / 2.0) * scale_w,
            (cy - h / 2.0) * scale_h,
            (cx + w / 2.0) * scale_w,
            (cy + h / 2.0) * scale_h,
        )
        .clamp_to(orig_width, orig_height);

        let label = COCO_CLASSES.get(best_class).copied().unwrap_or("unknown");
        candidates.push(Detection::new(bbox, best_score, label));
    }

    Ok(candidates)
}

/// Class-aware non-maximum suppression: within each class, drop any box
/// whose IoU with a higher-confidence kept box exceeds the threshold.
pub fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].label != detections[j].label {
                continue;
            }
            if detections[i].bbox.iou(&detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a feature-major [84, N] buffer from candidate tuples of
    /// (cx, cy, w, h, class, score) in model coordinates.
    fn raw_output(boxes: &[(f32, f32, f32, f32, usize, f32)]) -> Vec<f32> {
        let n = boxes.len();
        let mut raw = vec![0.0f32; NUM_FEATURES * n];
        for (i, &(cx, cy, w, h, class, score)) in boxes.iter().enumerate() {
            raw[i] = cx;
            raw[n + i] = cy;
            raw[2 * n + i] = w;
            raw[3 * n + i] = h;
            raw[(4 + class) * n + i] = score;
        }
        raw
    }

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES[0], "person");
        assert_eq!(COCO_CLASSES[2], "car");
        assert_eq!(COCO_CLASSES.len(), 80);
    }

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.input_size, 640);
        assert!((config.confidence_floor - 0.25).abs() < 0.001);
        assert!((config.nms_threshold - 0.45).abs() < 0.001);
    }

    #[test]
    fn missing_model_is_reported() {
        let config = DetectorConfig {
            model_path: "/nonexistent/model.onnx".to_string(),
            ..DetectorConfig::default()
        };
        assert!(matches!(
            OnnxPersonDetector::new(config),
            Err(VisionError::ModelNotFound(_))
        ));
    }

    #[test]
    fn decode_scales_boxes_to_source_pixels() {
        // 1280x720 source, 640 model input: scale_w = 2.0, scale_h = 1.125
        let raw = raw_output(&[
            (320.0, 320.0, 64.0, 128.0, 0, 0.9),
            (100.0, 100.0, 10.0, 10.0, 2, 0.5),
        ]);
        let detections = decode_predictions(&raw, 0.25, 640, 1280, 720).unwrap();

        assert_eq!(detections.len(), 2);
        let person = &detections[0];
        assert_eq!(person.label, "person");
        assert!((person.bbox.x1 - 576.0).abs() < 0.01);
        assert!((person.bbox.x2 - 704.0).abs() < 0.01);
        assert!((person.bbox.y1 - 288.0).abs() < 0.01);
        assert!((person.bbox.y2 - 432.0).abs() < 0.01);
        assert_eq!(detections[1].label, "car");
    }

    #[test]
    fn decode_drops_low_confidence_candidates() {
        let raw = raw_output(&[
            (320.0, 320.0, 64.0, 64.0, 0, 0.9),
            (100.0, 100.0, 10.0, 10.0, 0, 0.1),
        ]);
        let detections = decode_predictions(&raw, 0.25, 640, 640, 640).unwrap();
        assert_eq!(detections.len(), 1);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn decode_clamps_boxes_to_frame() {
        // Box hanging off the left/top edge.
        let raw = raw_output(&[(10.0, 10.0, 100.0, 100.0, 0, 0.8)]);
        let detections = decode_predictions(&raw, 0.25, 640, 640, 640).unwrap();
        let bbox = detections[0].bbox;
        assert_eq!(bbox.x1, 0.0);
        assert_eq!(bbox.y1, 0.0);
        assert!(bbox.x2 > 0.0);
    }

    #[test]
    fn decode_rejects_malformed_output() {
        assert!(decode_predictions(&[0.0; 83], 0.25, 640, 640, 640).is_err());
        assert!(decode_predictions(&[], 0.25, 640, 640, 640).is_err());
    }

    #[test]
    fn nms_suppresses_overlapping_same_class() {
        let a = Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9, "person");
        let b = Detection::new(BoundingBox::new(5.0, 5.0, 105.0, 105.0), 0.7, "person");
        let kept = non_maximum_suppression(vec![b, a], 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn nms_keeps_overlapping_different_classes() {
        let a = Detection::new(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9, "person");
        let b = Detection::new(BoundingBox::new(5.0, 5.0, 105.0, 105.0), 0.7, "dog");
        let kept = non_maximum_suppression(vec![a, b], 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn nms_keeps_disjoint_same_class() {
        let a = Detection::new(BoundingBox::new(0.0, 0.0, 50.0, 50.0), 0.9, "person");
        let b = Detection::new(BoundingBox::new(200.0, 200.0, 250.0, 250.0), 0.8, "person");
        let kept = non_maximum_suppression(vec![a, b], 0.45);
        assert_eq!(kept.len(), 2);
    }
}
