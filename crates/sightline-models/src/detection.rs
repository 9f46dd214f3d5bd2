//! Person detection models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Class label for person detections.
pub const PERSON_LABEL: &str = "person";

/// An axis-aligned bounding box in source-frame pixel coordinates.
///
/// Corners are stored as `(x1, y1)` top-left and `(x2, y2)` bottom-right,
/// already clamped to the frame dimensions by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner
    pub x1: f32,
    /// Y coordinate of the top-left corner
    pub y1: f32,
    /// X coordinate of the bottom-right corner
    pub x2: f32,
    /// Y coordinate of the bottom-right corner
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp the box to `width` x `height` frame bounds.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width as f32),
            y1: self.y1.clamp(0.0, height as f32),
            x2: self.x2.clamp(0.0, width as f32),
            y2: self.y2.clamp(0.0, height as f32),
        }
    }

    /// Intersection-over-union with another box. Returns 0.0 for
    /// degenerate boxes or disjoint pairs.
    pub fn iou(&self, other: &Self) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let iw = (ix2 - ix1).max(0.0);
        let ih = (iy2 - iy1).max(0.0);
        let intersection = iw * ih;

        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// A single object detection within one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Location of the detected object in pixel coordinates
    pub bbox: BoundingBox,

    /// Model confidence in [0.0, 1.0]
    pub confidence: f32,

    /// Source class label (e.g. "person")
    pub label: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, label: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            label: label.into(),
        }
    }

    /// Whether this is a person detection.
    pub fn is_person(&self) -> bool {
        self.label == PERSON_LABEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_dimensions() {
        let bbox = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 50.0);
        assert_eq!(bbox.area(), 5000.0);
    }

    #[test]
    fn degenerate_box_has_zero_area() {
        let bbox = BoundingBox::new(50.0, 50.0, 40.0, 40.0);
        assert_eq!(bbox.width(), 0.0);
        assert_eq!(bbox.area(), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!((bbox.iou(&bbox) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // intersection 50, union 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn clamp_keeps_box_inside_frame() {
        let bbox = BoundingBox::new(-5.0, -5.0, 700.0, 500.0).clamp_to(640, 480);
        assert_eq!(bbox.x1, 0.0);
        assert_eq!(bbox.y1, 0.0);
        assert_eq!(bbox.x2, 640.0);
        assert_eq!(bbox.y2, 480.0);
    }

    #[test]
    fn person_label_check() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(Detection::new(bbox, 0.9, PERSON_LABEL).is_person());
        assert!(!Detection::new(bbox, 0.9, "car").is_person());
    }
}
