//! Raw object-detector output records.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

/// One detection produced by the upstream object detector.
///
/// The pipeline consumes these read-only; it never runs detection itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class label, e.g. `"carton"` or `"pile"`.
    pub label: String,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Axis-aligned box in image pixel coordinates.
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_json_roundtrip() {
        let det = Detection::new("carton", 0.91, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_string(&det).unwrap();
        let back: Detection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, det);
    }
}
