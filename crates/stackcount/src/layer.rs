//! Horizontal stack tiers produced by clustering.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, BoundingBox};

/// One horizontal tier of the carton stack.
///
/// Membership is fixed once clustering completes: later stages may drop
/// whole layers or individual boxes, but a box is never reassigned to a
/// different layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// 0 = visually topmost (smallest y), ascending downward.
    pub index: usize,
    /// Member carton boxes.
    pub boxes: Vec<BoundingBox>,
    /// Top of the layer's vertical extent.
    pub y_min: f32,
    /// Bottom of the layer's vertical extent.
    pub y_max: f32,
    /// Mean of the member boxes' vertical centers.
    pub center_y: f32,
    /// Fraction of the ROI width spanned by the union of member box
    /// x-extents, clamped to 1.0.
    pub coverage: f32,
}

impl Layer {
    /// Build a layer from member boxes, deriving extent and coverage
    /// against the scene ROI. `boxes` must be non-empty.
    pub(crate) fn from_boxes(index: usize, boxes: Vec<BoundingBox>, roi: &BoundingBox) -> Self {
        debug_assert!(!boxes.is_empty(), "layers are never built empty");

        let y_min = boxes.iter().map(|b| b.y_min).fold(f32::INFINITY, f32::min);
        let y_max = boxes
            .iter()
            .map(|b| b.y_max)
            .fold(f32::NEG_INFINITY, f32::max);
        let centers: Vec<f32> = boxes.iter().map(BoundingBox::center_y).collect();
        let center_y = geometry::mean(&centers);
        let coverage = coverage_ratio(&boxes, roi);

        Self {
            index,
            boxes,
            y_min,
            y_max,
            center_y,
            coverage,
        }
    }

    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }
}

/// Horizontal coverage of `boxes` against the ROI width, clamped to 1.0.
pub(crate) fn coverage_ratio(boxes: &[BoundingBox], roi: &BoundingBox) -> f32 {
    let roi_width = roi.width();
    if roi_width <= 0.0 || boxes.is_empty() {
        return 0.0;
    }
    (geometry::union_x_extent(boxes) / roi_width).min(1.0)
}

/// Re-number layers 0..n in their current order.
pub(crate) fn reindex(layers: &mut [Layer]) {
    for (i, layer) in layers.iter_mut().enumerate() {
        layer.index = i;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn roi() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn layer_derives_extent_and_center() {
        let boxes = vec![
            BoundingBox::new(0.0, 10.0, 20.0, 30.0),
            BoundingBox::new(25.0, 12.0, 45.0, 32.0),
        ];
        let layer = Layer::from_boxes(0, boxes, &roi());
        assert_relative_eq!(layer.y_min, 10.0);
        assert_relative_eq!(layer.y_max, 32.0);
        assert_relative_eq!(layer.center_y, 21.0);
        assert_eq!(layer.box_count(), 2);
    }

    #[test]
    fn coverage_counts_union_not_sum() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 60.0, 10.0),
            BoundingBox::new(40.0, 0.0, 80.0, 10.0),
        ];
        let layer = Layer::from_boxes(0, boxes, &roi());
        assert_relative_eq!(layer.coverage, 0.8);
    }

    #[test]
    fn coverage_clamps_to_one() {
        let boxes = vec![BoundingBox::new(-10.0, 0.0, 120.0, 10.0)];
        assert_relative_eq!(coverage_ratio(&boxes, &roi()), 1.0);
    }

    #[test]
    fn reindex_renumbers_in_order() {
        let mut layers = vec![
            Layer::from_boxes(5, vec![BoundingBox::new(0.0, 0.0, 10.0, 10.0)], &roi()),
            Layer::from_boxes(9, vec![BoundingBox::new(0.0, 20.0, 10.0, 30.0)], &roi()),
        ];
        reindex(&mut layers);
        assert_eq!(layers[0].index, 0);
        assert_eq!(layers[1].index, 1);
    }
}
