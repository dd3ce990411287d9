//! Scene preparation: confidence filtering and ROI establishment.

use serde::{Deserialize, Serialize};

use crate::config::SceneConfig;
use crate::detection::Detection;
use crate::error::PipelineError;
use crate::geometry::{self, BoundingBox};

/// How the scene's region of interest was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoiSource {
    /// A pile-outline detection bounded the stack.
    PileDetection,
    /// No pile outline survived; the hull of the carton boxes was used.
    CartonHull,
}

/// Validated scene: the stack ROI and the carton boxes inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedScene {
    /// Region of interest bounding the stack. Area is always > 0.
    pub roi: BoundingBox,
    /// Carton boxes that cleared confidence and ROI-overlap filtering.
    pub boxes: Vec<BoundingBox>,
    /// How the ROI was established.
    pub roi_source: RoiSource,
    /// Raw detections handed in.
    pub n_input: usize,
    /// Detections that cleared the confidence threshold.
    pub n_confident: usize,
}

/// Filter raw detections and establish the stack ROI.
///
/// Pure function over its inputs: discards low-confidence and
/// degenerate detections, derives the ROI from the best pile-outline
/// detection (falling back to the carton hull), and keeps the carton
/// boxes that substantially overlap the ROI.
pub fn prepare(
    detections: &[Detection],
    config: &SceneConfig,
) -> Result<PreparedScene, PipelineError> {
    let n_input = detections.len();

    let confident: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.confidence >= config.confidence_threshold && d.bbox.is_valid())
        .collect();
    let n_confident = confident.len();

    let cartons: Vec<BoundingBox> = confident
        .iter()
        .filter(|d| d.label == config.carton_label)
        .map(|d| d.bbox)
        .collect();

    // Highest-confidence pile outline wins when several are present.
    let pile = confident
        .iter()
        .filter(|d| d.label == config.pile_label)
        .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap());

    let no_pile = || PipelineError::NoPileDetected {
        n_detections: n_input,
        n_confident,
    };

    let (roi, roi_source) = match pile {
        Some(p) => (p.bbox, RoiSource::PileDetection),
        None => {
            let hull = geometry::hull(&cartons).ok_or_else(|| no_pile())?;
            (hull, RoiSource::CartonHull)
        }
    };

    if roi.area() <= 0.0 {
        return Err(no_pile());
    }

    let boxes: Vec<BoundingBox> = cartons
        .into_iter()
        .filter(|b| b.intersection_area(&roi) >= config.min_roi_overlap * b.area())
        .collect();

    if boxes.is_empty() {
        tracing::warn!(
            n_input,
            n_confident,
            "no carton box overlaps the pile ROI"
        );
        return Err(no_pile());
    }

    tracing::debug!(
        n_input,
        n_confident,
        n_boxes = boxes.len(),
        roi_source = ?roi_source,
        "scene prepared"
    );

    Ok(PreparedScene {
        roi,
        boxes,
        roi_source,
        n_input,
        n_confident,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carton(x: f32, y: f32, conf: f32) -> Detection {
        Detection::new("carton", conf, BoundingBox::new(x, y, x + 10.0, y + 10.0))
    }

    fn pile(bbox: BoundingBox, conf: f32) -> Detection {
        Detection::new("pile", conf, bbox)
    }

    #[test]
    fn roi_comes_from_pile_detection_when_present() {
        let dets = vec![
            pile(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9),
            carton(10.0, 10.0, 0.9),
        ];
        let scene = prepare(&dets, &SceneConfig::default()).expect("scene");
        assert_eq!(scene.roi_source, RoiSource::PileDetection);
        assert_eq!(scene.roi, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(scene.boxes.len(), 1);
    }

    #[test]
    fn roi_falls_back_to_carton_hull() {
        let dets = vec![carton(0.0, 0.0, 0.9), carton(40.0, 20.0, 0.9)];
        let scene = prepare(&dets, &SceneConfig::default()).expect("scene");
        assert_eq!(scene.roi_source, RoiSource::CartonHull);
        assert_eq!(scene.roi, BoundingBox::new(0.0, 0.0, 50.0, 30.0));
        assert_eq!(scene.boxes.len(), 2);
    }

    #[test]
    fn low_confidence_detections_are_discarded() {
        let dets = vec![carton(0.0, 0.0, 0.9), carton(40.0, 0.0, 0.3)];
        let scene = prepare(&dets, &SceneConfig::default()).expect("scene");
        assert_eq!(scene.n_confident, 1);
        assert_eq!(scene.boxes.len(), 1);
    }

    #[test]
    fn all_below_threshold_is_no_pile() {
        let dets = vec![carton(0.0, 0.0, 0.2), carton(20.0, 0.0, 0.5)];
        let err = prepare(&dets, &SceneConfig::default()).expect_err("no pile");
        assert_eq!(
            err,
            PipelineError::NoPileDetected {
                n_detections: 2,
                n_confident: 0
            }
        );
    }

    #[test]
    fn empty_input_is_no_pile() {
        let err = prepare(&[], &SceneConfig::default()).expect_err("no pile");
        assert!(matches!(err, PipelineError::NoPileDetected { .. }));
    }

    #[test]
    fn cartons_outside_the_roi_are_background() {
        let dets = vec![
            pile(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9),
            carton(10.0, 10.0, 0.9),
            // Far outside the pile outline.
            carton(300.0, 10.0, 0.9),
        ];
        let scene = prepare(&dets, &SceneConfig::default()).expect("scene");
        assert_eq!(scene.boxes.len(), 1);
        assert_eq!(scene.boxes[0], BoundingBox::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn pile_outline_with_no_cartons_inside_is_no_pile() {
        let dets = vec![
            pile(BoundingBox::new(0.0, 0.0, 100.0, 100.0), 0.9),
            carton(300.0, 10.0, 0.9),
        ];
        assert!(prepare(&dets, &SceneConfig::default()).is_err());
    }

    #[test]
    fn degenerate_boxes_are_discarded() {
        let dets = vec![Detection::new(
            "carton",
            0.9,
            BoundingBox::new(10.0, 10.0, 10.0, 20.0),
        )];
        assert!(prepare(&dets, &SceneConfig::default()).is_err());
    }

    #[test]
    fn unrelated_labels_are_ignored() {
        let dets = vec![
            carton(0.0, 0.0, 0.9),
            Detection::new("person", 0.99, BoundingBox::new(0.0, 0.0, 50.0, 50.0)),
        ];
        let scene = prepare(&dets, &SceneConfig::default()).expect("scene");
        assert_eq!(scene.roi_source, RoiSource::CartonHull);
        assert_eq!(scene.boxes.len(), 1);
    }
}
