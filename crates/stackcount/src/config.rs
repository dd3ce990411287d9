//! Per-stage pipeline configuration.
//!
//! Every policy threshold in the pipeline lives here rather than as a
//! hardcoded constant, because the dominant failure mode in production
//! is a misclassified top layer and operators tune these values against
//! representative scenes.

use serde::{Deserialize, Serialize};

/// Scene preparation controls (confidence filter + ROI establishment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Minimum detector confidence for a detection to be considered.
    pub confidence_threshold: f32,
    /// Detector class label for carton boxes.
    pub carton_label: String,
    /// Detector class label for the pile outline detection.
    pub pile_label: String,
    /// Minimum fraction of a carton box's area that must overlap the
    /// ROI; boxes below this are background and discarded.
    pub min_roi_overlap: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.65,
            carton_label: "carton".to_string(),
            pile_label: "pile".to_string(),
            min_roi_overlap: 0.5,
        }
    }
}

/// Which clustering variant the pipeline runs.
///
/// `BoxRoiConstrained` is the production path; the other two exist so
/// clustering errors can be isolated stage-by-stage and must stay
/// independently invocable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterVariant {
    /// Vertical-gap split only.
    Basic,
    /// Gap split plus rejection of boxes mostly outside the ROI.
    RoiConstrained,
    /// ROI rejection plus a dynamic footprint built from accepted boxes.
    #[default]
    BoxRoiConstrained,
}

/// Layer clustering controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Clustering variant to run.
    pub variant: ClusterVariant,
    /// Vertical split threshold as a fraction of the median box height.
    /// Adaptive rather than a fixed pixel constant so the split
    /// tolerates scale variation across camera distances.
    pub gap_ratio: f32,
    /// Minimum fraction of a box's width that must overlap the ROI
    /// horizontally (ROI-constrained and box-ROI-constrained variants).
    pub min_roi_x_overlap: f32,
    /// Maximum horizontal gap between a box and the running footprint
    /// of accepted boxes, as a multiple of the box's own width
    /// (box-ROI-constrained variant only). Wide enough to bridge a
    /// single missed detection mid-row, narrow enough to reject a
    /// detached foreground object.
    pub footprint_margin_ratio: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            variant: ClusterVariant::default(),
            gap_ratio: 0.6,
            min_roi_x_overlap: 0.5,
            footprint_margin_ratio: 1.5,
        }
    }
}

/// Layer filtering controls (fake top layer, rear-face duplicates).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerFilterConfig {
    /// Layer 0 is a detection artifact when its box count is below this
    /// fraction of layer 1's box count...
    pub fake_count_ratio: f32,
    /// ...and its coverage ratio is below this bound.
    pub fake_min_coverage: f32,
    /// Rear-box filtering skips layers with this many boxes or fewer.
    pub rear_min_boxes: usize,
    /// A layer holds a distinct rear row when the spread of its boxes'
    /// vertical centers exceeds this fraction of the median box height.
    pub rear_spread_ratio: f32,
}

impl Default for LayerFilterConfig {
    fn default() -> Self {
        Self {
            fake_count_ratio: 0.3,
            fake_min_coverage: 0.4,
            rear_min_boxes: 3,
            rear_spread_ratio: 0.35,
        }
    }
}

/// Full-layer classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Minimum top-layer coverage ratio for a "full" verdict.
    pub coverage_threshold: f32,
    /// Maximum coefficient of variation of horizontal gaps for a
    /// "full" verdict.
    pub cv_gap_threshold: f32,
    /// Top-layer boxes shorter than this fraction of the tallest box in
    /// the layer are excluded from the metrics (occluded slivers).
    pub height_filter_ratio: f32,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.85,
            cv_gap_threshold: 0.4,
            height_filter_ratio: 0.5,
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Scene preparation controls.
    pub scene: SceneConfig,
    /// Layer clustering controls.
    pub cluster: ClusterConfig,
    /// Layer filtering controls.
    pub layer_filter: LayerFilterConfig,
    /// Full-layer classification thresholds.
    pub classify: ClassifyConfig,
}
