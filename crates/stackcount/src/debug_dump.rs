//! Versioned per-stage diagnostic dump.
//!
//! Misclassification debugging is a first-class use case: when an
//! operator disputes a count, every stage's intermediate artifact must
//! be inspectable offline. The schema reuses production pipeline
//! structures wherever possible; debug-only structs are limited to
//! stage bookkeeping.

use serde::{Deserialize, Serialize};

use crate::classify::LayerVerdict;
use crate::cluster::ClusterOutcome;
use crate::config::{ClusterVariant, ProcessConfig};
use crate::count::{CountStrategy, LayerCount};
use crate::geometry::BoundingBox;
use crate::layer::Layer;
use crate::layer_filter::LayerRemoval;
use crate::scene::RoiSource;

pub const DEBUG_SCHEMA_V1: &str = "stackcount.debug.v1";

/// Complete diagnostic trace of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugDump {
    pub schema_version: String,
    pub pile_id: u32,
    /// Configuration snapshot the stages ran with.
    pub config: ProcessConfig,
    pub stages: StagesDebug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagesDebug {
    pub stage0_scene: SceneDebug,
    pub stage1_cluster: ClusterDebug,
    pub stage2_layer_filter: LayerFilterDebug,
    pub stage3_classify: ClassifyDebug,
    pub stage4_count: CountDebug,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDebug {
    pub n_input: usize,
    pub n_confident: usize,
    pub n_in_roi: usize,
    pub roi: BoundingBox,
    pub roi_source: RoiSource,
    /// Carton boxes that entered clustering.
    pub boxes: Vec<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterDebug {
    pub variant: ClusterVariant,
    pub split_threshold_px: f32,
    pub n_boxes_in: usize,
    pub n_rejected: usize,
    pub layers: Vec<Layer>,
}

impl ClusterDebug {
    pub(crate) fn from_outcome(variant: ClusterVariant, outcome: &ClusterOutcome) -> Self {
        Self {
            variant,
            split_threshold_px: outcome.split_threshold_px,
            n_boxes_in: outcome.n_boxes_in,
            n_rejected: outcome.n_rejected,
            layers: outcome.layers.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFilterDebug {
    /// The dropped fake top layer, when that check fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fake_top_dropped: Option<Layer>,
    /// Rear-face boxes removed per layer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rear_removed: Vec<LayerRemoval>,
    /// Layers after both filters, re-indexed.
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyDebug {
    pub verdict: LayerVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountDebug {
    pub strategy: CountStrategy,
    pub total: u32,
    pub per_layer: Vec<LayerCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CoverageMetrics, TopLayerSummary, VerdictReason};

    #[test]
    fn debug_dump_json_roundtrip_minimal() {
        let roi = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let dump = DebugDump {
            schema_version: DEBUG_SCHEMA_V1.to_string(),
            pile_id: 1,
            config: ProcessConfig::default(),
            stages: StagesDebug {
                stage0_scene: SceneDebug {
                    n_input: 0,
                    n_confident: 0,
                    n_in_roi: 0,
                    roi,
                    roi_source: RoiSource::CartonHull,
                    boxes: vec![],
                },
                stage1_cluster: ClusterDebug {
                    variant: ClusterVariant::BoxRoiConstrained,
                    split_threshold_px: 6.0,
                    n_boxes_in: 0,
                    n_rejected: 0,
                    layers: vec![],
                },
                stage2_layer_filter: LayerFilterDebug {
                    fake_top_dropped: None,
                    rear_removed: vec![],
                    layers: vec![],
                },
                stage3_classify: ClassifyDebug {
                    verdict: LayerVerdict {
                        is_full: false,
                        reason: VerdictReason::PartialLowCoverage,
                        top_layer: TopLayerSummary {
                            index: 0,
                            expected: 0,
                            observed: 0,
                            n_height_filtered: 0,
                        },
                        metrics: CoverageMetrics {
                            coverage: 0.0,
                            gap_cv: 0.0,
                            width_cv: 0.0,
                            coverage_threshold: 0.85,
                            cv_gap_threshold: 0.4,
                        },
                    },
                },
                stage4_count: CountDebug {
                    strategy: CountStrategy::Partial,
                    total: 0,
                    per_layer: vec![],
                },
            },
        };

        let s = serde_json::to_string_pretty(&dump).unwrap();
        let back: DebugDump = serde_json::from_str(&s).unwrap();
        assert_eq!(back.schema_version, DEBUG_SCHEMA_V1);
        assert_eq!(back, dump);
    }
}
