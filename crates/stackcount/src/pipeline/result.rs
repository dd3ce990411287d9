//! Externally visible pipeline output.

use serde::{Deserialize, Serialize};

use crate::classify::LayerVerdict;
use crate::count::{CountStrategy, LayerCount};
use crate::geometry::BoundingBox;

/// Final result of one stack counting invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Pile type the count was computed against.
    pub pile_id: u32,
    /// Total cartons in the stack.
    pub total_count: u32,
    /// Strategy that produced the total.
    pub strategy: CountStrategy,
    /// Top-layer classification with its numeric evidence.
    pub verdict: LayerVerdict,
    /// Per-layer contribution breakdown, topmost first.
    pub per_layer: Vec<LayerCount>,
    /// Raw detections handed to the pipeline.
    pub n_detections_in: usize,
    /// Layers surviving clustering and filtering.
    pub n_layers: usize,
    /// Region of interest the metrics were computed against.
    pub roi: BoundingBox,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CoverageMetrics, TopLayerSummary, VerdictReason};
    use crate::count::CountSource;

    #[test]
    fn result_json_roundtrip() {
        let result = ProcessingResult {
            pile_id: 3,
            total_count: 28,
            strategy: CountStrategy::Full,
            verdict: LayerVerdict {
                is_full: true,
                reason: VerdictReason::FullByCoverage,
                top_layer: TopLayerSummary {
                    index: 0,
                    expected: 8,
                    observed: 8,
                    n_height_filtered: 0,
                },
                metrics: CoverageMetrics {
                    coverage: 0.92,
                    gap_cv: 0.1,
                    width_cv: 0.05,
                    coverage_threshold: 0.85,
                    cv_gap_threshold: 0.4,
                },
            },
            per_layer: vec![LayerCount {
                layer_index: 0,
                observed: 8,
                counted: 8,
                source: CountSource::Template,
            }],
            n_detections_in: 9,
            n_layers: 1,
            roi: BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        };

        let json = serde_json::to_string_pretty(&result).unwrap();
        let back: ProcessingResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
