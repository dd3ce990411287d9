//! Full-layer classification: is the topmost surviving layer complete?
//!
//! The verdict drives strategy selection downstream, and a wrong
//! verdict is the dominant production failure mode, so the numeric
//! evidence (coverage, gap regularity) is part of the contract rather
//! than optional telemetry.

use serde::{Deserialize, Serialize};

use crate::config::ClassifyConfig;
use crate::geometry::{self, BoundingBox};
use crate::layer::{self, Layer};
use crate::template::PileTemplate;

/// Why the top layer was classified the way it was. Exactly one reason
/// is attached to every verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    /// Coverage and spacing regularity both cleared their thresholds.
    FullByCoverage,
    /// The union of top-layer boxes spans too little of the ROI width.
    PartialLowCoverage,
    /// Coverage was sufficient but box spacing is irregular, consistent
    /// with cartons missing mid-row.
    PartialIrregularSpacing,
}

/// Numeric evidence behind a verdict, with the thresholds applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    /// Fraction of the ROI width covered by the top layer's boxes.
    pub coverage: f32,
    /// Coefficient of variation of horizontal gaps between adjacent
    /// boxes; 0.0 when fewer than two gaps exist.
    pub gap_cv: f32,
    /// Coefficient of variation of box widths. Diagnostic only; not
    /// part of the classification rule.
    pub width_cv: f32,
    pub coverage_threshold: f32,
    pub cv_gap_threshold: f32,
}

/// Snapshot of the evaluated top layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopLayerSummary {
    /// Index of the evaluated layer (0 after re-indexing).
    pub index: usize,
    /// Template's expected carton count for this tier.
    pub expected: u32,
    /// Boxes observed after height filtering.
    pub observed: usize,
    /// Boxes excluded as occluded slivers by the height filter.
    pub n_height_filtered: usize,
}

/// Classification of the topmost surviving layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerVerdict {
    pub is_full: bool,
    pub reason: VerdictReason,
    pub top_layer: TopLayerSummary,
    pub metrics: CoverageMetrics,
}

/// Strategy seam for full-layer classification.
///
/// The production implementation is [`CoverageClassifier`]; alternate
/// implementations can be injected into the processor at construction
/// time for evaluation against recorded scenes.
pub trait FullLayerClassifier: Send + Sync {
    /// Assess the top layer of `layers` (ordered top-to-bottom,
    /// non-empty) against the pile template and scene ROI.
    fn assess(&self, layers: &[Layer], template: &PileTemplate, roi: &BoundingBox) -> LayerVerdict;
}

/// Coverage-and-regularity classifier.
///
/// A layer is full when its boxes cover enough of the ROI width and
/// are evenly spaced: residual gaps in a genuinely complete tier are
/// systematic packing slack, while missing cartons leave irregular
/// holes.
#[derive(Debug, Clone, Default)]
pub struct CoverageClassifier {
    config: ClassifyConfig,
}

impl CoverageClassifier {
    pub fn new(config: ClassifyConfig) -> Self {
        Self { config }
    }
}

impl FullLayerClassifier for CoverageClassifier {
    fn assess(&self, layers: &[Layer], template: &PileTemplate, roi: &BoundingBox) -> LayerVerdict {
        let cfg = &self.config;
        let empty_verdict = |reason| LayerVerdict {
            is_full: false,
            reason,
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
                coverage_threshold: cfg.coverage_threshold,
                cv_gap_threshold: cfg.cv_gap_threshold,
            },
        };

        debug_assert!(!layers.is_empty(), "guarded by scene preparation");
        let Some(top) = layers.first() else {
            return empty_verdict(VerdictReason::PartialLowCoverage);
        };

        let boxes = filter_by_height(&top.boxes, cfg.height_filter_ratio);
        let n_height_filtered = top.box_count() - boxes.len();
        if n_height_filtered > 0 {
            tracing::debug!(
                n_before = top.box_count(),
                n_after = boxes.len(),
                "height filter removed occluded slivers from top layer"
            );
        }

        let coverage = layer::coverage_ratio(&boxes, roi);
        let gap_cv = gap_cv(&boxes);
        let width_cv = width_cv(&boxes);

        let (is_full, reason) = if coverage < cfg.coverage_threshold {
            (false, VerdictReason::PartialLowCoverage)
        } else if gap_cv > cfg.cv_gap_threshold {
            (false, VerdictReason::PartialIrregularSpacing)
        } else {
            (true, VerdictReason::FullByCoverage)
        };

        // The top layer's template entry sits at the top of the
        // bottom-first layer_counts list.
        let expected = template
            .layer_counts
            .get(layers.len().saturating_sub(1))
            .or_else(|| template.layer_counts.last())
            .copied()
            .unwrap_or(0);

        tracing::info!(
            is_full,
            reason = ?reason,
            coverage,
            gap_cv,
            observed = boxes.len(),
            expected,
            "top layer classified"
        );

        LayerVerdict {
            is_full,
            reason,
            top_layer: TopLayerSummary {
                index: top.index,
                expected,
                observed: boxes.len(),
                n_height_filtered,
            },
            metrics: CoverageMetrics {
                coverage,
                gap_cv,
                width_cv,
                coverage_threshold: cfg.coverage_threshold,
                cv_gap_threshold: cfg.cv_gap_threshold,
            },
        }
    }
}

/// Drop boxes shorter than `ratio` times the tallest box.
fn filter_by_height(boxes: &[BoundingBox], ratio: f32) -> Vec<BoundingBox> {
    let max_height = boxes
        .iter()
        .map(BoundingBox::height)
        .fold(f32::NEG_INFINITY, f32::max);
    if !max_height.is_finite() {
        return Vec::new();
    }
    let threshold = ratio * max_height;
    boxes
        .iter()
        .filter(|b| b.height() >= threshold)
        .copied()
        .collect()
}

/// Coefficient of variation of gaps between adjacent box centers,
/// sorted left-to-right. Fewer than two gaps is vacuously regular.
fn gap_cv(boxes: &[BoundingBox]) -> f32 {
    if boxes.len() < 3 {
        return 0.0;
    }
    let mut centers: Vec<f32> = boxes.iter().map(BoundingBox::center_x).collect();
    centers.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let gaps: Vec<f32> = centers.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = geometry::mean(&gaps);
    if mean <= 0.0 {
        return 0.0;
    }
    geometry::std_dev(&gaps) / mean
}

/// Coefficient of variation of box widths.
fn width_cv(boxes: &[BoundingBox]) -> f32 {
    if boxes.len() < 2 {
        return 0.0;
    }
    let widths: Vec<f32> = boxes.iter().map(BoundingBox::width).collect();
    let mean = geometry::mean(&widths);
    if mean <= 0.0 {
        return 0.0;
    }
    geometry::std_dev(&widths) / mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use approx::assert_relative_eq;

    fn roi() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 100.0, 100.0)
    }

    fn template(counts: &[u32]) -> PileTemplate {
        PileTemplate {
            pile_id: 1,
            name: "test".to_string(),
            layer_counts: counts.to_vec(),
        }
    }

    fn layer_from(boxes: Vec<BoundingBox>) -> Layer {
        Layer::from_boxes(0, boxes, &roi())
    }

    /// `n` boxes of width `w`, evenly spaced across the 100px ROI.
    fn even_row(n: usize, w: f32) -> Vec<BoundingBox> {
        let pitch = 100.0 / n as f32;
        (0..n)
            .map(|i| {
                let x = i as f32 * pitch + 0.5 * (pitch - w);
                BoundingBox::new(x, 10.0, x + w, 30.0)
            })
            .collect()
    }

    fn classifier() -> CoverageClassifier {
        CoverageClassifier::default()
    }

    #[test]
    fn dense_even_row_is_full() {
        let layers = vec![layer_from(even_row(10, 9.0))];
        let v = classifier().assess(&layers, &template(&[10]), &roi());
        assert!(v.is_full);
        assert_eq!(v.reason, VerdictReason::FullByCoverage);
        assert!(v.metrics.coverage >= 0.85);
        assert!(v.metrics.gap_cv <= 0.4);
        assert_eq!(v.top_layer.observed, 10);
    }

    #[test]
    fn sparse_row_is_partial_low_coverage() {
        let layers = vec![layer_from(even_row(5, 9.0))];
        let v = classifier().assess(&layers, &template(&[10]), &roi());
        assert!(!v.is_full);
        assert_eq!(v.reason, VerdictReason::PartialLowCoverage);
        assert!(v.metrics.coverage < 0.85);
    }

    #[test]
    fn wide_but_irregular_row_is_partial_irregular() {
        // Overlapping wide detections keep coverage high while the box
        // centers bunch up at one end: full-looking footprint, but the
        // spacing says cartons are missing mid-row.
        let boxes = vec![
            BoundingBox::new(0.0, 10.0, 50.0, 30.0),
            BoundingBox::new(10.0, 10.0, 60.0, 30.0),
            BoundingBox::new(55.0, 10.0, 90.0, 30.0),
            BoundingBox::new(85.0, 10.0, 95.0, 30.0),
            BoundingBox::new(94.0, 10.0, 100.0, 30.0),
        ];
        let layers = vec![layer_from(boxes)];
        let v = classifier().assess(&layers, &template(&[5]), &roi());
        assert!(!v.is_full);
        assert_eq!(v.reason, VerdictReason::PartialIrregularSpacing);
        assert!(v.metrics.coverage >= 0.85);
        assert!(v.metrics.gap_cv > 0.4);
    }

    #[test]
    fn coverage_never_decreases_with_more_even_boxes() {
        let mut prev = 0.0;
        for n in 2..=10 {
            let layers = vec![layer_from(even_row(n, 8.0))];
            let v = classifier().assess(&layers, &template(&[10]), &roi());
            assert!(
                v.metrics.coverage >= prev - 1e-6,
                "coverage dropped at n={}",
                n
            );
            prev = v.metrics.coverage;
        }
    }

    #[test]
    fn single_box_layer_has_zero_gap_cv() {
        let layers = vec![layer_from(vec![BoundingBox::new(0.0, 10.0, 30.0, 30.0)])];
        let v = classifier().assess(&layers, &template(&[1]), &roi());
        assert_relative_eq!(v.metrics.gap_cv, 0.0);
        assert_eq!(v.reason, VerdictReason::PartialLowCoverage);
    }

    #[test]
    fn occluded_slivers_are_height_filtered() {
        let mut boxes = even_row(9, 9.0);
        // A half-visible carton peeking over the layer edge.
        boxes.push(BoundingBox::new(40.0, 25.0, 49.0, 30.0));
        let layers = vec![layer_from(boxes)];
        let v = classifier().assess(&layers, &template(&[10]), &roi());
        assert_eq!(v.top_layer.n_height_filtered, 1);
        assert_eq!(v.top_layer.observed, 9);
    }

    #[test]
    fn expected_count_follows_surviving_depth() {
        let boxes = even_row(4, 9.0);
        let top = Layer::from_boxes(0, boxes.clone(), &roi());
        let lower = Layer::from_boxes(1, boxes, &roi());
        let v = classifier().assess(&[top, lower], &template(&[10, 8]), &roi());
        // Two surviving layers: the top tier's entry is the second one.
        assert_eq!(v.top_layer.expected, 8);
    }

    #[test]
    fn verdict_json_roundtrip() {
        let layers = vec![layer_from(even_row(10, 9.0))];
        let v = classifier().assess(&layers, &template(&[10]), &roi());
        let json = serde_json::to_string(&v).unwrap();
        let back: LayerVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
