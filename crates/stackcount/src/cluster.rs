//! Layer clustering: grouping carton boxes into horizontal tiers.
//!
//! Boxes are sorted by vertical center and split into layers wherever
//! the gap between consecutive centers exceeds an adaptive threshold
//! derived from the median box height. Three variants share one
//! signature with increasing strictness of geometric constraint:
//!
//! 1. [`cluster_basic`] — gap-based split only.
//! 2. [`cluster_roi_constrained`] — additionally rejects boxes whose
//!    horizontal extent falls mostly outside the ROI.
//! 3. [`cluster_box_roi_constrained`] — additionally gates each layer
//!    band below the first on the running footprint of accepted boxes,
//!    so a foreground occluder cannot distort later layer boundaries.
//!
//! The box-ROI-constrained variant is the production path; the other
//! two stay independently invocable for diagnostic isolation of
//! clustering errors.

use serde::{Deserialize, Serialize};

use crate::config::{ClusterConfig, ClusterVariant};
use crate::geometry::{self, BoundingBox};
use crate::layer::Layer;

/// Result of one clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterOutcome {
    /// Layers ordered top-to-bottom; index 0 has the smallest center y.
    pub layers: Vec<Layer>,
    /// Boxes handed in.
    pub n_boxes_in: usize,
    /// Boxes rejected as noise by the variant's geometric constraints.
    pub n_rejected: usize,
    /// The adaptive vertical split threshold that was applied, in pixels.
    pub split_threshold_px: f32,
}

/// Adaptive vertical split threshold: `gap_ratio` times the median box
/// height of the scene.
pub fn split_threshold_px(boxes: &[BoundingBox], gap_ratio: f32) -> f32 {
    let heights: Vec<f32> = boxes.iter().map(BoundingBox::height).collect();
    gap_ratio * geometry::median(&heights)
}

/// Run the variant selected in `config`.
pub fn cluster_layers(
    boxes: &[BoundingBox],
    roi: &BoundingBox,
    config: &ClusterConfig,
) -> ClusterOutcome {
    match config.variant {
        ClusterVariant::Basic => cluster_basic(boxes, roi, config),
        ClusterVariant::RoiConstrained => cluster_roi_constrained(boxes, roi, config),
        ClusterVariant::BoxRoiConstrained => cluster_box_roi_constrained(boxes, roi, config),
    }
}

/// Gap-based splitting with no geometric rejection.
pub fn cluster_basic(
    boxes: &[BoundingBox],
    roi: &BoundingBox,
    config: &ClusterConfig,
) -> ClusterOutcome {
    let threshold = split_threshold_px(boxes, config.gap_ratio);
    let bands = split_into_bands(boxes.to_vec(), threshold);
    finish(bands, boxes.len(), threshold, roi)
}

/// Gap-based splitting after discarding boxes mostly outside the ROI.
pub fn cluster_roi_constrained(
    boxes: &[BoundingBox],
    roi: &BoundingBox,
    config: &ClusterConfig,
) -> ClusterOutcome {
    let candidates = filter_by_roi_x(boxes, roi, config.min_roi_x_overlap);
    let threshold = split_threshold_px(&candidates, config.gap_ratio);
    let bands = split_into_bands(candidates, threshold);
    finish(bands, boxes.len(), threshold, roi)
}

/// ROI-constrained splitting plus a dynamic footprint gate.
///
/// After band-splitting, the topmost band is accepted wholly and its
/// box x-extents seed a running footprint. Every later band grows into
/// that footprint greedily, nearest box first: a box joins when its
/// horizontal distance to the footprint is within
/// `footprint_margin_ratio` of its own width, and widens the footprint
/// for the boxes after it. A detached foreground object never gets
/// close enough to join, while a lower tier wider than a partial top
/// tier chains outward box by box. Bands emptied by the gate disappear
/// rather than forming bogus layers.
pub fn cluster_box_roi_constrained(
    boxes: &[BoundingBox],
    roi: &BoundingBox,
    config: &ClusterConfig,
) -> ClusterOutcome {
    let candidates = filter_by_roi_x(boxes, roi, config.min_roi_x_overlap);
    let threshold = split_threshold_px(&candidates, config.gap_ratio);
    let bands = split_into_bands(candidates, threshold);

    let mut footprint: Option<(f32, f32)> = None;
    let mut kept_bands: Vec<Vec<BoundingBox>> = Vec::with_capacity(bands.len());

    for band in bands {
        let accepted = match footprint {
            None => band,
            Some(fp) => grow_into_footprint(band, fp, config.footprint_margin_ratio),
        };

        for b in &accepted {
            footprint = Some(match footprint {
                None => (b.x_min, b.x_max),
                Some((fx_min, fx_max)) => (fx_min.min(b.x_min), fx_max.max(b.x_max)),
            });
        }

        if !accepted.is_empty() {
            kept_bands.push(accepted);
        }
    }

    finish(kept_bands, boxes.len(), threshold, roi)
}

/// Horizontal distance from `b` to the footprint interval; 0.0 when
/// they overlap.
fn footprint_gap(b: &BoundingBox, footprint: (f32, f32)) -> f32 {
    let (fx_min, fx_max) = footprint;
    (fx_min - b.x_max).max(b.x_min - fx_max).max(0.0)
}

/// Greedily accept band boxes nearest the footprint first, widening it
/// as they join. Boxes left over when no candidate is close enough are
/// rejected.
fn grow_into_footprint(
    band: Vec<BoundingBox>,
    seed: (f32, f32),
    margin_ratio: f32,
) -> Vec<BoundingBox> {
    let mut remaining = band;
    let mut accepted = Vec::with_capacity(remaining.len());
    let mut footprint = seed;

    while !remaining.is_empty() {
        let (best_idx, best_gap) = remaining
            .iter()
            .enumerate()
            .map(|(i, b)| (i, footprint_gap(b, footprint)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .expect("remaining is non-empty");

        if best_gap > margin_ratio * remaining[best_idx].width() {
            break;
        }

        let b = remaining.swap_remove(best_idx);
        footprint = (footprint.0.min(b.x_min), footprint.1.max(b.x_max));
        accepted.push(b);
    }

    accepted
}

fn filter_by_roi_x(boxes: &[BoundingBox], roi: &BoundingBox, min_frac: f32) -> Vec<BoundingBox> {
    boxes
        .iter()
        .filter(|b| b.x_overlap(roi) >= min_frac * b.width())
        .copied()
        .collect()
}

/// Sort by vertical center and cut wherever the gap between consecutive
/// centers exceeds `threshold`.
fn split_into_bands(mut boxes: Vec<BoundingBox>, threshold: f32) -> Vec<Vec<BoundingBox>> {
    boxes.sort_by(|a, b| a.center_y().partial_cmp(&b.center_y()).unwrap());

    let mut bands: Vec<Vec<BoundingBox>> = Vec::new();
    let mut current: Vec<BoundingBox> = Vec::new();
    let mut prev_center = f32::NEG_INFINITY;

    for b in boxes {
        let center = b.center_y();
        if !current.is_empty() && center - prev_center > threshold {
            bands.push(std::mem::take(&mut current));
        }
        prev_center = center;
        current.push(b);
    }
    if !current.is_empty() {
        bands.push(current);
    }
    bands
}

fn finish(
    bands: Vec<Vec<BoundingBox>>,
    n_boxes_in: usize,
    threshold: f32,
    roi: &BoundingBox,
) -> ClusterOutcome {
    let n_kept: usize = bands.iter().map(Vec::len).sum();
    let n_rejected = n_boxes_in - n_kept;

    let layers: Vec<Layer> = bands
        .into_iter()
        .enumerate()
        .map(|(index, band)| Layer::from_boxes(index, band, roi))
        .collect();

    if n_rejected > 0 {
        tracing::debug!(n_boxes_in, n_rejected, "clustering rejected noise boxes");
    }
    tracing::debug!(
        n_layers = layers.len(),
        split_threshold_px = threshold,
        "layers clustered"
    );

    ClusterOutcome {
        layers,
        n_boxes_in,
        n_rejected,
        split_threshold_px: threshold,
    }
}
