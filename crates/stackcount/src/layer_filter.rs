//! Layer filtering: removal of detection artifacts after clustering.
//!
//! Two independent policies. Neither ever fails: a layer legitimately
//! reduced to zero members is dropped rather than passed downstream.

use serde::{Deserialize, Serialize};

use crate::config::LayerFilterConfig;
use crate::geometry::{self, BoundingBox};
use crate::layer::{self, Layer};

/// Result of the fake-top-layer check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeTopOutcome {
    /// Surviving layers, re-indexed.
    pub layers: Vec<Layer>,
    /// The dropped top layer, when the check fired.
    pub dropped: Option<Layer>,
}

/// Boxes removed from one layer by rear-box filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRemoval {
    pub layer_index: usize,
    pub n_removed: usize,
}

/// Result of rear-box filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RearFilterOutcome {
    /// Surviving layers, re-indexed, with coverage recomputed.
    pub layers: Vec<Layer>,
    /// Per-layer removal counts (only layers that lost boxes).
    pub removed: Vec<LayerRemoval>,
}

/// Drop layer 0 when it is detection noise rather than a real tier.
///
/// A stray reflection or an adjacent unrelated object above the stack
/// shows up as a sparse, narrow top layer. The check fires only when at
/// least two layers exist and layer 0 is both under-populated relative
/// to layer 1 and low-coverage; a single-layer scene is never "fake".
pub fn remove_fake_top_layer(layers: Vec<Layer>, config: &LayerFilterConfig) -> FakeTopOutcome {
    if layers.len() < 2 {
        return FakeTopOutcome {
            layers,
            dropped: None,
        };
    }

    let top_count = layers[0].box_count() as f32;
    let next_count = layers[1].box_count() as f32;
    let sparse = top_count < config.fake_count_ratio * next_count;
    let narrow = layers[0].coverage < config.fake_min_coverage;

    if !(sparse && narrow) {
        return FakeTopOutcome {
            layers,
            dropped: None,
        };
    }

    tracing::info!(
        top_boxes = layers[0].box_count(),
        next_boxes = layers[1].box_count(),
        top_coverage = layers[0].coverage,
        "dropping fake top layer"
    );

    let mut iter = layers.into_iter();
    let dropped = iter.next();
    let mut remaining: Vec<Layer> = iter.collect();
    layer::reindex(&mut remaining);

    FakeTopOutcome {
        layers: remaining,
        dropped,
    }
}

/// Remove rear-face duplicate boxes in multi-layer scenes.
///
/// When an L-shaped stack exposes the rear row of a tier through a gap,
/// the detector reports both faces: near-identical vertical extent, but
/// the rear boxes sit in a distinct band above the front row. Within
/// each layer, when the spread of vertical centers indicates two rows,
/// boxes centered above the layer mean are removed. No-op for
/// single-layer scenes: a flat layer has no "rear".
pub fn filter_rear_boxes(
    layers: Vec<Layer>,
    roi: &BoundingBox,
    config: &LayerFilterConfig,
) -> RearFilterOutcome {
    if layers.len() <= 1 {
        return RearFilterOutcome {
            layers,
            removed: Vec::new(),
        };
    }

    let mut removed = Vec::new();
    let mut filtered: Vec<Layer> = Vec::with_capacity(layers.len());

    for layer in layers {
        if layer.box_count() <= config.rear_min_boxes {
            filtered.push(layer);
            continue;
        }

        let centers: Vec<f32> = layer.boxes.iter().map(BoundingBox::center_y).collect();
        let spread = centers.iter().fold(f32::NEG_INFINITY, |a, &c| a.max(c))
            - centers.iter().fold(f32::INFINITY, |a, &c| a.min(c));
        let heights: Vec<f32> = layer.boxes.iter().map(BoundingBox::height).collect();
        let median_height = geometry::median(&heights);

        // One flat row: center spread stays well under a box height.
        if spread <= config.rear_spread_ratio * median_height {
            filtered.push(layer);
            continue;
        }

        let mean_center = geometry::mean(&centers);
        let front: Vec<BoundingBox> = layer
            .boxes
            .iter()
            .zip(&centers)
            .filter(|(_, &c)| c >= mean_center)
            .map(|(b, _)| *b)
            .collect();

        let n_removed = layer.box_count() - front.len();
        if n_removed > 0 {
            tracing::debug!(
                layer_index = layer.index,
                n_removed,
                "removed rear-face boxes"
            );
            removed.push(LayerRemoval {
                layer_index: layer.index,
                n_removed,
            });
        }

        if !front.is_empty() {
            filtered.push(Layer::from_boxes(layer.index, front, roi));
        }
    }

    layer::reindex(&mut filtered);
    RearFilterOutcome {
        layers: filtered,
        removed,
    }
}
