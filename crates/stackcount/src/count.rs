//! Counting strategies: template-driven totals for full and partial stacks.
//!
//! Once the top layer is judged complete, the template is authoritative
//! for every tier: it encodes ground truth for a known pile type and
//! dominates noisy vision counts. When the top layer is partial, only
//! that layer is counted from its surviving detections; every tier
//! below it was covered by a higher layer and cannot have been touched
//! by in-progress loading or unloading.

use serde::{Deserialize, Serialize};

use crate::layer::Layer;
use crate::template::PileTemplate;

/// Which counting strategy produced the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountStrategy {
    /// Every surviving layer counted from the template.
    Full,
    /// Lower layers from the template, top layer from detections.
    Partial,
}

/// Where one layer's count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    Template,
    Observed,
}

/// One layer's contribution to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCount {
    /// Layer index, 0 = topmost.
    pub layer_index: usize,
    /// Boxes the detector saw in this layer.
    pub observed: usize,
    /// Cartons attributed to this layer.
    pub counted: u32,
    /// Where `counted` came from.
    pub source: CountSource,
}

/// A computed stack total with its per-layer breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackCount {
    pub total: u32,
    pub strategy: CountStrategy,
    pub per_layer: Vec<LayerCount>,
}

/// Template entry for the layer at `layer_index` (0 = topmost) when
/// `n_layers` survive. `layer_counts` is ordered bottom tier first.
fn template_entry(template: &PileTemplate, n_layers: usize, layer_index: usize) -> u32 {
    let tier = n_layers.saturating_sub(1).saturating_sub(layer_index);
    template
        .layer_counts
        .get(tier)
        .or_else(|| template.layer_counts.last())
        .copied()
        .unwrap_or(0)
}

/// Count a stack whose top layer is complete.
///
/// The total is the sum of the template's first `n_layers` entries.
/// More surviving layers than template entries violates the template
/// invariant (an over-detected layer should have been filtered as an
/// artifact); the sum then covers the whole template and the anomaly is
/// traced.
pub fn full_stack(layers: &[Layer], template: &PileTemplate) -> StackCount {
    let n_layers = layers.len();
    if n_layers > template.n_layers() {
        tracing::warn!(
            n_layers,
            template_layers = template.n_layers(),
            "more surviving layers than template entries; counting whole template"
        );
    }

    let per_layer: Vec<LayerCount> = layers
        .iter()
        .map(|layer| LayerCount {
            layer_index: layer.index,
            observed: layer.box_count(),
            counted: template_entry(template, n_layers, layer.index),
            source: CountSource::Template,
        })
        .collect();

    StackCount {
        total: template.sum_first(n_layers),
        strategy: CountStrategy::Full,
        per_layer,
    }
}

/// Count a stack whose top layer is partially populated.
///
/// The layers below the top are template-complete by construction;
/// only the top layer is counted directly from its detections.
pub fn partial_stack(layers: &[Layer], template: &PileTemplate) -> StackCount {
    let n_layers = layers.len();
    let lower_sum = template.sum_first(n_layers.saturating_sub(1));

    let per_layer: Vec<LayerCount> = layers
        .iter()
        .map(|layer| {
            if layer.index == 0 {
                LayerCount {
                    layer_index: 0,
                    observed: layer.box_count(),
                    counted: layer.box_count() as u32,
                    source: CountSource::Observed,
                }
            } else {
                LayerCount {
                    layer_index: layer.index,
                    observed: layer.box_count(),
                    counted: template_entry(template, n_layers, layer.index),
                    source: CountSource::Template,
                }
            }
        })
        .collect();

    let top_observed = layers.first().map(Layer::box_count).unwrap_or(0) as u32;

    StackCount {
        total: lower_sum + top_observed,
        strategy: CountStrategy::Partial,
        per_layer,
    }
}
