//! Top-level pipeline orchestrator: prepare → cluster → filter →
//! classify → count.

use crate::classify::FullLayerClassifier;
use crate::cluster;
use crate::config::ProcessConfig;
use crate::count::{self, StackCount};
use crate::debug_dump::{
    ClassifyDebug, ClusterDebug, CountDebug, DebugDump, LayerFilterDebug, SceneDebug, StagesDebug,
    DEBUG_SCHEMA_V1,
};
use crate::detection::Detection;
use crate::error::PipelineError;
use crate::layer::Layer;
use crate::layer_filter;
use crate::pipeline::ProcessingResult;
use crate::scene::{self, PreparedScene};
use crate::template::{PileTemplate, TemplateDb};

/// Everything the stages produced, kept for result and debug assembly.
struct StageOutputs {
    scene: PreparedScene,
    cluster: cluster::ClusterOutcome,
    fake_top_dropped: Option<Layer>,
    rear_removed: Vec<layer_filter::LayerRemoval>,
    layers: Vec<Layer>,
    verdict: crate::classify::LayerVerdict,
    count: StackCount,
}

fn run_stages(
    detections: &[Detection],
    template: &PileTemplate,
    config: &ProcessConfig,
    classifier: &dyn FullLayerClassifier,
) -> Result<StageOutputs, PipelineError> {
    let scene = scene::prepare(detections, &config.scene)?;

    let cluster_outcome = cluster::cluster_layers(&scene.boxes, &scene.roi, &config.cluster);

    let fake = layer_filter::remove_fake_top_layer(cluster_outcome.layers.clone(), &config.layer_filter);
    let rear = layer_filter::filter_rear_boxes(fake.layers, &scene.roi, &config.layer_filter);
    let layers = rear.layers;

    // Filtering only ever removes; clustering of a non-empty scene
    // yields at least one layer and the filters cannot empty the last
    // one, so `layers` is non-empty here.
    debug_assert!(!layers.is_empty());

    let verdict = classifier.assess(&layers, template, &scene.roi);

    let count = if verdict.is_full {
        count::full_stack(&layers, template)
    } else {
        count::partial_stack(&layers, template)
    };

    tracing::info!(
        total = count.total,
        strategy = ?count.strategy,
        n_layers = layers.len(),
        "stack counted"
    );

    Ok(StageOutputs {
        scene,
        cluster: cluster_outcome,
        fake_top_dropped: fake.dropped,
        rear_removed: rear.removed,
        layers,
        verdict,
        count,
    })
}

fn assemble_result(pile_id: u32, outputs: &StageOutputs) -> ProcessingResult {
    ProcessingResult {
        pile_id,
        total_count: outputs.count.total,
        strategy: outputs.count.strategy,
        verdict: outputs.verdict,
        per_layer: outputs.count.per_layer.clone(),
        n_detections_in: outputs.scene.n_input,
        n_layers: outputs.layers.len(),
        roi: outputs.scene.roi,
    }
}

fn assemble_debug(pile_id: u32, config: &ProcessConfig, outputs: &StageOutputs) -> DebugDump {
    DebugDump {
        schema_version: DEBUG_SCHEMA_V1.to_string(),
        pile_id,
        config: config.clone(),
        stages: StagesDebug {
            stage0_scene: SceneDebug {
                n_input: outputs.scene.n_input,
                n_confident: outputs.scene.n_confident,
                n_in_roi: outputs.scene.boxes.len(),
                roi: outputs.scene.roi,
                roi_source: outputs.scene.roi_source,
                boxes: outputs.scene.boxes.clone(),
            },
            stage1_cluster: ClusterDebug::from_outcome(config.cluster.variant, &outputs.cluster),
            stage2_layer_filter: LayerFilterDebug {
                fake_top_dropped: outputs.fake_top_dropped.clone(),
                rear_removed: outputs.rear_removed.clone(),
                layers: outputs.layers.clone(),
            },
            stage3_classify: ClassifyDebug {
                verdict: outputs.verdict,
            },
            stage4_count: CountDebug {
                strategy: outputs.count.strategy,
                total: outputs.count.total,
                per_layer: outputs.count.per_layer.clone(),
            },
        },
    }
}

fn lookup_template<'a>(
    templates: &'a TemplateDb,
    pile_id: u32,
) -> Result<&'a PileTemplate, PipelineError> {
    templates
        .get(pile_id)
        .ok_or(PipelineError::TemplateNotFound { pile_id })
}

pub(crate) fn run(
    detections: &[Detection],
    pile_id: u32,
    templates: &TemplateDb,
    config: &ProcessConfig,
    classifier: &dyn FullLayerClassifier,
) -> Result<ProcessingResult, PipelineError> {
    let template = lookup_template(templates, pile_id)?;
    let outputs = run_stages(detections, template, config, classifier)?;
    Ok(assemble_result(pile_id, &outputs))
}

pub(crate) fn run_with_debug(
    detections: &[Detection],
    pile_id: u32,
    templates: &TemplateDb,
    config: &ProcessConfig,
    classifier: &dyn FullLayerClassifier,
) -> Result<(ProcessingResult, DebugDump), PipelineError> {
    let template = lookup_template(templates, pile_id)?;
    let outputs = run_stages(detections, template, config, classifier)?;
    let result = assemble_result(pile_id, &outputs);
    let dump = assemble_debug(pile_id, config, &outputs);
    Ok((result, dump))
}
