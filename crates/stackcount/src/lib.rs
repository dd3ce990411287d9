//! stackcount — carton count inference for palletized stacks.
//!
//! Takes raw object-detector bounding boxes of a stacked pile of
//! cartons and produces the total carton count, together with a
//! classification of whether the stack's top layer is fully populated.
//! The pipeline stages are:
//!
//! 1. **Scene** – confidence filtering and ROI establishment.
//! 2. **Cluster** – grouping boxes into horizontal layers (three
//!    variants of increasing geometric strictness).
//! 3. **Layer filter** – removal of fake top layers and rear-face
//!    duplicate boxes.
//! 4. **Classify** – coverage-and-regularity verdict on the top layer.
//! 5. **Count** – template-driven total, full or partial strategy
//!    selected by the verdict.
//!
//! The pipeline is a pure, synchronous function of
//! `(detections, pile template, configuration)`: no I/O, no internal
//! retries, no state shared between invocations. The only long-lived
//! object is the [`TemplateDb`], loaded once and read-shared.
//!
//! # Public API
//! - [`StackProcessor`] and [`process_stack`] as primary entry points
//! - [`ProcessConfig`] for threshold tuning
//! - [`FullLayerClassifier`] as the classifier injection seam
//! - result structures with full diagnostic traces

mod classify;
mod cluster;
mod config;
mod count;
mod debug_dump;
mod detection;
mod error;
mod geometry;
mod layer;
mod layer_filter;
mod pipeline;
mod processor;
mod scene;
mod template;

pub use classify::{
    CoverageClassifier, CoverageMetrics, FullLayerClassifier, LayerVerdict, TopLayerSummary,
    VerdictReason,
};
pub use cluster::{
    cluster_basic, cluster_box_roi_constrained, cluster_layers, cluster_roi_constrained,
    split_threshold_px, ClusterOutcome,
};
pub use config::{
    ClassifyConfig, ClusterConfig, ClusterVariant, LayerFilterConfig, ProcessConfig, SceneConfig,
};
pub use count::{full_stack, partial_stack, CountSource, CountStrategy, LayerCount, StackCount};
pub use debug_dump::{
    ClassifyDebug, ClusterDebug, CountDebug, DebugDump, LayerFilterDebug, SceneDebug, StagesDebug,
    DEBUG_SCHEMA_V1,
};
pub use detection::Detection;
pub use error::PipelineError;
pub use geometry::{hull, union_x_extent, BoundingBox};
pub use layer::Layer;
pub use layer_filter::{
    filter_rear_boxes, remove_fake_top_layer, FakeTopOutcome, LayerRemoval, RearFilterOutcome,
};
pub use pipeline::ProcessingResult;
pub use processor::{process_stack, StackProcessor};
pub use scene::{prepare, PreparedScene, RoiSource};
pub use template::{PileTemplate, TemplateDb};
