//! High-level counting API.
//!
//! [`StackProcessor`] is the primary entry point for counting cartons
//! in a palletized stack. It wraps a [`ProcessConfig`] and a
//! [`TemplateDb`] and provides the one-call interface composing every
//! pipeline stage. Create once, process many scenes: the processor
//! holds no per-invocation state, so `&self` calls may run concurrently
//! from independent workers.

use crate::classify::{CoverageClassifier, FullLayerClassifier};
use crate::config::ProcessConfig;
use crate::debug_dump::DebugDump;
use crate::detection::Detection;
use crate::error::PipelineError;
use crate::pipeline::{self, ProcessingResult};
use crate::template::TemplateDb;

/// Primary counting interface.
pub struct StackProcessor {
    config: ProcessConfig,
    templates: TemplateDb,
    /// Injected classifier; when absent, a [`CoverageClassifier`] is
    /// built from the current config per call so config edits keep
    /// taking effect.
    classifier: Option<Box<dyn FullLayerClassifier>>,
}

impl StackProcessor {
    /// Create a processor with default configuration.
    pub fn new(templates: TemplateDb) -> Self {
        Self {
            config: ProcessConfig::default(),
            templates,
            classifier: None,
        }
    }

    /// Create with full config control.
    pub fn with_config(templates: TemplateDb, config: ProcessConfig) -> Self {
        Self {
            config,
            templates,
            classifier: None,
        }
    }

    /// Replace the full-layer classifier (construction-time strategy
    /// injection).
    pub fn with_classifier(mut self, classifier: Box<dyn FullLayerClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Access the current configuration.
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut ProcessConfig {
        &mut self.config
    }

    /// The template database this processor reads.
    pub fn templates(&self) -> &TemplateDb {
        &self.templates
    }

    /// Count the cartons in one stack.
    pub fn process_stack(
        &self,
        detections: &[Detection],
        pile_id: u32,
    ) -> Result<ProcessingResult, PipelineError> {
        self.dispatch(detections, pile_id, false)
            .map(|(result, _)| result)
    }

    /// Count the cartons in one stack, also returning the per-stage
    /// diagnostic dump.
    pub fn process_stack_with_debug(
        &self,
        detections: &[Detection],
        pile_id: u32,
    ) -> Result<(ProcessingResult, DebugDump), PipelineError> {
        self.dispatch(detections, pile_id, true)
            .map(|(result, dump)| (result, dump.expect("dump present in debug mode")))
    }

    fn dispatch(
        &self,
        detections: &[Detection],
        pile_id: u32,
        debug: bool,
    ) -> Result<(ProcessingResult, Option<DebugDump>), PipelineError> {
        let fallback;
        let classifier: &dyn FullLayerClassifier = match &self.classifier {
            Some(c) => c.as_ref(),
            None => {
                fallback = CoverageClassifier::new(self.config.classify);
                &fallback
            }
        };

        if debug {
            let (result, dump) = pipeline::run_with_debug(
                detections,
                pile_id,
                &self.templates,
                &self.config,
                classifier,
            )?;
            Ok((result, Some(dump)))
        } else {
            let result =
                pipeline::run(detections, pile_id, &self.templates, &self.config, classifier)?;
            Ok((result, None))
        }
    }
}

/// One-shot convenience wrapper around [`StackProcessor::process_stack`].
pub fn process_stack(
    detections: &[Detection],
    pile_id: u32,
    templates: &TemplateDb,
    config: &ProcessConfig,
) -> Result<ProcessingResult, PipelineError> {
    StackProcessor::with_config(templates.clone(), config.clone())
        .process_stack(detections, pile_id)
}
