//! High-level counting pipeline.
//!
//! This module is the internal glue layer that wires together the
//! pipeline stages: scene preparation -> layer clustering -> layer
//! filtering -> full-layer classification -> counting strategy.
//!
//! Algorithmic primitives live in `crate::scene`, `crate::cluster`,
//! `crate::layer_filter`, `crate::classify`, and `crate::count`. The
//! pipeline layer owns stage boundaries, call order, and data flow.
//! The public entry point is [`crate::StackProcessor`].

mod result;
mod run;

pub use result::ProcessingResult;

pub(crate) use run::{run, run_with_debug};
