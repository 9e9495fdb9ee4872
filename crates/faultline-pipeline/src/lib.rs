//! Batched, plugin-driven event-processing pipeline
//!
//! A batch of raw events becomes a batch of `EventContext`s, runs through an
//! ordered list of plugins with per-context failure isolation, gets persisted
//! through the repositories, and finishes with a second "processed" plugin
//! pass for post-persistence side effects.

pub mod context;
pub mod plugin;
pub mod plugins;
pub mod processor;

pub use context::EventContext;
pub use plugin::{EventPipeline, EventPlugin, PluginError};
pub use processor::{BatchSummary, EventProcessor, ProcessorError};
