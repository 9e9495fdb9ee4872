use std::sync::Arc;

use async_trait::async_trait;
use faultline_repositories::RepositoryError;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::context::EventContext;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("{0}")]
    Failure(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One stage in the event pipeline. Plugins are stateless between events;
/// anything they need across a run is set up in `startup`.
#[async_trait]
pub trait EventPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ascending execution order; ties run in registration order. Fixed at
    /// wiring time.
    fn priority(&self) -> i32;

    /// When true, a failure in this plugin is non-fatal for the context:
    /// later plugins still run on it.
    fn continue_on_error(&self) -> bool {
        false
    }

    /// Run once per plugin at process start.
    async fn startup(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Processing pass: enrich the event, populate signature data, cancel or
    /// discard the context, or fail it via the returned error.
    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let _ = context;
        Ok(())
    }

    /// Processed pass: post-persistence side effects (counters,
    /// notifications).
    async fn processed_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let _ = context;
        Ok(())
    }
}

/// Explicit, ordered plugin registry. Ordering is a first-class configuration
/// value: plugins execute in ascending numeric priority, ties in registration
/// order, fixed once wiring completes.
pub struct EventPipeline {
    plugins: Vec<Arc<dyn EventPlugin>>,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn register(&mut self, plugin: Arc<dyn EventPlugin>) {
        debug!(plugin = plugin.name(), priority = plugin.priority(), "Registering event plugin");
        self.plugins.push(plugin);
        // Stable sort keeps registration order for equal priorities.
        self.plugins.sort_by_key(|p| p.priority());
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin's startup hook. A failing plugin is logged and
    /// skipped for this call only; the others still start.
    pub async fn startup(&self) {
        for plugin in &self.plugins {
            if let Err(e) = plugin.startup().await {
                error!(plugin = plugin.name(), error = %e, "Plugin startup failed; skipping");
            }
        }
    }

    /// Processing pass over a batch. Each plugin sees the still-eligible
    /// subset; a failure is recorded on that context alone and never aborts
    /// siblings or the batch.
    pub async fn process_batch(&self, contexts: &mut [EventContext]) {
        self.run_pass(contexts, Pass::Process).await;
    }

    /// Second ordered pass over the surviving contexts, with the same
    /// partial-failure isolation.
    pub async fn processed_batch(&self, contexts: &mut [EventContext]) {
        self.run_pass(contexts, Pass::Processed).await;
    }

    async fn run_pass(&self, contexts: &mut [EventContext], pass: Pass) {
        for plugin in &self.plugins {
            if !contexts.iter().any(|c| c.is_eligible()) {
                debug!("No eligible contexts remain; stopping plugin iteration early");
                break;
            }

            for context in contexts.iter_mut().filter(|c| c.is_eligible()) {
                let result = match pass {
                    Pass::Process => plugin.process_context(context).await,
                    Pass::Processed => plugin.processed_context(context).await,
                };

                if let Err(e) = result {
                    if plugin.continue_on_error() {
                        warn!(
                            plugin = plugin.name(),
                            event_id = %context.event.id,
                            error = %e,
                            "Plugin failed; continuing with this event"
                        );
                    } else {
                        error!(
                            plugin = plugin.name(),
                            event_id = %context.event.id,
                            error = %e,
                            "Plugin failed; excluding event from further processing"
                        );
                        context.set_error(plugin.name(), e.to_string());
                    }
                }
            }
        }
    }
}

impl Default for EventPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
enum Pass {
    Process,
    Processed,
}
