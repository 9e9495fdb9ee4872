use std::sync::Arc;

use faultline_core::{BatchReceiver, EventBatch, QueueError};
use faultline_repositories::{
    EventRepository, NewEvent, OrganizationRepository, ProjectRepository, RepositoryError,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::context::EventContext;
use crate::plugin::EventPipeline;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Unknown organization: {0}")]
    UnknownOrganization(String),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    /// Storage failures propagate to the queue host, which owns retry and
    /// redelivery policy.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of one batch. The queue host sees "batch processed"; per-event
/// granularity lives here for callers that want it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub persisted: usize,
    pub cancelled: usize,
    pub discarded: usize,
    pub failed: usize,
}

/// Batch entry point: resolves the owning organization and project, runs the
/// plugin passes, and persists the surviving events between them.
pub struct EventProcessor {
    pipeline: Arc<EventPipeline>,
    organizations: Arc<OrganizationRepository>,
    projects: Arc<ProjectRepository>,
    events: Arc<EventRepository>,
}

impl EventProcessor {
    pub fn new(
        pipeline: Arc<EventPipeline>,
        organizations: Arc<OrganizationRepository>,
        projects: Arc<ProjectRepository>,
        events: Arc<EventRepository>,
    ) -> Self {
        Self {
            pipeline,
            organizations,
            projects,
            events,
        }
    }

    pub async fn process_batch(&self, batch: EventBatch) -> Result<BatchSummary, ProcessorError> {
        let organization = self
            .organizations
            .get_by_id(&batch.organization_id)
            .await?
            .ok_or_else(|| ProcessorError::UnknownOrganization(batch.organization_id.clone()))?;
        let project = self
            .projects
            .get_by_id(&batch.project_id)
            .await?
            .filter(|project| project.organization_id == organization.id)
            .ok_or_else(|| ProcessorError::UnknownProject(batch.project_id.clone()))?;

        debug!(
            project_id = %project.id,
            events = batch.events.len(),
            format_version = batch.format_version,
            "Processing event batch"
        );

        let format_version = batch.format_version;
        let mut contexts: Vec<EventContext> = batch
            .events
            .into_iter()
            .map(|raw| {
                let mut event = NewEvent::new(
                    organization.id.clone(),
                    project.id.clone(),
                    raw.event_type,
                );
                event.source = raw.source;
                event.message = raw.message;
                event.date = raw.date;
                event.reference_id = raw.reference_id;
                event.session_id = raw.session_id;
                event.data = raw.data;
                EventContext::new(event, organization.clone(), project.clone())
                    .with_format_version(format_version)
            })
            .collect();

        self.pipeline.process_batch(&mut contexts).await;

        let to_persist: Vec<NewEvent> = contexts
            .iter()
            .filter(|context| context.is_eligible())
            .map(|context| context.event.clone())
            .collect();
        let persisted = self.events.add_many(to_persist).await?;

        self.pipeline.processed_batch(&mut contexts).await;

        let mut summary = BatchSummary {
            total: contexts.len(),
            persisted,
            ..Default::default()
        };
        for context in &contexts {
            if context.is_cancelled() {
                summary.cancelled += 1;
            } else if context.is_discarded() {
                summary.discarded += 1;
            } else if let Some((plugin, message)) = context.error() {
                summary.failed += 1;
                warn!(
                    event_id = %context.event.id,
                    plugin,
                    error = message,
                    "Event failed during pipeline processing"
                );
            }
        }

        info!(
            project_id = %project.id,
            total = summary.total,
            persisted = summary.persisted,
            failed = summary.failed,
            "Batch processed"
        );
        Ok(summary)
    }

    /// Queue consumer loop: one worker per subscription, one batch at a time.
    /// Runs until the queue channel closes. Batch-level failures are logged
    /// and the worker moves on; redelivery is the queue host's concern.
    pub async fn run_worker(self: Arc<Self>, mut receiver: Box<dyn BatchReceiver>) {
        info!("Event batch worker started");
        loop {
            match receiver.recv().await {
                Ok(batch) => {
                    if let Err(e) = self.process_batch(batch).await {
                        error!(error = %e, "Failed to process event batch");
                    }
                }
                Err(QueueError::ChannelClosed) => {
                    info!("Batch queue closed; worker stopping");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive event batch");
                }
            }
        }
    }
}
