use std::collections::BTreeMap;

use faultline_entities::events::EventData;
use faultline_entities::{organizations, projects, stacks};
use faultline_repositories::NewEvent;

/// Ephemeral per-event working state. Created at batch start, discarded at
/// batch end; never persisted.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// The event under construction. Plugins enrich it; the processor
    /// persists it once the processing pass completes.
    pub event: NewEvent,
    pub organization: organizations::Model,
    pub project: projects::Model,

    /// Resolved stack, populated by the stack assignment step.
    pub stack: Option<stacks::Model>,

    /// True only within the batch that created the stack.
    pub is_new: bool,
    /// True when this event reopened a previously resolved stack.
    pub is_regression: bool,

    /// Client/format version of the originating batch; enrichment plugins
    /// branch on it to pick parsing rules.
    pub format_version: i32,

    /// Signature key/value pairs accumulated by upstream plugins and consumed
    /// by the signature engine. Non-empty data short-circuits frame analysis.
    pub signature_data: BTreeMap<String, String>,

    is_cancelled: bool,
    is_discarded: bool,
    error_message: Option<String>,
    error_plugin: Option<String>,
}

impl EventContext {
    pub fn new(
        event: NewEvent,
        organization: organizations::Model,
        project: projects::Model,
    ) -> Self {
        Self {
            event,
            organization,
            project,
            stack: None,
            is_new: false,
            is_regression: false,
            format_version: 1,
            signature_data: BTreeMap::new(),
            is_cancelled: false,
            is_discarded: false,
            error_message: None,
            error_plugin: None,
        }
    }

    pub fn with_format_version(mut self, format_version: i32) -> Self {
        self.format_version = format_version;
        self
    }

    /// Drop this event without error; it is excluded from all later stages
    /// and from persistence.
    pub fn cancel(&mut self) {
        self.is_cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    /// Like cancel, but recorded separately so callers can tell policy drops
    /// from transport drops.
    pub fn discard(&mut self) {
        self.is_discarded = true;
    }

    pub fn is_discarded(&self) -> bool {
        self.is_discarded
    }

    /// Mark this context failed. It is excluded from subsequent plugins and
    /// from persistence; the batch continues.
    pub fn set_error(&mut self, plugin: &str, message: impl Into<String>) {
        self.error_plugin = Some(plugin.to_string());
        self.error_message = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn error(&self) -> Option<(&str, &str)> {
        match (&self.error_plugin, &self.error_message) {
            (Some(plugin), Some(message)) => Some((plugin.as_str(), message.as_str())),
            _ => None,
        }
    }

    /// Eligible contexts flow into the next pipeline stage and, ultimately,
    /// persistence.
    pub fn is_eligible(&self) -> bool {
        !self.is_cancelled && !self.is_discarded && !self.has_error()
    }

    /// Parse the structured payload attached to the event.
    pub fn event_data(&self) -> Option<EventData> {
        self.event.data.as_ref().and_then(EventData::from_json_value)
    }

    /// Write the structured payload back onto the event.
    pub fn set_event_data(&mut self, data: &EventData) {
        self.event.data = data.to_json_value();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn context() -> EventContext {
        let organization = organizations::Model {
            id: "org1".to_string(),
            name: "Acme".to_string(),
            retention_days: 90,
            max_events_per_month: 0,
            is_suspended: false,
            suspension_code: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let project = projects::Model {
            id: "proj1".to_string(),
            organization_id: "org1".to_string(),
            name: "Website".to_string(),
            settings: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut event = NewEvent::new("org1".to_string(), "proj1".to_string(), "error".to_string());
        event.stack_id = "stack1".to_string();
        EventContext::new(event, organization, project)
    }

    #[test]
    fn test_fresh_context_is_eligible() {
        let ctx = context();
        assert!(ctx.is_eligible());
        assert!(!ctx.is_new);
        assert!(!ctx.is_regression);
    }

    #[test]
    fn test_cancel_discard_and_error_make_context_ineligible() {
        let mut ctx = context();
        ctx.cancel();
        assert!(!ctx.is_eligible());

        let mut ctx = context();
        ctx.discard();
        assert!(!ctx.is_eligible());

        let mut ctx = context();
        ctx.set_error("broken-plugin", "it broke");
        assert!(!ctx.is_eligible());
        assert_eq!(ctx.error(), Some(("broken-plugin", "it broke")));
    }

    #[test]
    fn test_event_data_round_trip() {
        let mut ctx = context();
        assert!(ctx.event_data().is_none());

        let data = EventData {
            error: Some(faultline_entities::events::ErrorInfo {
                error_type: Some("TypeError".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        ctx.set_event_data(&data);
        let back = ctx.event_data().unwrap();
        assert_eq!(back.error.unwrap().error_type.as_deref(), Some("TypeError"));
    }
}
