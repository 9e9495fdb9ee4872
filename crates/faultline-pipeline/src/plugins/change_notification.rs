use std::sync::Arc;

use async_trait::async_trait;
use faultline_core::{ChangeType, EntityChanged};
use faultline_notifications::NotificationThrottle;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Publishes throttled stack-change notifications after persistence. A burst
/// of events on one stack collapses to at most one notification per throttle
/// interval; notification failure never fails the batch.
pub struct ChangeNotificationPlugin {
    throttle: Arc<NotificationThrottle>,
}

impl ChangeNotificationPlugin {
    pub fn new(throttle: Arc<NotificationThrottle>) -> Self {
        Self { throttle }
    }
}

#[async_trait]
impl EventPlugin for ChangeNotificationPlugin {
    fn name(&self) -> &'static str {
        "change-notification"
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn processed_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let Some(stack) = &context.stack else {
            return Ok(());
        };

        let change_type = if context.is_new {
            ChangeType::Added
        } else {
            ChangeType::Saved
        };

        self.throttle
            .notify_entity_changed(EntityChanged {
                type_name: "Stack".to_string(),
                change_type,
                id: Some(stack.id.clone()),
                organization_id: Some(stack.organization_id.clone()),
                project_id: Some(stack.project_id.clone()),
                stack_id: None,
            })
            .await;

        Ok(())
    }
}
