use async_trait::async_trait;
use tracing::debug;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Drops events belonging to suspended organizations before any other work
/// happens.
pub struct OrganizationGatePlugin;

#[async_trait]
impl EventPlugin for OrganizationGatePlugin {
    fn name(&self) -> &'static str {
        "organization-gate"
    }

    fn priority(&self) -> i32 {
        0
    }

    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        if context.organization.is_suspended {
            debug!(
                organization_id = %context.organization.id,
                event_id = %context.event.id,
                "Organization is suspended; cancelling event"
            );
            context.cancel();
        }
        Ok(())
    }
}
