use async_trait::async_trait;
use faultline_entities::projects::SETTING_INCLUDE_PRIVATE_INFORMATION;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Strips user identity and request details unless the project opted into
/// keeping private information.
pub struct PrivateInformationPlugin;

#[async_trait]
impl EventPlugin for PrivateInformationPlugin {
    fn name(&self) -> &'static str {
        "private-information"
    }

    fn priority(&self) -> i32 {
        20
    }

    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let include_private = context
            .project
            .bool_setting(SETTING_INCLUDE_PRIVATE_INFORMATION)
            .unwrap_or(false);
        if include_private {
            return Ok(());
        }

        let Some(mut data) = context.event_data() else {
            return Ok(());
        };

        let mut changed = data.user.is_some();
        data.user = None;

        if let Some(request) = &mut data.request {
            changed = changed
                || request.client_ip_address.is_some()
                || request.headers.is_some()
                || request.post_data.is_some();
            request.client_ip_address = None;
            request.headers = None;
            request.post_data = None;
        }

        if changed {
            context.set_event_data(&data);
        }
        Ok(())
    }
}
