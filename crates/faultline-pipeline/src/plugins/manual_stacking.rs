use async_trait::async_trait;
use tracing::debug;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Copies caller-supplied stacking overrides into the context's signature
/// data, where they take precedence over frame analysis.
pub struct ManualStackingPlugin;

#[async_trait]
impl EventPlugin for ManualStackingPlugin {
    fn name(&self) -> &'static str {
        "manual-stacking"
    }

    fn priority(&self) -> i32 {
        30
    }

    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let Some(data) = context.event_data() else {
            return Ok(());
        };
        let Some(manual) = data.manual_stacking else {
            return Ok(());
        };
        if manual.signature_data.is_empty() {
            return Ok(());
        }

        debug!(
            event_id = %context.event.id,
            keys = manual.signature_data.len(),
            "Applying manual stacking overrides"
        );
        for (key, value) in manual.signature_data {
            context.signature_data.insert(key, value);
        }
        Ok(())
    }
}
