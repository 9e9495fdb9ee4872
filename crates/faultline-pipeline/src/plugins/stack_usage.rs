use std::sync::Arc;

use async_trait::async_trait;
use faultline_repositories::StackRepository;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Post-persistence counter updates. Runs in the processed pass so only
/// events that actually reached storage count. The repository increment is a
/// single atomic UPDATE, which keeps concurrent batches on the same stack
/// correct.
pub struct StackUsagePlugin {
    stacks: Arc<StackRepository>,
}

impl StackUsagePlugin {
    pub fn new(stacks: Arc<StackRepository>) -> Self {
        Self { stacks }
    }
}

#[async_trait]
impl EventPlugin for StackUsagePlugin {
    fn name(&self) -> &'static str {
        "stack-usage"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn processed_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        // A brand-new stack was created with this occurrence already counted.
        if context.is_new {
            return Ok(());
        }
        if let Some(stack) = &context.stack {
            self.stacks
                .increment_usage(&stack.id, context.event.date)
                .await?;
        }
        Ok(())
    }
}
