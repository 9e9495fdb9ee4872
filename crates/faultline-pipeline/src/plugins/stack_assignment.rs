use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use faultline_entities::projects::{SETTING_COMMON_METHODS, SETTING_USER_NAMESPACES};
use faultline_entities::{projects, stacks};
use faultline_repositories::{NewStack, RepositoryError, StackRepository};
use faultline_stacking::{compute_signature, SignatureConfig, StackSignature};
use tracing::{debug, info};

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

const TITLE_MESSAGE_LENGTH: usize = 100;

/// Resolves each event to its stack: computes the signature, finds or creates
/// the stack under `(project_id, hash)`, and performs regression detection.
pub struct StackAssignmentPlugin {
    stacks: Arc<StackRepository>,
    defaults: SignatureConfig,
}

impl StackAssignmentPlugin {
    pub fn new(stacks: Arc<StackRepository>, defaults: SignatureConfig) -> Self {
        Self { stacks, defaults }
    }

    /// Per-project signature configuration: process-wide defaults extended by
    /// the project's own pattern settings.
    fn config_for(&self, project: &projects::Model) -> SignatureConfig {
        let mut config = self.defaults.clone();
        config
            .user_namespace_patterns
            .extend(project.list_setting(SETTING_USER_NAMESPACES));
        config
            .common_method_patterns
            .extend(project.list_setting(SETTING_COMMON_METHODS));
        config
    }

    fn signature_for(&self, context: &EventContext) -> StackSignature {
        // Accumulated signature data (manual stacking) short-circuits frame
        // analysis entirely.
        if !context.signature_data.is_empty() {
            return StackSignature::from_data(context.signature_data.clone());
        }

        if let Some(error) = context.event_data().and_then(|data| data.error) {
            return compute_signature(&error, &self.config_for(&context.project));
        }

        // Non-error events (log messages, sessions) stack by type and source.
        let mut data = BTreeMap::new();
        data.insert("Type".to_string(), context.event.event_type.clone());
        if let Some(source) = &context.event.source {
            data.insert("Source".to_string(), source.clone());
        }
        StackSignature::from_data(data)
    }

    fn build_title(&self, context: &EventContext) -> String {
        let data = context.event_data();

        if let Some(title) = data
            .as_ref()
            .and_then(|d| d.manual_stacking.as_ref())
            .and_then(|manual| manual.title.clone())
        {
            return title;
        }

        if let Some(error) = data.as_ref().and_then(|d| d.error.as_ref()) {
            let innermost = error.innermost();
            let error_type = innermost.error_type.as_deref().unwrap_or("Error");
            return match &innermost.message {
                Some(message) => format!(
                    "{}: {}",
                    error_type,
                    message.chars().take(TITLE_MESSAGE_LENGTH).collect::<String>()
                ),
                None => error_type.to_string(),
            };
        }

        context
            .event
            .message
            .clone()
            .unwrap_or_else(|| context.event.event_type.clone())
    }

    async fn resolve_stack(
        &self,
        context: &EventContext,
        signature: &StackSignature,
    ) -> Result<(stacks::Model, bool), RepositoryError> {
        if let Some(stack) = self
            .stacks
            .get_by_signature_hash(&context.event.project_id, &signature.hash)
            .await?
        {
            return Ok((stack, false));
        }

        let new_stack = NewStack {
            organization_id: context.event.organization_id.clone(),
            project_id: context.event.project_id.clone(),
            signature_hash: signature.hash.clone(),
            signature_info: serde_json::to_value(&signature.data)
                .unwrap_or_else(|_| serde_json::json!({})),
            title: self.build_title(context),
            first_occurrence: context.event.date,
        };

        match self.stacks.add(new_stack).await {
            Ok(stack) => Ok((stack, true)),
            Err(RepositoryError::Database(_)) => {
                // A concurrent batch won the insert race on the unique
                // (project_id, signature_hash) index; use its stack.
                let stack = self
                    .stacks
                    .get_by_signature_hash(&context.event.project_id, &signature.hash)
                    .await?
                    .ok_or(RepositoryError::NotFound("stack"))?;
                Ok((stack, false))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl EventPlugin for StackAssignmentPlugin {
    fn name(&self) -> &'static str {
        "stack-assignment"
    }

    fn priority(&self) -> i32 {
        40
    }

    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let signature = self.signature_for(context);
        context.signature_data = signature.data.clone();

        let (mut stack, is_new) = self.resolve_stack(context, &signature).await?;

        if is_new {
            info!(
                stack_id = %stack.id,
                project_id = %context.event.project_id,
                "Created new stack"
            );
            context.is_new = true;
        } else if stack.is_resolved() {
            // A matching event on a resolved stack is a regression: clear the
            // resolved state and report it back through the context.
            stack = self.stacks.mark_regressed(&stack.id).await?;
            context.is_regression = true;
            info!(stack_id = %stack.id, "Stack regressed");
        } else {
            debug!(stack_id = %stack.id, "Event attached to existing stack");
        }

        context.event.stack_id = stack.id.clone();
        context.stack = Some(stack);
        Ok(())
    }
}
