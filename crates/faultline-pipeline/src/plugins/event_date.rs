use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::debug;

use crate::context::EventContext;
use crate::plugin::{EventPlugin, PluginError};

/// Clock skew tolerated before a future-dated event is clamped to now.
const FUTURE_TOLERANCE_MINUTES: i64 = 10;

/// Clamps far-future event dates and discards events older than the
/// organization's retention window.
pub struct EventDatePlugin;

#[async_trait]
impl EventPlugin for EventDatePlugin {
    fn name(&self) -> &'static str {
        "event-date"
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn process_context(&self, context: &mut EventContext) -> Result<(), PluginError> {
        let now = Utc::now();

        if context.event.date > now + Duration::minutes(FUTURE_TOLERANCE_MINUTES) {
            debug!(
                event_id = %context.event.id,
                event_date = %context.event.date,
                "Event date is in the future; clamping to now"
            );
            context.event.date = now;
        }

        let retention_days = context.organization.retention_days;
        if retention_days > 0 && context.event.date < now - Duration::days(retention_days as i64) {
            debug!(
                event_id = %context.event.id,
                event_date = %context.event.date,
                retention_days,
                "Event is outside the retention window; discarding"
            );
            context.discard();
        }

        Ok(())
    }
}
