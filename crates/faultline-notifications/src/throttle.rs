use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use faultline_core::{ChangePublisher, EntityChanged, UtcDateTime};
use tracing::{debug, error};

/// Gate storing the last send time per scope key. The check and the update
/// happen as one atomic operation so two workers racing on the same scope
/// cannot both pass. The production gate must live in a shared store when
/// workers span processes; this trait is the seam for that.
#[async_trait]
pub trait ThrottleCache: Send + Sync {
    /// Record `now` as the last send for `key` if at least `min_interval`
    /// has passed since the previous one. Returns true when the caller may
    /// publish.
    async fn try_mark_sent(&self, key: &str, now: UtcDateTime, min_interval: Duration) -> bool;
}

pub struct InMemoryThrottleCache {
    last_sent: Mutex<HashMap<String, UtcDateTime>>,
}

impl InMemoryThrottleCache {
    pub fn new() -> Self {
        Self {
            last_sent: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryThrottleCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ThrottleCache for InMemoryThrottleCache {
    async fn try_mark_sent(&self, key: &str, now: UtcDateTime, min_interval: Duration) -> bool {
        let mut last_sent = self.last_sent.lock().unwrap();
        if let Some(previous) = last_sent.get(key) {
            if now - *previous < min_interval {
                return false;
            }
        }
        last_sent.insert(key.to_string(), now);
        true
    }
}

/// Debounced change-notification layer: at most one publish per scope key per
/// minimum interval. Notification is best-effort and never blocks or fails
/// the write path it is attached to.
pub struct NotificationThrottle {
    cache: Arc<dyn ThrottleCache>,
    publisher: Arc<dyn ChangePublisher>,
    min_interval: Duration,
}

impl NotificationThrottle {
    /// Default minimum interval between notifications for one scope.
    pub const DEFAULT_MIN_INTERVAL_MS: i64 = 2_000;

    pub fn new(cache: Arc<dyn ThrottleCache>, publisher: Arc<dyn ChangePublisher>) -> Self {
        Self::with_min_interval(
            cache,
            publisher,
            Duration::milliseconds(Self::DEFAULT_MIN_INTERVAL_MS),
        )
    }

    pub fn with_min_interval(
        cache: Arc<dyn ThrottleCache>,
        publisher: Arc<dyn ChangePublisher>,
        min_interval: Duration,
    ) -> Self {
        Self {
            cache,
            publisher,
            min_interval,
        }
    }

    /// Publish `change` under `scope_key` unless a notification for that
    /// scope went out within the minimum interval.
    pub async fn notify(&self, scope_key: &str, change: EntityChanged) {
        let now = Utc::now();
        if !self
            .cache
            .try_mark_sent(scope_key, now, self.min_interval)
            .await
        {
            debug!(scope = %scope_key, "Notification suppressed by throttle");
            return;
        }

        if let Err(e) = self.publisher.publish(change).await {
            // Best-effort: the write path must never see transport failures.
            error!(scope = %scope_key, error = %e, "Failed to publish change notification");
        }
    }

    /// Throttled notification using the change's own most-specific scope.
    pub async fn notify_entity_changed(&self, change: EntityChanged) {
        let scope = change.scope_key();
        self.notify(&scope, change).await;
    }

    /// Fan a set of changes out as one throttled notification per distinct
    /// scope key, never a cross-product of ownership levels. Bulk writes
    /// that touch many entities pass everything through here.
    pub async fn notify_all(&self, changes: Vec<EntityChanged>) {
        let mut seen = HashSet::new();
        for change in changes {
            let scope = change.scope_key();
            if !seen.insert(scope.clone()) {
                continue;
            }
            self.notify(&scope, change).await;
        }
    }
}
