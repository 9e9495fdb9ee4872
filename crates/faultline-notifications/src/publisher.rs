use async_trait::async_trait;
use faultline_core::{ChangePublisher, EntityChanged, PublishError};
use tokio::sync::broadcast;

/// Broadcast-channel implementation of `ChangePublisher`. Every subscriber
/// receives every change; subscribers filter by the scope ids on the payload.
#[derive(Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<EntityChanged>,
}

impl BroadcastPublisher {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(buffer_size);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EntityChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl ChangePublisher for BroadcastPublisher {
    async fn publish(&self, change: EntityChanged) -> Result<(), PublishError> {
        self.sender
            .send(change)
            .map(|_| ())
            .map_err(|e| PublishError::TransportUnavailable(e.to_string()))
    }
}
