use async_trait::async_trait;
use faultline_core::{BatchQueue, BatchReceiver, EventBatch, QueueError};
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Broadcast-backed batch queue. Keep the receiver returned by
/// `create_channel` alive (or hold at least one subscription) or sends will
/// fail with no listeners.
#[derive(Clone)]
pub struct BroadcastBatchQueue {
    sender: broadcast::Sender<EventBatch>,
}

struct BroadcastBatchReceiver {
    receiver: broadcast::Receiver<EventBatch>,
}

impl BroadcastBatchQueue {
    pub fn new(sender: broadcast::Sender<EventBatch>) -> Self {
        Self { sender }
    }

    pub fn create_channel(
        buffer_size: usize,
    ) -> (BroadcastBatchQueue, broadcast::Receiver<EventBatch>) {
        let (sender, receiver) = broadcast::channel(buffer_size);
        (BroadcastBatchQueue::new(sender), receiver)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl BatchQueue for BroadcastBatchQueue {
    async fn send(&self, batch: EventBatch) -> Result<(), QueueError> {
        debug!("Broadcasting batch: {}", batch);

        if self.sender.receiver_count() == 0 {
            error!("No workers subscribed to the batch queue; batch will be lost: {}", batch);
        }

        self.sender
            .send(batch)
            .map(|_| ())
            .map_err(|e| QueueError::SendError(e.to_string()))
    }

    fn subscribe(&self) -> Box<dyn BatchReceiver> {
        Box::new(BroadcastBatchReceiver {
            receiver: self.sender.subscribe(),
        })
    }
}

#[async_trait]
impl BatchReceiver for BroadcastBatchReceiver {
    async fn recv(&mut self) -> Result<EventBatch, QueueError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => QueueError::ChannelClosed,
            broadcast::error::RecvError::Lagged(n) => {
                error!("Batch receiver lagged by {} messages", n);
                QueueError::ReceiveError(format!("Receiver lagged by {} messages", n))
            }
        })
    }
}
