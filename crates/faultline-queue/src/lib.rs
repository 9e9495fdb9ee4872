//! Event batch queue transport
//!
//! Broadcast-channel implementation of the `BatchQueue`/`BatchReceiver`
//! traits from `faultline-core`. Each subscribed worker receives every batch;
//! concurrency comes from running multiple workers on independent batches.

mod queue;

pub use queue::BroadcastBatchQueue;
