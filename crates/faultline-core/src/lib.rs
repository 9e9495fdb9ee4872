//! Core utilities and types shared across all Faultline crates

pub mod batches;
pub mod cache;
pub mod ids;
pub mod notifications;
pub mod paging;
pub mod types;

// Re-export commonly used types
pub use batches::*;
pub use cache::{CacheClient, InMemoryCache};
pub use ids::new_id;
pub use notifications::{ChangePublisher, ChangeType, EntityChanged, PublishError};
pub use paging::{PagingOptions, DEFAULT_LIMIT, MAX_LIMIT};
pub use types::UtcDateTime;

// Re-export external dependencies
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
