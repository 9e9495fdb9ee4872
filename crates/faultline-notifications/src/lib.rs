//! Change notification throttle and pub/sub transport
//!
//! Converts per-write notification triggers into a bounded-rate stream so
//! ingestion bursts never overwhelm subscribers. Publishing is best-effort:
//! transport failures are logged and swallowed, never surfaced to the write
//! path.

mod publisher;
mod throttle;

pub use publisher::BroadcastPublisher;
pub use throttle::{InMemoryThrottleCache, NotificationThrottle, ThrottleCache};
