//! Canonical datetime type used across all Faultline crates

use chrono::{DateTime as ChronoDateTime, Utc};

/// Standard UTC DateTime type used across all Faultline crates
///
/// This is the canonical datetime type for:
/// - Database TIMESTAMPTZ columns
/// - Event occurrence dates and stack first/last occurrence tracking
/// - Serialized payloads (ISO 8601 with 'Z' suffix)
pub type UtcDateTime = ChronoDateTime<Utc>;
