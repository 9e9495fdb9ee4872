//! Stack signature engine
//!
//! Derives a stable fingerprint from an event's error data so that
//! semantically-identical occurrences collapse to one stack. Computation is a
//! pure function: identical input always yields an identical signature,
//! across restarts and nodes.

pub mod normalize;
pub mod patterns;
mod signature;

pub use signature::{compute_signature, SignatureConfig, StackSignature};
