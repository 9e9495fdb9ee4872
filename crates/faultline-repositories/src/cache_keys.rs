//! Deterministic cache key composition
//!
//! Single-owner queries key on the owner id directly. Multi-id queries hash
//! the sorted, deduplicated id set so the same set always maps to the same
//! key regardless of input order. Paged results are never cached, so paging
//! never participates in key derivation.

use sha2::{Digest, Sha256};

pub fn owner_key(prefix: &str, owner_id: &str) -> String {
    format!("{prefix}:{owner_id}")
}

pub fn id_set_key(prefix: &str, ids: &[String]) -> String {
    let mut sorted: Vec<&str> = ids.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut hasher = Sha256::new();
    for id in sorted {
        hasher.update(id.as_bytes());
        hasher.update(b"\n");
    }
    format!("{prefix}:set:{:x}", hasher.finalize())
}
