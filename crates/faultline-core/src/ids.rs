//! Entity id generation
//!
//! Ids are 24 lowercase hex characters: the unix timestamp in seconds (8
//! chars) followed by 16 chars of random entropy. Lexicographic comparison of
//! two ids therefore approximates creation order, which is what cursor
//! pagination (`before`/`after`) relies on. Ids never need coordination
//! between workers.

use chrono::Utc;
use uuid::Uuid;

/// Generate a new entity id.
pub fn new_id() -> String {
    let seconds = Utc::now().timestamp().max(0) as u64;
    let entropy = Uuid::new_v4().simple().to_string();
    format!("{:08x}{}", seconds, &entropy[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shape() {
        let id = new_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!id.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_ids_sort_by_creation_second() {
        // Two ids minted in different seconds must order lexicographically.
        let older = format!("{:08x}{}", 1_700_000_000u64, "aaaaaaaaaaaaaaaa");
        let newer = format!("{:08x}{}", 1_700_000_001u64, "0000000000000000");
        assert!(older < newer);
    }
}
