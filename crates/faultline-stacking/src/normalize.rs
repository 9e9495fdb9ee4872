//! Error message normalization for signature purposes
//!
//! Events without any usable stack frames are fingerprinted from their type
//! and message. Messages frequently embed volatile values (ids, uuids,
//! numbers) which would split one defect into many stacks, so those tokens
//! are replaced with placeholders before hashing.

use regex::Regex;

/// Normalize an error message for consistent grouping.
pub fn normalize_message(message: &str) -> String {
    let mut normalized = message.to_lowercase();

    // Replace UUIDs first, before the hex pass eats their segments
    let uuid_regex =
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap();
    normalized = uuid_regex.replace_all(&normalized, "<uuid>").to_string();

    // Replace long hex ids (e.g. 0x1a2b3c4d, deadbeef01)
    let hex_regex = Regex::new(r"\b(0x)?[0-9a-f]{8,}\b").unwrap();
    normalized = hex_regex.replace_all(&normalized, "<hex>").to_string();

    // Replace standalone numbers of 4+ digits (ids, ports, timestamps)
    let number_regex = Regex::new(r"\b\d{4,}\b").unwrap();
    normalized = number_regex.replace_all(&normalized, "<num>").to_string();

    // Truncate to keep signature input bounded
    normalized.chars().take(200).collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_folding() {
        assert_eq!(
            normalize_message("Connection REFUSED"),
            normalize_message("connection refused")
        );
    }

    #[test]
    fn test_uuid_replacement() {
        let normalized =
            normalize_message("resource 550e8400-e29b-41d4-a716-446655440000 missing");
        assert!(normalized.contains("<uuid>"));
        assert!(!normalized.contains("550e8400"));
    }

    #[test]
    fn test_hex_replacement() {
        let normalized = normalize_message("transaction 0xdeadbeef12 aborted");
        assert!(normalized.contains("<hex>"));
        assert!(!normalized.contains("deadbeef"));
    }

    #[test]
    fn test_number_replacement() {
        let normalized = normalize_message("user 123456 not found");
        assert!(normalized.contains("<num>"));
        assert!(!normalized.contains("123456"));

        // Short numbers are kept; they are usually structural, not ids.
        assert!(normalize_message("retry 3 of 5").contains('3'));
    }

    #[test]
    fn test_volatile_tokens_collapse_to_same_message() {
        let a = normalize_message("user 123456 not found on host 0xdeadbeef12");
        let b = normalize_message("user 987654 not found on host 0xfeedface99");
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncation() {
        let long = "x".repeat(500);
        assert_eq!(normalize_message(&long).len(), 200);
    }
}
