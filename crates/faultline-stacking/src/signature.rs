use std::collections::BTreeMap;

use faultline_entities::events::{ErrorInfo, StackFrame};
use sha2::{Digest, Sha256};

use crate::normalize::normalize_message;
use crate::patterns::matches_any;

pub const KEY_EXCEPTION_TYPE: &str = "ExceptionType";
pub const KEY_METHOD: &str = "Method";
pub const KEY_MESSAGE: &str = "Message";

/// Frame classification patterns. User namespaces mark diagnostic frames;
/// common methods (generic persistence calls, framework glue) are skipped
/// because they never identify a defect.
#[derive(Debug, Clone, Default)]
pub struct SignatureConfig {
    pub user_namespace_patterns: Vec<String>,
    pub common_method_patterns: Vec<String>,
}

/// Fingerprint plus the key/value map it was derived from. The hash is the
/// stack lookup key, scoped per project by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct StackSignature {
    pub hash: String,
    pub data: BTreeMap<String, String>,
    /// True when the representative method came from a user-code frame.
    pub is_user_method: bool,
}

impl StackSignature {
    /// Build a signature directly from a key/value map. Used for manual
    /// stacking overrides and non-error events; takes precedence over frame
    /// analysis entirely.
    pub fn from_data(data: BTreeMap<String, String>) -> Self {
        let hash = hash_signature_data(&data);
        Self {
            hash,
            data,
            is_user_method: false,
        }
    }
}

/// Derive a signature from error data. Pure: identical input yields an
/// identical signature regardless of timestamps, line numbers or node.
pub fn compute_signature(error: &ErrorInfo, config: &SignatureConfig) -> StackSignature {
    let mut data = BTreeMap::new();

    let innermost = error.innermost();
    // A missing exception type is an empty string, not an error.
    data.insert(
        KEY_EXCEPTION_TYPE.to_string(),
        innermost.error_type.clone().unwrap_or_default(),
    );

    let representative = find_representative_frame(error, config);
    match representative {
        Some((frame, is_user)) => {
            data.insert(KEY_METHOD.to_string(), frame.full_method());
            let hash = hash_signature_data(&data);
            StackSignature {
                hash,
                data,
                is_user_method: is_user,
            }
        }
        None => {
            // No usable frames at all (e.g. a manual log message): fall back
            // to the normalized message so the event still deduplicates.
            if let Some(message) = &innermost.message {
                data.insert(KEY_MESSAGE.to_string(), normalize_message(message));
            }
            let hash = hash_signature_data(&data);
            StackSignature {
                hash,
                data,
                is_user_method: false,
            }
        }
    }
}

/// Walk the error chain innermost-first (closest to the fault), scanning each
/// error's target frame and then its stack trace outward from the throw site.
fn find_representative_frame<'a>(
    error: &'a ErrorInfo,
    config: &SignatureConfig,
) -> Option<(&'a StackFrame, bool)> {
    let chain = error_chain_innermost_first(error);

    for level in &chain {
        for frame in candidate_frames(level) {
            let method = frame.full_method();
            if method.is_empty() {
                continue;
            }
            if matches_any(&method, &config.common_method_patterns) {
                continue;
            }
            if config.user_namespace_patterns.is_empty() {
                // Without configured user namespaces the first non-common
                // frame is the best diagnostic candidate.
                return Some((frame, false));
            }
            let namespace = frame.namespace.as_deref().unwrap_or_default();
            if matches_any(namespace, &config.user_namespace_patterns) {
                return Some((frame, true));
            }
        }
    }

    // No user frame anywhere: fall back to the immediate throw site of the
    // innermost error's own call stack.
    let innermost = chain.first()?;
    innermost
        .target_frame
        .as_ref()
        .or_else(|| innermost.stack_trace.first())
        .map(|frame| (frame, false))
}

fn error_chain_innermost_first(error: &ErrorInfo) -> Vec<&ErrorInfo> {
    let mut chain = vec![error];
    let mut current = error;
    while let Some(inner) = &current.inner {
        chain.push(inner);
        current = inner;
    }
    chain.reverse();
    chain
}

fn candidate_frames(error: &ErrorInfo) -> impl Iterator<Item = &StackFrame> {
    error.target_frame.iter().chain(error.stack_trace.iter())
}

/// Hash the canonical string form of the signature map: `key=value` lines in
/// map order (BTreeMap gives stable key ordering), case-sensitive.
fn hash_signature_data(data: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(namespace: &str, type_name: &str, method: &str, line: i32) -> StackFrame {
        StackFrame {
            namespace: Some(namespace.to_string()),
            type_name: Some(type_name.to_string()),
            method: Some(method.to_string()),
            file_name: None,
            line_number: Some(line),
        }
    }

    fn config() -> SignatureConfig {
        SignatureConfig {
            user_namespace_patterns: vec!["Acme.*".to_string()],
            common_method_patterns: vec!["*.Repository.Save".to_string()],
        }
    }

    #[test]
    fn test_signature_is_deterministic() {
        let make_error = |line| ErrorInfo {
            error_type: Some("System.NullReferenceException".to_string()),
            message: Some("Object reference not set".to_string()),
            stack_trace: vec![frame("Acme.Api", "OrderController", "Submit", line)],
            ..Default::default()
        };

        // Line numbers must not affect the signature.
        let a = compute_signature(&make_error(10), &config());
        let b = compute_signature(&make_error(99), &config());
        assert_eq!(a, b);
        assert!(!a.hash.is_empty());
    }

    #[test]
    fn test_common_methods_are_skipped() {
        let error = ErrorInfo {
            error_type: Some("DbException".to_string()),
            stack_trace: vec![
                frame("Vendor.Data", "Repository", "Save", 1),
                frame("Acme.Orders", "OrderService", "Place", 2),
            ],
            ..Default::default()
        };

        let signature = compute_signature(&error, &config());
        let method = signature.data.get(KEY_METHOD).unwrap();
        assert_eq!(method, "Acme.Orders.OrderService.Place");
        assert!(signature.is_user_method);
    }

    #[test]
    fn test_chained_common_methods_never_become_representative() {
        let cfg = SignatureConfig {
            user_namespace_patterns: vec![],
            common_method_patterns: vec![
                "Vendor.Data.Store.CommonMethodA".to_string(),
                "Vendor.Data.Store.CommonMethodB".to_string(),
            ],
        };
        let error = ErrorInfo {
            error_type: Some("StorageException".to_string()),
            stack_trace: vec![
                frame("Vendor.Data", "Store", "CommonMethodB", 5),
                frame("Vendor.Data", "Store", "CommonMethodA", 9),
                frame("App.Web", "Checkout", "Pay", 12),
            ],
            ..Default::default()
        };

        let signature = compute_signature(&error, &cfg);
        let method = signature.data.get(KEY_METHOD).unwrap();
        assert_eq!(method, "App.Web.Checkout.Pay");
    }

    #[test]
    fn test_first_user_frame_wins_over_earlier_non_user_frames() {
        let error = ErrorInfo {
            error_type: Some("TimeoutException".to_string()),
            stack_trace: vec![
                frame("Vendor.Http", "Client", "Send", 1),
                frame("Acme.Billing", "InvoiceService", "Issue", 2),
                frame("Acme.Web", "Program", "Main", 3),
            ],
            ..Default::default()
        };

        let signature = compute_signature(&error, &config());
        assert_eq!(
            signature.data.get(KEY_METHOD).unwrap(),
            "Acme.Billing.InvoiceService.Issue"
        );
    }

    #[test]
    fn test_fallback_to_throw_site_when_no_user_frame() {
        let error = ErrorInfo {
            error_type: Some("IOException".to_string()),
            stack_trace: vec![
                frame("Vendor.IO", "File", "Open", 1),
                frame("Vendor.Host", "Program", "Main", 2),
            ],
            ..Default::default()
        };

        let signature = compute_signature(&error, &config());
        assert_eq!(signature.data.get(KEY_METHOD).unwrap(), "Vendor.IO.File.Open");
        assert!(!signature.is_user_method);
    }

    #[test]
    fn test_inner_error_is_walked_first() {
        let error = ErrorInfo {
            error_type: Some("WrapperException".to_string()),
            stack_trace: vec![frame("Acme.Web", "Middleware", "Invoke", 1)],
            inner: Some(Box::new(ErrorInfo {
                error_type: Some("SqlException".to_string()),
                stack_trace: vec![frame("Acme.Data", "OrderStore", "Insert", 2)],
                ..Default::default()
            })),
            ..Default::default()
        };

        let signature = compute_signature(&error, &config());
        assert_eq!(
            signature.data.get(KEY_EXCEPTION_TYPE).unwrap(),
            "SqlException"
        );
        assert_eq!(
            signature.data.get(KEY_METHOD).unwrap(),
            "Acme.Data.OrderStore.Insert"
        );
    }

    #[test]
    fn test_no_frames_falls_back_to_type_and_message() {
        let error = ErrorInfo {
            error_type: Some("ValidationError".to_string()),
            message: Some("user 123456 rejected".to_string()),
            ..Default::default()
        };

        let a = compute_signature(&error, &config());
        assert!(a.data.contains_key(KEY_MESSAGE));

        // Volatile message tokens must not split the stack.
        let mut other = error.clone();
        other.message = Some("user 999999 rejected".to_string());
        let b = compute_signature(&other, &config());
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_missing_exception_type_is_empty_string() {
        let error = ErrorInfo {
            message: Some("plain log line".to_string()),
            ..Default::default()
        };
        let signature = compute_signature(&error, &config());
        assert_eq!(signature.data.get(KEY_EXCEPTION_TYPE).unwrap(), "");
    }

    #[test]
    fn test_from_data_is_stable_across_insertion_order() {
        let mut forward = BTreeMap::new();
        forward.insert("A".to_string(), "1".to_string());
        forward.insert("B".to_string(), "2".to_string());

        let mut reverse = BTreeMap::new();
        reverse.insert("B".to_string(), "2".to_string());
        reverse.insert("A".to_string(), "1".to_string());

        assert_eq!(
            StackSignature::from_data(forward).hash,
            StackSignature::from_data(reverse).hash
        );
    }

    #[test]
    fn test_different_data_produces_different_hash() {
        let error_a = ErrorInfo {
            error_type: Some("TypeError".to_string()),
            ..Default::default()
        };
        let error_b = ErrorInfo {
            error_type: Some("RangeError".to_string()),
            ..Default::default()
        };
        assert_ne!(
            compute_signature(&error_a, &config()).hash,
            compute_signature(&error_b, &config()).hash
        );
    }
}
