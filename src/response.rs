//! Response classification for the Reinos Webservice.
//!
//! The webservice answers with JSON on the happy path, but it can also hand
//! back a PHP `print_r` array dump, or a PHP fatal error inside a 200 OK
//! body. Every raw response goes through [`classify`] exactly once and comes
//! out as either an [`ActionResult`] or a typed [`EeError`].

use serde_json::{Value, json};
use thiserror::Error;

/// Guidance shown instead of the raw PHP memory-exhaustion dump.
pub const MEMORY_EXHAUSTED_GUIDANCE: &str = "Server memory exhausted. Try reducing search scope by: 1) Adding more specific search parameters, 2) Reducing the 'limit' parameter, 3) Searching within a specific channel, or 4) Using get_entry for known entry IDs instead of broad searches.";

/// Guidance shown instead of the raw PHP fatal error text.
pub const FATAL_ERROR_GUIDANCE: &str = "Server encountered a fatal error. This may be due to invalid parameters or server configuration issues.";

/// Message attached to a legacy array response that signals zero matches.
pub const NO_RESULTS_GUIDANCE: &str = "No entries found matching the search criteria. Try: 1) Broader search terms, 2) Different channel_name, 3) Checking if entries exist with search_entries using just site_id and channel_name";

/// Message attached to a legacy array response presumed successful.
pub const LEGACY_ARRAY_NOTE: &str = "Response received in PHP array format";

const INVALID_FORMAT_MESSAGE: &str = "Invalid response format from server. The response was neither valid JSON nor recognized PHP array format.";

/// Failure classes surfaced by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    InvalidMethod,
    HttpError,
    MemoryExhausted,
    PhpFatalError,
    InvalidFormat,
    MissingParameter,
    InvalidAction,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::InvalidMethod => "invalid_method",
            ErrorKind::HttpError => "http_error",
            ErrorKind::MemoryExhausted => "memory_exhausted",
            ErrorKind::PhpFatalError => "php_fatal_error",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::MissingParameter => "missing_parameter",
            ErrorKind::InvalidAction => "invalid_action",
        }
    }
}

/// A failed webservice interaction.
///
/// `message` is always safe to show to the caller; raw server output only
/// ever lands in `details`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EeError {
    pub message: String,
    pub status_code: Option<u16>,
    pub kind: ErrorKind,
    pub details: Value,
}

impl EeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            kind,
            details: Value::Null,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// A successful webservice interaction, one variant per outcome kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// The body parsed as JSON.
    Json(Value),
    /// Legacy PHP array text, presumed successful.
    LegacyArray { raw: String },
    /// Legacy PHP array text explicitly reporting zero matches.
    LegacyNoResults { raw: String },
}

impl ActionResult {
    /// The JSON shape handed back to the tool caller.
    pub fn into_value(self) -> Value {
        match self {
            ActionResult::Json(value) => value,
            ActionResult::LegacyArray { raw } => json!({
                "success": true,
                "message": LEGACY_ARRAY_NOTE,
                "raw_response": raw,
                "data_type": "php_array",
            }),
            ActionResult::LegacyNoResults { raw } => json!({
                "success": false,
                "message": NO_RESULTS_GUIDANCE,
                "raw_response": raw,
                "data_type": "php_array_no_results",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanVerdict {
    MemoryExhausted,
    PhpFatal,
    InterpreterNoise,
}

/// Ordered body scans; first match wins. The generic fatal rule assumes the
/// memory rule already did not match, so the order here is load-bearing.
/// Checks are case-sensitive whole-body scans per the webservice contract.
const SCAN_RULES: &[(fn(&str) -> bool, ScanVerdict)] = &[
    (is_memory_fatal, ScanVerdict::MemoryExhausted),
    (is_fatal, ScanVerdict::PhpFatal),
    (is_interpreter_noise, ScanVerdict::InterpreterNoise),
];

fn is_memory_fatal(body: &str) -> bool {
    body.contains("Fatal error") && body.contains("memory size")
}

fn is_fatal(body: &str) -> bool {
    body.contains("Fatal error")
}

fn is_interpreter_noise(body: &str) -> bool {
    body.contains("Warning:") || body.contains("Notice:")
}

/// Classify one raw response into exactly one outcome.
///
/// Pure over its inputs; classifying the same triple twice yields the same
/// outcome.
pub fn classify(status: u16, ok: bool, body: &str) -> Result<ActionResult, EeError> {
    if !ok {
        tracing::error!(status, "API error");
        return Err(EeError::new(ErrorKind::HttpError, format!("API error: {status}"))
            .with_status(status)
            .with_details(json!({ "text": body })));
    }

    for (matches, verdict) in SCAN_RULES {
        if !matches(body) {
            continue;
        }
        match verdict {
            ScanVerdict::MemoryExhausted => {
                tracing::error!("PHP memory exhausted: {body}");
                return Err(
                    EeError::new(ErrorKind::MemoryExhausted, MEMORY_EXHAUSTED_GUIDANCE)
                        .with_status(500)
                        .with_details(json!({ "error_type": "memory_exhausted", "text": body })),
                );
            }
            ScanVerdict::PhpFatal => {
                tracing::error!("PHP fatal error: {body}");
                return Err(EeError::new(ErrorKind::PhpFatalError, FATAL_ERROR_GUIDANCE)
                    .with_status(500)
                    .with_details(json!({ "error_type": "php_fatal_error", "text": body })));
            }
            ScanVerdict::InterpreterNoise => {
                // Warnings and notices are cosmetic; the payload around them
                // is usually still usable. Deliberately not stripped before
                // the JSON parse below.
                tracing::warn!("PHP warning/notice in response: {body}");
            }
        }
        break;
    }

    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Ok(ActionResult::Json(value));
    }

    if body.trim_start().starts_with("Array") {
        if body.contains("No Entry found") {
            return Ok(ActionResult::LegacyNoResults {
                raw: body.to_string(),
            });
        }
        return Ok(ActionResult::LegacyArray {
            raw: body.to_string(),
        });
    }

    tracing::error!("Invalid response format: {body}");
    Err(EeError::new(ErrorKind::InvalidFormat, INVALID_FORMAT_MESSAGE)
        .with_status(status)
        .with_details(json!({ "text": body })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_json_passes_through() {
        let body = r#"{"entries":[{"entry_id":"7","title":"Hello"}]}"#;
        let result = classify(200, true, body).unwrap();
        assert_eq!(
            result,
            ActionResult::Json(serde_json::from_str(body).unwrap())
        );
    }

    #[test]
    fn json_scalar_bodies_still_count_as_json() {
        assert_eq!(
            classify(200, true, "42").unwrap(),
            ActionResult::Json(json!(42))
        );
    }

    #[test]
    fn http_failure_short_circuits_body_checks() {
        let err = classify(500, false, "Fatal error: memory size").unwrap_err();
        assert_eq!(err.kind, ErrorKind::HttpError);
        assert_eq!(err.status_code, Some(500));
        assert_eq!(err.message, "API error: 500");
    }

    #[test]
    fn memory_exhaustion_maps_to_guidance() {
        let body = "Fatal error: Allowed memory size of 134217728 bytes exhausted";
        let err = classify(200, true, body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MemoryExhausted);
        assert_eq!(err.status_code, Some(500));
        assert_eq!(err.message, MEMORY_EXHAUSTED_GUIDANCE);
        // Raw text is preserved for diagnostics, not for the caller.
        assert_eq!(err.details["text"], json!(body));
    }

    #[test]
    fn generic_fatal_without_memory_pattern() {
        let err = classify(200, true, "Fatal error: Call to undefined function").unwrap_err();
        assert_eq!(err.kind, ErrorKind::PhpFatalError);
        assert_eq!(err.status_code, Some(500));
        assert_eq!(err.message, FATAL_ERROR_GUIDANCE);
    }

    #[test]
    fn warning_prefix_breaks_json_and_falls_through_to_invalid_format() {
        // Warnings are logged but not stripped, so warning + JSON fails the
        // parse and lands in the malformed path. Preserved quirk.
        let body = "Warning: something\n{\"ok\":true}";
        let err = classify(200, true, body).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFormat);
        assert_eq!(err.status_code, Some(200));
    }

    #[test]
    fn notice_alone_with_valid_json_never_happens_but_pure_json_is_fine() {
        let result = classify(200, true, r#"{"note":"Notice: embedded"}"#).unwrap();
        assert!(matches!(result, ActionResult::Json(_)));
    }

    #[test]
    fn php_array_body_is_legacy_success() {
        let body = "Array\n(\n    [0] => Array\n        (\n            [entry_id] => 12\n        )\n)\n";
        let result = classify(200, true, body).unwrap();
        assert_eq!(
            result,
            ActionResult::LegacyArray {
                raw: body.to_string()
            }
        );
    }

    #[test]
    fn php_array_with_no_entry_found_is_no_results() {
        let body = "Array\n(\n No Entry found \n)";
        let result = classify(200, true, body).unwrap();
        assert_eq!(
            result,
            ActionResult::LegacyNoResults {
                raw: body.to_string()
            }
        );
    }

    #[test]
    fn leading_whitespace_before_array_token_is_tolerated() {
        let body = "  \nArray\n(\n)";
        assert!(matches!(
            classify(200, true, body).unwrap(),
            ActionResult::LegacyArray { .. }
        ));
    }

    #[test]
    fn neither_json_nor_array_is_invalid_format() {
        let err = classify(200, true, "not json, not array").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidFormat);
        assert_eq!(err.status_code, Some(200));
    }

    #[test]
    fn classification_is_idempotent() {
        let body = "Array\n(\n No Entry found \n)";
        let first = classify(200, true, body).unwrap();
        let second = classify(200, true, body).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn legacy_variants_render_their_wire_shape() {
        let value = ActionResult::LegacyNoResults { raw: "Array".into() }.into_value();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["data_type"], json!("php_array_no_results"));
        let value = ActionResult::LegacyArray { raw: "Array".into() }.into_value();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["data_type"], json!("php_array"));
    }
}
