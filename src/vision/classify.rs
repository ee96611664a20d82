//! Classification of raw attempt outcomes
//!
//! All keyword matching against upstream error wording lives here. The
//! vocabulary the service uses for quota errors is not documented, so expect
//! [`mentions_quota`] to need revision as that wording changes.

use serde_json::Value;

use super::transport::AttemptResult;

/// Markers in an error message that indicate quota or billing exhaustion
const QUOTA_MARKERS: &[&str] = &["quota", "exceeded", "billing"];

/// Why a call was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    /// Quota or billing limit reached
    Quota,
    /// API key rejected; independent of which model was asked
    Auth,
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedOutcome {
    /// The model answered with usable text
    Success(String),
    /// Move on to the next API version or candidate
    SkipVersion,
    /// Stop every remaining attempt of this call
    Abort(AbortKind),
}

/// An outcome plus a human-readable reason for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: ClassifiedOutcome,
    pub reason: String,
}

impl Classification {
    fn skip(reason: impl Into<String>) -> Self {
        Self {
            outcome: ClassifiedOutcome::SkipVersion,
            reason: reason.into(),
        }
    }

    fn abort(kind: AbortKind, reason: impl Into<String>) -> Self {
        Self {
            outcome: ClassifiedOutcome::Abort(kind),
            reason: reason.into(),
        }
    }
}

/// Whether an error message reports quota or billing exhaustion (case-insensitive)
#[must_use]
pub fn mentions_quota(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|m| lower.contains(m))
}

/// Extract `error.message` from an error body
#[must_use]
pub fn error_message(body: Option<&Value>) -> Option<&str> {
    body?.get("error")?.get("message")?.as_str()
}

/// Classify the raw result of one attempt
#[must_use]
pub fn classify(result: &AttemptResult) -> Classification {
    let (status, body) = match result {
        AttemptResult::Transport(failure) => return Classification::skip(failure.to_string()),
        AttemptResult::Http { status, body } => (*status, body.as_ref()),
    };

    match status {
        200 => classify_success_body(body),
        404 => Classification::skip("model not found"),
        400 | 403 => {
            let message = error_message(body).unwrap_or_default();
            if mentions_quota(message) {
                Classification::abort(AbortKind::Quota, truncate(message))
            } else if status == 403 {
                Classification::abort(AbortKind::Auth, truncate(message))
            } else {
                Classification::skip(format!("bad request: {}", truncate(message)))
            }
        }
        other => Classification::skip(format!(
            "status {other}: {}",
            truncate(error_message(body).unwrap_or_default())
        )),
    }
}

/// Inspect a 200 body for safety blocks, bad finish reasons and text
fn classify_success_body(body: Option<&Value>) -> Classification {
    let Some(body) = body else {
        return Classification::skip("response body is not JSON");
    };

    if let Some(reason) = body
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .filter(|r| !r.is_null())
    {
        return Classification::skip(format!("blocked by safety filter: {reason}"));
    }

    let Some(candidate) = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return Classification::skip("no candidates");
    };

    if let Some(finish) = candidate.get("finishReason").and_then(Value::as_str) {
        if !finish.eq_ignore_ascii_case("stop") {
            return Classification::skip(format!("finish reason: {finish}"));
        }
    }

    let text = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .and_then(|parts| parts.iter().find_map(|p| p.get("text").and_then(Value::as_str)))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match text {
        Some(text) => Classification {
            outcome: ClassifiedOutcome::Success(text.to_string()),
            reason: "ok".to_string(),
        },
        None => Classification::skip("no text in response"),
    }
}

/// Upstream messages can be long; keep diagnostics short
fn truncate(message: &str) -> String {
    message.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::vision::transport::TransportFailure;

    fn error_body(message: &str) -> Value {
        json!({ "error": { "code": 400, "message": message } })
    }

    fn text_body(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    // -- mentions_quota --------------------------------------------------------

    #[test]
    fn test_quota_markers_case_insensitive() {
        assert!(mentions_quota("Quota exceeded for metric"));
        assert!(mentions_quota("RESOURCE EXCEEDED"));
        assert!(mentions_quota("Billing account disabled"));
    }

    #[test]
    fn test_unrelated_message_is_not_quota() {
        assert!(!mentions_quota("API key not valid"));
        assert!(!mentions_quota(""));
    }

    // -- transport -------------------------------------------------------------

    #[test]
    fn test_timeout_skips() {
        let c = classify(&AttemptResult::Transport(TransportFailure::Timeout));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
        assert_eq!(c.reason, "timeout");
    }

    #[test]
    fn test_connect_error_skips() {
        let c = classify(&AttemptResult::Transport(TransportFailure::Connect(
            "refused".to_string(),
        )));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    // -- status codes ----------------------------------------------------------

    #[test]
    fn test_not_found_skips() {
        let c = classify(&AttemptResult::http(404, error_body("models/x is not found")));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    #[test]
    fn test_bad_request_with_quota_aborts() {
        let c = classify(&AttemptResult::http(400, error_body("Quota exceeded for quota metric")));
        assert_eq!(c.outcome, ClassifiedOutcome::Abort(AbortKind::Quota));
    }

    #[test]
    fn test_forbidden_with_quota_aborts_as_quota() {
        let c = classify(&AttemptResult::http(403, error_body("billing not enabled")));
        assert_eq!(c.outcome, ClassifiedOutcome::Abort(AbortKind::Quota));
    }

    #[test]
    fn test_forbidden_without_quota_aborts_as_auth() {
        let c = classify(&AttemptResult::http(403, error_body("API key not valid")));
        assert_eq!(c.outcome, ClassifiedOutcome::Abort(AbortKind::Auth));
    }

    #[test]
    fn test_forbidden_without_body_aborts_as_auth() {
        let c = classify(&AttemptResult::Http {
            status: 403,
            body: None,
        });
        assert_eq!(c.outcome, ClassifiedOutcome::Abort(AbortKind::Auth));
    }

    #[test]
    fn test_plain_bad_request_skips() {
        let c = classify(&AttemptResult::http(400, error_body("Invalid argument")));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    #[test]
    fn test_server_error_skips_even_with_quota_words() {
        let c = classify(&AttemptResult::http(429, error_body("Quota exceeded")));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);

        let c = classify(&AttemptResult::http(503, error_body("overloaded")));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    // -- 200 bodies ------------------------------------------------------------

    #[test]
    fn test_text_is_success() {
        let c = classify(&AttemptResult::http(200, text_body("  A red mug on a desk  ")));
        assert_eq!(
            c.outcome,
            ClassifiedOutcome::Success("A red mug on a desk".to_string())
        );
    }

    #[test]
    fn test_safety_block_skips() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let c = classify(&AttemptResult::http(200, body));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
        assert!(c.reason.contains("safety"));
    }

    #[test]
    fn test_non_stop_finish_reason_skips() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "partial" }] },
                "finishReason": "MAX_TOKENS"
            }]
        });
        let c = classify(&AttemptResult::http(200, body));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    #[test]
    fn test_missing_finish_reason_is_accepted() {
        let body = json!({ "candidates": [{ "content": { "parts": [{ "text": "ok" }] } }] });
        let c = classify(&AttemptResult::http(200, body));
        assert_eq!(c.outcome, ClassifiedOutcome::Success("ok".to_string()));
    }

    #[test]
    fn test_text_found_in_later_part() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": {} }, { "text": "second" }] },
                "finishReason": "STOP"
            }]
        });
        let c = classify(&AttemptResult::http(200, body));
        assert_eq!(c.outcome, ClassifiedOutcome::Success("second".to_string()));
    }

    #[test]
    fn test_empty_text_skips() {
        let c = classify(&AttemptResult::http(200, text_body("   ")));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    #[test]
    fn test_no_candidates_skips() {
        let c = classify(&AttemptResult::http(200, json!({ "candidates": [] })));
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }

    #[test]
    fn test_non_json_success_skips() {
        let c = classify(&AttemptResult::Http {
            status: 200,
            body: None,
        });
        assert_eq!(c.outcome, ClassifiedOutcome::SkipVersion);
    }
}
