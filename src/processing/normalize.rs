//! Turning raw model replies into JSON records.
//!
//! Models frequently wrap JSON in a markdown code fence. The fence is removed before parsing,
//! and any failure is folded into an `{error, raw_output}` record instead of an `Err`.

use super::types::ParsedRecord;
use regex::Regex;
use serde_json::json;
use std::fmt;
use std::sync::LazyLock;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(json)?\s*").expect("valid opening fence regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("valid closing fence regex"));

/// Why a request ended in an error record. Rendered as the prefix of the `error` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Model endpoint could not be reached or timed out.
    UpstreamUnreachable,
    /// Model endpoint answered with a non-success status.
    UpstreamStatus,
    /// Response body lacked the expected candidate text.
    MalformedEnvelope,
    /// Candidate text was not valid JSON.
    InvalidJson,
}

impl FailureKind {
    /// Stable snake_case tag for this failure.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpstreamUnreachable => "upstream_unreachable",
            Self::UpstreamStatus => "upstream_status",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::InvalidJson => "invalid_json",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the `{error, raw_output}` record for a failed request.
pub fn error_record(kind: FailureKind, message: &str, raw_output: &str) -> ParsedRecord {
    json!({
        "error": format!("{kind}: {message}"),
        "raw_output": raw_output,
    })
}

/// Returns `true` when `record` has exactly the shape produced by [`error_record`].
pub fn is_error_record(record: &ParsedRecord) -> bool {
    record.as_object().is_some_and(|map| {
        map.len() == 2 && map.contains_key("error") && map.contains_key("raw_output")
    })
}

/// Remove a surrounding ```` ``` ```` or ```` ```json ```` fence. Unfenced text is returned as-is.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text;
    }
    let without_open = match OPENING_FENCE.find(trimmed) {
        Some(found) => &trimmed[found.end()..],
        None => trimmed,
    };
    let without_open = without_open.trim();
    match CLOSING_FENCE.find(without_open) {
        Some(found) => &without_open[..found.start()],
        None => without_open,
    }
}

/// Parse model text into a record, reporting `raw_text` itself as `raw_output` on failure.
pub fn normalize(raw_text: &str) -> ParsedRecord {
    normalize_with_raw(raw_text, raw_text)
}

/// Parse model text into a record, reporting `raw_output` (usually the full provider body)
/// on failure.
pub fn normalize_with_raw(text: &str, raw_output: &str) -> ParsedRecord {
    match serde_json::from_str::<ParsedRecord>(strip_code_fence(text)) {
        Ok(record) => record,
        Err(error) => {
            tracing::warn!(error = %error, length = text.len(), "Model reply was not valid JSON");
            error_record(FailureKind::InvalidJson, &error.to_string(), raw_output)
        }
    }
}
