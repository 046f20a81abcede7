use std::time::Duration;

use thiserror::Error;

/// Failure reported by an [`AdsDataSource`](crate::AdsDataSource) call.
///
/// Variants carry enough context for [`SourceError::is_retryable`] to decide
/// whether the retry policy should try again.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limited by upstream (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("resource not found: {resource}")]
    NotFound { resource: String },

    #[error("permission denied for {resource}")]
    PermissionDenied { resource: String },

    /// Non-2xx response without a structured upstream error code.
    #[error("unexpected HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    /// Structured upstream error, e.g. `QUOTA_EXCEEDED` or `INTERNAL_ERROR`.
    #[error("upstream error {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("invalid response for {context}: {reason}")]
    InvalidResponse { context: String, reason: String },
}

/// Upstream error codes that signal a transient condition.
const TRANSIENT_CODES: &[&str] = &[
    "QUOTA_EXCEEDED",
    "RESOURCE_EXHAUSTED",
    "INTERNAL_ERROR",
    "TRANSIENT_ERROR",
    "RESOURCE_TEMPORARILY_UNAVAILABLE",
];

impl SourceError {
    /// Returns `true` for errors that are worth retrying after a back-off delay.
    ///
    /// **Retryable:**
    /// - Timeouts and connection failures.
    /// - [`SourceError::RateLimited`] (HTTP 429).
    /// - HTTP 500, 502, 503 and 504.
    /// - Upstream codes listed in `TRANSIENT_CODES`, or any upstream message
    ///   mentioning "resource temporarily unavailable".
    ///
    /// Everything else (not found, permission denied, malformed responses,
    /// other 4xx) fails immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::Timeout(_)
            | SourceError::Connection(_)
            | SourceError::RateLimited { .. } => true,
            SourceError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            SourceError::Upstream { code, message } => {
                TRANSIENT_CODES
                    .iter()
                    .any(|c| code.eq_ignore_ascii_case(c))
                    || message
                        .to_lowercase()
                        .contains("resource temporarily unavailable")
            }
            SourceError::NotFound { .. }
            | SourceError::PermissionDenied { .. }
            | SourceError::InvalidResponse { .. } => false,
        }
    }
}

/// Rejections raised before any network call is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid customer id '{0}': expected 1-20 digits (dashes allowed)")]
    CustomerId(String),

    /// An explicit filter with no ids would load every keyword yet resolve
    /// no negatives.
    #[error("{field} is present but lists no ids")]
    EmptyIdList { field: String },

    #[error("{field} contains an empty id")]
    EmptyId { field: String },

    #[error("{field} contains malformed id '{id}': ids must be numeric")]
    MalformedId { field: String, id: String },

    #[error("{field} has {len} ids; at most {max} are allowed per request")]
    TooManyIds { field: String, len: usize, max: usize },

    #[error("page size {page_size} is out of range (1..={max})")]
    PageSize { page_size: u32, max: u32 },

    #[error("concurrency limit {limit} is out of range (1..={max})")]
    Concurrency { limit: usize, max: usize },
}

/// Errors that abort an analysis.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("keyword page at offset {offset} failed after {attempts} attempt(s): {source}")]
    KeywordPage {
        offset: u64,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    #[error(
        "campaign negatives for {campaign_count} campaign(s) failed after {attempts} attempt(s): {source}"
    )]
    CampaignNegatives {
        campaign_count: usize,
        attempts: u32,
        #[source]
        source: SourceError,
    },

    #[error("keyword pagination for customer {customer_id} exceeded {max_keywords} keywords")]
    PaginationLimit { customer_id: String, max_keywords: u64 },

    #[error("analysis exceeded its deadline of {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("analysis cancelled by caller")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(code: &str, message: &str) -> SourceError {
        SourceError::Upstream {
            code: code.to_owned(),
            message: message.to_owned(),
        }
    }

    #[test]
    fn network_failures_are_retryable() {
        assert!(SourceError::Timeout("read".to_owned()).is_retryable());
        assert!(SourceError::Connection("reset".to_owned()).is_retryable());
        assert!(SourceError::RateLimited {
            retry_after_secs: Some(5)
        }
        .is_retryable());
    }

    #[test]
    fn transient_upstream_codes_are_retryable() {
        assert!(upstream("QUOTA_EXCEEDED", "daily quota").is_retryable());
        assert!(upstream("internal_error", "boom").is_retryable());
        assert!(upstream("UNKNOWN", "Resource temporarily unavailable, try later").is_retryable());
    }

    #[test]
    fn permanent_failures_are_not_retryable() {
        assert!(!upstream("INVALID_ARGUMENT", "bad field").is_retryable());
        assert!(!SourceError::NotFound {
            resource: "shared set 9".to_owned()
        }
        .is_retryable());
        assert!(!SourceError::PermissionDenied {
            resource: "customer 1".to_owned()
        }
        .is_retryable());
        assert!(!SourceError::InvalidResponse {
            context: "keywords".to_owned(),
            reason: "eof".to_owned()
        }
        .is_retryable());
    }

    #[test]
    fn status_codes_split_between_transient_and_permanent() {
        let status = |status| SourceError::Status {
            status,
            message: String::new(),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(!status(501).is_retryable());
    }

    #[test]
    fn keyword_page_error_names_offset_and_attempts() {
        let err = EngineError::KeywordPage {
            offset: 500,
            attempts: 3,
            source: SourceError::Timeout("read".to_owned()),
        };
        let msg = err.to_string();
        assert!(msg.contains("offset 500"), "{msg}");
        assert!(msg.contains("3 attempt(s)"), "{msg}");
    }
}
