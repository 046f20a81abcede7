use thiserror::Error;

/// Errors raised while constructing an [`AdsApiClient`](crate::AdsApiClient).
///
/// Request-time failures are reported as
/// [`SourceError`](adscope_engine::SourceError) so the engine can classify
/// them for retry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying `reqwest::Client` could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
