//! HTTP client for the ads reporting API.
//!
//! Every call is a single JSON `GET` under `{base}/v1/customers/{id}/`.
//! Failures are mapped onto [`SourceError`] so the engine's retry policy can
//! tell transient conditions (timeouts, 429, 5xx, quota codes) from
//! permanent ones (404, 401/403, malformed bodies).

use std::time::Duration;

use adscope_core::{AppConfig, CampaignNegatives, Keyword, NegativeKeyword, Page, SharedListRef};
use adscope_engine::{AdsDataSource, SourceError};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::wire::{
    CampaignNegativesResponse, ErrorEnvelope, KeywordsResponse, NegativesResponse,
    SharedListsResponse, SharedSetsResponse,
};

/// Client for the ads API.
pub struct AdsApiClient {
    client: Client,
    api_token: Option<String>,
    base_url: Url,
}

impl std::fmt::Debug for AdsApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

impl AdsApiClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`ClientError::InvalidBaseUrl`] if `base_url` is not an
    /// absolute `http(s)` URL.
    pub fn new(
        base_url: &str,
        api_token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("adscope/0.1 (negative-keyword-audit)")
            .build()?;

        // Exactly one trailing slash, so endpoint segments append to the
        // configured path instead of replacing its last segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| ClientError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "expected an absolute http(s) URL".to_owned(),
            });
        }

        Ok(Self {
            client,
            api_token: api_token.filter(|t| !t.is_empty()).map(str::to_owned),
            base_url: parsed,
        })
    }

    /// # Errors
    ///
    /// See [`AdsApiClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(
            &config.api_base_url,
            config.api_token.as_deref(),
            config.request_timeout_secs,
        )
    }

    /// Builds `{base}/v1/customers/{customer_id}/{path...}?{query}` with every
    /// segment and query value percent-encoded.
    fn endpoint(&self, customer_id: &str, path: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "customers", customer_id])
                .extend(path);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T, SourceError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&e, resource))?;

        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, resource))?;

        if !status.is_success() {
            let error = map_status(status, retry_after_secs, resource, &body);
            tracing::debug!(resource, status = status.as_u16(), error = %error, "ads API request failed");
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| SourceError::InvalidResponse {
            context: resource.to_owned(),
            reason: e.to_string(),
        })
    }
}

fn transport_error(error: &reqwest::Error, resource: &str) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout(resource.to_owned())
    } else {
        SourceError::Connection(format!("{resource}: {error}"))
    }
}

/// Classifies a non-2xx response.
///
/// 5xx statuses stay [`SourceError::Status`] even when the body carries an
/// error code, so their retryability follows the status. 4xx bodies with a
/// code become [`SourceError::Upstream`], which lets quota codes retry.
fn map_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    resource: &str,
    body: &str,
) -> SourceError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited { retry_after_secs },
        StatusCode::NOT_FOUND => SourceError::NotFound {
            resource: resource.to_owned(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SourceError::PermissionDenied {
            resource: resource.to_owned(),
        },
        _ => error_from_body(status, body),
    }
}

fn error_from_body(status: StatusCode, body: &str) -> SourceError {
    let Ok(ErrorEnvelope { error }) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return SourceError::Status {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        };
    };
    match error.code {
        Some(code) if !status.is_server_error() => SourceError::Upstream {
            code,
            message: error.message,
        },
        Some(code) => SourceError::Status {
            status: status.as_u16(),
            message: format!("{code}: {}", error.message),
        },
        None => SourceError::Status {
            status: status.as_u16(),
            message: error.message,
        },
    }
}

#[async_trait]
impl AdsDataSource for AdsApiClient {
    async fn fetch_keywords(
        &self,
        customer_id: &str,
        campaign_ids: Option<&[String]>,
        page_size: u32,
        offset: u64,
    ) -> Result<Page<Keyword>, SourceError> {
        let limit = page_size.to_string();
        let offset_value = offset.to_string();
        let mut query = vec![("limit", limit.as_str()), ("offset", offset_value.as_str())];
        for id in campaign_ids.unwrap_or_default() {
            query.push(("campaign_id", id.as_str()));
        }
        let url = self.endpoint(customer_id, &["keywords"], &query);
        let resource = format!("keywords page at offset {offset}");
        let response: KeywordsResponse = self.get_json(url, &resource).await?;
        Ok(Page {
            items: response.keywords,
            total: response.total,
        })
    }

    async fn fetch_shared_negative_lists(
        &self,
        customer_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError> {
        let url = self.endpoint(customer_id, &["sharedNegativeLists"], &[]);
        let response: SharedListsResponse = self
            .get_json(url, &format!("shared negative lists of customer {customer_id}"))
            .await?;
        Ok(response.shared_lists)
    }

    async fn fetch_campaign_shared_sets(
        &self,
        customer_id: &str,
        campaign_id: &str,
    ) -> Result<Vec<SharedListRef>, SourceError> {
        let url = self.endpoint(customer_id, &["campaigns", campaign_id, "sharedSets"], &[]);
        let response: SharedSetsResponse = self
            .get_json(url, &format!("shared sets of campaign {campaign_id}"))
            .await?;
        Ok(response.shared_sets)
    }

    async fn fetch_shared_set_negatives(
        &self,
        customer_id: &str,
        shared_set_id: &str,
    ) -> Result<Vec<NegativeKeyword>, SourceError> {
        let url = self.endpoint(customer_id, &["sharedSets", shared_set_id, "negatives"], &[]);
        let response: NegativesResponse = self
            .get_json(url, &format!("shared set {shared_set_id}"))
            .await?;
        Ok(response.negatives)
    }

    async fn fetch_campaign_negatives(
        &self,
        customer_id: &str,
        campaign_ids: &[String],
    ) -> Result<Vec<CampaignNegatives>, SourceError> {
        let query: Vec<(&str, &str)> = campaign_ids
            .iter()
            .map(|id| ("campaign_id", id.as_str()))
            .collect();
        let url = self.endpoint(customer_id, &["campaignNegatives"], &query);
        let response: CampaignNegativesResponse = self
            .get_json(url, &format!("negatives of {} campaign(s)", campaign_ids.len()))
            .await?;
        Ok(response.campaigns)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
