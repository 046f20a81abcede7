use super::*;

fn test_client(base_url: &str) -> AdsApiClient {
    AdsApiClient::new(base_url, Some("secret-token"), 30).expect("client construction should not fail")
}

#[test]
fn endpoint_builds_customer_scoped_path() {
    let client = test_client("https://ads.example.com");
    let url = client.endpoint("123", &["campaigns", "55", "sharedSets"], &[]);
    assert_eq!(
        url.as_str(),
        "https://ads.example.com/v1/customers/123/campaigns/55/sharedSets"
    );
}

#[test]
fn endpoint_keeps_base_path_and_repeats_query_keys() {
    let client = test_client("https://ads.example.com/api/");
    let url = client.endpoint(
        "123",
        &["keywords"],
        &[("limit", "500"), ("campaign_id", "1"), ("campaign_id", "2")],
    );
    assert_eq!(
        url.as_str(),
        "https://ads.example.com/api/v1/customers/123/keywords?limit=500&campaign_id=1&campaign_id=2"
    );
}

#[test]
fn endpoint_encodes_path_segments() {
    let client = test_client("https://ads.example.com");
    let url = client.endpoint("123", &["sharedSets", "a/b c", "negatives"], &[]);
    assert!(
        url.as_str().contains("sharedSets/a%2Fb%20c/negatives"),
        "segment should be percent-encoded: {url}"
    );
}

#[test]
fn rejects_non_http_base_url() {
    assert!(matches!(
        AdsApiClient::new("mailto:ads@example.com", None, 30),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        AdsApiClient::new("not a url", None, 30),
        Err(ClientError::InvalidBaseUrl { .. })
    ));
}

#[test]
fn debug_output_redacts_token() {
    let rendered = format!("{:?}", test_client("https://ads.example.com"));
    assert!(!rendered.contains("secret-token"), "{rendered}");
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn status_mapping_covers_well_known_codes() {
    assert!(matches!(
        map_status(StatusCode::TOO_MANY_REQUESTS, Some(7), "r", ""),
        SourceError::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
    assert!(matches!(
        map_status(StatusCode::NOT_FOUND, None, "shared set 9", ""),
        SourceError::NotFound { ref resource } if resource == "shared set 9"
    ));
    assert!(matches!(
        map_status(StatusCode::FORBIDDEN, None, "r", ""),
        SourceError::PermissionDenied { .. }
    ));
}

#[test]
fn client_error_with_code_is_upstream_and_server_error_stays_status() {
    let quota = r#"{"error":{"code":"QUOTA_EXCEEDED","message":"daily quota"}}"#;
    let err = map_status(StatusCode::BAD_REQUEST, None, "r", quota);
    assert!(matches!(err, SourceError::Upstream { ref code, .. } if code == "QUOTA_EXCEEDED"));
    assert!(err.is_retryable());

    let invalid = r#"{"error":{"code":"INVALID_ARGUMENT","message":"bad field"}}"#;
    assert!(!map_status(StatusCode::BAD_REQUEST, None, "r", invalid).is_retryable());

    let err = map_status(StatusCode::SERVICE_UNAVAILABLE, None, "r", invalid);
    assert!(matches!(err, SourceError::Status { status: 503, .. }));
    assert!(err.is_retryable());
}

#[test]
fn unparseable_error_body_is_kept_as_status_message() {
    let err = map_status(StatusCode::BAD_GATEWAY, None, "r", "<html>bad gateway</html>");
    assert!(
        matches!(err, SourceError::Status { status: 502, ref message } if message.contains("bad gateway"))
    );
}
