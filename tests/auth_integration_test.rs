use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;
use std::time::Duration;
use xubio_etl::config::extraction::Credentials;
use xubio_etl::domain::ports::RecordSource;
use xubio_etl::utils::error::{ErrorCategory, ErrorSeverity};
use xubio_etl::{EtlError, TokenClient, XubioClient};

fn credentials() -> Credentials {
    Credentials {
        client_id: "etl_client".to_string(),
        client_secret: "secret_123".to_string(),
    }
}

/// 取得 token 後以 bearer 呼叫 API
#[tokio::test]
async fn test_token_is_used_as_bearer() -> Result<()> {
    let server = MockServer::start();

    let token_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/TokenEndpoint")
            .body_contains("grant_type=client_credentials");
        then.status(200)
            .json_body(json!({"access_token": "issued-token", "expires_in": 3600}));
    });
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/cuenta")
            .header("Authorization", "Bearer issued-token");
        then.status(200).json_body(json!([{"codigo": "1.1.01"}]));
    });

    let token = TokenClient::new(
        &server.url("/TokenEndpoint"),
        credentials(),
        Duration::from_secs(5),
    )
    .fetch_token()
    .await?;

    let client = XubioClient::new(&server.base_url(), token)?;
    let payload = client
        .get_json(&["cuenta"], &[], Duration::from_secs(5))
        .await?;

    token_mock.assert();
    api_mock.assert();
    assert_eq!(payload, json!([{"codigo": "1.1.01"}]));

    Ok(())
}

#[tokio::test]
async fn test_token_failure_is_fatal() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/TokenEndpoint");
        then.status(401).json_body(json!({"error": "invalid_client"}));
    });

    let err = TokenClient::new(
        &server.url("/TokenEndpoint"),
        credentials(),
        Duration::from_secs(5),
    )
    .fetch_token()
    .await
    .unwrap_err();

    assert!(matches!(err, EtlError::AuthError { .. }));
    assert_eq!(err.category(), ErrorCategory::Authentication);
    assert_eq!(err.severity(), ErrorSeverity::Critical);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_token_endpoint() -> Result<()> {
    // 保留的 port 0 無法連線
    let client = TokenClient::new(
        "http://127.0.0.1:0/TokenEndpoint",
        credentials(),
        Duration::from_secs(2),
    );

    assert!(matches!(
        client.fetch_token().await,
        Err(EtlError::AuthError { .. })
    ));

    Ok(())
}
