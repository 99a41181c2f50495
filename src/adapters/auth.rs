use crate::config::extraction::Credentials;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// client-credentials 交換，只負責取得一次 token
pub struct TokenClient {
    client: Client,
    token_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl TokenClient {
    pub fn new(token_url: &str, credentials: Credentials, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.to_string(),
            credentials,
            timeout,
        }
    }

    pub async fn fetch_token(&self) -> Result<String> {
        tracing::info!("🔑 Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials"), ("scope", "api_auth")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EtlError::AuthError {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::AuthError {
                message: format!("token endpoint answered {}", status),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| EtlError::AuthError {
            message: format!("invalid token response: {}", e),
        })?;

        if token.access_token.is_empty() {
            return Err(EtlError::AuthError {
                message: "empty access_token".to_string(),
            });
        }

        tracing::info!("✅ Access token obtained");
        Ok(token.access_token)
    }
}
