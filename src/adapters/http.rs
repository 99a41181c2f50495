use crate::domain::ports::RecordSource;
use crate::utils::error::{EtlError, FetchError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// 以 bearer token 呼叫 Xubio REST API
pub struct XubioClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl XubioClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(client: Client, base_url: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| EtlError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EtlError::InvalidConfigValueError {
                field: "api.base_url".to_string(),
                value: base_url.to_string(),
                reason: "URL cannot have path segments".to_string(),
            });
        }

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// 片段會被 percent-encode，主鍵值可安全放入路徑
    pub fn url_for(&self, segments: &[&str]) -> std::result::Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Transport("base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RecordSource for XubioClient {
    async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
        timeout: Duration,
    ) -> std::result::Result<Value, FetchError> {
        let url = self.url_for(segments)?;
        tracing::debug!("GET {} {:?}", url, query);

        let mut request = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .timeout(timeout);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| FetchError::MalformedPayload(e.to_string()))
    }
}
