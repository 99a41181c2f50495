use crate::core::windows::MonthWindows;
use crate::domain::model::{EndpointDescriptor, RawRecord};
use crate::domain::ports::RecordSource;
use crate::utils::error::FetchError;
use chrono::NaiveDate;
use serde_json::Value;
use std::time::Duration;

/// 陣列 -> 各元素；null 或空值 -> 無記錄；其他 -> 單一記錄
pub fn normalize_payload(payload: Value) -> Vec<RawRecord> {
    match payload {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(ref obj) if obj.is_empty() => Vec::new(),
        Value::String(ref s) if s.is_empty() => Vec::new(),
        other => vec![other],
    }
}

/// 單次未分段請求，失敗時回傳錯誤交由呼叫端吸收
pub async fn fetch_all<R: RecordSource + ?Sized>(
    source: &R,
    endpoint: &EndpointDescriptor,
    timeout: Duration,
) -> Result<Vec<RawRecord>, FetchError> {
    let payload = source.get_json(&[endpoint.path.as_str()], &[], timeout).await?;
    Ok(normalize_payload(payload))
}

/// 依月份區間逐一抓取日期型端點
pub struct WindowedFetcher<'a, R: RecordSource + ?Sized> {
    source: &'a R,
    timeout: Duration,
    pause: Duration,
}

impl<'a, R: RecordSource + ?Sized> WindowedFetcher<'a, R> {
    pub fn new(source: &'a R, timeout: Duration, pause: Duration) -> Self {
        Self {
            source,
            timeout,
            pause,
        }
    }

    pub async fn fetch(
        &self,
        endpoint: &EndpointDescriptor,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<RawRecord> {
        tracing::info!(
            "📅 {}: fetching month by month from {} to {}",
            endpoint.name,
            start,
            end
        );

        let mut all_records = Vec::new();
        let mut windows = MonthWindows::new(start, end).peekable();

        while let Some(window) = windows.next() {
            let query = window.query_params();
            let label = window.start.format("%B %Y").to_string();

            match self
                .source
                .get_json(&[endpoint.path.as_str()], &query, self.timeout)
                .await
            {
                Ok(payload) => {
                    let records = normalize_payload(payload);
                    if records.is_empty() {
                        tracing::info!(
                            "   📊 {}: {} → {} → ⚪ no data",
                            label,
                            window.start,
                            window.end
                        );
                    } else {
                        tracing::info!(
                            "   📊 {}: {} → {} → ✅ {} records",
                            label,
                            window.start,
                            window.end,
                            records.len()
                        );
                        all_records.extend(records);
                    }
                }
                Err(FetchError::Timeout) => {
                    tracing::warn!("   📊 {}: {} → {} → ⏰ timeout", label, window.start, window.end);
                }
                Err(err) => {
                    tracing::warn!(
                        "   📊 {}: {} → {} → ❌ {} ({})",
                        label,
                        window.start,
                        window.end,
                        err,
                        endpoint.path
                    );
                }
            }

            if windows.peek().is_some() && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        tracing::info!("   🎯 Total {}: {} records", endpoint.name, all_records.len());
        all_records
    }
}

/// 不分段的目錄型端點
pub struct CatalogFetcher<'a, R: RecordSource + ?Sized> {
    source: &'a R,
    timeout: Duration,
}

impl<'a, R: RecordSource + ?Sized> CatalogFetcher<'a, R> {
    pub fn new(source: &'a R, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub async fn fetch(&self, endpoint: &EndpointDescriptor) -> Vec<RawRecord> {
        tracing::info!("📋 {}: fetching catalog", endpoint.name);

        match fetch_all(self.source, endpoint, self.timeout).await {
            Ok(records) => {
                tracing::info!("   ✅ {} records", records.len());
                records
            }
            Err(err) => {
                tracing::warn!("   ❌ {} ({}): {}", endpoint.name, endpoint.path, err);
                Vec::new()
            }
        }
    }
}
