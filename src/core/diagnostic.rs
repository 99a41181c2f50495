use crate::config::extraction::{DiagnosticMode, DiagnosticSettings, PacingPolicy};
use crate::core::fetcher::fetch_all;
use crate::domain::model::{EndpointDescriptor, RawRecord};
use crate::domain::ports::RecordSource;
use indexmap::IndexMap;
use serde_json::Value;
use std::time::Duration;

/// 欄位名稱（小寫）包含其中任一字串即視為識別欄位候選
pub const IDENTIFIER_MARKERS: &[&str] = &["id", "numero", "codigo", "clave", "transaccion", "key"];

/// 依明確程度排序的候選欄位名稱
pub const KEY_FIELD_CANDIDATES: &[&str] = &[
    "transaccionId",
    "id",
    "idAsiento",
    "numeroAsiento",
    "asientoId",
    "codigoAsiento",
    "numeroTransaccion",
    "transactionId",
    "entryId",
    "journalId",
    "accountingEntryId",
    "codigo",
    "numero",
    "clave",
    "key",
];

const MAX_LOGGED_FAILURES: usize = 3;
const PROGRESS_EVERY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyField {
    Found(String),
    NotFound,
}

impl KeyField {
    pub fn name(&self) -> Option<&str> {
        match self {
            KeyField::Found(name) => Some(name),
            KeyField::NotFound => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyFieldDiagnosis {
    pub sample_size: usize,
    /// 欄位在樣本中出現的次數，依首次出現順序
    pub field_frequency: IndexMap<String, usize>,
    /// 名稱像識別欄位的欄位，依首次出現順序
    pub identifier_like: Vec<String>,
    pub selection: KeyField,
}

impl KeyFieldDiagnosis {
    pub fn most_frequent(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut fields: Vec<_> = self
            .field_frequency
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        // sort_by 為穩定排序，同次數維持出現順序
        fields.sort_by(|a, b| b.1.cmp(&a.1));
        fields.truncate(limit);
        fields
    }
}

fn is_identifier_like(field: &str) -> bool {
    let lower = field.to_lowercase();
    IDENTIFIER_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// 從前 `sample_size` 筆標頭推斷主鍵欄位
pub fn infer_key_field(headers: &[RawRecord], sample_size: usize) -> KeyFieldDiagnosis {
    let sample = &headers[..headers.len().min(sample_size)];
    let mut field_frequency: IndexMap<String, usize> = IndexMap::new();
    let mut identifier_like: Vec<String> = Vec::new();

    for record in sample {
        let Value::Object(obj) = record else {
            continue;
        };
        for field in obj.keys() {
            *field_frequency.entry(field.clone()).or_insert(0) += 1;
            if is_identifier_like(field) && !identifier_like.contains(field) {
                identifier_like.push(field.clone());
            }
        }
    }

    let selection = KEY_FIELD_CANDIDATES
        .iter()
        .find(|candidate| identifier_like.iter().any(|f| f == *candidate))
        .map(|candidate| candidate.to_string())
        .or_else(|| {
            identifier_like
                .iter()
                .find(|f| f.to_lowercase().contains("id"))
                .cloned()
        })
        .or_else(|| identifier_like.first().cloned())
        .map_or(KeyField::NotFound, KeyField::Found);

    KeyFieldDiagnosis {
        sample_size: sample.len(),
        field_frequency,
        identifier_like,
        selection,
    }
}

/// 取出可用於明細路徑的主鍵值
fn key_value(record: &RawRecord, key_field: &str) -> Option<String> {
    match record.get(key_field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailStats {
    pub detailed: usize,
    pub header_only: usize,
}

/// 先抓標頭，推斷主鍵後逐筆抓明細
pub struct KeyFieldDiagnostic<'a, R: RecordSource + ?Sized> {
    source: &'a R,
    settings: &'a DiagnosticSettings,
    pacing: &'a PacingPolicy,
    headers_timeout: Duration,
    detail_timeout: Duration,
}

impl<'a, R: RecordSource + ?Sized> KeyFieldDiagnostic<'a, R> {
    pub fn new(
        source: &'a R,
        settings: &'a DiagnosticSettings,
        pacing: &'a PacingPolicy,
        headers_timeout: Duration,
        detail_timeout: Duration,
    ) -> Self {
        Self {
            source,
            settings,
            pacing,
            headers_timeout,
            detail_timeout,
        }
    }

    pub async fn fetch_with_detail(&self, endpoint: &EndpointDescriptor) -> Vec<RawRecord> {
        tracing::info!("📊 {}: fetching headers for detail expansion", endpoint.name);

        let headers = match fetch_all(self.source, endpoint, self.headers_timeout).await {
            Ok(headers) => headers,
            Err(err) => {
                tracing::warn!("   ❌ {} ({}): {}", endpoint.name, endpoint.path, err);
                return Vec::new();
            }
        };

        if headers.is_empty() {
            tracing::info!("   ⚪ no headers to process");
            return headers;
        }
        tracing::info!("   ✅ {} headers", headers.len());

        if self.settings.mode == DiagnosticMode::StructureOnly {
            return self.structure_only(headers);
        }

        let diagnosis = infer_key_field(&headers, self.settings.sample_size);
        log_diagnosis(&diagnosis);

        let KeyField::Found(key_field) = &diagnosis.selection else {
            tracing::warn!(
                "   ⚠️ no key field identified, keeping {} header records",
                headers.len()
            );
            return headers;
        };

        let (records, stats) = self.expand_details(endpoint, headers, key_field).await;
        tracing::info!(
            "   🎯 {}: {} records ({} with detail, {} header only, key '{}')",
            endpoint.name,
            records.len(),
            stats.detailed,
            stats.header_only,
            key_field
        );
        records
    }

    /// 每筆標頭替換成明細；任何失敗都保留原標頭，不重排也不過濾
    pub async fn expand_details(
        &self,
        endpoint: &EndpointDescriptor,
        headers: Vec<RawRecord>,
        key_field: &str,
    ) -> (Vec<RawRecord>, DetailStats) {
        tracing::info!("   🔄 fetching detail using field '{}'", key_field);

        let total = headers.len();
        let batch = self.pacing.detail_batch_size.max(1);
        let mut stats = DetailStats::default();
        let mut records = Vec::with_capacity(total);

        for (index, header) in headers.into_iter().enumerate() {
            let position = index + 1;

            // 每完成一批明細請求後暫停，最後一批之後不暫停
            if index > 0 && index % batch == 0 && !self.pacing.detail_batch_pause.is_zero() {
                tokio::time::sleep(self.pacing.detail_batch_pause).await;
            }

            let Some(id) = key_value(&header, key_field) else {
                stats.header_only += 1;
                records.push(header);
                continue;
            };

            let detail = self
                .source
                .get_json(&[endpoint.path.as_str(), id.as_str()], &[], self.detail_timeout)
                .await;

            match detail {
                Ok(payload @ Value::Object(_)) => {
                    stats.detailed += 1;
                    records.push(payload);
                    if position % PROGRESS_EVERY == 0 {
                        tracing::info!(
                            "      [{}/{}] ✅ {} detailed, {} errors",
                            position,
                            total,
                            stats.detailed,
                            stats.header_only
                        );
                    }
                }
                Ok(other) => {
                    if stats.header_only < MAX_LOGGED_FAILURES {
                        tracing::warn!(
                            "      [{}/{}] ⚠️ unexpected detail payload for ID '{}': {}",
                            position,
                            total,
                            id,
                            truncate(&other.to_string(), 50)
                        );
                    }
                    stats.header_only += 1;
                    records.push(header);
                }
                Err(err) => {
                    if stats.header_only < MAX_LOGGED_FAILURES {
                        tracing::warn!(
                            "      [{}/{}] ❌ {} for ID '{}'",
                            position,
                            total,
                            err,
                            id
                        );
                    }
                    stats.header_only += 1;
                    records.push(header);
                }
            }
        }

        (records, stats)
    }

    fn structure_only(&self, headers: Vec<RawRecord>) -> Vec<RawRecord> {
        if let Some(Value::Object(first)) = headers.first() {
            tracing::info!("   📋 structure of the first record:");
            for (field, value) in first {
                tracing::info!(
                    "      • {:<25} ({:<7}): {}",
                    field,
                    json_type(value),
                    truncate(&preview(value), 100)
                );
            }
            if let Ok(pretty) = serde_json::to_string_pretty(&headers[0]) {
                tracing::debug!("   📄 first record:\n{}", truncate(&pretty, 2000));
            }
        }

        headers
            .into_iter()
            .take(self.settings.structure_preview_records)
            .collect()
    }
}

fn log_diagnosis(diagnosis: &KeyFieldDiagnosis) {
    tracing::info!(
        "   🔍 analysed {} sample records, {} distinct fields",
        diagnosis.sample_size,
        diagnosis.field_frequency.len()
    );

    if diagnosis.identifier_like.is_empty() {
        tracing::warn!("   ⚠️ no identifier-like fields, most common fields:");
        for (field, count) in diagnosis.most_frequent(10) {
            tracing::info!("      • {}: {}/{}", field, count, diagnosis.sample_size);
        }
    } else {
        for field in &diagnosis.identifier_like {
            let count = diagnosis.field_frequency.get(field).copied().unwrap_or(0);
            tracing::info!(
                "      • {} (present in {}/{})",
                field,
                count,
                diagnosis.sample_size
            );
        }
    }

    if let KeyField::Found(field) = &diagnosis.selection {
        tracing::info!("   ✅ key field selected: '{}'", field);
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
