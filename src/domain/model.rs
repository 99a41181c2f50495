use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// API 回傳的原始記錄，欄位集合事先未知
pub type RawRecord = serde_json::Value;

/// 邏輯資源名稱與 API 路徑
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    pub path: String,
    pub strategy: FetchStrategy,
}

impl EndpointDescriptor {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            strategy: FetchStrategy::classify(name),
        }
    }

    pub fn with_strategy(mut self, strategy: FetchStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    DateWindowed,
    Catalog,
    DiagnosticDetail,
}

impl FetchStrategy {
    /// 依端點名稱做靜態分類，未知名稱視為目錄資料
    pub fn classify(endpoint_name: &str) -> Self {
        match endpoint_name {
            "factura_compra" | "factura_venta" | "cobros" | "retenciones" => {
                FetchStrategy::DateWindowed
            }
            "asiento_contable" => FetchStrategy::DiagnosticDetail,
            _ => FetchStrategy::Catalog,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchStrategy::DateWindowed => "monthly windows",
            FetchStrategy::Catalog => "catalog",
            FetchStrategy::DiagnosticDetail => "key-field diagnostic",
        }
    }
}

/// 單月抓取區間，兩端皆包含
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("fechaDesde", self.start.format("%Y-%m-%d").to_string()),
            ("fechaHasta", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

/// 攤平後的值：序列已轉為 JSON 字串，巢狀物件仍為物件
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Map(FlatRecord),
}

impl FlatValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FlatValue::Null => serde_json::Value::Null,
            FlatValue::Bool(b) => serde_json::Value::Bool(*b),
            FlatValue::Number(n) => serde_json::Value::Number(n.clone()),
            FlatValue::Text(s) => serde_json::Value::String(s.clone()),
            FlatValue::Map(record) => record.to_json(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlatValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    pub fields: IndexMap<String, FlatValue>,
}

impl FlatRecord {
    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// 單一端點的抽取結果
#[derive(Debug, Clone)]
pub struct EndpointResult {
    pub endpoint: EndpointDescriptor,
    pub records: Vec<RawRecord>,
}

/// 端點名稱到記錄序列的對應，依端點表順序保存
#[derive(Debug, Clone, Default)]
pub struct ExtractionResultSet {
    results: Vec<EndpointResult>,
}

impl ExtractionResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, endpoint: EndpointDescriptor, records: Vec<RawRecord>) {
        self.results.push(EndpointResult { endpoint, records });
    }

    pub fn get(&self, name: &str) -> Option<&[RawRecord]> {
        self.results
            .iter()
            .find(|r| r.endpoint.name == name)
            .map(|r| r.records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.results.iter().map(|r| r.records.len()).sum()
    }
}

impl IntoIterator for ExtractionResultSet {
    type Item = EndpointResult;
    type IntoIter = std::vec::IntoIter<EndpointResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// 日期欄位涵蓋統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateCoverage {
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
    /// `YYYY-MM`
    pub months: BTreeSet<String>,
}

impl DateCoverage {
    pub fn months_covered(&self) -> usize {
        self.months.len()
    }
}

#[derive(Debug, Clone)]
pub struct EndpointTable {
    pub endpoint: EndpointDescriptor,
    pub records: Vec<FlatRecord>,
    pub coverage: DateCoverage,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub tables: Vec<EndpointTable>,
}

impl TransformResult {
    pub fn total_records(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}
