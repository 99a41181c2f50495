use crate::domain::model::{EndpointDescriptor, FetchStrategy};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://xubio.com/API/1.1";
pub const DEFAULT_TOKEN_URL: &str = "https://xubio.com/API/1.1/TokenEndpoint";
pub const DEFAULT_START_DATE: &str = "2024-01-01";
pub const SUPPORTED_FORMATS: &[&str] = &["xlsx", "csv"];

/// 端點表（順序即執行順序）
pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    [
        ("asiento_contable", "asientoContableManualBean"),
        ("clientes", "clienteBean"),
        ("retenciones", "retencionBean"),
        ("cuentas", "cuenta"),
        ("factura_compra", "comprobanteCompraBean"),
        ("factura_venta", "comprobanteVentaBean"),
        ("cobros", "cobranzaBean"),
        ("pagos", "pagoBean"),
        ("categorias_cuentas", "categoriaCuenta"),
    ]
    .into_iter()
    .map(|(name, path)| EndpointDescriptor::new(name, path))
    .collect()
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.client_id.chars().take(15).collect();
        f.debug_struct("Credentials")
            .field("client_id", &format!("{}...", visible))
            .field("client_secret", &"***")
            .finish()
    }
}

/// 請求節流策略：所有請求循序發出，並在固定點暫停
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingPolicy {
    pub between_windows: Duration,
    pub between_endpoints: Duration,
    pub detail_batch_size: usize,
    pub detail_batch_pause: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            between_windows: Duration::from_millis(500),
            between_endpoints: Duration::from_secs(1),
            detail_batch_size: 10,
            detail_batch_pause: Duration::from_millis(500),
        }
    }
}

impl PacingPolicy {
    /// 不暫停，測試用
    pub fn none() -> Self {
        Self {
            between_windows: Duration::ZERO,
            between_endpoints: Duration::ZERO,
            detail_batch_size: 10,
            detail_batch_pause: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    pub token: Duration,
    pub window: Duration,
    pub catalog: Duration,
    pub headers: Duration,
    pub detail: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            token: Duration::from_secs(30),
            window: Duration::from_secs(90),
            catalog: Duration::from_secs(180),
            headers: Duration::from_secs(120),
            detail: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticMode {
    #[default]
    Full,
    StructureOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSettings {
    pub mode: DiagnosticMode,
    pub sample_size: usize,
    /// structure-only 模式回傳的標頭數
    pub structure_preview_records: usize,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            mode: DiagnosticMode::Full,
            sample_size: 5,
            structure_preview_records: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPolicy {
    /// 只取第一筆記錄的欄位
    FirstRecord,
    /// 第一筆記錄的欄位，再依出現順序補上其他欄位
    #[default]
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub output_path: String,
    pub formats: Vec<String>,
    pub column_policy: ColumnPolicy,
    pub date_field_marker: String,
    pub max_column_width: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            formats: vec!["xlsx".to_string()],
            column_policy: ColumnPolicy::Union,
            date_field_marker: "fecha".to_string(),
            max_column_width: 50,
        }
    }
}

impl OutputSettings {
    pub fn wants(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f == format)
    }
}

/// 單次執行的完整設定，建構後不再變動
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub token_url: String,
    pub credentials: Credentials,
    pub start_date: NaiveDate,
    /// `None` 表示以執行當日為結束日
    pub end_date: Option<NaiveDate>,
    pub endpoints: Vec<EndpointDescriptor>,
    pub pacing: PacingPolicy,
    pub timeouts: Timeouts,
    pub diagnostic: DiagnosticSettings,
    pub output: OutputSettings,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            credentials: Credentials::default(),
            start_date: NaiveDate::parse_from_str(DEFAULT_START_DATE, "%Y-%m-%d")
                .unwrap_or(NaiveDate::MIN),
            end_date: None,
            endpoints: default_endpoints(),
            pacing: PacingPolicy::default(),
            timeouts: Timeouts::default(),
            diagnostic: DiagnosticSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

impl ExtractionConfig {
    /// 抽取結束日，未設定時以今天為準
    pub fn resolved_end_date(&self) -> NaiveDate {
        self.end_date_or(chrono::Local::now().date_naive())
    }

    /// 未設定結束日時使用 `run_date`
    pub fn end_date_or(&self, run_date: NaiveDate) -> NaiveDate {
        self.end_date.unwrap_or(run_date)
    }

    pub fn endpoints_with(
        &self,
        strategy: FetchStrategy,
    ) -> impl Iterator<Item = &EndpointDescriptor> + '_ {
        self.endpoints.iter().filter(move |e| e.strategy == strategy)
    }

    pub fn validate_credentials(&self) -> Result<()> {
        if self.credentials.client_id.trim().is_empty() {
            return Err(crate::utils::error::EtlError::MissingConfigError {
                field: "client_id".to_string(),
            });
        }
        if self.credentials.client_secret.trim().is_empty() {
            return Err(crate::utils::error::EtlError::MissingConfigError {
                field: "client_secret".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for ExtractionConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.base_url)?;
        validation::validate_url("api.token_url", &self.token_url)?;
        validation::validate_path("load.output_path", &self.output.output_path)?;
        validation::validate_choices("load.output_formats", &self.output.formats, SUPPORTED_FORMATS)?;
        validation::validate_non_empty_string("load.date_field_marker", &self.output.date_field_marker)?;
        validation::validate_positive_number("pacing.detail_batch_size", self.pacing.detail_batch_size, 1)?;
        validation::validate_positive_number("diagnostic.sample_size", self.diagnostic.sample_size, 1)?;
        validation::validate_unique_names("endpoints", self.endpoints.iter().map(|e| e.name.as_str()))?;
        for endpoint in &self.endpoints {
            validation::validate_non_empty_string("endpoints.path", &endpoint.path)?;
        }
        validation::validate_date_order(
            "extraction.start_date",
            self.start_date,
            self.resolved_end_date(),
        )?;
        Ok(())
    }
}
