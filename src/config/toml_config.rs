use crate::config::extraction::{ColumnPolicy, Credentials, DiagnosticMode, ExtractionConfig};
use crate::domain::model::{EndpointDescriptor, FetchStrategy};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// TOML 設定檔；每個區段都是選填，未填的欄位沿用預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub api: Option<ApiSection>,
    pub extraction: Option<ExtractionSection>,
    pub pacing: Option<PacingSection>,
    pub diagnostic: Option<DiagnosticSection>,
    pub endpoints: Option<Vec<EndpointEntry>>,
    pub load: Option<LoadSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_timeout_seconds: Option<u64>,
    pub window_timeout_seconds: Option<u64>,
    pub catalog_timeout_seconds: Option<u64>,
    pub headers_timeout_seconds: Option<u64>,
    pub detail_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionSection {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingSection {
    pub between_windows_ms: Option<u64>,
    pub between_endpoints_ms: Option<u64>,
    pub detail_batch_size: Option<usize>,
    pub detail_batch_pause_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticSection {
    pub mode: Option<DiagnosticMode>,
    pub sample_size: Option<usize>,
    pub structure_preview_records: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointEntry {
    pub name: String,
    pub path: String,
    /// 未指定時依名稱分類
    pub strategy: Option<FetchStrategy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSection {
    pub output_path: Option<String>,
    pub output_formats: Option<Vec<String>>,
    pub column_policy: Option<ColumnPolicy>,
    pub date_field_marker: Option<String>,
    pub max_column_width: Option<usize>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${XUBIO_CLIENT_ID})，找不到的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            EtlError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 套用到預設的 `ExtractionConfig` 上
    pub fn into_extraction_config(self) -> Result<ExtractionConfig> {
        let mut config = ExtractionConfig::default();

        if let Some(api) = self.api {
            if let Some(base_url) = api.base_url {
                config.base_url = base_url;
            }
            if let Some(token_url) = api.token_url {
                config.token_url = token_url;
            }
            config.credentials = Credentials {
                client_id: api.client_id.unwrap_or_default(),
                client_secret: api.client_secret.unwrap_or_default(),
            };
            let timeouts = &mut config.timeouts;
            apply_seconds(&mut timeouts.token, api.token_timeout_seconds);
            apply_seconds(&mut timeouts.window, api.window_timeout_seconds);
            apply_seconds(&mut timeouts.catalog, api.catalog_timeout_seconds);
            apply_seconds(&mut timeouts.headers, api.headers_timeout_seconds);
            apply_seconds(&mut timeouts.detail, api.detail_timeout_seconds);
        }

        if let Some(extraction) = self.extraction {
            if let Some(start) = extraction.start_date {
                config.start_date = parse_date("extraction.start_date", &start)?;
            }
            if let Some(end) = extraction.end_date {
                config.end_date = Some(parse_date("extraction.end_date", &end)?);
            }
        }

        if let Some(pacing) = self.pacing {
            let policy = &mut config.pacing;
            apply_millis(&mut policy.between_windows, pacing.between_windows_ms);
            apply_millis(&mut policy.between_endpoints, pacing.between_endpoints_ms);
            apply_millis(&mut policy.detail_batch_pause, pacing.detail_batch_pause_ms);
            if let Some(size) = pacing.detail_batch_size {
                policy.detail_batch_size = size;
            }
        }

        if let Some(diagnostic) = self.diagnostic {
            let settings = &mut config.diagnostic;
            if let Some(mode) = diagnostic.mode {
                settings.mode = mode;
            }
            if let Some(size) = diagnostic.sample_size {
                settings.sample_size = size;
            }
            if let Some(preview) = diagnostic.structure_preview_records {
                settings.structure_preview_records = preview;
            }
        }

        if let Some(entries) = self.endpoints {
            config.endpoints = entries
                .into_iter()
                .map(|entry| {
                    let descriptor = EndpointDescriptor::new(&entry.name, &entry.path);
                    match entry.strategy {
                        Some(strategy) => descriptor.with_strategy(strategy),
                        None => descriptor,
                    }
                })
                .collect();
        }

        if let Some(load) = self.load {
            let output = &mut config.output;
            if let Some(path) = load.output_path {
                output.output_path = path;
            }
            if let Some(formats) = load.output_formats {
                output.formats = formats;
            }
            if let Some(policy) = load.column_policy {
                output.column_policy = policy;
            }
            if let Some(marker) = load.date_field_marker {
                output.date_field_marker = marker;
            }
            if let Some(width) = load.max_column_width {
                output.max_column_width = width;
            }
        }

        Ok(config)
    }
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        EtlError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: format!("expected YYYY-MM-DD ({})", e),
        }
    })
}

fn apply_seconds(target: &mut Duration, seconds: Option<u64>) {
    if let Some(seconds) = seconds {
        *target = Duration::from_secs(seconds);
    }
}

fn apply_millis(target: &mut Duration, millis: Option<u64>) {
    if let Some(millis) = millis {
        *target = Duration::from_millis(millis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = TomlConfig::from_toml_str("")
            .unwrap()
            .into_extraction_config()
            .unwrap();

        assert_eq!(config.base_url, "https://xubio.com/API/1.1");
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(config.endpoints.len(), 9);
        assert_eq!(config.pacing.between_endpoints, Duration::from_secs(1));
        assert_eq!(config.timeouts.window, Duration::from_secs(90));
    }

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[api]
base_url = "https://sandbox.example.com/API/1.1"
client_id = "id"
client_secret = "secret"
catalog_timeout_seconds = 60

[extraction]
start_date = "2024-03-01"
end_date = "2024-06-30"

[pacing]
between_windows_ms = 0
between_endpoints_ms = 0
detail_batch_size = 25

[diagnostic]
mode = "structure_only"
sample_size = 3

[[endpoints]]
name = "factura_venta"
path = "comprobanteVentaBean"

[[endpoints]]
name = "productos"
path = "productoVentaBean"
strategy = "catalog"

[[endpoints]]
name = "remitos"
path = "remitoVentaBean"
strategy = "date_windowed"

[load]
output_path = "./exports"
output_formats = ["xlsx", "csv"]
column_policy = "first_record"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_extraction_config()
            .unwrap();

        assert_eq!(config.base_url, "https://sandbox.example.com/API/1.1");
        assert_eq!(config.credentials.client_id, "id");
        assert_eq!(config.timeouts.catalog, Duration::from_secs(60));
        assert_eq!(config.timeouts.detail, Duration::from_secs(30));
        assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(config.pacing.between_windows, Duration::ZERO);
        assert_eq!(config.pacing.detail_batch_size, 25);
        assert_eq!(config.pacing.detail_batch_pause, Duration::from_millis(500));
        assert_eq!(config.diagnostic.mode, DiagnosticMode::StructureOnly);
        assert_eq!(config.diagnostic.sample_size, 3);

        let strategies: Vec<_> = config.endpoints.iter().map(|e| e.strategy).collect();
        assert_eq!(
            strategies,
            vec![
                FetchStrategy::DateWindowed,
                FetchStrategy::Catalog,
                FetchStrategy::DateWindowed
            ]
        );

        assert_eq!(config.output.output_path, "./exports");
        assert!(config.output.wants("csv"));
        assert_eq!(config.output.column_policy, ColumnPolicy::FirstRecord);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("XUBIO_TEST_TOML_SECRET", "from-env");

        let toml_content = r#"
[api]
client_id = "id"
client_secret = "${XUBIO_TEST_TOML_SECRET}"
token_url = "${XUBIO_TEST_TOML_UNSET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let api = config.api.unwrap();
        assert_eq!(api.client_secret.as_deref(), Some("from-env"));
        assert_eq!(api.token_url.as_deref(), Some("${XUBIO_TEST_TOML_UNSET}"));

        std::env::remove_var("XUBIO_TEST_TOML_SECRET");
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let config = TomlConfig::from_toml_str("[extraction]\nstart_date = \"01/02/2024\"\n").unwrap();
        let err = config.into_extraction_config().unwrap_err();
        assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[api]
base_url = "invalid-url"

[extraction]
end_date = "2024-12-31"

[load]
output_formats = ["parquet"]
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_extraction_config()
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_endpoint_names_fail_validation() {
        let toml_content = r#"
[extraction]
end_date = "2024-12-31"

[[endpoints]]
name = "cuentas"
path = "cuenta"

[[endpoints]]
name = "cuentas"
path = "cuentaBean"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .into_extraction_config()
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let err = TomlConfig::from_toml_str("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, EtlError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[load]\noutput_path = \"./from-file\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path())
            .unwrap()
            .into_extraction_config()
            .unwrap();
        assert_eq!(config.output.output_path, "./from-file");
    }
}
