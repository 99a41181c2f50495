use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;
use xubio_etl::config::extraction::default_endpoints;
use xubio_etl::utils::validation::Validate;
use xubio_etl::TomlConfig;

const EXAMPLE_CONFIG: &str = include_str!("../xubio-etl.example.toml");

/// 範例設定檔必須與內建預設值一致
#[test]
fn test_example_config_matches_defaults() -> Result<()> {
    std::env::set_var("XUBIO_CLIENT_ID", "example-id");
    std::env::set_var("XUBIO_CLIENT_SECRET", "example-secret");

    let config = TomlConfig::from_toml_str(EXAMPLE_CONFIG)?.into_extraction_config()?;

    assert_eq!(config.endpoints, default_endpoints());
    assert_eq!(config.credentials.client_id, "example-id");
    assert_eq!(config.pacing.between_windows, Duration::from_millis(500));
    assert_eq!(config.timeouts.catalog, Duration::from_secs(180));
    assert!(config.output.wants("xlsx"));
    assert!(config.output.wants("csv"));
    config.validate()?;
    config.validate_credentials()?;

    Ok(())
}

#[test]
fn test_config_file_on_disk() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("xubio.toml");
    std::fs::write(
        &path,
        r#"
[extraction]
start_date = "2023-07-01"
end_date = "2023-12-31"

[[endpoints]]
name = "cobros"
path = "cobranzaBean"
"#,
    )?;

    let config = TomlConfig::from_file(&path)?.into_extraction_config()?;
    assert_eq!(config.endpoints.len(), 1);
    assert_eq!(config.resolved_end_date().to_string(), "2023-12-31");
    config.validate()?;

    assert!(TomlConfig::from_file(temp_dir.path().join("missing.toml")).is_err());

    Ok(())
}
