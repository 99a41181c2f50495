pub mod extraction;
pub mod toml_config;

pub use extraction::ExtractionConfig;
pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use super::extraction::{Credentials, DiagnosticMode, ExtractionConfig};
    use super::toml_config::TomlConfig;
    use crate::utils::error::Result;
    use chrono::NaiveDate;
    use clap::Parser;
    use std::path::PathBuf;

    /// 命令列參數優先於 TOML 設定檔
    #[derive(Clone, Parser)]
    #[command(name = "xubio-etl")]
    #[command(about = "Extracts Xubio accounting data into Excel/CSV workbooks with a coverage report")]
    pub struct CliConfig {
        #[arg(long, help = "Path to a TOML configuration file")]
        pub config: Option<PathBuf>,

        #[arg(long, help = "First day to extract (YYYY-MM-DD)")]
        pub start_date: Option<NaiveDate>,

        #[arg(long, help = "Last day to extract (YYYY-MM-DD), defaults to today")]
        pub end_date: Option<NaiveDate>,

        #[arg(long)]
        pub output_path: Option<String>,

        #[arg(long, value_delimiter = ',', help = "Output formats: xlsx, csv")]
        pub formats: Vec<String>,

        #[arg(long, env = "XUBIO_CLIENT_ID", hide_env_values = true)]
        pub client_id: Option<String>,

        #[arg(long, env = "XUBIO_CLIENT_SECRET", hide_env_values = true)]
        pub client_secret: Option<String>,

        #[arg(long, help = "Only inspect the header structure of diagnostic endpoints")]
        pub structure_only: bool,

        #[arg(long, help = "Print the extraction plan without calling the API")]
        pub dry_run: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub log_json: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,
    }

    impl CliConfig {
        /// 讀取設定檔（若有），再套用命令列覆寫
        pub fn build_config(&self) -> Result<ExtractionConfig> {
            let base = match &self.config {
                Some(path) => {
                    tracing::info!("📄 Loading configuration from {}", path.display());
                    TomlConfig::from_file(path)?
                }
                None => TomlConfig::default(),
            };
            let mut config = base.into_extraction_config()?;
            self.apply_overrides(&mut config);
            Ok(config)
        }

        pub fn apply_overrides(&self, config: &mut ExtractionConfig) {
            if let Some(start) = self.start_date {
                config.start_date = start;
            }
            if let Some(end) = self.end_date {
                config.end_date = Some(end);
            }
            if let Some(path) = &self.output_path {
                config.output.output_path = path.clone();
            }
            if !self.formats.is_empty() {
                config.output.formats = self.formats.clone();
            }

            let Credentials {
                client_id,
                client_secret,
            } = &mut config.credentials;
            if let Some(id) = &self.client_id {
                *client_id = id.clone();
            }
            if let Some(secret) = &self.client_secret {
                *client_secret = secret.clone();
            }

            if self.structure_only {
                config.diagnostic.mode = DiagnosticMode::StructureOnly;
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_cli_overrides() {
            let cli = CliConfig::try_parse_from([
                "xubio-etl",
                "--start-date",
                "2024-05-01",
                "--end-date",
                "2024-07-15",
                "--formats",
                "xlsx,csv",
                "--client-id",
                "cli-id",
                "--client-secret",
                "cli-secret",
                "--structure-only",
            ])
            .unwrap();

            let config = cli.build_config().unwrap();
            assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
            assert_eq!(config.end_date, NaiveDate::from_ymd_opt(2024, 7, 15));
            assert_eq!(config.output.formats, vec!["xlsx", "csv"]);
            assert_eq!(config.credentials.client_id, "cli-id");
            assert_eq!(config.credentials.client_secret, "cli-secret");
            assert_eq!(config.diagnostic.mode, DiagnosticMode::StructureOnly);
            assert!(!cli.dry_run);
        }

        #[test]
        fn test_invalid_date_argument() {
            let result = CliConfig::try_parse_from(["xubio-etl", "--start-date", "2024-13-01"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_cli_wins_over_toml_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(
                &mut file,
                b"[load]\noutput_path = \"./toml-out\"\noutput_formats = [\"csv\"]\n",
            )
            .unwrap();
            let path = file.path().to_string_lossy().to_string();

            let cli = CliConfig::try_parse_from([
                "xubio-etl",
                "--config",
                path.as_str(),
                "--output-path",
                "./cli-out",
            ])
            .unwrap();

            let config = cli.build_config().unwrap();
            assert_eq!(config.output.output_path, "./cli-out");
            assert_eq!(config.output.formats, vec!["csv"]);
        }
    }
}
