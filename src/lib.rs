pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, TokenClient, XubioClient};
pub use config::{ExtractionConfig, TomlConfig};
pub use core::{etl::EtlEngine, pipeline::ExtractionPipeline};
pub use utils::error::{EtlError, Result};
