use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 互動式終端機
    #[default]
    Compact,
    /// 排程執行時輸出 JSON lines，方便集中收集
    Json,
}

/// `RUST_LOG` 未設定時使用的過濾條件
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "xubio_etl=debug,info"
    } else {
        "xubio_etl=info"
    }
}

pub fn init_logger(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "xubio_etl=info");
        assert!(default_directive(true).starts_with("xubio_etl=debug"));
        assert!(EnvFilter::try_new(default_directive(true)).is_ok());
    }
}
