use clap::Parser;
use xubio_etl::core::windows::months_touched;
use xubio_etl::domain::model::FetchStrategy;
use xubio_etl::utils::error::{EtlError, ErrorSeverity};
use xubio_etl::utils::{logger, validation::Validate};
use xubio_etl::{
    CliConfig, EtlEngine, ExtractionConfig, ExtractionPipeline, LocalStorage, TokenClient,
    XubioClient,
};

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::High => 1,     // 設定或資料錯誤
        ErrorSeverity::Critical => 3, // 認證或系統錯誤
    }
}

fn fail(stage: &str, e: &EtlError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()));
}

fn print_plan(config: &ExtractionConfig) {
    let end = config.resolved_end_date();
    println!("📋 Extraction plan");
    println!("   API:      {}", config.base_url);
    println!("   Period:   {} → {}", config.start_date, end);
    println!("   Output:   {} ({})", config.output.output_path, config.output.formats.join(", "));
    println!("   Pacing:   {:?}", config.pacing);
    println!("   Endpoints:");
    for endpoint in &config.endpoints {
        match endpoint.strategy {
            FetchStrategy::DateWindowed => println!(
                "      • {:<20} {:<28} {} ({} windows)",
                endpoint.name,
                endpoint.path,
                endpoint.strategy.label(),
                months_touched(config.start_date, end)
            ),
            _ => println!(
                "      • {:<20} {:<28} {}",
                endpoint.name,
                endpoint.path,
                endpoint.strategy.label()
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 不存在時忽略
    let dotenv = dotenvy::dotenv();

    let cli = CliConfig::parse();

    let format = if cli.log_json {
        logger::LogFormat::Json
    } else {
        logger::LogFormat::Compact
    };
    logger::init_logger(cli.verbose, format);

    tracing::info!("Starting xubio-etl CLI");
    if let Ok(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = match cli.build_config() {
        Ok(config) => config,
        Err(e) => fail("Configuration could not be loaded", &e),
    };
    if cli.verbose {
        tracing::debug!("Extraction config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail("Configuration validation failed", &e);
    }

    if cli.dry_run {
        print_plan(&config);
        return Ok(());
    }

    if let Err(e) = config.validate_credentials() {
        fail("Credentials are missing", &e);
    }

    let token_client = TokenClient::new(
        &config.token_url,
        config.credentials.clone(),
        config.timeouts.token,
    );
    let token = match token_client.fetch_token().await {
        Ok(token) => token,
        Err(e) => fail("Token exchange failed", &e),
    };

    let client = match XubioClient::new(&config.base_url, token) {
        Ok(client) => client,
        Err(e) => fail("API client could not be created", &e),
    };

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output.output_path.clone());
    let pipeline = ExtractionPipeline::new(storage, client, config);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Extraction completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Extraction completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => fail("Extraction failed", &e),
    }

    Ok(())
}
