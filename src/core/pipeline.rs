use crate::adapters::{csv_bundle, xlsx};
use crate::config::extraction::ExtractionConfig;
use crate::core::coverage::date_coverage;
use crate::core::diagnostic::KeyFieldDiagnostic;
use crate::core::export::build_workbook;
use crate::core::fetcher::{CatalogFetcher, WindowedFetcher};
use crate::core::flatten::flatten_records;
use crate::core::report::{coverage_report, ReportContext};
use crate::core::{Pipeline, RecordSource, Storage};
use crate::domain::model::{
    EndpointDescriptor, EndpointTable, ExtractionResultSet, FetchStrategy, RawRecord,
    TransformResult,
};
use crate::utils::error::Result;
use chrono::{NaiveDate, NaiveDateTime};

/// 同一次執行的輸出檔名共用同一個時間戳記
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    stamp: String,
}

impl ArtifactNames {
    pub fn new(started_at: NaiveDateTime) -> Self {
        Self {
            stamp: started_at.format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    pub fn workbook(&self) -> String {
        format!("xubio_extract_{}.xlsx", self.stamp)
    }

    pub fn csv_bundle(&self) -> String {
        format!("xubio_extract_{}_csv.zip", self.stamp)
    }

    pub fn report(&self) -> String {
        format!("report_{}.txt", self.stamp)
    }
}

/// 依端點分類選擇抓取方式，循序處理整張端點表
pub struct ExtractionPipeline<S: Storage, R: RecordSource> {
    storage: S,
    source: R,
    config: ExtractionConfig,
    started_at: NaiveDateTime,
    /// 執行開始時決定，整次執行不變
    end_date: NaiveDate,
}

impl<S: Storage, R: RecordSource> ExtractionPipeline<S, R> {
    pub fn new(storage: S, source: R, config: ExtractionConfig) -> Self {
        Self::with_started_at(storage, source, config, chrono::Local::now().naive_local())
    }

    pub fn with_started_at(
        storage: S,
        source: R,
        config: ExtractionConfig,
        started_at: NaiveDateTime,
    ) -> Self {
        let end_date = config.end_date_or(started_at.date());
        Self {
            storage,
            source,
            config,
            started_at,
            end_date,
        }
    }

    async fn fetch_endpoint(&self, endpoint: &EndpointDescriptor) -> Vec<RawRecord> {
        let timeouts = &self.config.timeouts;
        match endpoint.strategy {
            FetchStrategy::DateWindowed => {
                WindowedFetcher::new(&self.source, timeouts.window, self.config.pacing.between_windows)
                    .fetch(endpoint, self.config.start_date, self.end_date)
                    .await
            }
            FetchStrategy::Catalog => {
                CatalogFetcher::new(&self.source, timeouts.catalog)
                    .fetch(endpoint)
                    .await
            }
            FetchStrategy::DiagnosticDetail => {
                KeyFieldDiagnostic::new(
                    &self.source,
                    &self.config.diagnostic,
                    &self.config.pacing,
                    timeouts.headers,
                    timeouts.detail,
                )
                .fetch_with_detail(endpoint)
                .await
            }
        }
    }
}

fn log_run_summary(results: &ExtractionResultSet) {
    tracing::info!("{}", "=".repeat(60));
    tracing::info!("📊 EXTRACTION SUMMARY");

    let mut successful = 0;
    for result in results.iter() {
        let count = result.records.len();
        let marker = if count > 0 {
            successful += 1;
            "✅"
        } else {
            "❌"
        };
        tracing::info!(
            "   {} {:<20}: {:>6} records ({})",
            marker,
            result.endpoint.name,
            count,
            result.endpoint.strategy.label()
        );
    }

    tracing::info!(
        "🎯 {}/{} endpoints with data, {} records in total",
        successful,
        results.len(),
        results.total_records()
    );
}

#[async_trait::async_trait]
impl<S: Storage, R: RecordSource> Pipeline for ExtractionPipeline<S, R> {
    async fn extract(&self) -> Result<ExtractionResultSet> {
        tracing::info!(
            "🚀 Extracting {} endpoints, period {} → {}",
            self.config.endpoints.len(),
            self.config.start_date,
            self.end_date
        );

        let mut results = ExtractionResultSet::new();
        let mut endpoints = self.config.endpoints.iter().peekable();

        while let Some(endpoint) = endpoints.next() {
            tracing::info!("🔄 {} ({})", endpoint.name, endpoint.strategy.label());
            let records = self.fetch_endpoint(endpoint).await;
            results.push(endpoint.clone(), records);

            let pause = self.config.pacing.between_endpoints;
            if endpoints.peek().is_some() && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        log_run_summary(&results);
        Ok(results)
    }

    async fn transform(&self, data: ExtractionResultSet) -> Result<TransformResult> {
        let marker = &self.config.output.date_field_marker;

        let tables = data
            .into_iter()
            .map(|result| {
                let records = flatten_records(&result.records);
                let coverage = date_coverage(&records, marker);
                tracing::debug!(
                    "{}: {} rows, {} months with dates",
                    result.endpoint.name,
                    records.len(),
                    coverage.months_covered()
                );
                EndpointTable {
                    endpoint: result.endpoint,
                    records,
                    coverage,
                }
            })
            .collect();

        Ok(TransformResult { tables })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output = &self.config.output;
        let names = ArtifactNames::new(self.started_at);

        if result.total_records() == 0 {
            tracing::warn!("⚠️ No records were extracted, writing empty artifacts");
        }

        let workbook = build_workbook(&result, output);
        let mut primary = None;

        if output.wants("xlsx") {
            let data = xlsx::write_workbook(&workbook)?;
            tracing::debug!("Writing workbook ({} bytes) to storage", data.len());
            self.storage.write_file(&names.workbook(), &data).await?;
            tracing::info!("💾 Excel saved: {}/{}", output.output_path, names.workbook());
            primary = Some(names.workbook());
        }

        if output.wants("csv") {
            let data = csv_bundle::write_csv_bundle(&workbook)?;
            tracing::debug!("Writing CSV bundle ({} bytes) to storage", data.len());
            self.storage.write_file(&names.csv_bundle(), &data).await?;
            tracing::info!("💾 CSV bundle saved: {}/{}", output.output_path, names.csv_bundle());
            if primary.is_none() {
                primary = Some(names.csv_bundle());
            }
        }

        let context = ReportContext {
            generated_at: self.started_at,
            period_start: self.config.start_date,
            period_end: self.end_date,
        };
        let report = coverage_report(&result, &context);
        self.storage.write_file(&names.report(), report.as_bytes()).await?;
        tracing::info!("📄 Report saved: {}/{}", output.output_path, names.report());

        let artifact = primary.unwrap_or_else(|| names.report());
        Ok(format!("{}/{}", output.output_path, artifact))
    }
}
