use crate::core::Pipeline;
use crate::utils::error::Result;
use std::time::Instant;

/// 依序執行 extract → transform → load，並記錄各階段耗時
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting extraction run");

        let phase = Instant::now();
        let raw_data = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} records from {} endpoints in {:.1?}",
            raw_data.total_records(),
            raw_data.len(),
            phase.elapsed()
        );

        let phase = Instant::now();
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🔄 Flattened {} rows in {:.1?}",
            transformed.total_records(),
            phase.elapsed()
        );

        let phase = Instant::now();
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("📦 Artifacts written in {:.1?}", phase.elapsed());

        tracing::info!("✅ Run finished in {:.1?}", started.elapsed());
        Ok(output_path)
    }
}
