use crate::core::BatchPipeline;
use crate::domain::model::BatchResult;
use crate::utils::error::Result;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub output_path: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BatchEngine<P: BatchPipeline> {
    pipeline: P,
}

impl<P: BatchPipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let started = Instant::now();
        tracing::info!("Starting batch estimation...");

        // Extract
        let vehicles = self.pipeline.extract().await?;
        tracing::info!("Read {} vehicles", vehicles.len());

        // Transform
        let BatchResult {
            records,
            succeeded,
            failed,
        } = self.pipeline.transform(vehicles).await?;
        tracing::info!("Estimated {} vehicles ({} failed)", succeeded, failed);
        if failed > 0 {
            tracing::warn!("⚠️ {} rows could not be estimated, see the error column", failed);
        }

        // Load
        let output_path = self.pipeline.load(&records).await?;
        tracing::info!("Output saved to: {} in {:?}", output_path, started.elapsed());

        Ok(BatchSummary {
            output_path,
            total: records.len(),
            succeeded,
            failed,
        })
    }
}
