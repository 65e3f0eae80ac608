use crate::core::pipeline::InferencePipeline;
use crate::core::{BatchPipeline, FeatureScaler, PriceModel, Storage};
use crate::domain::model::{BatchResult, EstimateRecord, VehicleRecord};
use crate::utils::error::{EstimatorError, Result};
use std::sync::Arc;

const REQUIRED_COLUMNS: [&str; 4] = ["brand", "model", "year", "mileage"];

/// Reads vehicles from CSV, estimates each row and writes a CSV of estimates.
pub struct CsvBatchPipeline<S: Storage, Sc: FeatureScaler, M: PriceModel> {
    storage: S,
    pipeline: Arc<InferencePipeline<Sc, M>>,
    input_path: String,
    output_path: String,
    delimiter: u8,
}

impl<S: Storage, Sc: FeatureScaler, M: PriceModel> CsvBatchPipeline<S, Sc, M> {
    pub fn new(
        storage: S,
        pipeline: Arc<InferencePipeline<Sc, M>>,
        input_path: impl Into<String>,
        output_path: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            pipeline,
            input_path: input_path.into(),
            output_path: output_path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn estimate_record(&self, record: &VehicleRecord) -> EstimateRecord {
        let mut out = EstimateRecord {
            brand: record.brand.clone(),
            model: record.model.clone(),
            year: record.year.clone(),
            mileage: record.mileage.clone(),
            is_auction: false,
            estimated_price: None,
            error: None,
        };

        let input = match record.to_input() {
            Ok(input) => input,
            Err(e) => {
                out.error = Some(e.user_friendly_message());
                return out;
            }
        };
        out.is_auction = input.is_auction;

        match self.pipeline.estimate(&input) {
            // 輸出保留兩位小數
            Ok(estimate) => out.estimated_price = Some((estimate.price * 100.0).round() / 100.0),
            Err(e) => out.error = Some(e.user_friendly_message()),
        }
        out
    }
}

#[async_trait::async_trait]
impl<S, Sc, M> BatchPipeline for CsvBatchPipeline<S, Sc, M>
where
    S: Storage,
    Sc: FeatureScaler,
    M: PriceModel,
{
    async fn extract(&self) -> Result<Vec<VehicleRecord>> {
        let data = self.storage.read_file(&self.input_path).await?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(data.as_slice());

        // 只有標頭錯誤會中止整批，單列錯誤留到 transform 記錄
        let headers = reader.headers()?;
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(EstimatorError::InvalidInput {
                    field: "header".to_string(),
                    reason: format!("input CSV has no '{}' column", column),
                });
            }
        }

        let mut records = Vec::new();
        for row in reader.deserialize() {
            match row {
                Ok(record) => records.push(record),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("⚠️ Unreadable row in {}: {}", self.input_path, e);
                    records.push(VehicleRecord::unreadable(e.to_string()));
                }
            }
        }

        tracing::debug!("Read {} vehicles from {}", records.len(), self.input_path);
        Ok(records)
    }

    async fn transform(&self, records: Vec<VehicleRecord>) -> Result<BatchResult> {
        let records: Vec<EstimateRecord> = records
            .iter()
            .map(|record| self.estimate_record(record))
            .collect();

        let failed = records.iter().filter(|r| r.error.is_some()).count();
        Ok(BatchResult {
            succeeded: records.len() - failed,
            failed,
            records,
        })
    }

    async fn load(&self, records: &[EstimateRecord]) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        let data = writer
            .into_inner()
            .map_err(|e| EstimatorError::IoError(e.into_error()))?;

        self.storage.write_file(&self.output_path, &data).await?;
        Ok(self.output_path.clone())
    }
}
