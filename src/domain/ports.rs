use crate::domain::model::{BatchResult, EstimateRecord, VehicleRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn reference_year(&self) -> i32;
    fn model_path(&self) -> String;
    fn scaler_path(&self) -> String;
    fn knowledge_base_path(&self) -> String;
}

/// Fitted feature scaler, e.g. a standard scaler exported from training.
pub trait FeatureScaler: Send + Sync {
    fn n_features(&self) -> usize;
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Fitted regression model producing one price per feature row.
pub trait PriceModel: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64>;
}

#[async_trait]
pub trait BatchPipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<VehicleRecord>>;
    async fn transform(&self, records: Vec<VehicleRecord>) -> Result<BatchResult>;
    async fn load(&self, result: &[EstimateRecord]) -> Result<String>;
}
