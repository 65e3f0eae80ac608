pub mod artifacts;
pub mod batch;
pub mod engine;
pub mod features;
pub mod knowledge_base;
pub mod pipeline;

pub use crate::domain::model::{PriceEstimate, VehicleInput};
pub use crate::domain::ports::{BatchPipeline, ConfigProvider, FeatureScaler, PriceModel, Storage};
pub use crate::utils::error::Result;
