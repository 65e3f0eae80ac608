pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::EstimatorConfig;

pub use crate::adapters::{LocalStorage, Regressor, StandardScaler};
pub use crate::core::{
    artifacts::ArtifactLoader, batch::CsvBatchPipeline, engine::BatchEngine,
    knowledge_base::KnowledgeBase, pipeline::estimate_price, pipeline::InferencePipeline,
};
pub use crate::domain::model::{PriceEstimate, VehicleInput};
pub use crate::utils::error::{EstimatorError, Result};
