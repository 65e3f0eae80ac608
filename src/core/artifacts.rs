use crate::adapters::{Regressor, StandardScaler};
use crate::core::knowledge_base::KnowledgeBase;
use crate::core::pipeline::InferencePipeline;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::{EstimatorError, Result};

pub struct LoadedArtifacts {
    pub knowledge_base: KnowledgeBase,
    pub scaler: StandardScaler,
    pub model: Regressor,
}

impl LoadedArtifacts {
    pub fn into_pipeline(self, reference_year: i32) -> Result<InferencePipeline<StandardScaler, Regressor>> {
        if let Some(width) = self.model.n_features() {
            let expected = self.knowledge_base.feature_order().len();
            if width != expected {
                return Err(EstimatorError::artifact(
                    "model",
                    format!(
                        "model reads {} features but the feature order lists {}",
                        width, expected
                    ),
                ));
            }
        }

        let pipeline =
            InferencePipeline::new(self.knowledge_base, self.scaler, self.model, reference_year);
        pipeline.check_compatibility()?;
        Ok(pipeline)
    }
}

/// Loads the three training artifacts through a [`Storage`] backend.
pub struct ArtifactLoader<S: Storage> {
    storage: S,
}

impl<S: Storage> ArtifactLoader<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub async fn load_knowledge_base(&self, path: &str) -> Result<KnowledgeBase> {
        let bytes = self.storage.read_file(path).await?;
        let knowledge_base = KnowledgeBase::from_json(&bytes).map_err(|e| with_path(e, path))?;
        tracing::info!(
            "📚 Knowledge base loaded: {} brands, {} features",
            knowledge_base.brands().len(),
            knowledge_base.feature_order().len()
        );
        Ok(knowledge_base)
    }

    pub async fn load_scaler(&self, path: &str) -> Result<StandardScaler> {
        let bytes = self.storage.read_file(path).await?;
        let scaler = StandardScaler::from_json(&bytes).map_err(|e| with_path(e, path))?;
        tracing::info!("📏 Scaler loaded: {} features", scaler.mean.len());
        Ok(scaler)
    }

    pub async fn load_model(&self, path: &str) -> Result<Regressor> {
        let bytes = self.storage.read_file(path).await?;
        let model = Regressor::from_json(&bytes).map_err(|e| with_path(e, path))?;
        match &model {
            Regressor::Linear(_) => tracing::info!("🤖 Linear model loaded"),
            Regressor::TreeEnsemble(ensemble) => {
                tracing::info!("🤖 Tree ensemble loaded: {} trees", ensemble.trees.len())
            }
        }
        Ok(model)
    }

    pub async fn load_all<C: ConfigProvider>(&self, config: &C) -> Result<LoadedArtifacts> {
        let knowledge_base_path = config.knowledge_base_path();
        let scaler_path = config.scaler_path();
        let model_path = config.model_path();

        // 三個檔案互不相依，一起讀取
        let (knowledge_base, scaler, model) = tokio::try_join!(
            self.load_knowledge_base(&knowledge_base_path),
            self.load_scaler(&scaler_path),
            self.load_model(&model_path),
        )?;

        Ok(LoadedArtifacts {
            knowledge_base,
            scaler,
            model,
        })
    }

    pub async fn load_pipeline<C: ConfigProvider>(
        &self,
        config: &C,
    ) -> Result<InferencePipeline<StandardScaler, Regressor>> {
        self.load_all(config)
            .await?
            .into_pipeline(config.reference_year())
    }
}

fn with_path(error: EstimatorError, path: &str) -> EstimatorError {
    match error {
        EstimatorError::SerializationError(e) => EstimatorError::artifact(path, e.to_string()),
        EstimatorError::ArtifactError { message, .. } => EstimatorError::artifact(path, message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalStorage;
    use tempfile::TempDir;

    const FEATURES: &str = r#"["car_age", "mileage", "miles_per_year", "brand_tier", "model_rarity", "brand_encoded", "model_encoded", "is_auction"]"#;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    fn knowledge_base_json() -> String {
        format!(
            r#"{{
                "brand_to_models": {{"Toyota": ["Camry"]}},
                "brand_map": {{"Toyota": 3}},
                "model_map": {{"Camry": 17}},
                "tier_map": {{"Toyota": 2}},
                "rarity_map": {{"17": 40}},
                "features": {}
            }}"#,
            FEATURES
        )
    }

    #[tokio::test]
    async fn test_load_knowledge_base_reports_path_on_bad_json() {
        let dir = TempDir::new().unwrap();
        write(&dir, "kb.json", "{ not json");
        let loader = ArtifactLoader::new(LocalStorage::new(dir.path()));

        let err = loader.load_knowledge_base("kb.json").await.unwrap_err();
        match err {
            EstimatorError::ArtifactError { artifact, .. } => assert_eq!(artifact, "kb.json"),
            other => panic!("expected artifact error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mismatched_scaler_width_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(&dir, "kb.json", &knowledge_base_json());
        write(&dir, "scaler.json", r#"{"mean": [0, 0], "scale": [1, 1]}"#);
        write(
            &dir,
            "model.json",
            r#"{"type": "linear", "coefficients": [1, 1, 1, 1, 1, 1, 1, 1], "intercept": 0}"#,
        );
        let loader = ArtifactLoader::new(LocalStorage::new(dir.path()));

        let artifacts = LoadedArtifacts {
            knowledge_base: loader.load_knowledge_base("kb.json").await.unwrap(),
            scaler: loader.load_scaler("scaler.json").await.unwrap(),
            model: loader.load_model("model.json").await.unwrap(),
        };
        assert!(matches!(
            artifacts.into_pipeline(2025),
            Err(EstimatorError::ArtifactError { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let loader = ArtifactLoader::new(LocalStorage::new(dir.path()));
        assert!(matches!(
            loader.load_model("missing.json").await,
            Err(EstimatorError::IoError(_))
        ));
    }
}
