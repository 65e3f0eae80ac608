use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Artifact error in {artifact}: {message}")]
    ArtifactError { artifact: String, message: String },

    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Feature '{feature}' is required by the feature order but is not produced by the pipeline")]
    SchemaMismatch { feature: String },

    #[error("Scaling failed: {message}")]
    ScalingError { message: String },

    #[error("Prediction failed: {message}")]
    PredictionError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Artifact,
    Input,
    Inference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EstimatorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EstimatorError::IoError(_) | EstimatorError::CsvError(_) => ErrorCategory::Io,
            EstimatorError::ConfigError { .. }
            | EstimatorError::ConfigValidationError { .. }
            | EstimatorError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EstimatorError::SerializationError(_) | EstimatorError::ArtifactError { .. } => {
                ErrorCategory::Artifact
            }
            EstimatorError::InvalidInput { .. } => ErrorCategory::Input,
            EstimatorError::SchemaMismatch { .. }
            | EstimatorError::ScalingError { .. }
            | EstimatorError::PredictionError { .. } => ErrorCategory::Inference,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Inference => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Artifact => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EstimatorError::IoError(_) => "Check that the file exists and is readable",
            EstimatorError::SerializationError(_) => {
                "Re-export the artifacts; the JSON does not match the expected layout"
            }
            EstimatorError::CsvError(_) => {
                "Check the CSV header: brand,model,year,mileage,listing"
            }
            EstimatorError::ConfigError { .. }
            | EstimatorError::ConfigValidationError { .. }
            | EstimatorError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command line flags"
            }
            EstimatorError::ArtifactError { .. } => {
                "Make sure the model, scaler and knowledge base come from the same training run"
            }
            EstimatorError::InvalidInput { .. } => "Correct the vehicle details and try again",
            EstimatorError::SchemaMismatch { .. } => {
                "The knowledge base feature list does not match this estimator version"
            }
            EstimatorError::ScalingError { .. } => {
                "The scaler was fitted on a different number of features"
            }
            EstimatorError::PredictionError { .. } => {
                "The model could not score this vehicle; try different inputs"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not read or write a file: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Artifact => format!("Could not load model artifacts: {}", self),
            ErrorCategory::Input => format!("Invalid vehicle details: {}", self),
            ErrorCategory::Inference => format!("An error occurred during prediction: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub(crate) fn artifact(artifact: &str, message: impl Into<String>) -> Self {
        EstimatorError::ArtifactError {
            artifact: artifact.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_errors_share_one_message_shape() {
        let errors = vec![
            EstimatorError::SchemaMismatch {
                feature: "color_code".to_string(),
            },
            EstimatorError::ScalingError {
                message: "expected 8 features, got 7".to_string(),
            },
            EstimatorError::PredictionError {
                message: "tree 0 is empty".to_string(),
            },
        ];

        for e in errors {
            assert_eq!(e.category(), ErrorCategory::Inference);
            assert_eq!(e.severity(), ErrorSeverity::High);
            assert!(e
                .user_friendly_message()
                .starts_with("An error occurred during prediction: "));
        }
    }

    #[test]
    fn test_schema_mismatch_names_the_feature() {
        let e = EstimatorError::SchemaMismatch {
            feature: "color_code".to_string(),
        };
        assert!(e.to_string().contains("color_code"));
    }

    #[test]
    fn test_exit_codes_follow_severity() {
        let input = EstimatorError::InvalidInput {
            field: "mileage".to_string(),
            reason: "must not be negative".to_string(),
        };
        assert_eq!(input.exit_code(), 2);

        let artifact = EstimatorError::artifact("scaler.json", "empty mean vector");
        assert_eq!(artifact.category(), ErrorCategory::Artifact);
        assert_eq!(artifact.exit_code(), 3);
    }
}
