use crate::core::pipeline::DEFAULT_REFERENCE_YEAR;
use crate::core::ConfigProvider;
use crate::utils::error::{EstimatorError, Result};
use crate::utils::validation::{self, Validate};
use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default)]
    pub estimator: EstimatorSettings,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    pub batch: Option<BatchConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorSettings {
    #[serde(default = "default_name")]
    pub name: String,
    /// 計算車齡的基準年份
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,
    #[serde(default = "default_knowledge_base_file")]
    pub knowledge_base_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input: String,
    pub output: String,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

fn default_name() -> String {
    "car-price-estimator".to_string()
}

fn default_reference_year() -> i32 {
    DEFAULT_REFERENCE_YEAR
}

fn default_base_dir() -> String {
    "models".to_string()
}

fn default_model_file() -> String {
    "car_price_model.json".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_knowledge_base_file() -> String {
    "project_artifacts.json".to_string()
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            reference_year: default_reference_year(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            model_file: default_model_file(),
            scaler_file: default_scaler_file(),
            knowledge_base_file: default_knowledge_base_file(),
        }
    }
}

impl EstimatorConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EstimatorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EstimatorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EstimatorError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_range(
            "estimator.reference_year",
            self.estimator.reference_year,
            1900,
            2100,
        )?;

        validation::validate_path("artifacts.base_dir", &self.artifacts.base_dir)?;
        for (field, file) in [
            ("artifacts.model_file", &self.artifacts.model_file),
            ("artifacts.scaler_file", &self.artifacts.scaler_file),
            ("artifacts.knowledge_base_file", &self.artifacts.knowledge_base_file),
        ] {
            validation::validate_path(field, file)?;
            validation::validate_file_extension(field, file, &["json"])?;
        }

        if let Some(batch) = &self.batch {
            validation::validate_path("batch.input", &batch.input)?;
            validation::validate_path("batch.output", &batch.output)?;
            validation::validate_file_extension("batch.input", &batch.input, &["csv", "tsv"])?;
            validation::validate_file_extension("batch.output", &batch.output, &["csv", "tsv"])?;
            self.batch_delimiter()?;
        }

        if let Some(logging) = &self.logging {
            if let Some(level) = &logging.level {
                check_one_of("logging.level", level, &VALID_LOG_LEVELS)?;
            }
            if let Some(format) = &logging.format {
                check_one_of("logging.format", format, &VALID_LOG_FORMATS)?;
            }
        }

        Ok(())
    }

    /// 套用命令列覆蓋設定
    pub fn apply_overrides(&mut self, models_dir: Option<&str>, reference_year: Option<i32>) {
        if let Some(dir) = models_dir {
            self.artifacts.base_dir = dir.to_string();
        }
        if let Some(year) = reference_year {
            self.estimator.reference_year = year;
        }
    }

    pub fn batch_delimiter(&self) -> Result<u8> {
        let delimiter = self
            .batch
            .as_ref()
            .and_then(|b| b.delimiter.as_deref())
            .unwrap_or(",");
        match delimiter {
            "\\t" | "\t" | "tab" => Ok(b'\t'),
            d if d.len() == 1 => Ok(d.as_bytes()[0]),
            d => Err(EstimatorError::InvalidConfigValueError {
                field: "batch.delimiter".to_string(),
                value: d.to_string(),
                reason: "Delimiter must be a single ASCII character".to_string(),
            }),
        }
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .unwrap_or("compact")
    }

    /// 基準年份落後於 `current_year` 時回傳落後的年數
    pub fn reference_year_lag(&self, current_year: i32) -> Option<i32> {
        let lag = current_year - self.estimator.reference_year;
        (lag > 0).then_some(lag)
    }

    /// 基準年份過舊只提示，不自動改用系統時間
    pub fn warn_if_reference_year_stale(&self) {
        let current_year = chrono::Local::now().year();
        if let Some(lag) = self.reference_year_lag(current_year) {
            tracing::warn!(
                "⚠️ Reference year {} is {} year(s) behind {}; car ages will be understated",
                self.estimator.reference_year,
                lag,
                current_year
            );
        }
    }

    fn artifact_path(&self, file: &str) -> String {
        Path::new(&self.artifacts.base_dir)
            .join(file)
            .to_string_lossy()
            .into_owned()
    }
}

fn check_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(EstimatorError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: format!("Valid values: {}", allowed.join(", ")),
    })
}

impl ConfigProvider for EstimatorConfig {
    fn reference_year(&self) -> i32 {
        self.estimator.reference_year
    }

    fn model_path(&self) -> String {
        self.artifact_path(&self.artifacts.model_file)
    }

    fn scaler_path(&self) -> String {
        self.artifact_path(&self.artifacts.scaler_file)
    }

    fn knowledge_base_path(&self) -> String {
        self.artifact_path(&self.artifacts.knowledge_base_file)
    }
}

impl Validate for EstimatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
