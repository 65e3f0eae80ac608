use crate::config::toml_config::EstimatorConfig;
use crate::domain::model::{ListingType, VehicleInput};
use crate::utils::error::{EstimatorError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "price-estimator")]
#[command(about = "Estimate the market value of a used vehicle")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory holding the model, scaler and knowledge base files
    #[arg(long, global = true)]
    pub models_dir: Option<String>,

    /// Year that car ages are measured against
    #[arg(long, global = true)]
    pub reference_year: Option<i32>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Estimate the price of one vehicle
    Estimate(EstimateArgs),
    /// List the known brands
    Brands,
    /// List the known models of a brand
    Models {
        #[arg(long)]
        brand: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EstimateArgs {
    #[arg(long)]
    pub brand: String,

    #[arg(long)]
    pub model: String,

    #[arg(long, default_value_t = 2015)]
    pub year: i32,

    #[arg(long, default_value_t = 50_000.0)]
    pub mileage: f64,

    /// "buy-it-now" or "auction"
    #[arg(long, default_value = "buy-it-now")]
    pub listing: ListingType,

    /// Print the feature vector handed to the model
    #[arg(long)]
    pub show_features: bool,
}

impl EstimateArgs {
    pub fn to_input(&self) -> VehicleInput {
        VehicleInput::new(
            self.brand.trim(),
            self.model.trim(),
            self.year,
            self.mileage,
            self.listing.is_auction(),
        )
    }
}

impl Validate for EstimateArgs {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("brand", &self.brand)?;
        validation::validate_non_empty_string("model", &self.model)?;
        validation::validate_non_negative("mileage", self.mileage)?;
        if !(1900..=2100).contains(&self.year) {
            return Err(EstimatorError::InvalidInput {
                field: "year".to_string(),
                reason: format!("Year must be between 1900 and 2100, got {}", self.year),
            });
        }
        Ok(())
    }
}

impl CliConfig {
    /// 載入設定檔 (若有)，套用命令列覆蓋後驗證
    pub fn load_config(&self) -> Result<EstimatorConfig> {
        let mut config = match &self.config {
            Some(path) => EstimatorConfig::from_file(path)?,
            None => EstimatorConfig::default(),
        };
        config.apply_overrides(self.models_dir.as_deref(), self.reference_year);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_estimate_command() {
        let cli = CliConfig::try_parse_from([
            "price-estimator",
            "--reference-year",
            "2026",
            "estimate",
            "--brand",
            "Toyota",
            "--model",
            "Camry",
            "--listing",
            "auction",
        ])
        .unwrap();

        assert_eq!(cli.reference_year, Some(2026));
        match cli.command {
            Command::Estimate(args) => {
                let input = args.to_input();
                assert_eq!(input.year, 2015);
                assert_eq!(input.mileage, 50_000.0);
                assert!(input.is_auction);
                assert!(args.validate().is_ok());
            }
            other => panic!("expected estimate, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_mileage_is_rejected() {
        let cli = CliConfig::try_parse_from([
            "price-estimator",
            "estimate",
            "--brand",
            "Toyota",
            "--model",
            "Camry",
            "--mileage=-10",
        ])
        .unwrap();

        let Command::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert!(matches!(
            args.validate(),
            Err(EstimatorError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let cli = CliConfig::try_parse_from([
            "price-estimator",
            "--models-dir",
            "artifacts",
            "--reference-year",
            "2030",
            "brands",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.estimator.reference_year, 2030);
        assert_eq!(config.artifacts.base_dir, "artifacts");
    }
}
