use clap::Parser;
use price_estimator::config::{Command, EstimateArgs};
use price_estimator::utils::format::format_currency;
use price_estimator::utils::{logger, validation::Validate};
use price_estimator::{
    ArtifactLoader, CliConfig, EstimatorConfig, EstimatorError, InferencePipeline, LocalStorage,
    Regressor, StandardScaler,
};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail(&e);
        }
    };

    // 初始化日誌
    logger::init_from_settings(config.log_format(), config.log_level(), cli.verbose);
    tracing::debug!("CLI config: {:?}", cli);
    config.warn_if_reference_year_stale();

    let pipeline = match load_pipeline(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };

    match &cli.command {
        Command::Estimate(args) => {
            if let Err(e) = estimate(&pipeline, args) {
                fail(&e);
            }
        }
        Command::Brands => {
            for brand in pipeline.knowledge_base().brands() {
                println!("{}", brand);
            }
        }
        Command::Models { brand } => {
            let models = pipeline.knowledge_base().models_for_brand(brand);
            if models.is_empty() {
                println!("No models known for brand '{}'", brand);
            }
            for model in models {
                println!("{}", model);
            }
        }
    }
}

async fn load_pipeline(
    config: &EstimatorConfig,
) -> price_estimator::Result<InferencePipeline<StandardScaler, Regressor>> {
    tracing::info!("📁 Loading artifacts from: {}", config.artifacts.base_dir);
    let loader = ArtifactLoader::new(LocalStorage::new(""));
    let pipeline = loader.load_pipeline(config).await?;
    tracing::info!("✅ Artifacts loaded (reference year {})", pipeline.reference_year());
    Ok(pipeline)
}

fn estimate(
    pipeline: &InferencePipeline<StandardScaler, Regressor>,
    args: &EstimateArgs,
) -> price_estimator::Result<()> {
    args.validate()?;
    let input = args.to_input();

    let known_models = pipeline.knowledge_base().models_for_brand(&input.brand);
    if !known_models.is_empty() && !known_models.contains(&input.model.as_str()) {
        tracing::warn!("Model '{}' is not listed for brand '{}'", input.model, input.brand);
    }

    let estimate = pipeline.estimate(&input)?;

    if args.show_features {
        println!("📋 Features:");
        for (name, value) in estimate.features.iter() {
            println!("  {:<16} {}", name, value);
        }
    }

    println!(
        "💰 Estimated Market Value: {} ({} {} {}, {} miles, {})",
        format_currency(estimate.price),
        input.year,
        input.brand,
        input.model,
        input.mileage,
        args.listing
    );
    Ok(())
}

fn fail(e: &EstimatorError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}
