use anyhow::Context;
use clap::Parser;
use price_estimator::config::toml_config::BatchConfig;
use price_estimator::utils::{logger, validation::Validate};
use price_estimator::{ArtifactLoader, BatchEngine, CsvBatchPipeline, EstimatorConfig, LocalStorage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "batch-estimate")]
#[command(about = "Estimate prices for every vehicle in a CSV file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "estimator.toml")]
    config: String,

    /// Override the input CSV from the config
    #[arg(short, long)]
    input: Option<String>,

    /// Override the output CSV from the config
    #[arg(short, long)]
    output: Option<String>,

    /// Override the reference year from the config
    #[arg(long)]
    reference_year: Option<i32>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match EstimatorConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    config.apply_overrides(None, args.reference_year);
    apply_batch_overrides(&mut config, &args);

    logger::init_from_settings(config.log_format(), config.log_level(), args.verbose);
    tracing::info!("🚀 Starting batch estimation");
    tracing::info!("📁 Configuration: {}", args.config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }

    let Some(batch) = config.batch.clone() else {
        eprintln!("❌ No [batch] section in config and no --input/--output given");
        std::process::exit(1);
    };

    config.warn_if_reference_year_stale();
    display_config_summary(&config, &batch);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No estimates will be written");
        return Ok(());
    }

    let loader = ArtifactLoader::new(LocalStorage::new(""));
    let pipeline = loader
        .load_pipeline(&config)
        .await
        .context("loading model artifacts")?;

    let batch_pipeline = CsvBatchPipeline::new(
        LocalStorage::new(""),
        Arc::new(pipeline),
        batch.input.clone(),
        batch.output.clone(),
    )
    .with_delimiter(config.batch_delimiter()?);

    let engine = BatchEngine::new(batch_pipeline);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Batch estimation completed");
            println!(
                "✅ {} of {} vehicles estimated ({} failed)",
                summary.succeeded, summary.total, summary.failed
            );
            println!("📁 Output saved to: {}", summary.output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch estimation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    }

    Ok(())
}

fn apply_batch_overrides(config: &mut EstimatorConfig, args: &Args) {
    if let Some(batch) = config.batch.as_mut() {
        if let Some(input) = &args.input {
            batch.input = input.clone();
        }
        if let Some(output) = &args.output {
            batch.output = output.clone();
        }
    } else if let (Some(input), Some(output)) = (&args.input, &args.output) {
        config.batch = Some(BatchConfig {
            input: input.clone(),
            output: output.clone(),
            delimiter: None,
        });
    }
}

fn display_config_summary(config: &EstimatorConfig, batch: &BatchConfig) {
    println!("📋 Configuration Summary:");
    println!("  Estimator: {}", config.estimator.name);
    println!("  Reference Year: {}", config.estimator.reference_year);
    println!("  Artifacts: {}", config.artifacts.base_dir);
    println!("  Input: {}", batch.input);
    println!("  Output: {}", batch.output);
    println!();
}
