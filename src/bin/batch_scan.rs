use clap::Parser;
use ingredient_risk::app::BatchRunner;
use ingredient_risk::config::BatchConfig;
use ingredient_risk::utils::error::{ErrorSeverity, RiskError};
use ingredient_risk::utils::{logger, monitor::PhaseMonitor, validation::Validate};
use ingredient_risk::{source_from_config, EngineConfig, LocalStorage, RiskEngine, UserSkinProfile};

#[derive(Parser)]
#[command(name = "batch-scan")]
#[command(about = "Analyse a directory of OCR scans against one skin profile")]
struct Args {
    /// Path to TOML configuration file with a [batch] section
    #[arg(short, long, default_value = "ingredient-risk.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log timing and memory per phase
    #[arg(long)]
    monitor: bool,

    /// Dry run - list the scans that would be analysed
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting batch scan");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match EngineConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let Some(batch) = config.batch.clone() else {
        let e = RiskError::MissingConfigError {
            field: "batch".to_string(),
        };
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    };

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &batch);

    let monitor = PhaseMonitor::new(args.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(config, batch, args.dry_run, &monitor).await {
        tracing::error!(
            "❌ Batch scan failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    monitor.log_final_stats();
    Ok(())
}

async fn run(
    config: EngineConfig,
    batch: BatchConfig,
    dry_run: bool,
    monitor: &PhaseMonitor,
) -> Result<(), RiskError> {
    let profile = load_profile(batch.profile_path()?)?;

    let source = source_from_config(&config.dataset)?;
    let (engine, build_report) = RiskEngine::from_source(source.as_ref(), config).await?;
    tracing::info!(
        "📚 Index: {} ingredients, {} rows skipped",
        build_report.ingredients_indexed,
        build_report.skipped_count()
    );
    monitor.log_phase("Index build");

    let storage = LocalStorage::new(&batch.output_path);
    let runner = BatchRunner::new(engine, storage, batch.clone());

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        for scan in runner.collect_scans()? {
            println!("  would analyse {}", scan.display());
        }
        return Ok(());
    }

    let summary = runner.run(&profile).await?;
    monitor.log_phase("Analysis and write");

    println!("✅ Batch scan completed successfully!");
    println!("📁 Output saved to: {}", batch.output_path);
    for outcome in &summary.scans {
        println!(
            "  {:<24} {:<12} avoid {:>3}  caution {:>3}",
            outcome.scan, outcome.summary, outcome.avoid, outcome.caution
        );
    }
    for failed in &summary.failed {
        println!("  ⚠️ {} failed: {}", failed.scan, failed.error);
    }
    Ok(())
}

fn load_profile(path: &str) -> Result<UserSkinProfile, RiskError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn display_config_summary(config: &EngineConfig, batch: &BatchConfig) {
    println!("📋 Configuration Summary:");
    match config.dataset.source {
        ingredient_risk::config::DatasetSourceKind::File => {
            println!("  Dataset: {}", config.dataset.path.as_deref().unwrap_or("-"))
        }
        ingredient_risk::config::DatasetSourceKind::Http => {
            println!("  Dataset: {}", config.dataset.url.as_deref().unwrap_or("-"))
        }
    }
    println!("  Input: {}", batch.input_dir);
    println!("  Output: {}", batch.output_path);
    println!("  Formats: {}", batch.output_formats.join(", "));
    println!("  Concurrency: {}", batch.concurrency());
    if let Some(archive) = batch.archive_name() {
        println!("  Archive: {}", archive);
    }
}

