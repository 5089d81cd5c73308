use clap::Parser;
use ingredient_risk::config::OutputFormat;
use ingredient_risk::utils::error::{ErrorSeverity, RiskError};
use ingredient_risk::utils::{logger, monitor::PhaseMonitor, validation::Validate};
use ingredient_risk::{source_from_config, AnalysisReport, CliConfig, RawScanText, RiskEngine, UserSkinProfile};
use std::io::Read;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting ingredient-risk CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor = PhaseMonitor::new(config.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&config, &monitor).await {
        Ok(report) => {
            match config.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Table => print_table(&report),
            }
            monitor.log_final_stats();
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Analysis failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
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
    }

    Ok(())
}

async fn run(config: &CliConfig, monitor: &PhaseMonitor) -> Result<AnalysisReport, RiskError> {
    let engine_config = config.engine_config()?;

    let source = source_from_config(&engine_config.dataset)?;
    let (engine, build_report) = RiskEngine::from_source(source.as_ref(), engine_config).await?;
    if build_report.skipped_count() > 0 {
        tracing::warn!(
            "⚠️ {} dataset rows were skipped, run with --verbose for details",
            build_report.skipped_count()
        );
    }
    monitor.log_phase("Index build");

    let profile = read_profile(&config.profile)?;
    let raw = read_scan(&config.text, config.locale.clone())?;
    tracing::debug!("Scan text has {} bytes", raw.text().len());

    let report = engine.analyze_async(raw, profile).await?;
    monitor.log_phase("Analysis");

    tracing::info!(
        "✅ Summary: {} ({} recognized, {} unrecognized)",
        report.summary,
        report.recognized_count,
        report.unrecognized_count
    );
    Ok(report)
}

fn read_profile(path: &str) -> Result<UserSkinProfile, RiskError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_scan(path: &str, locale: Option<String>) -> Result<RawScanText, RiskError> {
    let bytes = if path == "-" {
        let mut buffer = Vec::new();
        std::io::stdin().read_to_end(&mut buffer)?;
        buffer
    } else {
        std::fs::read(path)?
    };
    Ok(RawScanText::from_bytes(&bytes, locale))
}

fn print_table(report: &AnalysisReport) {
    println!(
        "📋 Summary: {} ({} recognized, {} unrecognized)",
        report.summary.to_string().to_uppercase(),
        report.recognized_count,
        report.unrecognized_count
    );
    println!("{:<8} {:<32} {:>6} {:>5}  REASONS", "RISK", "INGREDIENT", "CONF", "SCORE");

    for verdict in &report.verdicts {
        let name = verdict.ingredient.as_deref().unwrap_or(&verdict.label_text);
        let score = verdict.risk_score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:<32} {:>6.2} {:>5}  {}",
            verdict.risk,
            name,
            verdict.confidence,
            score,
            verdict.reasons.join("; ")
        );
    }

    for warning in &report.warnings {
        println!(
            "⚠️ '{}' is ambiguous: {}",
            warning.alias,
            warning.candidates.join(", ")
        );
    }
}
