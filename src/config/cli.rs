use crate::config::engine_config::{DatasetSourceKind, EngineConfig};
use crate::core::dataset::DatasetFormat;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, Validate};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "ingredient-risk")]
#[command(about = "Check an OCR'd cosmetic ingredient list against a skin profile")]
pub struct CliConfig {
    /// Optional TOML configuration, command line flags win over it
    #[arg(long)]
    pub config: Option<String>,

    /// Reference dataset file (csv or json)
    #[arg(long)]
    pub dataset: Option<String>,

    /// Dataset format, inferred from the extension when omitted
    #[arg(long = "format", value_enum)]
    pub dataset_format: Option<DatasetFormat>,

    /// Profile JSON as exported by the profile service
    #[arg(long)]
    pub profile: String,

    /// OCR text file, `-` reads stdin
    #[arg(long, default_value = "-")]
    pub text: String,

    #[arg(long)]
    pub locale: Option<String>,

    /// Override matcher.acceptance_threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log timing and memory per phase")]
    pub monitor: bool,
}

impl CliConfig {
    /// 合併 TOML 設定與命令列覆蓋
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(dataset) = &self.dataset {
            config.dataset.source = DatasetSourceKind::File;
            config.dataset.path = Some(dataset.clone());
        }
        if let Some(format) = self.dataset_format {
            config.dataset.format = Some(format);
        }
        if let Some(threshold) = self.threshold {
            config = config.with_acceptance_threshold(threshold);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("profile", &self.profile)?;
        validate_path("text", &self.text)?;
        if let Some(threshold) = self.threshold {
            validate_range("threshold", threshold, 0.0, 1.0)?;
        }
        Ok(())
    }
}
