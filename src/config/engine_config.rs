use crate::core::dataset::DatasetFormat;
use crate::domain::model::{DermalSafety, HazardCategory, HazardSeverity};
use crate::domain::profile::SkinCondition;
use crate::utils::error::{Result, RiskError};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dataset: DatasetConfig,
    pub normalizer: NormalizerConfig,
    pub matcher: MatcherConfig,
    pub scoring: ScoringConfig,
    pub batch: Option<BatchConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSourceKind {
    #[default]
    File,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub source: DatasetSourceKind,
    pub path: Option<String>,
    pub url: Option<String>,
    pub format: Option<DatasetFormat>,
    pub timeout_seconds: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: DatasetSourceKind::File,
            path: Some("reference/ingredients.csv".to_string()),
            url: None,
            format: None,
            timeout_seconds: 30,
        }
    }
}

impl DatasetConfig {
    /// 沒有明確指定格式時，依副檔名判斷
    pub fn resolved_format(&self) -> DatasetFormat {
        if let Some(format) = self.format {
            return format;
        }
        let location = match self.source {
            DatasetSourceKind::File => self.path.as_deref(),
            DatasetSourceKind::Http => self.url.as_deref(),
        };
        location
            .and_then(DatasetFormat::from_extension)
            .unwrap_or(DatasetFormat::Csv)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub min_token_length: usize,
    /// Checked in order, the first marker found opens the ingredient section.
    pub section_markers: Vec<String>,
    pub end_phrases: Vec<String>,
    pub stop_phrases: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            min_token_length: 3,
            section_markers: owned(&[
                "ingredients",
                "ingrédients",
                "inhaltsstoffe",
                "inci",
                "składniki",
                "skład",
                "zawiera",
                "contains",
            ]),
            end_phrases: owned(&["made in", "wyprodukowano w", "best before", "najlepiej użyć przed"]),
            stop_phrases: owned(&["www.", ".com", "uwagi", "note:", "przyp"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub acceptance_threshold: f64,
    /// 編輯距離預算 = max(min_distance, floor(長度 / distance_divisor))
    pub distance_divisor: usize,
    pub min_distance: usize,
    pub max_distance: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.8,
            distance_divisor: 6,
            min_distance: 1,
            max_distance: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
    pub condition: SkinCondition,
    pub hazards: Vec<HazardCategory>,
    /// Overrides `scoring.avoid_threshold` for this condition.
    #[serde(default)]
    pub avoid_at: Option<HazardSeverity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub avoid_threshold: HazardSeverity,
    pub condition_rules: Vec<ConditionRule>,
    pub toxicology: ToxicologyConfig,
}

/// 動物毒理數據換算成人體等效劑量 (HED) 的參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToxicologyConfig {
    pub human_weight_kg: f64,
    pub safety_factor: f64,
    pub skin_penetration_percent: f64,
    pub application_area_cm2: f64,
    /// Dose assessments at or below this tier raise a caution.
    pub caution_at: DermalSafety,
}

impl Default for ToxicologyConfig {
    fn default() -> Self {
        Self {
            human_weight_kg: 60.0,
            safety_factor: 100.0,
            skin_penetration_percent: 10.0,
            application_area_cm2: 100.0,
            caution_at: DermalSafety::HighRisk,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        use HazardCategory::{Allergen, Comedogenic, Irritant};
        let rule = |condition, hazards: &[HazardCategory]| ConditionRule {
            condition,
            hazards: hazards.to_vec(),
            avoid_at: None,
        };

        Self {
            avoid_threshold: HazardSeverity::High,
            condition_rules: vec![
                rule(SkinCondition::AcneProne, &[Comedogenic]),
                rule(SkinCondition::SensitiveSkin, &[Irritant, Allergen]),
                rule(SkinCondition::Atopic, &[Irritant, Allergen]),
                rule(SkinCondition::Eczema, &[Irritant, Allergen]),
                rule(SkinCondition::Rosacea, &[Irritant]),
                rule(SkinCondition::Psoriasis, &[Irritant]),
                rule(SkinCondition::AllergyProne, &[Allergen]),
            ],
            toxicology: ToxicologyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub input_dir: String,
    pub output_path: String,
    pub profile_path: Option<String>,
    pub locale: Option<String>,
    pub concurrency: Option<usize>,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: String,
}

fn default_output_formats() -> Vec<String> {
    vec!["json".to_string(), "csv".to_string()]
}

impl BatchConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4)
    }

    pub fn wants_format(&self, format: &str) -> bool {
        self.output_formats.iter().any(|f| f == format)
    }

    pub fn archive_name(&self) -> Option<&str> {
        self.compression
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| c.filename.as_str())
    }

    pub fn profile_path(&self) -> Result<&String> {
        validate_required_field("batch.profile_path", &self.profile_path)
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RiskError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATASET_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.matcher.acceptance_threshold = threshold;
        self
    }

    fn validate_dataset(&self) -> Result<()> {
        let dataset = &self.dataset;
        match dataset.source {
            DatasetSourceKind::File => {
                let path = validate_required_field("dataset.path", &dataset.path)?;
                validate_path("dataset.path", path)?;
                if dataset.format.is_none() {
                    validate_file_extension("dataset.path", path, &["csv", "json"])?;
                }
            }
            DatasetSourceKind::Http => {
                let url = validate_required_field("dataset.url", &dataset.url)?;
                validate_url("dataset.url", url)?;
            }
        }
        validate_range("dataset.timeout_seconds", dataset.timeout_seconds, 1, 600)
    }

    fn validate_normalizer(&self) -> Result<()> {
        let normalizer = &self.normalizer;
        validate_range("normalizer.min_token_length", normalizer.min_token_length, 1, 64)?;
        for marker in &normalizer.section_markers {
            validate_non_empty_string("normalizer.section_markers", marker)?;
        }
        for phrase in normalizer.end_phrases.iter().chain(&normalizer.stop_phrases) {
            validate_non_empty_string("normalizer.phrases", phrase)?;
        }
        Ok(())
    }

    fn validate_matcher(&self) -> Result<()> {
        let matcher = &self.matcher;
        validate_range("matcher.acceptance_threshold", matcher.acceptance_threshold, 0.0, 1.0)?;
        validate_positive_number("matcher.distance_divisor", matcher.distance_divisor, 1)?;
        validate_range("matcher.max_distance", matcher.max_distance, matcher.min_distance, 16)
    }

    fn validate_scoring(&self) -> Result<()> {
        let toxicology = &self.scoring.toxicology;
        validate_range("scoring.toxicology.human_weight_kg", toxicology.human_weight_kg, 1.0, 500.0)?;
        validate_range("scoring.toxicology.safety_factor", toxicology.safety_factor, 1.0, 10_000.0)?;
        validate_range(
            "scoring.toxicology.skin_penetration_percent",
            toxicology.skin_penetration_percent,
            0.01,
            100.0,
        )?;
        validate_range(
            "scoring.toxicology.application_area_cm2",
            toxicology.application_area_cm2,
            1.0,
            20_000.0,
        )?;

        for rule in &self.scoring.condition_rules {
            if rule.hazards.is_empty() {
                return Err(RiskError::invalid_value(
                    "scoring.condition_rules",
                    rule.condition,
                    "A condition rule needs at least one hazard category",
                ));
            }
        }
        Ok(())
    }

    fn validate_batch(&self) -> Result<()> {
        let Some(batch) = &self.batch else {
            return Ok(());
        };

        validate_path("batch.input_dir", &batch.input_dir)?;
        validate_path("batch.output_path", &batch.output_path)?;
        validate_positive_number("batch.concurrency", batch.concurrency(), 1)?;

        let valid_formats = ["json", "csv"];
        for format in &batch.output_formats {
            if !valid_formats.contains(&format.as_str()) {
                return Err(RiskError::invalid_value(
                    "batch.output_formats",
                    format,
                    format!("Unsupported format. Valid formats: {}", valid_formats.join(", ")),
                ));
            }
        }

        if let Some(compression) = &batch.compression {
            if compression.enabled {
                validate_file_extension("batch.compression.filename", &compression.filename, &["zip"])?;
            }
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Only the sections an analysis reads. Dataset and batch settings do not
    /// matter once the caller holds a built index.
    pub fn validate_analysis(&self) -> Result<()> {
        self.validate_normalizer()?;
        self.validate_matcher()?;
        self.validate_scoring()
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_dataset()?;
        self.validate_analysis()?;
        self.validate_batch()
    }
}
