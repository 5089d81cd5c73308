use crate::core::normalizer::canonical_key;
use crate::core::reference_index::ReferenceIndex;
use crate::domain::model::{
    AmbiguousAlias, HazardCategory, HazardFlag, HazardSeverity, ReferenceIngredient, ToxicityValue,
};
use crate::domain::ports::DatasetSource;
use crate::utils::error::{Result, RiskError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum DatasetFormat {
    Csv,
    Json,
}

impl DatasetFormat {
    pub fn from_extension(location: &str) -> Option<Self> {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        match std::path::Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("csv") => Some(DatasetFormat::Csv),
            Some("json") => Some(DatasetFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

/// 建索引時的統計，回報給呼叫端
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexBuildReport {
    pub rows_read: usize,
    pub ingredients_indexed: usize,
    pub skipped: Vec<SkippedRow>,
    pub ambiguous_aliases: Vec<AmbiguousAlias>,
}

impl IndexBuildReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// CSV layout: aliases and hazards are `|` separated, hazards are `category[:severity]`,
/// toxicity entries are `TYPE:value:unit:species:route`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    canonical_name: String,
    #[serde(default)]
    aliases: String,
    #[serde(default)]
    hazards: String,
    #[serde(default)]
    cas_number: String,
    #[serde(default)]
    ec_number: String,
    #[serde(default)]
    popularity: String,
    #[serde(default)]
    toxicity: String,
}

#[derive(Debug, Deserialize)]
struct JsonRow {
    canonical_name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    hazards: Vec<JsonHazard>,
    #[serde(default)]
    cas_number: Option<String>,
    #[serde(default)]
    ec_number: Option<String>,
    #[serde(default)]
    popularity: Option<u32>,
    #[serde(default)]
    toxicity: Vec<ToxicityValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonHazard {
    Bare(String),
    Detailed {
        category: String,
        #[serde(default)]
        severity: Option<String>,
    },
}

/// Row shape shared by both formats before validation.
struct RawIngredient {
    canonical_name: String,
    aliases: Vec<String>,
    hazards: Vec<(String, Option<String>)>,
    cas_number: Option<String>,
    ec_number: Option<String>,
    popularity: u32,
    toxicity: Vec<ToxicityValue>,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_toxicity(entry: &str) -> std::result::Result<ToxicityValue, String> {
    let malformed = || format!("malformed toxicity entry '{}'", entry);
    let fields: Vec<&str> = entry.split(':').map(str::trim).collect();
    let [kind, value, unit, species, route] = fields[..] else {
        return Err(malformed());
    };
    Ok(ToxicityValue {
        kind: kind.to_string(),
        value: value.parse().map_err(|_| malformed())?,
        unit: unit.to_string(),
        species: species.to_string(),
        route: route.to_string(),
    })
}

impl CsvRow {
    fn into_raw(self) -> std::result::Result<RawIngredient, String> {
        let popularity = match self.popularity.trim() {
            "" => 0,
            value => value
                .parse::<u32>()
                .map_err(|_| format!("popularity '{}' is not a non-negative integer", value))?,
        };
        let toxicity = self
            .toxicity
            .split('|')
            .filter_map(non_empty)
            .map(|entry| parse_toxicity(&entry))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RawIngredient {
            canonical_name: self.canonical_name,
            aliases: self.aliases.split('|').filter_map(non_empty).collect(),
            hazards: self
                .hazards
                .split('|')
                .filter_map(non_empty)
                .map(|hazard| match hazard.split_once(':') {
                    Some((category, severity)) => (category.to_string(), Some(severity.to_string())),
                    None => (hazard, None),
                })
                .collect(),
            cas_number: non_empty(&self.cas_number),
            ec_number: non_empty(&self.ec_number),
            popularity,
            toxicity,
        })
    }
}

impl From<JsonRow> for RawIngredient {
    fn from(row: JsonRow) -> Self {
        Self {
            canonical_name: row.canonical_name,
            aliases: row.aliases,
            hazards: row
                .hazards
                .into_iter()
                .map(|hazard| match hazard {
                    JsonHazard::Bare(category) => (category, None),
                    JsonHazard::Detailed { category, severity } => (category, severity),
                })
                .collect(),
            cas_number: row.cas_number.as_deref().and_then(non_empty),
            ec_number: row.ec_number.as_deref().and_then(non_empty),
            popularity: row.popularity.unwrap_or(0),
            toxicity: row.toxicity,
        }
    }
}

/// Collects validated rows; malformed rows are logged and skipped, never fatal.
pub struct IndexBuilder {
    ingredients: Vec<ReferenceIngredient>,
    seen: HashSet<String>,
    report: IndexBuildReport,
    cas_pattern: Regex,
}

impl IndexBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ingredients: Vec::new(),
            seen: HashSet::new(),
            report: IndexBuildReport::default(),
            cas_pattern: Regex::new(r"^\d{2,7}-\d{2}-\d$")?,
        })
    }

    fn accept(&mut self, line: usize, row: std::result::Result<RawIngredient, String>) {
        self.report.rows_read += 1;
        match row.and_then(|raw| self.validate(raw)) {
            Ok(ingredient) => self.ingredients.push(ingredient),
            Err(reason) => {
                tracing::warn!("Skipping dataset row {}: {}", line, reason);
                self.report.skipped.push(SkippedRow { line, reason });
            }
        }
    }

    fn validate(&mut self, raw: RawIngredient) -> std::result::Result<ReferenceIngredient, String> {
        let canonical_name = raw.canonical_name.trim().to_string();
        let key = canonical_key(&canonical_name);
        if key.is_empty() {
            return Err("canonical name is empty".to_string());
        }
        if self.seen.contains(&key) {
            return Err(format!("duplicate canonical name '{}'", canonical_name));
        }

        let mut alias_keys = HashSet::from([key.clone()]);
        let mut aliases = Vec::new();
        for alias in raw.aliases {
            let alias = alias.trim().to_string();
            let alias_key = canonical_key(&alias);
            if !alias_key.is_empty() && alias_keys.insert(alias_key) {
                aliases.push(alias);
            }
        }
        aliases.sort();

        let mut hazards: Vec<HazardFlag> = Vec::new();
        for (category, severity) in raw.hazards {
            let category: HazardCategory = category.parse()?;
            let severity = match severity {
                Some(severity) => severity.parse()?,
                None => HazardSeverity::Medium,
            };
            match hazards.iter_mut().find(|flag| flag.category == category) {
                Some(flag) => flag.severity = flag.severity.max(severity),
                None => hazards.push(HazardFlag { category, severity }),
            }
        }
        hazards.sort_by_key(|flag| flag.category);

        if let Some(cas) = &raw.cas_number {
            if !self.cas_pattern.is_match(cas) {
                return Err(format!("malformed CAS number '{}'", cas));
            }
        }

        if let Some(bad) = raw.toxicity.iter().find(|t| !(t.value.is_finite() && t.value > 0.0)) {
            return Err(format!("toxicity value {} for {} must be positive", bad.value, bad.kind));
        }

        self.seen.insert(key);
        Ok(ReferenceIngredient {
            canonical_name,
            aliases,
            hazards,
            cas_number: raw.cas_number,
            ec_number: raw.ec_number,
            popularity: raw.popularity,
            toxicity: raw.toxicity,
        })
    }

    pub fn read_csv(&mut self, bytes: &[u8]) {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        for (i, result) in reader.deserialize::<CsvRow>().enumerate() {
            // header 佔第一行
            let fallback_line = i + 2;
            match result {
                Ok(row) => self.accept(fallback_line, row.into_raw()),
                Err(e) => {
                    let line = e
                        .position()
                        .map(|p| p.line() as usize)
                        .unwrap_or(fallback_line);
                    self.accept(line, Err(e.to_string()));
                }
            }
        }
    }

    pub fn read_json(&mut self, bytes: &[u8]) -> Result<()> {
        let rows: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        for (i, value) in rows.into_iter().enumerate() {
            let row = serde_json::from_value::<JsonRow>(value)
                .map(RawIngredient::from)
                .map_err(|e| e.to_string());
            self.accept(i + 1, row);
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(ReferenceIndex, IndexBuildReport)> {
        if self.ingredients.is_empty() {
            return Err(RiskError::IndexBuildError {
                message: format!(
                    "no valid ingredient rows ({} read, {} skipped)",
                    self.report.rows_read,
                    self.report.skipped_count()
                ),
            });
        }

        let index = ReferenceIndex::build(self.ingredients)?;
        self.report.ingredients_indexed = index.len();
        self.report.ambiguous_aliases = index.ambiguous_aliases().to_vec();

        tracing::info!(
            "Reference index built: {} ingredients, {} rows skipped, {} ambiguous aliases",
            self.report.ingredients_indexed,
            self.report.skipped_count(),
            self.report.ambiguous_aliases.len()
        );
        Ok((index, self.report))
    }
}

pub fn parse_dataset(bytes: &[u8], format: DatasetFormat) -> Result<(ReferenceIndex, IndexBuildReport)> {
    let mut builder = IndexBuilder::new()?;
    match format {
        DatasetFormat::Csv => builder.read_csv(bytes),
        DatasetFormat::Json => builder.read_json(bytes)?,
    }
    builder.finish()
}

pub async fn load_index(
    source: &dyn DatasetSource,
    format: DatasetFormat,
) -> Result<(ReferenceIndex, IndexBuildReport)> {
    tracing::info!("Loading reference dataset from {} ({:?})", source.describe(), format);
    let bytes = source.fetch().await?;
    tracing::debug!("Fetched {} bytes of reference data", bytes.len());

    tokio::task::spawn_blocking(move || parse_dataset(&bytes, format))
        .await
        .map_err(|e| RiskError::TaskError {
            message: format!("index build task failed: {}", e),
        })?
}
