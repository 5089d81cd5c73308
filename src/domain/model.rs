use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// OCR 文字，每次掃描建立一次
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawScanText {
    text: String,
    locale: Option<String>,
}

impl RawScanText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: None,
        }
    }

    /// Invalid UTF-8 degrades to an empty scan instead of failing the request.
    pub fn from_bytes(bytes: &[u8], locale: Option<String>) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self {
                text: text.to_string(),
                locale,
            },
            Err(e) => {
                tracing::warn!("Scan text is not valid UTF-8 ({}), treating as empty", e);
                Self { text: String::new(), locale }
            }
        }
    }

    pub fn from_optional(text: Option<&str>) -> Self {
        Self::new(text.unwrap_or_default())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateToken {
    pub text: String,
    /// 在 token 序列中的順序
    pub position: usize,
    /// 原始文字中的 byte 範圍
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardCategory {
    Allergen,
    Irritant,
    Comedogenic,
    EndocrineDisruptor,
    Photosensitizing,
    PregnancyUnsafe,
}

impl HazardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardCategory::Allergen => "allergen",
            HazardCategory::Irritant => "irritant",
            HazardCategory::Comedogenic => "comedogenic",
            HazardCategory::EndocrineDisruptor => "endocrine_disruptor",
            HazardCategory::Photosensitizing => "photosensitizing",
            HazardCategory::PregnancyUnsafe => "pregnancy_unsafe",
        }
    }
}

impl fmt::Display for HazardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "allergen" | "sensitizer" | "sensitization" => Ok(HazardCategory::Allergen),
            "irritant" | "irritation" => Ok(HazardCategory::Irritant),
            "comedogenic" => Ok(HazardCategory::Comedogenic),
            "endocrine_disruptor" | "endocrine" => Ok(HazardCategory::EndocrineDisruptor),
            "photosensitizing" | "photosensitizer" | "phototoxic" => {
                Ok(HazardCategory::Photosensitizing)
            }
            "pregnancy_unsafe" | "pregnancy" => Ok(HazardCategory::PregnancyUnsafe),
            _ => Err(format!("unknown hazard category '{}'", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for HazardSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HazardSeverity::Low => "low",
            HazardSeverity::Medium => "medium",
            HazardSeverity::High => "high",
        })
    }
}

impl FromStr for HazardSeverity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(HazardSeverity::Low),
            "medium" | "moderate" => Ok(HazardSeverity::Medium),
            "high" => Ok(HazardSeverity::High),
            other => Err(format!("unknown hazard severity '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardFlag {
    pub category: HazardCategory,
    pub severity: HazardSeverity,
}

/// Animal toxicity study value (e.g. NOAEL 1000 mg/kg-day, rat, oral).
/// Unit, species and route are kept as delivered; relevance is decided when
/// the dose is assessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicityValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub unit: String,
    pub species: String,
    pub route: String,
}

/// Canonical ingredient entity. Only the reference index creates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceIngredient {
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub hazards: Vec<HazardFlag>,
    pub cas_number: Option<String>,
    pub ec_number: Option<String>,
    pub popularity: u32,
    #[serde(default)]
    pub toxicity: Vec<ToxicityValue>,
}

impl ReferenceIngredient {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn hazard(&self, category: HazardCategory) -> Option<HazardSeverity> {
        self.hazards
            .iter()
            .filter(|flag| flag.category == category)
            .map(|flag| flag.severity)
            .max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Exact,
    Alias,
    Fuzzy,
}

/// 同一個別名對應到多個成分時的警告
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AmbiguousAlias {
    pub alias: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MatchResult<'a> {
    pub token: CandidateToken,
    pub ingredient: Option<&'a ReferenceIngredient>,
    pub confidence: f64,
    pub strategy: Option<MatchStrategy>,
    pub ambiguity: Option<AmbiguousAlias>,
}

impl<'a> MatchResult<'a> {
    pub fn unrecognized(token: CandidateToken) -> Self {
        Self {
            token,
            ingredient: None,
            confidence: 0.0,
            strategy: None,
            ambiguity: None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.ingredient.is_some()
    }
}

/// Ordered so that `max()` picks the worst verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Unknown,
    Safe,
    Caution,
    Avoid,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            RiskLevel::Unknown => "unknown",
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::Avoid => "avoid",
        })
    }
}

/// Dermal safety tier derived from the safe concentration, worst first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DermalSafety {
    HighRisk,
    RequiresCarefulFormulation,
    SafeWithLimits,
    SafeAtTypicalUse,
    SafeAtAnyConcentration,
}

impl fmt::Display for DermalSafety {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DermalSafety::HighRisk => "high risk",
            DermalSafety::RequiresCarefulFormulation => "requires careful formulation",
            DermalSafety::SafeWithLimits => "safe with limits",
            DermalSafety::SafeAtTypicalUse => "safe at typical use",
            DermalSafety::SafeAtAnyConcentration => "safe at any concentration",
        })
    }
}

/// Human equivalent dose computed from the most conservative animal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseAssessment {
    pub toxicity_type: String,
    pub species: String,
    pub route: String,
    pub source_value_mg_kg: f64,
    pub hed_mg_kg: f64,
    pub total_safe_dose_mg: f64,
    pub safe_concentration_percent: f64,
    pub safety: DermalSafety,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientVerdict {
    pub ingredient: Option<String>,
    pub label_text: String,
    pub positions: Vec<usize>,
    pub risk: RiskLevel,
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub strategy: Option<MatchStrategy>,
    pub ambiguity: Option<AmbiguousAlias>,
    /// 0-100，只有帶危害標記的成分才有
    pub risk_score: Option<u8>,
    pub dose: Option<DoseAssessment>,
}

impl IngredientVerdict {
    pub fn first_position(&self) -> usize {
        self.positions.first().copied().unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryRisk {
    Inconclusive,
    Safe,
    Caution,
    Avoid,
}

impl fmt::Display for SummaryRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            SummaryRisk::Inconclusive => "inconclusive",
            SummaryRisk::Safe => "safe",
            SummaryRisk::Caution => "caution",
            SummaryRisk::Avoid => "avoid",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: SummaryRisk,
    pub verdicts: Vec<IngredientVerdict>,
    pub recognized_count: usize,
    pub unrecognized_count: usize,
    pub warnings: Vec<AmbiguousAlias>,
}

impl AnalysisReport {
    pub fn verdict_for(&self, canonical_name: &str) -> Option<&IngredientVerdict> {
        self.verdicts
            .iter()
            .find(|v| v.ingredient.as_deref() == Some(canonical_name))
    }

    pub fn count_at(&self, risk: RiskLevel) -> usize {
        self.verdicts.iter().filter(|v| v.risk == risk).count()
    }
}
