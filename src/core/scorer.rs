use crate::config::engine_config::{ConditionRule, ScoringConfig, ToxicologyConfig};
use crate::core::normalizer::{canonical_key, compact_key};
use crate::core::toxicology::DoseAssessor;
use crate::domain::model::{
    HazardCategory, HazardSeverity, IngredientVerdict, MatchResult, ReferenceIngredient, RiskLevel,
};
use crate::domain::profile::{SkinCondition, UserSkinProfile};
use std::collections::BTreeSet;

pub const LOW_CONFIDENCE_REASON: &str = "low-confidence identification";
pub const UNRECOGNIZED_REASON: &str = "ingredient not recognized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub level: RiskLevel,
    pub reason: String,
}

impl Finding {
    fn new(level: RiskLevel, reason: impl Into<String>) -> Self {
        Self {
            level,
            reason: reason.into(),
        }
    }
}

/// One personalization axis. Rules never see each other's output, so the
/// final verdict does not depend on the order they are registered in.
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding>;
}

/// `fragrances` ~ `fragrance`, `extracts` ~ `extract`
fn plural_variants(name: &str) -> Vec<String> {
    let key = compact_key(&canonical_key(name));
    let mut variants = vec![key.clone()];
    for suffix in ["es", "s"] {
        if let Some(stem) = key.strip_suffix(suffix) {
            if stem.chars().count() >= 3 {
                variants.push(stem.to_string());
            }
        }
    }
    variants
}

fn names_match(ingredient: &ReferenceIngredient, entry: &str) -> bool {
    let wanted = plural_variants(entry);
    if wanted[0].is_empty() {
        return false;
    }
    ingredient
        .names()
        .any(|name| plural_variants(name).iter().any(|v| wanted.contains(v)))
}

fn declared_matches<'p>(ingredient: &ReferenceIngredient, entries: &'p [String]) -> Vec<&'p str> {
    entries
        .iter()
        .map(|entry| entry.trim())
        .filter(|entry| names_match(ingredient, entry))
        .collect()
}

pub struct CosmeticAllergyRule;

impl RiskRule for CosmeticAllergyRule {
    fn name(&self) -> &'static str {
        "cosmetic_allergy"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding> {
        declared_matches(ingredient, &profile.cosmetic_allergies)
            .into_iter()
            .map(|entry| Finding::new(RiskLevel::Avoid, format!("matches declared allergy: {}", entry)))
            .collect()
    }
}

pub struct GeneralAllergyRule;

impl RiskRule for GeneralAllergyRule {
    fn name(&self) -> &'static str {
        "general_allergy"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding> {
        declared_matches(ingredient, &profile.general_allergies)
            .into_iter()
            .map(|entry| {
                Finding::new(
                    RiskLevel::Caution,
                    format!("matches declared general allergy: {}", entry),
                )
            })
            .collect()
    }
}

pub struct ConditionHazardRule {
    rules: Vec<ConditionRule>,
    avoid_threshold: HazardSeverity,
}

impl ConditionHazardRule {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            rules: config.condition_rules.clone(),
            avoid_threshold: config.avoid_threshold,
        }
    }
}

impl RiskRule for ConditionHazardRule {
    fn name(&self) -> &'static str {
        "condition_hazard"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding> {
        let conditions = profile.active_conditions();
        let mut findings = Vec::new();

        for rule in self.rules.iter().filter(|r| conditions.contains(&r.condition)) {
            let threshold = rule.avoid_at.unwrap_or(self.avoid_threshold);
            for &category in &rule.hazards {
                let Some(severity) = ingredient.hazard(category) else {
                    continue;
                };
                let level = if severity >= threshold {
                    RiskLevel::Avoid
                } else {
                    RiskLevel::Caution
                };
                findings.push(Finding::new(
                    level,
                    format!("{} ({}) conflicts with {}", category, severity, rule.condition),
                ));
            }
        }
        findings
    }
}

pub struct PhotosensitivityRule;

impl RiskRule for PhotosensitivityRule {
    fn name(&self) -> &'static str {
        "photosensitivity"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding> {
        match ingredient.hazard(HazardCategory::Photosensitizing) {
            Some(_) if profile.takes_photosensitizing_drugs() => vec![Finding::new(
                RiskLevel::Caution,
                "photosensitizing ingredient combined with photosensitizing medication",
            )],
            _ => Vec::new(),
        }
    }
}

pub struct PregnancyRule;

impl RiskRule for PregnancyRule {
    fn name(&self) -> &'static str {
        "pregnancy"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Vec<Finding> {
        match ingredient.hazard(HazardCategory::PregnancyUnsafe) {
            Some(_) if profile.is_pregnant() => {
                vec![Finding::new(RiskLevel::Avoid, "not recommended during pregnancy")]
            }
            _ => Vec::new(),
        }
    }
}

/// Flags ingredients whose animal toxicity data leaves only a low safe
/// dermal concentration.
pub struct ToxicologyRule {
    assessor: DoseAssessor,
}

impl ToxicologyRule {
    pub fn new(config: &ToxicologyConfig) -> Self {
        Self {
            assessor: DoseAssessor::new(config),
        }
    }
}

impl RiskRule for ToxicologyRule {
    fn name(&self) -> &'static str {
        "toxicology"
    }

    fn evaluate(&self, ingredient: &ReferenceIngredient, _profile: &UserSkinProfile) -> Vec<Finding> {
        match self.assessor.assess(&ingredient.toxicity) {
            Some(dose) if dose.safety <= self.assessor.caution_at() => vec![Finding::new(
                RiskLevel::Caution,
                format!(
                    "{}: safe dermal concentration {:.4}% ({} in {}, {})",
                    dose.safety, dose.safe_concentration_percent, dose.toxicity_type, dose.species, dose.route
                ),
            )],
            _ => Vec::new(),
        }
    }
}

/// 0-100 hazard score, worst hazard wins: profile boost weighted 0.6,
/// hazard severity weighted 0.4. `None` without hazard flags.
pub fn risk_score(ingredient: &ReferenceIngredient, profile: &UserSkinProfile) -> Option<u8> {
    let conditions = profile.active_conditions();
    let sensitive = conditions.contains(&SkinCondition::SensitiveSkin);
    let allergic = conditions.contains(&SkinCondition::AllergyProne)
        || !profile.cosmetic_allergies.is_empty()
        || !profile.general_allergies.is_empty();

    ingredient
        .hazards
        .iter()
        .map(|flag| {
            let boost = match flag.category {
                HazardCategory::Irritant if sensitive => 0.8,
                HazardCategory::Allergen if allergic => 0.9,
                _ => 0.3,
            };
            let weight = match flag.severity {
                HazardSeverity::High => 0.9,
                HazardSeverity::Medium => 0.6,
                HazardSeverity::Low => 0.3,
            };
            (100.0_f64 * (boost * 0.6 + weight * 0.4)).round() as u8
        })
        .max()
}

pub struct RiskScorer {
    rules: Vec<Box<dyn RiskRule>>,
    assessor: DoseAssessor,
}

impl RiskScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        let mut scorer = Self::with_rules(vec![
            Box::new(CosmeticAllergyRule),
            Box::new(GeneralAllergyRule),
            Box::new(ConditionHazardRule::new(config)),
            Box::new(PhotosensitivityRule),
            Box::new(PregnancyRule),
            Box::new(ToxicologyRule::new(&config.toxicology)),
        ]);
        scorer.assessor = DoseAssessor::new(&config.toxicology);
        scorer
    }

    /// Uses the default toxicology parameters for the `dose` field.
    pub fn with_rules(rules: Vec<Box<dyn RiskRule>>) -> Self {
        Self {
            rules,
            assessor: DoseAssessor::default(),
        }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn score(&self, result: &MatchResult<'_>, profile: &UserSkinProfile) -> IngredientVerdict {
        let mut verdict = IngredientVerdict {
            ingredient: None,
            label_text: result.token.text.clone(),
            positions: vec![result.token.position],
            risk: RiskLevel::Unknown,
            reasons: vec![UNRECOGNIZED_REASON.to_string()],
            confidence: result.confidence,
            strategy: result.strategy,
            ambiguity: result.ambiguity.clone(),
            risk_score: None,
            dose: None,
        };

        let Some(ingredient) = result.ingredient else {
            return verdict;
        };

        let findings: Vec<Finding> = self
            .rules
            .iter()
            .flat_map(|rule| rule.evaluate(ingredient, profile))
            .collect();

        let mut risk = findings
            .iter()
            .map(|f| f.level)
            .max()
            .unwrap_or(RiskLevel::Safe);
        let mut reasons: BTreeSet<String> = findings.into_iter().map(|f| f.reason).collect();

        if reasons.is_empty() && result.confidence < 1.0 {
            risk = RiskLevel::Caution;
            reasons.insert(LOW_CONFIDENCE_REASON.to_string());
        }

        verdict.ingredient = Some(ingredient.canonical_name.clone());
        verdict.risk = risk;
        verdict.reasons = reasons.into_iter().collect();
        verdict.risk_score = risk_score(ingredient, profile);
        verdict.dose = self.assessor.assess(&ingredient.toxicity);
        verdict
    }
}
