use crate::core::normalizer::canonical_key;
use crate::domain::model::{AmbiguousAlias, AnalysisReport, IngredientVerdict, RiskLevel, SummaryRisk};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VerdictKey {
    Recognized(String),
    Unrecognized(String),
}

impl VerdictKey {
    fn of(verdict: &IngredientVerdict) -> Self {
        match &verdict.ingredient {
            Some(name) => VerdictKey::Recognized(name.clone()),
            None => VerdictKey::Unrecognized(canonical_key(&verdict.label_text)),
        }
    }
}

/// Folds a later occurrence of the same ingredient into the first one.
fn merge(into: &mut IngredientVerdict, other: IngredientVerdict) {
    if other.confidence > into.confidence {
        into.confidence = other.confidence;
        into.strategy = other.strategy;
    }
    into.risk = into.risk.max(other.risk);
    into.risk_score = into.risk_score.max(other.risk_score);
    if into.dose.is_none() {
        into.dose = other.dose;
    }

    let reasons: BTreeSet<String> = into.reasons.drain(..).chain(other.reasons).collect();
    into.reasons = reasons.into_iter().collect();

    into.positions.extend(other.positions);
    into.positions.sort_unstable();
    into.positions.dedup();

    into.ambiguity = match (into.ambiguity.take(), other.ambiguity) {
        (Some(mut left), Some(right)) => {
            let candidates: BTreeSet<String> = left.candidates.drain(..).chain(right.candidates).collect();
            left.candidates = candidates.into_iter().collect();
            Some(left)
        }
        (left, right) => left.or(right),
    };
}

fn summarize(verdicts: &[IngredientVerdict]) -> SummaryRisk {
    let worst = verdicts
        .iter()
        .filter(|v| v.ingredient.is_some())
        .map(|v| v.risk)
        .max();

    match worst {
        None => SummaryRisk::Inconclusive,
        Some(RiskLevel::Avoid) => SummaryRisk::Avoid,
        Some(RiskLevel::Caution) => SummaryRisk::Caution,
        Some(_) => SummaryRisk::Safe,
    }
}

pub fn build_report(verdicts: Vec<IngredientVerdict>) -> AnalysisReport {
    let mut merged: Vec<IngredientVerdict> = Vec::with_capacity(verdicts.len());
    let mut seen: HashMap<VerdictKey, usize> = HashMap::new();

    for verdict in verdicts {
        let key = VerdictKey::of(&verdict);
        match seen.get(&key) {
            Some(&slot) => merge(&mut merged[slot], verdict),
            None => {
                seen.insert(key, merged.len());
                merged.push(verdict);
            }
        }
    }

    // 穩定排序：同等級依首次出現位置
    merged.sort_by_key(|v| (Reverse(v.risk), v.first_position()));

    let recognized_count = merged.iter().filter(|v| v.ingredient.is_some()).count();
    let warnings: BTreeSet<AmbiguousAlias> = merged.iter().filter_map(|v| v.ambiguity.clone()).collect();

    AnalysisReport {
        summary: summarize(&merged),
        recognized_count,
        unrecognized_count: merged.len() - recognized_count,
        warnings: warnings.into_iter().collect(),
        verdicts: merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MatchStrategy;

    fn verdict(name: Option<&str>, label: &str, position: usize, risk: RiskLevel, reasons: &[&str]) -> IngredientVerdict {
        IngredientVerdict {
            ingredient: name.map(str::to_string),
            label_text: label.to_string(),
            positions: vec![position],
            risk,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
            confidence: if name.is_some() { 1.0 } else { 0.0 },
            strategy: name.map(|_| MatchStrategy::Exact),
            ambiguity: None,
            risk_score: None,
            dose: None,
        }
    }

    #[test]
    fn test_orders_by_risk_then_first_occurrence() {
        let report = build_report(vec![
            verdict(Some("Aqua"), "aqua", 0, RiskLevel::Safe, &[]),
            verdict(None, "xyzzy", 1, RiskLevel::Unknown, &["ingredient not recognized"]),
            verdict(Some("Fragrance"), "parfum", 2, RiskLevel::Avoid, &["a"]),
            verdict(Some("Limonene"), "limonene", 3, RiskLevel::Caution, &["b"]),
            verdict(Some("Linalool"), "linalool", 4, RiskLevel::Avoid, &["c"]),
        ]);

        let order: Vec<&str> = report.verdicts.iter().map(|v| v.label_text.as_str()).collect();
        assert_eq!(order, vec!["parfum", "linalool", "limonene", "aqua", "xyzzy"]);
        assert_eq!(report.summary, SummaryRisk::Avoid);
        assert_eq!(report.recognized_count, 4);
        assert_eq!(report.unrecognized_count, 1);
    }

    #[test]
    fn test_duplicates_are_merged() {
        let mut fuzzy = verdict(Some("Fragrance"), "perfume", 5, RiskLevel::Caution, &["low-confidence identification"]);
        fuzzy.confidence = 0.86;
        fuzzy.strategy = Some(MatchStrategy::Fuzzy);

        let report = build_report(vec![
            fuzzy,
            verdict(Some("Aqua"), "aqua", 6, RiskLevel::Safe, &[]),
            verdict(Some("Fragrance"), "parfum", 9, RiskLevel::Avoid, &["matches declared allergy: parfum"]),
            verdict(None, "xyzzy", 10, RiskLevel::Unknown, &["ingredient not recognized"]),
            verdict(None, "XYZZY", 11, RiskLevel::Unknown, &["ingredient not recognized"]),
        ]);

        assert_eq!(report.verdicts.len(), 3);
        let fragrance = report.verdict_for("Fragrance").unwrap();
        assert_eq!(fragrance.label_text, "perfume");
        assert_eq!(fragrance.positions, vec![5, 9]);
        assert_eq!(fragrance.risk, RiskLevel::Avoid);
        assert_eq!(fragrance.confidence, 1.0);
        assert_eq!(fragrance.strategy, Some(MatchStrategy::Exact));
        assert_eq!(
            fragrance.reasons,
            vec!["low-confidence identification", "matches declared allergy: parfum"]
        );
        assert_eq!(report.unrecognized_count, 1);
        assert_eq!(report.verdicts[2].positions, vec![10, 11]);
    }

    #[test]
    fn test_only_unrecognized_is_inconclusive() {
        let report = build_report(vec![verdict(None, "xyzzy", 0, RiskLevel::Unknown, &[])]);
        assert_eq!(report.summary, SummaryRisk::Inconclusive);
        assert!(build_report(vec![]).verdicts.is_empty());
        assert_eq!(build_report(vec![]).summary, SummaryRisk::Inconclusive);
    }

    #[test]
    fn test_ambiguity_becomes_warning() {
        let mut first = verdict(Some("Aroma Oil"), "aroma", 0, RiskLevel::Safe, &[]);
        first.ambiguity = Some(AmbiguousAlias {
            alias: "aroma".to_string(),
            candidates: vec!["Aroma Oil".to_string(), "Vanillin".to_string()],
        });
        let second = first.clone();

        let report = build_report(vec![first, second]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].candidates, vec!["Aroma Oil", "Vanillin"]);
        assert_eq!(report.summary, SummaryRisk::Safe);
    }
}
