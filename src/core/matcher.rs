use crate::config::engine_config::MatcherConfig;
use crate::core::normalizer::{canonical_key, compact_key};
use crate::core::reference_index::ReferenceIndex;
use crate::domain::model::{AmbiguousAlias, CandidateToken, MatchResult, MatchStrategy, ReferenceIngredient};

/// Resolves candidate tokens against the reference index.
///
/// Every token yields exactly one `MatchResult`. Tokens that cannot be
/// resolved with enough confidence come back unrecognized instead of dropped.
pub struct IngredientMatcher<'a> {
    index: &'a ReferenceIndex,
    config: &'a MatcherConfig,
}

impl<'a> IngredientMatcher<'a> {
    pub fn new(index: &'a ReferenceIndex, config: &'a MatcherConfig) -> Self {
        Self { index, config }
    }

    /// Edit-distance budget for a token of `len` characters.
    pub fn distance_budget(&self, len: usize) -> usize {
        (len / self.config.distance_divisor.max(1))
            .max(self.config.min_distance)
            .min(self.config.max_distance)
    }

    pub fn match_all(&self, tokens: Vec<CandidateToken>) -> Vec<MatchResult<'a>> {
        tokens.into_iter().map(|token| self.match_token(token)).collect()
    }

    pub fn match_token(&self, token: CandidateToken) -> MatchResult<'a> {
        let key = canonical_key(&token.text);
        if key.is_empty() {
            return MatchResult::unrecognized(token);
        }

        // 只剩數字與連字號的 token 是 CAS 號碼，不做模糊比對
        if !key.chars().any(char::is_alphabetic) {
            let hits = self.index.lookup_cas(&key);
            if hits.is_empty() {
                return MatchResult::unrecognized(token);
            }
            return resolved(token, &key, hits, MatchStrategy::Alias);
        }

        let hits = self.index.lookup_exact(&key);
        if let Some(first) = hits.first() {
            let strategy = if is_canonical(first, &key) {
                MatchStrategy::Exact
            } else {
                MatchStrategy::Alias
            };
            return resolved(token, &key, hits, strategy);
        }

        self.match_approximate(token, &key)
    }

    fn match_approximate(&self, token: CandidateToken, key: &str) -> MatchResult<'a> {
        let token_len = key.chars().count();
        let budget = self.distance_budget(token_len);
        let candidates = self.index.lookup_approximate(key, budget);

        let Some(best) = candidates.first() else {
            return MatchResult::unrecognized(token);
        };

        let key_len = best.matched_key.chars().count();
        let similarity = 1.0 - best.distance as f64 / token_len.max(key_len) as f64;
        if similarity < self.config.acceptance_threshold {
            tracing::debug!(
                "Rejected '{}' ~ '{}' (similarity {:.3} below {:.3})",
                key,
                best.matched_key,
                similarity,
                self.config.acceptance_threshold
            );
            return MatchResult::unrecognized(token);
        }

        tracing::debug!(
            "Fuzzy matched '{}' to '{}' (distance {}, similarity {:.3})",
            key,
            best.matched_key,
            best.distance,
            similarity
        );

        // 與精確比對一致：共用鍵時取字母序第一個成分
        let alternatives = self.index.lookup_exact(best.matched_key);
        let chosen = alternatives.first().copied().unwrap_or(best.ingredient);
        MatchResult {
            token,
            ingredient: Some(chosen),
            confidence: similarity,
            strategy: Some(MatchStrategy::Fuzzy),
            ambiguity: ambiguity(best.matched_key, &alternatives),
        }
    }
}

fn is_canonical(ingredient: &ReferenceIngredient, key: &str) -> bool {
    let canonical = canonical_key(&ingredient.canonical_name);
    canonical == key || compact_key(&canonical) == compact_key(key)
}

fn ambiguity(alias: &str, hits: &[&ReferenceIngredient]) -> Option<AmbiguousAlias> {
    (hits.len() > 1).then(|| AmbiguousAlias {
        alias: alias.to_string(),
        candidates: hits.iter().map(|i| i.canonical_name.clone()).collect(),
    })
}

/// Hits arrive in alphabetical order, so the first one wins an ambiguous alias.
fn resolved<'a>(
    token: CandidateToken,
    key: &str,
    hits: Vec<&'a ReferenceIngredient>,
    strategy: MatchStrategy,
) -> MatchResult<'a> {
    MatchResult {
        token,
        ingredient: hits.first().copied(),
        confidence: 1.0,
        strategy: Some(strategy),
        ambiguity: ambiguity(key, &hits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, aliases: &[&str], cas: Option<&str>, popularity: u32) -> ReferenceIngredient {
        ReferenceIngredient {
            canonical_name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            hazards: vec![],
            cas_number: cas.map(str::to_string),
            ec_number: None,
            popularity,
            toxicity: vec![],
        }
    }

    fn index() -> ReferenceIndex {
        ReferenceIndex::build(vec![
            ingredient("Aqua", &["Water"], Some("7732-18-5"), 900),
            ingredient("Glycerin", &["Glycerol"], Some("56-81-5"), 800),
            ingredient("Paraffinum Liquidum", &["Mineral Oil"], None, 400),
            ingredient("Sodium Laureth Sulfate", &["SLES"], None, 500),
            ingredient("Vanillin", &["Aroma"], None, 50),
            ingredient("Aroma Oil", &["Aroma"], None, 40),
        ])
        .unwrap()
    }

    fn token(text: &str) -> CandidateToken {
        CandidateToken {
            text: text.to_string(),
            position: 0,
            span: 0..text.len(),
        }
    }

    #[test]
    fn test_distance_budget() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);
        assert_eq!(matcher.distance_budget(3), 1);
        assert_eq!(matcher.distance_budget(12), 2);
        assert_eq!(matcher.distance_budget(19), 3);
        assert_eq!(matcher.distance_budget(60), 4);
    }

    #[test]
    fn test_exact_and_alias_strategies() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let exact = matcher.match_token(token("aqua"));
        assert_eq!(exact.ingredient.unwrap().canonical_name, "Aqua");
        assert_eq!(exact.strategy, Some(MatchStrategy::Exact));
        assert_eq!(exact.confidence, 1.0);

        let alias = matcher.match_token(token("mineral oil"));
        assert_eq!(alias.ingredient.unwrap().canonical_name, "Paraffinum Liquidum");
        assert_eq!(alias.strategy, Some(MatchStrategy::Alias));
        assert_eq!(alias.confidence, 1.0);
    }

    #[test]
    fn test_merged_ocr_token_hits_compact_key() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let result = matcher.match_token(token("sodiumlaureth sulfate"));
        assert_eq!(result.ingredient.unwrap().canonical_name, "Sodium Laureth Sulfate");
        assert_eq!(result.strategy, Some(MatchStrategy::Exact));
    }

    #[test]
    fn test_misspelled_token_is_fuzzy_matched() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let result = matcher.match_token(token("paraffinum liqiudum"));
        assert_eq!(result.ingredient.unwrap().canonical_name, "Paraffinum Liquidum");
        assert_eq!(result.strategy, Some(MatchStrategy::Fuzzy));
        assert!((result.confidence - (1.0 - 2.0 / 19.0)).abs() < 1e-9);
        assert!(result.confidence >= 0.8);
    }

    #[test]
    fn test_low_similarity_is_unrecognized() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        // "aqxa" 距離 1，但相似度 0.75 低於門檻
        let result = matcher.match_token(token("aqxa"));
        assert!(!result.is_recognized());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.strategy, None);
        assert_eq!(result.token.text, "aqxa");
    }

    #[test]
    fn test_stricter_threshold_rejects_fuzzy_hit() {
        let index = index();
        let config = MatcherConfig {
            acceptance_threshold: 0.95,
            ..MatcherConfig::default()
        };
        let matcher = IngredientMatcher::new(&index, &config);
        assert!(!matcher.match_token(token("paraffinum liqiudum")).is_recognized());
    }

    #[test]
    fn test_ambiguous_alias_is_deterministic() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        for _ in 0..5 {
            let result = matcher.match_token(token("aroma"));
            assert_eq!(result.ingredient.unwrap().canonical_name, "Aroma Oil");
            assert_eq!(result.strategy, Some(MatchStrategy::Alias));
            let ambiguity = result.ambiguity.unwrap();
            assert_eq!(ambiguity.candidates, vec!["Aroma Oil", "Vanillin"]);
        }
    }

    #[test]
    fn test_garbled_ambiguous_alias_resolves_like_exact_alias() {
        let index = ReferenceIndex::build(vec![
            ingredient("Vanillin", &["Aromatic Extract"], None, 50),
            ingredient("Aroma Oil", &["Aromatic Extract"], None, 40),
        ])
        .unwrap();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let clean = matcher.match_token(token("aromatic extract"));
        let garbled = matcher.match_token(token("aromatic extrakt"));

        assert_eq!(clean.strategy, Some(MatchStrategy::Alias));
        assert_eq!(garbled.strategy, Some(MatchStrategy::Fuzzy));
        assert_eq!(clean.ingredient.unwrap().canonical_name, "Aroma Oil");
        assert_eq!(garbled.ingredient.unwrap().canonical_name, "Aroma Oil");

        let candidates = garbled.ambiguity.unwrap().candidates;
        assert_eq!(candidates, vec!["Aroma Oil", "Vanillin"]);
        assert_eq!(candidates, clean.ambiguity.unwrap().candidates);
    }

    #[test]
    fn test_cas_token_resolves_through_cas_lookup() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let result = matcher.match_token(token("56-81-5"));
        assert_eq!(result.ingredient.unwrap().canonical_name, "Glycerin");
        assert_eq!(result.strategy, Some(MatchStrategy::Alias));

        assert!(!matcher.match_token(token("50-00-0")).is_recognized());
    }

    #[test]
    fn test_match_all_keeps_every_token() {
        let index = index();
        let config = MatcherConfig::default();
        let matcher = IngredientMatcher::new(&index, &config);

        let results = matcher.match_all(vec![token("aqua"), token("zzzzzz"), token("glycerol")]);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_recognized());
        assert!(!results[1].is_recognized());
        assert_eq!(results[2].ingredient.unwrap().canonical_name, "Glycerin");
    }
}
