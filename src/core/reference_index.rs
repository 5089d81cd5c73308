use crate::core::bk_tree::BkTree;
use crate::core::normalizer::{canonical_key, compact_key};
use crate::domain::model::{AmbiguousAlias, ReferenceIngredient};
use crate::utils::error::{Result, RiskError};
use std::collections::{BTreeMap, HashMap};

/// Immutable lookup structure over the reference vocabulary.
///
/// Built once and shared read-only between concurrent analyses. Ingredient ids
/// are positions in `ingredients`, which is sorted by canonical key so that a
/// lower id always means an alphabetically earlier canonical name.
#[derive(Debug)]
pub struct ReferenceIndex {
    ingredients: Vec<ReferenceIngredient>,
    exact: HashMap<String, Vec<usize>>,
    compact: HashMap<String, Vec<usize>>,
    cas: HashMap<String, Vec<usize>>,
    fuzzy: BkTree,
    ambiguous: Vec<AmbiguousAlias>,
}

#[derive(Debug, Clone)]
pub struct ApproximateMatch<'a> {
    pub ingredient: &'a ReferenceIngredient,
    pub distance: usize,
    /// 實際命中的索引鍵（正式名稱或別名）
    pub matched_key: &'a str,
}

fn push_unique(ids: &mut Vec<usize>, id: usize) {
    if ids.last() != Some(&id) {
        ids.push(id);
    }
}

impl ReferenceIndex {
    pub fn build(mut ingredients: Vec<ReferenceIngredient>) -> Result<Self> {
        if ingredients.is_empty() {
            return Err(RiskError::IndexBuildError {
                message: "reference vocabulary is empty".to_string(),
            });
        }

        ingredients.sort_by(|a, b| {
            canonical_key(&a.canonical_name)
                .cmp(&canonical_key(&b.canonical_name))
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });

        let mut exact: HashMap<String, Vec<usize>> = HashMap::new();
        let mut compact: HashMap<String, Vec<usize>> = HashMap::new();
        let mut cas: HashMap<String, Vec<usize>> = HashMap::new();
        let mut fuzzy = BkTree::new();

        for (id, ingredient) in ingredients.iter().enumerate() {
            for name in ingredient.names() {
                let key = canonical_key(name);
                if key.is_empty() {
                    continue;
                }
                let squeezed = compact_key(&key);
                if !squeezed.is_empty() {
                    push_unique(compact.entry(squeezed).or_default(), id);
                }
                fuzzy.insert(&key);
                push_unique(exact.entry(key).or_default(), id);
            }
            if let Some(number) = &ingredient.cas_number {
                push_unique(cas.entry(number.clone()).or_default(), id);
            }
        }

        let mut ambiguous: Vec<AmbiguousAlias> = exact
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(alias, ids)| AmbiguousAlias {
                alias: alias.clone(),
                candidates: ids
                    .iter()
                    .map(|&id| ingredients[id].canonical_name.clone())
                    .collect(),
            })
            .collect();
        ambiguous.sort();

        for entry in &ambiguous {
            tracing::warn!(
                "Alias '{}' maps to several ingredients: {}",
                entry.alias,
                entry.candidates.join(", ")
            );
        }

        Ok(Self {
            ingredients,
            exact,
            compact,
            cas,
            fuzzy,
            ambiguous,
        })
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn ingredients(&self) -> &[ReferenceIngredient] {
        &self.ingredients
    }

    pub fn ambiguous_aliases(&self) -> &[AmbiguousAlias] {
        &self.ambiguous
    }

    fn resolve(&self, ids: Option<&Vec<usize>>) -> Vec<&ReferenceIngredient> {
        ids.map(|ids| ids.iter().map(|&id| &self.ingredients[id]).collect())
            .unwrap_or_default()
    }

    /// Canonical names and aliases, after key normalization. Falls back to the
    /// compact key when the spaced form is unknown. Results are alphabetical.
    pub fn lookup_exact(&self, name: &str) -> Vec<&ReferenceIngredient> {
        let key = canonical_key(name);
        if key.is_empty() {
            return Vec::new();
        }
        match self.exact.get(&key) {
            Some(ids) => self.resolve(Some(ids)),
            None => self.resolve(self.compact.get(&compact_key(&key))),
        }
    }

    pub fn lookup_cas(&self, cas_number: &str) -> Vec<&ReferenceIngredient> {
        self.resolve(self.cas.get(cas_number.trim()))
    }

    /// Ingredients with a name within `max_distance` edits, one entry per
    /// ingredient. Distinct keys are ordered by distance, then by the highest
    /// popularity among the ingredients sharing the key, then alphabetically.
    /// Ingredients under the same key stay alphabetical, so an ambiguous key
    /// leads with the same ingredient `lookup_exact` would return first.
    pub fn lookup_approximate(&self, name: &str, max_distance: usize) -> Vec<ApproximateMatch<'_>> {
        let key = canonical_key(name);
        if key.is_empty() {
            return Vec::new();
        }

        // 每個成分只保留最近的鍵；同距離時取字母序較前的鍵
        let mut best: BTreeMap<usize, (usize, &str)> = BTreeMap::new();
        for (hit, distance) in self.fuzzy.find(&key, max_distance) {
            for &id in self.exact.get(hit).into_iter().flatten() {
                let entry = best.entry(id).or_insert((distance, hit));
                if (distance, hit) < *entry {
                    *entry = (distance, hit);
                }
            }
        }

        let key_popularity = |hit: &str| {
            self.exact
                .get(hit)
                .into_iter()
                .flatten()
                .map(|&id| self.ingredients[id].popularity)
                .max()
                .unwrap_or(0)
        };

        let mut ranked: Vec<(usize, usize, &str)> = best
            .into_iter()
            .map(|(id, (distance, hit))| (id, distance, hit))
            .collect();
        ranked.sort_by(|a, b| {
            a.1.cmp(&b.1)
                .then_with(|| key_popularity(b.2).cmp(&key_popularity(a.2)))
                .then_with(|| a.2.cmp(b.2))
                .then_with(|| a.0.cmp(&b.0))
        });

        ranked
            .into_iter()
            .map(|(id, distance, matched_key)| ApproximateMatch {
                ingredient: &self.ingredients[id],
                distance,
                matched_key,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{HazardCategory, HazardFlag, HazardSeverity};

    fn ingredient(name: &str, aliases: &[&str], popularity: u32) -> ReferenceIngredient {
        ReferenceIngredient {
            canonical_name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            hazards: vec![],
            cas_number: None,
            ec_number: None,
            popularity,
            toxicity: vec![],
        }
    }

    fn index() -> ReferenceIndex {
        let mut fragrance = ingredient("Fragrance", &["Parfum", "Perfume"], 700);
        fragrance.hazards.push(HazardFlag {
            category: HazardCategory::Allergen,
            severity: HazardSeverity::High,
        });
        let mut glycerin = ingredient("Glycerin", &["Glycerol"], 800);
        glycerin.cas_number = Some("56-81-5".to_string());

        ReferenceIndex::build(vec![
            ingredient("Aqua", &["Water"], 900),
            fragrance,
            glycerin,
            ingredient("Glyceryl", &[], 10),
            ingredient("Sodium Laureth Sulfate", &["SLES"], 500),
            ingredient("Vanillin", &["Aroma"], 50),
            ingredient("Aroma Oil", &["Aroma"], 40),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_lookup_is_key_normalized() {
        let index = index();
        assert_eq!(index.lookup_exact("  PARFUM ")[0].canonical_name, "Fragrance");
        assert_eq!(index.lookup_exact("sodium laureth-sulfate")[0].canonical_name, "Sodium Laureth Sulfate");
        assert!(index.lookup_exact("unobtainium").is_empty());
        assert!(index.lookup_exact("").is_empty());
    }

    #[test]
    fn test_ambiguous_alias_candidates_are_alphabetical() {
        let index = index();
        let hits: Vec<&str> = index
            .lookup_exact("aroma")
            .iter()
            .map(|i| i.canonical_name.as_str())
            .collect();
        assert_eq!(hits, vec!["Aroma Oil", "Vanillin"]);

        assert_eq!(
            index.ambiguous_aliases(),
            &[AmbiguousAlias {
                alias: "aroma".to_string(),
                candidates: vec!["Aroma Oil".to_string(), "Vanillin".to_string()],
            }]
        );
    }

    #[test]
    fn test_cas_lookup() {
        let index = index();
        assert_eq!(index.lookup_cas("56-81-5")[0].canonical_name, "Glycerin");
        assert!(index.lookup_cas("7732-18-5").is_empty());
    }

    #[test]
    fn test_approximate_lookup_ranks_by_distance_then_popularity() {
        let index = index();
        let matches = index.lookup_approximate("glycerine", 3);
        let names: Vec<(&str, usize)> = matches
            .iter()
            .map(|m| (m.ingredient.canonical_name.as_str(), m.distance))
            .collect();
        assert_eq!(names, vec![("Glycerin", 1), ("Glyceryl", 3)]);
        assert_eq!(matches[0].matched_key, "glycerin");

        // 同距離時熱門成分優先
        let tied = index.lookup_approximate("glyceril", 1);
        assert_eq!(tied[0].ingredient.canonical_name, "Glycerin");
        assert_eq!(tied[1].ingredient.canonical_name, "Glyceryl");
        assert_eq!(tied.len(), 2);
    }

    #[test]
    fn test_approximate_lookup_keeps_shared_key_alphabetical() {
        let index = index();
        // "aroma" 同時屬於 Aroma Oil (40) 與 Vanillin (50)
        let matches = index.lookup_approximate("arome", 1);
        let names: Vec<(&str, &str)> = matches
            .iter()
            .map(|m| (m.ingredient.canonical_name.as_str(), m.matched_key))
            .collect();
        assert_eq!(names, vec![("Aroma Oil", "aroma"), ("Vanillin", "aroma")]);
    }

    #[test]
    fn test_approximate_lookup_reports_each_ingredient_once() {
        let index = index();
        let matches = index.lookup_approximate("perfum", 2);
        let fragrance_hits = matches
            .iter()
            .filter(|m| m.ingredient.canonical_name == "Fragrance")
            .count();
        assert_eq!(fragrance_hits, 1);
        assert_eq!(matches[0].distance, 1);
    }

    #[test]
    fn test_empty_vocabulary_is_rejected() {
        assert!(matches!(
            ReferenceIndex::build(vec![]),
            Err(RiskError::IndexBuildError { .. })
        ));
    }

    #[test]
    fn test_index_can_be_shared_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReferenceIndex>();
    }
}
