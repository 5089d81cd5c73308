use crate::config::engine_config::NormalizerConfig;
use crate::domain::model::{CandidateToken, RawScanText};
use crate::utils::error::Result;
use regex::Regex;

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Lower-cases and collapses a name into the key used for every index lookup.
/// Letters, digits, hyphens and apostrophes survive, everything else becomes a space.
pub fn canonical_key(name: &str) -> String {
    let mapped: String = name
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c == '-' || c == '\'' || c.is_whitespace())
        .to_string()
}

/// 去掉空白與連字號，對付 OCR 把單字黏在一起或拆開的情況
pub fn compact_key(key: &str) -> String {
    key.chars().filter(|c| c.is_alphanumeric()).collect()
}

pub struct Normalizer {
    min_token_length: usize,
    markers: Vec<Regex>,
    section_end: Option<Regex>,
    stop_phrases: Vec<String>,
    line_hyphen: Regex,
    annotations: Regex,
    percentages: Regex,
    cas_number: Regex,
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let markers = config
            .section_markers
            .iter()
            .map(|marker| Regex::new(&format!(r"(?i)\b{}\b\s*:?", regex::escape(marker.trim()))))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let section_end = if config.end_phrases.is_empty() {
            None
        } else {
            let alternatives = config
                .end_phrases
                .iter()
                .map(|phrase| format!(r"\b{}\b", regex::escape(phrase.trim())))
                .collect::<Vec<_>>();
            Some(Regex::new(&format!("(?i){}", alternatives.join("|")))?)
        };

        Ok(Self {
            min_token_length: config.min_token_length,
            markers,
            section_end,
            stop_phrases: config.stop_phrases.iter().map(|p| p.to_lowercase()).collect(),
            line_hyphen: Regex::new(r"-[ \t]*\r?\n[ \t]*")?,
            annotations: Regex::new(r"\([^)]*\)?|\[[^\]]*\]?|\{[^}]*\}?")?,
            percentages: Regex::new(r"[<>≤]?\s*\d+(?:[.,]\d+)?\s*%")?,
            cas_number: Regex::new(r"\b\d{2,7}-\d{2}-\d\b")?,
        })
    }

    /// Never fails: noise produces fewer tokens, not an error.
    pub fn normalize(&self, raw: &RawScanText) -> Vec<CandidateToken> {
        let text = raw.text();
        let (start, end) = self.section_bounds(text);
        let section = &text[start..end];

        let tokens: Vec<CandidateToken> = split_spans(section)
            .into_iter()
            .filter_map(|(s, e)| {
                self.clean_span(&section[s..e])
                    .map(|cleaned| (cleaned, start + s..start + e))
            })
            .enumerate()
            .map(|(position, (text, span))| CandidateToken {
                text,
                position,
                span,
            })
            .collect();

        tracing::debug!(
            locale = raw.locale().unwrap_or("-"),
            section_start = start,
            tokens = tokens.len(),
            "Normalized scan text"
        );
        tokens
    }

    pub fn is_cas_number(&self, token: &str) -> bool {
        self.cas_number
            .find(token)
            .is_some_and(|m| m.start() == 0 && m.end() == token.len())
    }

    fn section_bounds(&self, text: &str) -> (usize, usize) {
        let start = self
            .markers
            .iter()
            .find_map(|marker| marker.find(text))
            .map(|m| m.end())
            .unwrap_or(0);

        let end = self
            .section_end
            .as_ref()
            .and_then(|re| re.find_at(text, start))
            .map(|m| m.start())
            .unwrap_or(text.len());

        (start, end.max(start))
    }

    fn clean_span(&self, span: &str) -> Option<String> {
        let joined = self.line_hyphen.replace_all(span, "-");

        let mut lowered = String::with_capacity(joined.len());
        for ch in joined.chars() {
            if ZERO_WIDTH.contains(&ch) {
                continue;
            }
            if ch.is_whitespace() {
                lowered.push(' ');
            } else if !ch.is_control() {
                lowered.extend(ch.to_lowercase());
            }
        }

        if self
            .stop_phrases
            .iter()
            .any(|phrase| lowered.contains(phrase.as_str()))
        {
            return None;
        }

        let stripped = self.annotations.replace_all(&lowered, " ");
        let stripped = self.percentages.replace_all(&stripped, " ");

        // 只有 CAS 號碼時保留，讓比對器用 CAS 查詢
        let without_cas = self.cas_number.replace_all(&stripped, " ");
        let key = if without_cas.chars().any(char::is_alphabetic) {
            canonical_key(&without_cas)
        } else {
            canonical_key(&stripped)
        };

        if key.is_empty() || key.chars().count() < self.min_token_length {
            return None;
        }
        if !key.chars().any(char::is_alphabetic) && !self.is_cas_number(&key) {
            return None;
        }

        Some(key)
    }
}

/// Splits on commas, semicolons and newlines. A comma between two digits
/// (`1,2-hexanediol`) and a newline after a trailing hyphen do not split.
fn split_spans(section: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = section.char_indices().collect();
    let mut spans = Vec::new();
    let mut span_start = 0;

    for (i, &(offset, ch)) in chars.iter().enumerate() {
        let is_delimiter = match ch {
            ';' => true,
            ',' => {
                let prev_digit = i > 0 && chars[i - 1].1.is_ascii_digit();
                let next_digit = chars.get(i + 1).is_some_and(|(_, c)| c.is_ascii_digit());
                !(prev_digit && next_digit)
            }
            '\n' => !section[span_start..offset].trim_end().ends_with('-'),
            _ => false,
        };

        if is_delimiter {
            spans.push((span_start, offset));
            span_start = offset + ch.len_utf8();
        }
    }

    spans.push((span_start, section.len()));
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&NormalizerConfig::default()).unwrap()
    }

    fn texts(raw: &str) -> Vec<String> {
        normalizer()
            .normalize(&RawScanText::new(raw))
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_empty_text_yields_no_tokens() {
        assert!(texts("").is_empty());
        assert!(texts("   \n\t ").is_empty());
    }

    #[test]
    fn test_tokens_keep_order_and_source_spans() {
        let raw = "Aqua, Parfum, Sodium Laureth Sulfate";
        let tokens = normalizer().normalize(&RawScanText::new(raw));

        let names: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(names, vec!["aqua", "parfum", "sodium laureth sulfate"]);
        assert_eq!(tokens[1].position, 1);
        assert_eq!(raw[tokens[1].span.clone()].trim(), "Parfum");
    }

    #[test]
    fn test_real_label_uses_ingredient_section() {
        let text = "NIVEA® Soft
         to wysoce skuteczny krem nawilzajacy do codziennej pielegnacji.
         www.NIVEA.pl PL Infolinia: 801 888 888
         Ingredients: Aqua, Glycerin, Paraffinum Liquidum, Myristyl Alcohol, Butylene Glycol,
         Alcohol Denat., Stearic Acid, Tocophery! Acetate,
         Lanolin Alcohol (Eucerit©), Polyglyceryl-2 Caprate, Dimethicone,

         Limonene, Benzyl Alcohol, Benzyl Salicylate, Parfum.";

        let result = texts(text);

        assert!(result.contains(&"aqua".to_string()));
        assert!(result.contains(&"paraffinum liquidum".to_string()));
        assert!(result.contains(&"alcohol denat".to_string()));
        assert!(result.contains(&"tocophery acetate".to_string()));
        assert!(result.contains(&"lanolin alcohol".to_string()));
        assert!(result.contains(&"polyglyceryl-2 caprate".to_string()));
        assert!(result.contains(&"benzyl salicylate".to_string()));
        assert_eq!(result.last().map(String::as_str), Some("parfum"));
        assert!(!result.iter().any(|t| t.contains("nivea") || t.contains("infolinia")));
    }

    #[test]
    fn test_polish_marker_and_end_phrase() {
        let result = texts("Krem do rąk. Składniki: Aqua, Gliceryna; Parfum. Wyprodukowano w Polsce");
        assert_eq!(result, vec!["aqua", "gliceryna", "parfum"]);
    }

    #[test]
    fn test_annotations_are_stripped() {
        let result = texts("Glycerin (plant derived) 5%, Aqua [water], Niacinamide 98-92-0, Retinol (0.1");
        assert_eq!(result, vec!["glycerin", "aqua", "niacinamide", "retinol"]);
    }

    #[test]
    fn test_noise_tokens_are_dropped() {
        let result = texts("aqua, a, ab, 123, 4.5, , glycerin");
        assert_eq!(result, vec!["aqua", "glycerin"]);
    }

    #[test]
    fn test_stop_phrases_drop_tokens() {
        let result = texts("aqua, visit www.example.com, glycerin, note: keep cool");
        assert_eq!(result, vec!["aqua", "glycerin"]);
    }

    #[test]
    fn test_digit_comma_does_not_split() {
        let result = texts("Aqua, 1,2-Hexanediol, Glycerin");
        assert_eq!(result, vec!["aqua", "1 2-hexanediol", "glycerin"]);
    }

    #[test]
    fn test_hyphenated_line_break_is_joined() {
        let result = texts("Hydrogenated Coco-\nGlycerides, Aqua\nGlycerin");
        assert_eq!(result, vec!["hydrogenated coco-glycerides", "aqua", "glycerin"]);
    }

    #[test]
    fn test_bare_cas_number_is_kept() {
        let n = normalizer();
        let tokens = n.normalize(&RawScanText::new("56-81-5, Aqua"));
        assert_eq!(tokens[0].text, "56-81-5");
        assert!(n.is_cas_number(&tokens[0].text));
    }

    #[test]
    fn test_zero_width_and_bullets_are_removed() {
        let result = texts("• Aq\u{200B}ua\n* Glycerin");
        assert_eq!(result, vec!["aqua", "glycerin"]);
    }

    #[test]
    fn test_canonical_and_compact_keys() {
        assert_eq!(canonical_key("  Alcohol  Denat. "), "alcohol denat");
        assert_eq!(canonical_key("- Parfum (Fragrance)"), "parfum fragrance");
        assert_eq!(compact_key("sodium laureth-sulfate"), "sodiumlaurethsulfate");
    }
}
