//! Lexical sentiment classifier.
//!
//! Scores text by looking up word polarities, adjusting for a preceding
//! intensifier or negator, and averaging over the polar words found. No
//! training step and no external calls; identical input always yields the
//! same label.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::trace;

use chatlens_core::config::SentimentConfig;
use chatlens_core::types::SentimentLabel;

use crate::error::{ClassificationFault, InsightError};
use crate::lexicon::{INTENSIFIERS, MAX_BOOST, NEGATION_FACTOR, NEGATORS, POLARITY};

const TOKEN_PATTERN: &str = r"[\p{L}\p{N}']+";

/// Tokens a negator stays in effect for before it lapses.
const NEGATION_WINDOW: usize = 3;

/// Maps text to a polarity score in `[-1.0, 1.0]` and a coarse label.
#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    config: SentimentConfig,
    token_regex: Regex,
    polarity: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
    negators: HashSet<&'static str>,
}

impl SentimentClassifier {
    pub fn new(config: SentimentConfig) -> Result<Self, InsightError> {
        if config.negative_threshold > config.positive_threshold {
            return Err(InsightError::Config(format!(
                "negative threshold {} exceeds positive threshold {}",
                config.negative_threshold, config.positive_threshold
            )));
        }

        let token_regex =
            Regex::new(TOKEN_PATTERN).map_err(|e| InsightError::Config(e.to_string()))?;

        Ok(Self {
            config,
            token_regex,
            polarity: POLARITY.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        })
    }

    /// Continuous polarity score in `[-1.0, 1.0]`. Text with no polar
    /// words scores `0.0`.
    ///
    /// Text containing U+FFFD is treated as the product of a lossy decode
    /// upstream and reported as `InvalidEncoding`, even when the sender
    /// typed the character literally.
    pub fn score(&self, text: &str) -> Result<f64, ClassificationFault> {
        if text.contains(char::REPLACEMENT_CHARACTER) {
            return Err(ClassificationFault::InvalidEncoding);
        }
        let len = text.chars().count();
        if len > self.config.max_input_chars {
            return Err(ClassificationFault::InputTooLong {
                len,
                max: self.config.max_input_chars,
            });
        }

        let normalized = text.replace('\u{2019}', "'").to_lowercase();

        let mut total = 0.0;
        let mut polar_words = 0usize;
        let mut boost = 1.0;
        let mut negation_left = 0usize;

        for token in self.token_regex.find_iter(&normalized) {
            let word = token.as_str().trim_matches('\'');
            if word.is_empty() {
                continue;
            }

            if self.negators.contains(word) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(factor) = self.intensifiers.get(word) {
                boost = (boost * factor).min(MAX_BOOST);
                continue;
            }

            if let Some(valence) = self.polarity.get(word) {
                let mut value = valence * boost;
                if negation_left > 0 {
                    value *= NEGATION_FACTOR;
                }
                total += value;
                polar_words += 1;
                boost = 1.0;
                negation_left = 0;
            } else {
                boost = 1.0;
                negation_left = negation_left.saturating_sub(1);
            }
        }

        if polar_words == 0 {
            return Ok(0.0);
        }

        let score = total / polar_words as f64;
        if !score.is_finite() {
            return Err(ClassificationFault::NonFinite);
        }

        trace!(score, polar_words, "Scored text");
        Ok(score.clamp(-1.0, 1.0))
    }

    /// Classify text as Positive, Negative or Neutral.
    ///
    /// Never returns `SentimentLabel::Error`; a fault is signalled instead
    /// and the caller decides what to record.
    pub fn classify(&self, text: &str) -> Result<SentimentLabel, ClassificationFault> {
        let score = self.score(text)?;
        Ok(self.label_for(score))
    }

    fn label_for(&self, score: f64) -> SentimentLabel {
        if score > self.config.positive_threshold {
            SentimentLabel::Positive
        } else if score < self.config.negative_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> SentimentClassifier {
        SentimentClassifier::new(SentimentConfig::default()).unwrap()
    }

    #[test]
    fn test_positive_text() {
        assert_eq!(
            classifier().classify("I love this, it is great").unwrap(),
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_negative_text() {
        assert_eq!(
            classifier().classify("This is terrible and I hate it").unwrap(),
            SentimentLabel::Negative
        );
    }

    #[test]
    fn test_neutral_text() {
        assert_eq!(
            classifier().classify("The meeting is at 3pm on Tuesday").unwrap(),
            SentimentLabel::Neutral
        );
    }

    #[test]
    fn test_empty_text_is_neutral() {
        let c = classifier();
        assert_eq!(c.score("").unwrap(), 0.0);
        assert_eq!(c.classify("").unwrap(), SentimentLabel::Neutral);
        assert_eq!(c.classify("   \n\t").unwrap(), SentimentLabel::Neutral);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let c = classifier();
        assert!(c.score("good").unwrap() > 0.0);
        assert!(c.score("not good").unwrap() < 0.0);
        assert_eq!(c.classify("not good").unwrap(), SentimentLabel::Negative);
        assert!(c.score("don\u{2019}t like it").unwrap() < 0.0);
    }

    #[test]
    fn test_negation_lapses_after_window() {
        let c = classifier();
        let score = c.score("not on this particular day, good").unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn test_intensifier_strengthens() {
        let c = classifier();
        let plain = c.score("bad").unwrap();
        let intense = c.score("very bad").unwrap();
        assert!(intense < plain);
    }

    #[test]
    fn test_score_is_clamped() {
        let c = classifier();
        let score = c.score("extremely incredibly absolutely perfect").unwrap();
        assert_eq!(score, 1.0);
        let score = c.score("extremely incredibly absolutely worst").unwrap();
        assert_eq!(score, -1.0);
    }

    #[test]
    fn test_threshold_boundaries_are_neutral() {
        let c = classifier();
        assert_eq!(c.label_for(0.2), SentimentLabel::Neutral);
        assert_eq!(c.label_for(-0.2), SentimentLabel::Neutral);
        assert_eq!(c.label_for(0.2001), SentimentLabel::Positive);
        assert_eq!(c.label_for(-0.2001), SentimentLabel::Negative);
    }

    #[test]
    fn test_case_insensitive() {
        let c = classifier();
        assert_eq!(c.score("GREAT").unwrap(), c.score("great").unwrap());
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let text = "Thanks, that was really helpful but a bit slow";
        assert_eq!(c.score(text).unwrap(), c.score(text).unwrap());
    }

    #[test]
    fn test_never_returns_error_label() {
        let c = classifier();
        let samples = [
            "",
            "ok",
            "😀😀😀",
            "12345",
            "Ünïcödé wörds ärë fïnë",
            "not not not",
            "very",
            "'''",
        ];
        for text in samples {
            let label = c.classify(text).unwrap();
            assert_ne!(label, SentimentLabel::Error, "input {:?}", text);
        }
    }

    #[test]
    fn test_long_intensifier_run_stays_finite() {
        let c = classifier();
        for repeats in [1000, 1100, 1600] {
            let text = format!("{}good", "extremely ".repeat(repeats));
            assert!(text.chars().count() <= SentimentConfig::default().max_input_chars);
            assert_eq!(c.classify(&text), Ok(SentimentLabel::Positive), "repeats {}", repeats);
        }
        let text = format!("{}bad", "extremely ".repeat(1100));
        assert_eq!(c.classify(&text), Ok(SentimentLabel::Negative));
    }

    #[test]
    fn test_intensifier_boost_is_capped() {
        let c = classifier();
        let capped = c.score("extremely extremely extremely okay").unwrap();
        let longer = c.score(&format!("{}okay", "extremely ".repeat(50))).unwrap();
        assert_eq!(capped, longer);
    }

    #[test]
    fn test_literal_replacement_char_is_fault() {
        assert_eq!(
            classifier().classify("I typed \u{FFFD} on purpose, great"),
            Err(ClassificationFault::InvalidEncoding)
        );
    }

    #[test]
    fn test_replacement_char_is_fault() {
        let text = String::from_utf8_lossy(&[0x66, 0xff, 0x6f]).into_owned();
        assert_eq!(
            classifier().classify(&text),
            Err(ClassificationFault::InvalidEncoding)
        );
    }

    #[test]
    fn test_too_long_is_fault() {
        let config = SentimentConfig {
            max_input_chars: 10,
            ..SentimentConfig::default()
        };
        let c = SentimentClassifier::new(config).unwrap();
        assert!(matches!(
            c.classify("this sentence is longer than ten"),
            Err(ClassificationFault::InputTooLong { max: 10, .. })
        ));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let config = SentimentConfig {
            positive_threshold: -0.5,
            negative_threshold: 0.5,
            ..SentimentConfig::default()
        };
        assert!(SentimentClassifier::new(config).is_err());
    }
}
