use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::{ClassificationResult, LanguageDetector, ZeroShotClassifier};
use crate::error::{Error, Result};

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// fewest stop-word hits that can decide a language
const MIN_HITS: usize = 2;
/// smallest share of the words that must be stop words of the language
const MIN_SHARE: f32 = 0.15;

/// Picks the registered language with the most stop-word hits.
///
/// Short words such as "in" are shared between languages, so a language
/// only wins with enough hits, a large enough share of the text and a
/// strict lead over the runner-up. Anything else is unknown.
#[derive(Clone, Debug)]
pub struct LexiconLanguageDetector {
    stopwords: Vec<(&'static str, &'static [&'static str])>,
}

impl LexiconLanguageDetector {
    pub fn new(stopwords: Vec<(&'static str, &'static [&'static str])>) -> Self {
        LexiconLanguageDetector { stopwords }
    }
}

impl LanguageDetector for LexiconLanguageDetector {
    fn detect_language(&self, text: &str) -> Option<String> {
        let text = MARKUP.replace_all(text, " ").to_lowercase();
        let words = text.unicode_words().collect::<Vec<&str>>();

        let mut scores = self
            .stopwords
            .iter()
            .map(|(language, stopwords)| {
                let hits = words.iter().filter(|word| stopwords.contains(*word)).count();
                (*language, hits)
            })
            .collect::<Vec<(&str, usize)>>();
        scores.sort_by(|a, b| b.1.cmp(&a.1));

        let (language, hits) = *scores.first()?;
        let runner_up = scores.get(1).map_or(0, |(_, hits)| *hits);
        if hits < MIN_HITS || (hits as f32) < MIN_SHARE * words.len() as f32 || hits == runner_up {
            return None;
        }

        Some(language.to_owned())
    }
}

/// Offline stand-in for a zero-shot model: the intent label scores high
/// when the text contains one of its cue phrases.
#[derive(Clone, Debug)]
pub struct LexiconClassifier {
    intent_label: String,
    cues: Vec<String>,
}

impl LexiconClassifier {
    pub fn new(intent_label: impl Into<String>, cues: &[&str]) -> Self {
        LexiconClassifier {
            intent_label: intent_label.into(),
            cues: cues.iter().map(|cue| cue.to_lowercase()).collect(),
        }
    }

    fn intent_score(&self, text: &str) -> f32 {
        let text = text.to_lowercase();
        let hits = self
            .cues
            .iter()
            .filter(|cue| text.contains(cue.as_str()))
            .count();

        match hits {
            0 => 0.05,
            n => (0.85 + 0.05 * (n - 1) as f32).min(0.99),
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for LexiconClassifier {
    async fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
    ) -> Result<ClassificationResult> {
        if !candidate_labels.contains(&self.intent_label.as_str()) {
            return Err(Error::Classification(format!(
                "label {} is not among the candidates",
                self.intent_label
            )));
        }

        let score = self.intent_score(text);
        let other = candidate_labels
            .iter()
            .find(|label| **label != self.intent_label);

        Ok(match other {
            Some(other) if score < 0.5 => ClassificationResult {
                label: other.to_string(),
                score: 1.0 - score,
            },
            _ => ClassificationResult {
                label: self.intent_label.clone(),
                score,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH: &[&str] = &["the", "you", "and", "to"];
    const RUSSIAN: &[&str] = &["и", "вы", "на", "не"];
    const ENGLISH_SHORT_WORDS: &[&str] = &["the", "you", "and", "to", "in", "on"];

    fn detector() -> LexiconLanguageDetector {
        LexiconLanguageDetector::new(vec![("en", ENGLISH), ("ru", RUSSIAN)])
    }

    #[test]
    fn detects_language_ignoring_markup() {
        let detector = detector();

        assert_eq!(
            detector.detect_language("<p class=\"the\">Вы можете отписаться и не получать письма</p>"),
            Some("ru".to_owned())
        );
        assert_eq!(
            detector.detect_language("Thank you and see you next week"),
            Some("en".to_owned())
        );
        assert_eq!(detector.detect_language("Grüße aus Berlin"), None);
    }

    #[test]
    fn shared_short_words_do_not_decide() {
        let detector =
            LexiconLanguageDetector::new(vec![("en", ENGLISH_SHORT_WORDS), ("ru", RUSSIAN)]);

        assert_eq!(
            detector.detect_language(
                "Vielen Dank für Ihre Bestellung. Um sich abzumelden, klicken Sie in Ihrem Konto auf Unsubscribe: https://x.de/abmelden"
            ),
            None
        );
        // two hits in a long text are not enough either
        assert_eq!(
            detector.detect_language(
                "Nos offres du jour sont en ligne, on vous attend au magasin demain matin in Paris"
            ),
            None
        );
        // neither is a tie
        assert_eq!(detector.detect_language("you and вы и"), None);
    }

    #[tokio::test]
    async fn cue_phrases_lift_the_intent_label() {
        let classifier = LexiconClassifier::new("unsubscribe", &["unsubscribe", "opt out"]);

        let hit = classifier
            .classify("To opt out, visit https://x.com/out", &["unsubscribe", "other"])
            .await
            .unwrap();
        assert_eq!(hit.label, "unsubscribe");
        assert!(hit.score > 0.8);

        let miss = classifier
            .classify("Our spring collection is here", &["unsubscribe", "other"])
            .await
            .unwrap();
        assert_eq!(miss.label, "other");
        assert!(miss.score > 0.9);
    }

    #[tokio::test]
    async fn unknown_labels_are_an_error() {
        let classifier = LexiconClassifier::new("unsubscribe", &["unsubscribe"]);

        let result = classifier.classify("unsubscribe", &["отписаться", "другое"]).await;

        assert!(matches!(result, Err(Error::Classification(_))));
    }
}
