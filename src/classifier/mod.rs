//! Language detection, sentence splitting and zero-shot intent classification.
//!
//! The models are plain values: a [`LanguageModels`] set is built once and
//! handed to the detector, which only ever reads from it.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    config::Config,
    error::{Error, Result},
};

mod lexicon;
mod remote;

pub use lexicon::{LexiconClassifier, LexiconLanguageDetector};
pub use remote::InferenceClassifier;

/// Top label and its confidence.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub score: f32,
}

#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    /// rank `candidate_labels` for `text` and return the best one
    async fn classify(&self, text: &str, candidate_labels: &[&str])
        -> Result<ClassificationResult>;
}

pub trait LanguageDetector: Send + Sync {
    /// a language tag such as `en`, or `None` when the language is unknown
    fn detect_language(&self, text: &str) -> Option<String>;
}

pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits on Unicode sentence boundaries and drops blank sentences.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        text.split_sentence_bounds()
            .filter(|sentence| !sentence.trim().is_empty())
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSet {
    pub unsubscribe: String,
    pub other: String,
}

impl LabelSet {
    pub fn new(unsubscribe: impl Into<String>, other: impl Into<String>) -> Self {
        LabelSet {
            unsubscribe: unsubscribe.into(),
            other: other.into(),
        }
    }

    pub fn candidates(&self) -> [&str; 2] {
        [self.unsubscribe.as_str(), self.other.as_str()]
    }
}

#[derive(Clone)]
pub struct LanguageProfile {
    pub labels: LabelSet,
    pub classifier: Arc<dyn ZeroShotClassifier>,
    pub splitter: Arc<dyn SentenceSplitter>,
}

struct BuiltinLanguage {
    tag: &'static str,
    model: &'static str,
    unsubscribe_label: &'static str,
    other_label: &'static str,
    stopwords: &'static [&'static str],
    cues: &'static [&'static str],
}

const BUILTIN_LANGUAGES: &[BuiltinLanguage] = &[
    BuiltinLanguage {
        tag: "en",
        model: "roberta-large-mnli",
        unsubscribe_label: "unsubscribe",
        other_label: "other",
        stopwords: &[
            "the", "and", "you", "to", "of", "your", "is", "for", "this", "in", "we", "our",
            "with", "from", "that", "on", "are", "please", "if", "here",
        ],
        cues: &[
            "unsubscribe",
            "opt out",
            "opt-out",
            "stop receiving",
            "no longer wish to receive",
            "no longer want to receive",
            "email preferences",
            "remove yourself from",
        ],
    },
    BuiltinLanguage {
        tag: "ru",
        model: "cointegrated/rubert-tiny",
        unsubscribe_label: "отписаться",
        other_label: "другое",
        stopwords: &[
            "и", "в", "не", "на", "что", "вы", "вас", "это", "для", "по", "от", "с", "мы",
            "как", "если", "ваш", "вам", "из",
        ],
        cues: &[
            "отписаться",
            "отписки",
            "отказаться от рассылки",
            "отменить подписку",
            "не хотите получать",
        ],
    },
];

/// The classification capabilities, keyed by language tag.
#[derive(Clone)]
pub struct LanguageModels {
    detector: Arc<dyn LanguageDetector>,
    profiles: HashMap<String, LanguageProfile>,
}

impl LanguageModels {
    pub fn new(detector: Arc<dyn LanguageDetector>) -> Self {
        LanguageModels {
            detector,
            profiles: HashMap::new(),
        }
    }

    pub fn with_profile(mut self, language: impl Into<String>, profile: LanguageProfile) -> Self {
        self.profiles.insert(language.into(), profile);

        self
    }

    /// English and Russian, scored with the built-in lexicons
    pub fn offline() -> Self {
        Self::builtin(|language| -> Arc<dyn ZeroShotClassifier> {
            Arc::new(LexiconClassifier::new(
                language.unsubscribe_label,
                language.cues,
            ))
        })
    }

    /// English and Russian, classified by a remote zero-shot inference service
    pub fn remote(client: reqwest::Client, base_url: &str, token: Option<String>) -> Self {
        let base_url = base_url.trim_end_matches('/');

        Self::builtin(|language| -> Arc<dyn ZeroShotClassifier> {
            Arc::new(InferenceClassifier::new(
                client.clone(),
                format!("{base_url}/{}", language.model),
                token.clone(),
            ))
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        match &config.classifier_url {
            Some(url) => {
                let client = reqwest::Client::builder()
                    .timeout(config.http_timeout.max(Duration::from_secs(1)))
                    .build()?;

                Ok(Self::remote(client, url, config.classifier_token.clone()))
            }
            None => Ok(Self::offline()),
        }
    }

    fn builtin(classifier: impl Fn(&BuiltinLanguage) -> Arc<dyn ZeroShotClassifier>) -> Self {
        let detector = LexiconLanguageDetector::new(
            BUILTIN_LANGUAGES
                .iter()
                .map(|language| (language.tag, language.stopwords))
                .collect(),
        );

        BUILTIN_LANGUAGES
            .iter()
            .fold(Self::new(Arc::new(detector)), |models, language| {
                models.with_profile(
                    language.tag,
                    LanguageProfile {
                        labels: LabelSet::new(language.unsubscribe_label, language.other_label),
                        classifier: classifier(language),
                        splitter: Arc::new(UnicodeSentenceSplitter),
                    },
                )
            })
    }

    pub fn detect_language(&self, text: &str) -> Option<String> {
        self.detector.detect_language(text)
    }

    pub fn profile(&self, language: &str) -> Result<&LanguageProfile> {
        self.profiles
            .get(language)
            .ok_or_else(|| Error::ClassificationUnavailable(language.to_owned()))
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
