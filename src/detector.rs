use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    classifier::LanguageModels,
    config::Config,
    error::Result,
    instruction::UnsubscribeInstruction,
    types::Message,
};

pub const LIST_UNSUBSCRIBE: &str = "List-Unsubscribe";

static ENCLOSED: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(.*?)>").unwrap());
static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\n").unwrap());

/// One way of finding an unsubscribe instruction in a message.
#[async_trait]
pub trait DetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self, message: &Message) -> Option<UnsubscribeInstruction>;
}

/// The first `<...>` target of the `List-Unsubscribe` header.
pub struct HeaderStrategy;

#[async_trait]
impl DetectionStrategy for HeaderStrategy {
    fn name(&self) -> &'static str {
        "header"
    }

    async fn detect(&self, message: &Message) -> Option<UnsubscribeInstruction> {
        let header = message.header(LIST_UNSUBSCRIBE)?;
        let target = ENCLOSED.captures(header)?.get(1)?.as_str().trim();
        if target.is_empty() {
            debug!("empty {LIST_UNSUBSCRIBE} target in message from {}", message.sender());
            return None;
        }

        Some(UnsubscribeInstruction::from_target(target))
    }
}

/// The first anchor whose text or href mentions "unsubscribe".
pub struct AnchorStrategy;

#[async_trait]
impl DetectionStrategy for AnchorStrategy {
    fn name(&self) -> &'static str {
        "anchor"
    }

    async fn detect(&self, message: &Message) -> Option<UnsubscribeInstruction> {
        unsubscribe_anchor(message.body()).map(|href| UnsubscribeInstruction::from_target(&href))
    }
}

fn unsubscribe_anchor(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let selector = Selector::parse("a[href]").ok()?;

    document.select(&selector).find_map(|anchor| {
        let href = anchor.value().attr("href")?;
        let text = anchor.text().collect::<String>();

        if text.to_lowercase().contains("unsubscribe") || href.to_lowercase().contains("unsubscribe")
        {
            Some(href.to_owned())
        } else {
            None
        }
    })
}

fn first_anchor(fragment: &str) -> Option<String> {
    let fragment = Html::parse_fragment(fragment);
    let selector = Selector::parse("a[href]").ok()?;

    fragment
        .select(&selector)
        .find_map(|anchor| anchor.value().attr("href"))
        .map(str::to_owned)
}

/// Sentence level zero-shot classification in the body's language.
pub struct LanguageStrategy {
    models: Arc<LanguageModels>,
    threshold: f32,
    html_tag: Regex,
}

impl LanguageStrategy {
    pub fn new(models: Arc<LanguageModels>, config: &Config) -> Result<Self> {
        let mut languages = models.languages().collect::<Vec<&str>>();
        languages.sort_unstable();
        debug!("classifying sentences in: {}", languages.join(", "));

        Ok(LanguageStrategy {
            models,
            threshold: config.confidence_threshold,
            html_tag: Regex::new(&config.html_tag_pattern)?,
        })
    }

    async fn scan(&self, body: &str) -> Result<Option<UnsubscribeInstruction>> {
        let language = self
            .models
            .detect_language(body)
            .unwrap_or_else(|| "unknown".to_owned());
        debug!("detected language: {language}");

        let profile = self.models.profile(&language)?;
        let labels = profile.labels.candidates();

        for sentence in profile.splitter.split(body) {
            let cleaned = BLANK_LINES.replace_all(&sentence, "");
            if cleaned.trim().is_empty() {
                continue;
            }

            let result = profile.classifier.classify(&cleaned, &labels).await?;
            if result.label != profile.labels.unsubscribe || result.score <= self.threshold {
                continue;
            }

            if self.html_tag.is_match(&cleaned) {
                // markup without an anchor: keep looking
                if let Some(href) = first_anchor(&cleaned) {
                    debug!("found unsubscribe link in classified sentence: {href}");
                    return Ok(Some(UnsubscribeInstruction::from_target(&href)));
                }
                continue;
            }

            if let Some(link) = HTTP_URL.find(&cleaned) {
                debug!("found unsubscribe link in text: {}", link.as_str());
                return Ok(Some(UnsubscribeInstruction::Link(link.as_str().to_owned())));
            }

            debug!("unsubscribe intent detected, but no link found");
            return Ok(Some(UnsubscribeInstruction::FreeText(
                cleaned.trim().to_owned(),
            )));
        }

        Ok(None)
    }
}

#[async_trait]
impl DetectionStrategy for LanguageStrategy {
    fn name(&self) -> &'static str {
        "language"
    }

    async fn detect(&self, message: &Message) -> Option<UnsubscribeInstruction> {
        match self.scan(message.body()).await {
            Ok(instruction) => instruction,
            Err(e) => {
                error!("{e}");

                None
            }
        }
    }
}

/// Runs its strategies in order and stops at the first one that finds something.
pub struct UnsubscribeDetector {
    strategies: Vec<Box<dyn DetectionStrategy>>,
}

impl UnsubscribeDetector {
    /// header, anchor, then language classification
    pub fn new(models: Arc<LanguageModels>, config: &Config) -> Result<Self> {
        Ok(Self::with_strategies(vec![
            Box::new(HeaderStrategy),
            Box::new(AnchorStrategy),
            Box::new(LanguageStrategy::new(models, config)?),
        ]))
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DetectionStrategy>>) -> Self {
        UnsubscribeDetector { strategies }
    }

    pub async fn detect(&self, message: &Message) -> Option<UnsubscribeInstruction> {
        for strategy in &self.strategies {
            if let Some(instruction) = strategy.detect(message).await {
                info!(
                    "{} strategy found {instruction} in message from {}",
                    strategy.name(),
                    message.sender()
                );

                return Some(instruction);
            }
        }

        warn!("no unsubscribe link found in message from {}", message.sender());

        None
    }
}
