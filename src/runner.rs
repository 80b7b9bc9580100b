use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    actor::UnsubscribeActor,
    classifier::LanguageModels,
    config::Config,
    detector::UnsubscribeDetector,
    error::Result,
    transport::{ListFilter, MailTransport},
    types::Message,
};

/// Tally of one pass over the mailbox.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub detected: usize,
    pub unsubscribed: usize,
    pub failed: usize,
}

/// Scans a mailbox, detects unsubscribe offers and acts on them, one
/// message at a time.
pub struct Unsubscriber<T> {
    transport: Arc<T>,
    detector: UnsubscribeDetector,
    actor: UnsubscribeActor<T>,
    dry_run: bool,
}

impl<T: MailTransport> Unsubscriber<T> {
    pub fn new(transport: Arc<T>, models: Arc<LanguageModels>, config: &Config) -> Result<Self> {
        Ok(Unsubscriber {
            detector: UnsubscribeDetector::new(models, config)?,
            actor: UnsubscribeActor::new(transport.clone(), config)?,
            transport,
            dry_run: false,
        })
    }

    /// only detect, never visit links or send mail
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;

        self
    }

    pub async fn run(&self, filter: &ListFilter) -> Result<RunSummary> {
        let ids = self.transport.list_messages(filter).await?;
        info!("found {} emails in the mailbox", ids.len());

        let own_address = match self.transport.own_address().await {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("could not determine own address, forms get no email: {e}");
                None
            }
        };

        let mut summary = RunSummary::default();
        for id in ids {
            summary.scanned += 1;

            let message = match self.fetch(&id, own_address.as_deref()).await {
                Ok(message) => message,
                Err(e) => {
                    warn!("skipping message {id}: {e}");
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(instruction) = self.detector.detect(&message).await else {
                continue;
            };
            summary.detected += 1;

            if self.dry_run {
                if instruction.is_actionable() {
                    info!("dry run, would unsubscribe from {} via {instruction}", message.sender());
                } else {
                    info!("dry run, {} only offers: {instruction}", message.sender());
                }
                continue;
            }

            if self.actor.act(&message, &instruction).await {
                summary.unsubscribed += 1;
            } else {
                summary.failed += 1;
            }
        }

        info!("Successfully unsubscribed from {} emails", summary.unsubscribed);

        Ok(summary)
    }

    async fn fetch(&self, id: &str, own_address: Option<&str>) -> Result<Message> {
        let raw = self.transport.get_message(id).await?;
        let mut message = Message::from_raw(raw)?;
        if message.id().is_none() {
            message = message.with_id(Some(id.to_owned()));
        }

        Ok(match own_address {
            Some(address) => message.with_reply_address(address),
            None => message,
        })
    }
}
