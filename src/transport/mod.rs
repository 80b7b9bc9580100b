use async_trait::async_trait;
use lettre::message::header::ContentType;

use crate::{
    error::Result,
    types::{MessageId, RawMessage},
};

mod local;

pub use local::LocalMailbox;

/// Which messages to scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListFilter {
    pub max_results: usize,
    pub include_spam_trash: bool,
}

impl Default for ListFilter {
    fn default() -> Self {
        ListFilter {
            max_results: 500,
            include_spam_trash: true,
        }
    }
}

/// A plain text mail composed by the unsubscribe actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    pub fn to_email(&self) -> Result<lettre::Message> {
        let email = lettre::Message::builder()
            .from(self.from.parse()?)
            .to(self.to.parse()?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())?;

        Ok(email)
    }
}

/// The mailbox the pipeline reads from and replies through.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn list_messages(&self, filter: &ListFilter) -> Result<Vec<MessageId>>;

    async fn get_message(&self, id: &str) -> Result<RawMessage>;

    /// deliver `message`, returning the relay's receipt
    async fn send_message(&self, message: &OutgoingMessage) -> Result<String>;

    /// the address of the mailbox owner
    async fn own_address(&self) -> Result<String>;
}
