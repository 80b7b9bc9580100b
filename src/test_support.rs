use async_trait::async_trait;
use axum::Router;
use std::sync::Mutex;

use crate::{
    error::{Error, Result},
    transport::{ListFilter, MailTransport, OutgoingMessage},
    types::{MessageId, RawMessage},
};

/// serve `app` on an ephemeral local port and return its base url
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    format!("http://{address}")
}

/// In-memory mailbox that records what it is asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    pub address: String,
    pub messages: Vec<(MessageId, RawMessage)>,
    pub refuse_sending: bool,
    pub sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingTransport {
    pub fn new(address: &str) -> Self {
        RecordingTransport {
            address: address.to_owned(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, id: &str, raw: &str) -> Self {
        self.messages
            .push((id.to_owned(), RawMessage::Rfc822(raw.as_bytes().to_vec())));

        self
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn list_messages(&self, filter: &ListFilter) -> Result<Vec<MessageId>> {
        Ok(self
            .messages
            .iter()
            .map(|(id, _)| id.clone())
            .take(filter.max_results)
            .collect())
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        self.messages
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, raw)| raw.clone())
            .ok_or_else(|| Error::Transport(format!("no message {id}")))
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<String> {
        if self.refuse_sending {
            return Err(Error::Transport("relay refused the message".to_owned()));
        }
        self.sent.lock().unwrap().push(message.clone());

        Ok("250 queued".to_owned())
    }

    async fn own_address(&self) -> Result<String> {
        Ok(self.address.clone())
    }
}
