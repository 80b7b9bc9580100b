use async_trait::async_trait;
use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport,
    Tokio1Executor,
};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::{ListFilter, MailTransport, OutgoingMessage};
use crate::{
    config::SmtpConfig,
    error::{Error, Result},
    types::{MessageId, MessagePayload, RawMessage},
};

const FOLDERS_SPAM_TRASH: [&str; 2] = ["Spam", "Trash"];
const EXTENSIONS: [&str; 3] = ["eml", "email", "json"];

/// A mailbox stored as files in a directory, replying through an SMTP relay.
///
/// Files ending in `.eml` or `.email` hold RFC 822 messages, `.json` files
/// hold provider payloads. `Spam` and `Trash` sub-directories are scanned
/// when the filter asks for them.
pub struct LocalMailbox {
    root: PathBuf,
    address: String,
    relay: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl LocalMailbox {
    pub fn new(root: impl Into<PathBuf>, address: impl Into<String>) -> Self {
        LocalMailbox {
            root: root.into(),
            address: address.into(),
            relay: None,
        }
    }

    /// relay outgoing mail through the configured SMTP server, if any
    pub fn with_relay(mut self, smtp: &SmtpConfig) -> Result<Self> {
        let Some(host) = &smtp.host else {
            return Ok(self);
        };

        let mut builder = if smtp.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        builder = builder.port(smtp.port);
        if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        info!("relaying outgoing mail through {host}:{}", smtp.port);
        self.relay = Some(builder.build());

        Ok(self)
    }

    fn folders(&self, filter: &ListFilter) -> Vec<PathBuf> {
        let mut folders = vec![self.root.clone()];
        if filter.include_spam_trash {
            folders.extend(FOLDERS_SPAM_TRASH.iter().map(|folder| self.root.join(folder)));
        }

        folders
    }

    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(Error::Transport(format!("invalid message id {id}")));
        }

        Ok(self.root.join(relative))
    }
}

fn is_message_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| {
            EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

async fn list_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(folder).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await?.is_file() && is_message_file(&path) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

#[async_trait]
impl MailTransport for LocalMailbox {
    async fn list_messages(&self, filter: &ListFilter) -> Result<Vec<MessageId>> {
        let mut ids = Vec::new();
        for folder in self.folders(filter) {
            let files = match list_folder(&folder).await {
                Ok(files) => files,
                // spam and trash folders are optional
                Err(Error::Io(e)) if folder != self.root && e.kind() == std::io::ErrorKind::NotFound => {
                    continue
                }
                Err(e) => return Err(e),
            };

            ids.extend(files.iter().filter_map(|path| {
                let relative = path.strip_prefix(&self.root).ok()?;
                let parts = relative
                    .components()
                    .map(|component| component.as_os_str().to_str())
                    .collect::<Option<Vec<&str>>>()?;

                Some(parts.join("/"))
            }));
        }
        ids.truncate(filter.max_results);
        debug!("listed {} messages in {}", ids.len(), self.root.display());

        Ok(ids)
    }

    async fn get_message(&self, id: &str) -> Result<RawMessage> {
        let path = self.resolve(id)?;
        let bytes = fs::read(&path).await?;

        if path.extension().map_or(false, |extension| extension == "json") {
            let payload: MessagePayload = serde_json::from_slice(&bytes)?;
            Ok(RawMessage::Payload(payload))
        } else {
            Ok(RawMessage::Rfc822(bytes))
        }
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<String> {
        let relay = self
            .relay
            .as_ref()
            .ok_or_else(|| Error::Transport("no SMTP relay configured".to_owned()))?;

        let response = relay.send(message.to_email()?).await?;

        Ok(response.message().collect::<Vec<&str>>().join(" "))
    }

    async fn own_address(&self) -> Result<String> {
        Ok(self.address.clone())
    }
}
