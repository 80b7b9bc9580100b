//! Carries out unsubscribe instructions: visiting links, submitting the
//! forms found there, and mailing `mailto:` requests.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT},
    Client, StatusCode,
};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    instruction::UnsubscribeInstruction,
    transport::{MailTransport, OutgoingMessage},
    types::Message,
};

mod form;

pub use form::{fill_first_form, FilledForm, FormMethod};

pub const DEFAULT_SUBJECT: &str = "Unsubscribe Request";
pub const DEFAULT_BODY: &str = "Please unsubscribe me from your mailing list.";

pub struct UnsubscribeActor<T> {
    client: Client,
    transport: Arc<T>,
    delay: Duration,
    marker: String,
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Config(format!("{name}: {e}")))
}

impl<T: MailTransport> UnsubscribeActor<T> {
    pub fn new(transport: Arc<T>, config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("USER_AGENT", &config.user_agent)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("ACCEPT_LANGUAGE", &config.accept_language)?,
        );

        // redirects are followed with the default policy
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(UnsubscribeActor {
            client,
            transport,
            delay: config.unsubscribe_delay,
            marker: config.verification_marker.to_lowercase(),
        })
    }

    /// Attempt the unsubscription, returning whether it verifiably succeeded.
    ///
    /// Failures are logged, never returned. Every attempt is followed by the
    /// configured pause.
    pub async fn act(&self, message: &Message, instruction: &UnsubscribeInstruction) -> bool {
        let sender = message.sender();
        info!("attempting to unsubscribe from: {sender}");

        let unsubscribed = match instruction {
            UnsubscribeInstruction::MailTo {
                address,
                subject,
                body,
            } => match self.mail(address, subject.as_deref(), body.as_deref()).await {
                Ok(receipt) => {
                    info!("unsubscribe email sent to {address} for {sender} ({receipt})");
                    true
                }
                Err(e) => {
                    error!("error sending unsubscribe email for {sender}: {e}");
                    false
                }
            },
            UnsubscribeInstruction::Link(url) => match self.visit(message, url).await {
                Ok(verified) => verified,
                Err(Error::Status(status)) => {
                    warn!("failed to access unsubscribe link for {sender} - status code {status}");
                    false
                }
                Err(e) => {
                    error!("error while unsubscribing from {sender}: {e}");
                    false
                }
            },
            UnsubscribeInstruction::FreeText(text) => {
                warn!("no link or address to act on for {sender}: {text}");
                false
            }
        };

        sleep(self.delay).await;

        unsubscribed
    }

    async fn mail(&self, address: &str, subject: Option<&str>, body: Option<&str>) -> Result<String> {
        let request = OutgoingMessage {
            from: self.transport.own_address().await?,
            to: address.to_owned(),
            subject: subject.unwrap_or(DEFAULT_SUBJECT).to_owned(),
            body: body.unwrap_or(DEFAULT_BODY).to_owned(),
        };

        self.transport.send_message(&request).await
    }

    async fn visit(&self, message: &Message, url: &str) -> Result<bool> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("GET {url} - status code: {status}");
        if status != StatusCode::OK {
            return Err(Error::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !content_type.contains("text/html") {
            warn!("received non-HTML response ({content_type}) from {url}");
            return Ok(false);
        }

        let page_url = response.url().clone();
        let page = response.text().await?;

        match fill_first_form(&page, &page_url, message.reply_address())? {
            Some(form) => self.submit(message, form).await,
            None if self.confirms(&page) => {
                info!("unsubscribed from {} without a form", message.sender());
                Ok(true)
            }
            None => {
                warn!("no form or confirmation message found for {}", message.sender());
                Ok(false)
            }
        }
    }

    async fn submit(&self, message: &Message, form: FilledForm) -> Result<bool> {
        let request = match form.method {
            FormMethod::Post => self.client.post(form.action.clone()).form(&form.fields),
            FormMethod::Get => self.client.get(form.action.clone()).query(&form.fields),
        };

        let response = request.send().await?;
        let status = response.status();
        debug!("{} {} - status code: {status}", form.method, form.action);
        let page = response.text().await?;

        if status == StatusCode::OK && self.confirms(&page) {
            info!("unsubscribed from {} via form", message.sender());
            Ok(true)
        } else {
            warn!(
                "form submitted, but could not verify unsubscription for: {}",
                message.sender()
            );
            Ok(false)
        }
    }

    fn confirms(&self, page: &str) -> bool {
        page.to_lowercase().contains(&self.marker)
    }
}
