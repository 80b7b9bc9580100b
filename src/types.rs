use base64::{
    alphabet,
    engine::{general_purpose::GeneralPurpose, DecodePaddingMode, GeneralPurposeConfig},
    Engine,
};
use mail_parser::{MessageParser, PartType};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type MessageId = String;

pub const NO_SUBJECT: &str = "No Subject";

// provider payloads are base64url, padded or not
const BASE64_URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Header {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PayloadBody {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// one node of a provider message tree
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadPart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PayloadBody>,
    #[serde(default)]
    pub parts: Vec<PayloadPart>,
}

impl PayloadPart {
    /// the first non-empty body data, searching children depth first
    fn body_data(&self) -> Option<&str> {
        let own = self
            .body
            .as_ref()
            .and_then(|body| body.data.as_deref())
            .filter(|data| !data.is_empty());

        own.or_else(|| self.parts.iter().find_map(PayloadPart::body_data))
    }
}

/// message as delivered by a mail provider API
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MessagePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub payload: PayloadPart,
}

#[derive(Clone, Debug)]
pub enum RawMessage {
    Payload(MessagePayload),
    Rfc822(Vec<u8>),
}

fn decode_body(data: &str) -> Result<String> {
    let bytes = BASE64_URL.decode(data.trim())?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn unfold(value: &str) -> String {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// A fetched message, normalized and read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    id: Option<MessageId>,
    sender: String,
    subject: String,
    body: String,
    headers: Vec<Header>,
    reply_address: Option<String>,
}

impl Message {
    pub fn new(headers: Vec<Header>, body: impl Into<String>) -> Self {
        let sender = find_header(&headers, "From").unwrap_or_default().to_owned();
        let subject = find_header(&headers, "Subject")
            .unwrap_or(NO_SUBJECT)
            .to_owned();

        Message {
            id: None,
            sender,
            subject,
            body: body.into(),
            headers,
            reply_address: None,
        }
    }

    pub fn from_raw(raw: RawMessage) -> Result<Self> {
        match raw {
            RawMessage::Payload(payload) => payload.try_into(),
            RawMessage::Rfc822(bytes) => {
                let parsed = MessageParser::default()
                    .parse(&bytes)
                    .ok_or_else(|| Error::Parse("RFC 822 message".to_owned()))?;

                Ok(parsed.into())
            }
        }
    }

    pub fn with_id(mut self, id: Option<MessageId>) -> Self {
        self.id = id;

        self
    }

    pub fn with_reply_address(mut self, address: impl Into<String>) -> Self {
        self.reply_address = Some(address.into());

        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn reply_address(&self) -> Option<&str> {
        self.reply_address.as_deref()
    }

    /// case-insensitive header lookup, the first occurrence wins
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn header_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.header(name).unwrap_or(default)
    }
}

fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|header| header.name.eq_ignore_ascii_case(name))
        .map(|header| header.value.as_str())
}

impl TryFrom<MessagePayload> for Message {
    type Error = Error;

    fn try_from(message: MessagePayload) -> Result<Self> {
        let body = match message.payload.body_data() {
            Some(data) => decode_body(data)?,
            None => String::new(),
        };

        Ok(Message::new(message.payload.headers, body).with_id(message.id))
    }
}

impl From<mail_parser::Message<'_>> for Message {
    fn from(message: mail_parser::Message) -> Self {
        let headers = message
            .headers_raw()
            .map(|(name, value)| Header::new(name, unfold(value)))
            .collect::<Vec<Header>>();

        // parts are stored in document order, so this is a depth first search
        let body = message
            .parts
            .iter()
            .find_map(|part| match &part.body {
                PartType::Text(text) | PartType::Html(text) if !text.trim().is_empty() => {
                    Some(text.to_string())
                }
                _ => None,
            })
            .unwrap_or_default();

        let mut result = Message::new(headers, body);
        if let Some(subject) = message.subject() {
            result.subject = subject.to_owned();
        }

        result
    }
}
