use percent_encoding::percent_decode_str;
use std::fmt;

pub const MAILTO_PREFIX: &str = "mailto:";

/// What a message offers as a way out, at most one per message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnsubscribeInstruction {
    /// An HTTP(S) page to visit.
    Link(String),
    /// A mail to send, with optional prefilled subject and body.
    MailTo {
        address: String,
        subject: Option<String>,
        body: Option<String>,
    },
    /// Unsubscribe intent without anything to act on.
    FreeText(String),
}

impl UnsubscribeInstruction {
    /// classify an extracted target by its literal `mailto:` prefix
    pub fn from_target(target: &str) -> Self {
        let target = target.trim();

        if target.starts_with(MAILTO_PREFIX) {
            Self::parse_mailto(target)
        } else {
            UnsubscribeInstruction::Link(target.to_owned())
        }
    }

    /// Parse a `mailto:` URI. The path is the address; `subject` and `body`
    /// come from the query, URL-decoded, first occurrence wins and empty
    /// values count as absent.
    pub fn parse_mailto(uri: &str) -> Self {
        let rest = uri.strip_prefix(MAILTO_PREFIX).unwrap_or(uri);
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        let mut subject = None;
        let mut body = None;
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode_query_value(value);
            if value.is_empty() {
                continue;
            }

            if key.eq_ignore_ascii_case("subject") && subject.is_none() {
                subject = Some(value);
            } else if key.eq_ignore_ascii_case("body") && body.is_none() {
                body = Some(value);
            }
        }

        UnsubscribeInstruction::MailTo {
            address: percent_decode_str(path).decode_utf8_lossy().trim().to_owned(),
            subject,
            body,
        }
    }

    /// only links and mail addresses can be acted upon
    pub fn is_actionable(&self) -> bool {
        !matches!(self, UnsubscribeInstruction::FreeText(_))
    }
}

fn decode_query_value(value: &str) -> String {
    let value = value.replace('+', " ");

    percent_decode_str(&value).decode_utf8_lossy().into_owned()
}

impl fmt::Display for UnsubscribeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsubscribeInstruction::Link(url) => write!(f, "{url}"),
            UnsubscribeInstruction::MailTo { address, .. } => write!(f, "{MAILTO_PREFIX}{address}"),
            UnsubscribeInstruction::FreeText(text) => write!(f, "\"{text}\""),
        }
    }
}
