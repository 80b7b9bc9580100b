pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not decode message body: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("no classification model for language {0}")]
    ClassificationUnavailable(String),
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("network error {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("mail transport error {0}")]
    Transport(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("could not parse {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<lettre::error::Error> for Error {
    fn from(e: lettre::error::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<lettre::address::AddressError> for Error {
    fn from(e: lettre::address::AddressError) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
