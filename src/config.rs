use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/86.0.4240.183 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_HTML_TAG_PATTERN: &str = r"<.*?>";
pub const DEFAULT_VERIFICATION_MARKER: &str = "unsubscribed";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// get a configuration from the environment or return default value
pub fn parse_env_var<T: FromStr>(name: &'static str, default: T) -> T {
    env::var(name)
        .unwrap_or_default()
        .parse::<T>()
        .unwrap_or(default)
}

fn optional_env_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn bool_env_var(name: &'static str) -> bool {
    env::var(name).map_or_else(
        |_| false,
        |v| v.to_ascii_lowercase().parse().unwrap_or(false),
    )
}

/// SMTP relay used to deliver mailto unsubscribe requests
#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        SmtpConfig {
            host: optional_env_var("SMTP_HOST"),
            port: parse_env_var("SMTP_PORT", 1025),
            username: optional_env_var("SMTP_USERNAME"),
            password: optional_env_var("SMTP_PASSWORD"),
            tls: bool_env_var("SMTP_TLS"),
        }
    }
}

/// Tunables shared by the detector and the actor.
#[derive(Clone, Debug)]
pub struct Config {
    /// Timeout applied to every outbound HTTP request.
    pub http_timeout: Duration,
    /// Courtesy pause after each unsubscribe attempt.
    pub unsubscribe_delay: Duration,
    /// Minimum score (exclusive) for an unsubscribe classification.
    pub confidence_threshold: f32,
    /// Pattern deciding whether a sentence carries HTML markup.
    pub html_tag_pattern: String,
    /// Case-insensitive text proving an unsubscribe went through.
    pub verification_marker: String,
    pub user_agent: String,
    pub accept_language: String,
    /// Base URL of a zero-shot inference service, the offline lexicon is used when unset.
    pub classifier_url: Option<String>,
    pub classifier_token: Option<String>,
    pub smtp: SmtpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            http_timeout: Duration::from_secs(10),
            unsubscribe_delay: Duration::from_secs(2),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            html_tag_pattern: DEFAULT_HTML_TAG_PATTERN.to_owned(),
            verification_marker: DEFAULT_VERIFICATION_MARKER.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_owned(),
            classifier_url: None,
            classifier_token: None,
            smtp: SmtpConfig {
                port: 1025,
                ..SmtpConfig::default()
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            http_timeout: Duration::from_secs(parse_env_var(
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )),
            unsubscribe_delay: Duration::from_millis(parse_env_var(
                "UNSUBSCRIBE_DELAY_MS",
                defaults.unsubscribe_delay.as_millis() as u64,
            )),
            confidence_threshold: parse_env_var(
                "CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            ),
            html_tag_pattern: optional_env_var("HTML_TAG_PATTERN")
                .unwrap_or(defaults.html_tag_pattern),
            verification_marker: optional_env_var("VERIFICATION_MARKER")
                .map(|marker| marker.to_lowercase())
                .unwrap_or(defaults.verification_marker),
            user_agent: optional_env_var("USER_AGENT").unwrap_or(defaults.user_agent),
            accept_language: optional_env_var("ACCEPT_LANGUAGE")
                .unwrap_or(defaults.accept_language),
            classifier_url: optional_env_var("CLASSIFIER_URL"),
            classifier_token: optional_env_var("CLASSIFIER_TOKEN"),
            smtp: SmtpConfig::from_env(),
        }
    }

    /// configuration for tests and dry runs, without the courtesy delay
    pub fn without_delay(mut self) -> Self {
        self.unsubscribe_delay = Duration::ZERO;

        self
    }
}
