pub mod actor;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod error;
pub mod instruction;
mod runner;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

/// retrieve the version from Cargo.toml, note that this will yield an error
/// when compiling without cargo
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use actor::UnsubscribeActor;
pub use classifier::LanguageModels;
pub use config::Config;
pub use detector::UnsubscribeDetector;
pub use error::{Error, Result};
pub use instruction::UnsubscribeInstruction;
pub use runner::{RunSummary, Unsubscriber};
pub use transport::{ListFilter, LocalMailbox, MailTransport, OutgoingMessage};
pub use types::{Message, MessageId, RawMessage};
