use clap::Parser;
use std::{path::PathBuf, process, sync::Arc};
use tracing::{event, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mail_unsubscriber::{
    Config, LanguageModels, ListFilter, LocalMailbox, Result, RunSummary, Unsubscriber, VERSION,
};

/// Find unsubscribe offers in a mailbox and act on them
#[derive(Parser, Debug)]
#[command(name = "mail-unsubscriber", version)]
struct Cli {
    /// Directory holding the messages (.eml, .email or provider .json files)
    #[arg(short, long, env = "MAILBOX_DIR")]
    mailbox: PathBuf,

    /// Your own address, used for unsubscribe mails and forms
    #[arg(short, long, env = "MAILBOX_ADDRESS")]
    address: String,

    /// Maximum number of messages to scan
    #[arg(long, env = "MAX_MESSAGES", default_value_t = 500)]
    max_messages: usize,

    /// Skip the Spam and Trash folders
    #[arg(long)]
    exclude_spam_trash: bool,

    /// Only report what would be done
    #[arg(long)]
    dry_run: bool,
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let config = Config::from_env();

    let transport = Arc::new(LocalMailbox::new(&cli.mailbox, cli.address).with_relay(&config.smtp)?);
    let models = Arc::new(LanguageModels::from_config(&config)?);
    let unsubscriber = Unsubscriber::new(transport, models, &config)?.dry_run(cli.dry_run);

    unsubscriber
        .run(&ListFilter {
            max_results: cli.max_messages,
            include_spam_trash: !cli.exclude_spam_trash,
        })
        .await
}

#[tokio::main]
async fn main() {
    // initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "mail_unsubscriber=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    event!(
        Level::INFO,
        "mail-unsubscriber {VERSION} scanning {}",
        cli.mailbox.display()
    );

    let exit_code = match run(cli).await {
        Err(e) => {
            event!(Level::ERROR, "mail-unsubscriber error {e}");
            1
        }
        Ok(summary) => {
            event!(
                Level::INFO,
                "scanned {} messages: {} offers found, {} unsubscribed, {} failed, {} skipped",
                summary.scanned,
                summary.detected,
                summary.unsubscribed,
                summary.failed,
                summary.skipped
            );
            0
        }
    };

    process::exit(exit_code);
}
