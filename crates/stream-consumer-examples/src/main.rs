//! Streaming demonstrations against the OpenAI Responses API.
//!
//! `raw` prints every event as it arrives; `handled` dispatches by kind,
//! printing text increments and the final transcript. `all` runs both, one
//! session after the other.

use std::time::Duration;

use clap::{Parser, Subcommand};
use stream_consumer::observability::init_observability;
use stream_consumer::prelude::*;
use tracing::error;

const RAW_PROMPT: &str = "Say 'double bubble bath' ten times fast.";
const HANDLED_PROMPT: &str = "Explain the concept of streaming API responses in 3 sentences.";

#[derive(Parser, Debug)]
#[command(name = "stream-examples", about = "Response streaming examples")]
struct Cli {
    /// Model identifier. Overrides `OPENAI_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Base URL of a Responses-compatible endpoint. Overrides `OPENAI_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Abandon a session that has not finished after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print every raw event.
    Raw {
        #[arg(long, default_value = RAW_PROMPT)]
        prompt: String,
    },
    /// Print text increments and the final response text.
    Handled {
        #[arg(long, default_value = HANDLED_PROMPT)]
        prompt: String,
    },
    /// Run both examples.
    All,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_observability();
    let cli = Cli::parse();

    println!("OpenAI API Streaming Examples");
    println!("============================\n");

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "no session started");
            eprintln!(
                "Please set your OpenAI API key in the .env file or environment variables."
            );
            return Err(err.into());
        }
    };
    let client = StreamClient::responses(config)?;
    let timeout = cli.timeout_secs.map(Duration::from_secs);

    let examples = match cli.command.unwrap_or(Command::All) {
        Command::Raw { prompt } => vec![(Example::Raw, prompt)],
        Command::Handled { prompt } => vec![(Example::Handled, prompt)],
        Command::All => vec![
            (Example::Raw, RAW_PROMPT.to_string()),
            (Example::Handled, HANDLED_PROMPT.to_string()),
        ],
    };

    for (example, prompt) in examples {
        if let Err(err) = run_example(&client, example, prompt, timeout).await {
            error!(error = %err, "example failed");
            if !reported_by_observer(&err) {
                println!("An error occurred: {err}");
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Example {
    Raw,
    Handled,
}

/// Session failures reach the observer, which already printed them.
fn reported_by_observer(err: &ConsumerError) -> bool {
    matches!(err, ConsumerError::Session(_))
}

fn resolve_config(cli: &Cli) -> Result<SessionConfig, ConsumerError> {
    let mut config = SessionConfig::from_env()?;
    if let Some(model) = &cli.model {
        config = config.model(model.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config = config.base_url(base_url.clone());
    }
    Ok(config)
}

async fn run_example(
    client: &StreamClient,
    example: Example,
    prompt: String,
    timeout: Option<Duration>,
) -> Result<(), ConsumerError> {
    let title = match example {
        Example::Raw => "Basic Streaming Example",
        Example::Handled => "Streaming with Event Handling",
    };
    println!("\n=== {title} ===\n");

    let mut session = client.session(prompt);
    if let Some(limit) = timeout {
        session = session.timeout(limit);
    }
    match example {
        Example::Raw => session.stream(EventLogObserver::stdout()).await.map(|_| ()),
        Example::Handled => session.stream(ConsoleObserver::stdout()).await.map(|_| ()),
    }
}
