//! talkforge binary entry point

use std::io::Write;

use color_eyre::Result;
use futures::StreamExt;
use talkforge_rs::{
    cli::{Cli, Commands},
    config::{self, ClientConfig},
    messages::{ChatMessage, MessageList},
    services::{
        streaming::{delta_stream, StreamIngestor},
        ChatStreamClient, StreamStatus, StreamTransport, SubmitRequest,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Install error handler
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse_args();

    let mut config = config::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    // Set up logging
    init_logging(cli.verbose || config.verbose);

    // Handle commands
    match cli.command {
        Some(Commands::Submit {
            session_id,
            content,
            raw,
            post_process,
        }) => {
            if post_process {
                config.post_process = true;
            }
            if raw {
                print_deltas(config, &session_id, &content).await?;
            } else {
                submit(config, &session_id, &content).await?;
            }
        }
        Some(Commands::Config { show, path }) => {
            if path {
                let path = cli.config.unwrap_or_else(config::config_path);
                println!("{}", path.display());
            }
            if show || !path {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        Some(Commands::Version) => {
            println!("talkforge version {}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            println!("Nothing to do.");
            println!("Use --help for more information");
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("talkforge_rs=debug,talkforge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stream a reply to stdout as it arrives
async fn submit(config: ClientConfig, session_id: &str, content: &str) -> Result<()> {
    let post_process = config.post_process;
    let ingestor = StreamIngestor::new(ChatStreamClient::new(config)?).with_post_process(post_process);

    let mut messages = MessageList::new();
    messages.push(ChatMessage::user(content));

    let mut streamed = String::new();
    let mut stdout_closed = false;
    let mut live = messages.live(|message: &ChatMessage| {
        if stdout_closed {
            return;
        }
        if let Some(fresh) = message.content.strip_prefix(streamed.as_str()) {
            if !fresh.is_empty() {
                let mut out = std::io::stdout().lock();
                if let Err(err) = out.write_all(fresh.as_bytes()).and_then(|()| out.flush()) {
                    tracing::debug!(error = %err, "Stdout closed, no longer echoing");
                    stdout_closed = true;
                    return;
                }
                streamed.push_str(fresh);
            }
        }
    });

    let result = ingestor.stream_submit(session_id, content, &mut live).await;
    let status = live.status().clone();
    drop(live);
    if stdout_closed {
        result?;
        return Ok(());
    }
    println!();

    if let StreamStatus::Failed(reason) = &status {
        eprintln!("[stream failed: {reason}]");
    }
    let outcome = result?;
    tracing::debug!(?outcome, "Submit finished");

    if let Some(reply) = messages.last() {
        if reply.content != streamed {
            println!("{}", reply.content);
        }
        if let Some(call) = &reply.function_call {
            println!("{}", serde_json::to_string_pretty(call)?);
        }
    }

    Ok(())
}

/// Print each parsed delta as one JSON line
async fn print_deltas(config: ClientConfig, session_id: &str, content: &str) -> Result<()> {
    let client = ChatStreamClient::new(config)?;
    let body = client
        .open_stream(&SubmitRequest::new(session_id, content))
        .await?;

    let mut deltas = std::pin::pin!(delta_stream(body));
    while let Some(delta) = deltas.next().await {
        println!("{}", serde_json::to_string(&delta?)?);
    }

    Ok(())
}
