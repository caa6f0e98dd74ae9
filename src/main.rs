//! Plant Chat - plant identification and Q&A assistant
//!
//! A Rust client implementing the chat session state machine that drives
//! the classify, disambiguate and answer workflow against a plant backend.

mod config;
mod console;
mod conversation;
mod error;
mod gateway;
mod phrases;
mod runtime;
mod staging;
mod state_machine;

use config::{ClientConfig, SessionConfig};
use console::{ConsoleCommand, Transcript};
use gateway::{HttpGateway, Logged};
use runtime::{spawn_session, SessionHandle, SessionSnapshot};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the transcript
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plant_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let client_config = ClientConfig::from_env();
    let session_config = SessionConfig::from_env();
    tracing::info!(
        api_url = %client_config.api_url,
        timeout_secs = client_config.request_timeout.as_secs(),
        "Plant backend configured"
    );

    let gateway = Arc::new(Logged::new(HttpGateway::new(&client_config)?));
    let handle = spawn_session(Arc::clone(&gateway), gateway, session_config);

    println!("{}", console::HELP);
    let printer = tokio::spawn(print_updates(handle.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match console::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(e) = run_command(&handle, command).await {
                    println!("!! {e}");
                }
            }
            Err(e) => println!("!! {e}"),
        }
    }

    printer.abort();
    tracing::info!("Console closed");
    Ok(())
}

async fn run_command(
    handle: &SessionHandle,
    command: ConsoleCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        ConsoleCommand::Attach(paths) => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(console::load_attachment(path).await?);
            }
            let staged = handle.attach_images(files).await?;
            println!("staged {staged} image(s)");
        }
        ConsoleCommand::Remove(index) => handle.remove_image(index).await?,
        ConsoleCommand::Clear => handle.clear_images().await?,
        ConsoleCommand::Pick(target) => {
            let label = target.resolve(&handle.snapshot().candidates)?;
            handle.select_species(label).await?;
        }
        ConsoleCommand::Close => handle.dismiss_selection().await?,
        ConsoleCommand::Dismiss => handle.dismiss_error().await?,
        ConsoleCommand::Help => println!("{}", console::HELP),
        ConsoleCommand::Say(text) => handle.submit_text(text).await?,
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

/// Print log additions and signal changes until the session stops
async fn print_updates(mut rx: watch::Receiver<SessionSnapshot>) {
    let mut transcript = Transcript::new();
    loop {
        let snapshot = rx.borrow_and_update().clone();
        for line in transcript.render_new(&snapshot) {
            println!("{line}");
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}
