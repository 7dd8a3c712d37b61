//! Crop Chat terminal client - composition root.
//!
//! 1. Load configuration from TOML and apply CLI overrides
//! 2. Build the identity store and the HTTP backend
//! 3. Mount a chat view and its input coordinator
//! 4. Run a line-oriented loop: plain lines are sent, `/mic` toggles speech,
//!    `/logout` drops the token, `/quit` exits

mod cli;
mod command;
mod render;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};

use cropchat_chat::{ChatView, HttpChatBackend, IdentityProvider, TokenStore};
use cropchat_core::config::CropChatConfig;
use cropchat_core::events::ChatEvent;
use cropchat_speech::UnsupportedCapability;

use cli::CliArgs;
use command::{parse_command, Command};

/// Print every entry not printed yet.
fn flush(view: &ChatView, rendered: &mut usize) {
    let entries = view.entries();
    for entry in render::take_unrendered(&entries, rendered) {
        println!("{}", render::format_entry(entry));
    }
}

/// Print entries as they are appended, then once more on shutdown so nothing
/// appended just before exit is lost.
async fn render_loop(
    view: Arc<ChatView>,
    mut events: broadcast::Receiver<ChatEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut rendered = 0;
    flush(&view, &mut rendered);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ChatEvent::EntryAppended { .. }) => flush(&view, &mut rendered),
                Ok(event) => tracing::debug!(event = event.event_name(), "Chat event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind; re-reading transcript");
                    flush(&view, &mut rendered);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown => break,
        }
    }

    flush(&view, &mut rendered);
}

#[tokio::main]
async fn main() -> cropchat_core::Result<()> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = CropChatConfig::load_or_default(&config_file);
    config.backend.endpoint = args.resolve_endpoint(&config.backend.endpoint);
    let log_level = args.resolve_log_level(&config.general.log_level);
    config.general.log_level = log_level.clone();

    // Tracing.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    if args.write_config {
        config.save(&config_file)?;
        println!("Wrote configuration to {}", config_file.display());
        return Ok(());
    }

    tracing::info!("Starting Crop Chat v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), endpoint = %config.backend.endpoint, "Configuration resolved");

    // Identity and backend.
    let tokens = Arc::new(TokenStore::new(args.resolve_token()));
    if !tokens.is_logged_in() {
        tracing::warn!("No identity token configured; the backend will reject requests");
    }
    let identity: Arc<dyn IdentityProvider> = tokens.clone();
    let backend = HttpChatBackend::new(&config.backend, Arc::clone(&identity))?;

    // View.
    let view = Arc::new(ChatView::mount(Arc::new(backend), identity, &config.chat)?);
    let input = view.input_coordinator(Arc::new(UnsupportedCapability), config.speech.clone());

    let (stop_renderer, shutdown) = oneshot::channel();
    let renderer = tokio::spawn(render_loop(Arc::clone(&view), view.subscribe(), shutdown));

    let mut logout = tokens.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut logged_out = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Command::Quit => break,
                    Command::Mic => println!("{}", render::speech_notice(input.toggle_speech())),
                    Command::Logout => tokens.invalidate(),
                    Command::Say(text) => {
                        input.set_draft(text);
                        input.submit_typed();
                    }
                }
            }
            changed = logout.changed() => {
                if changed.is_err() || logout.borrow().is_none() {
                    logged_out = true;
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = stop_renderer.send(());
    if let Err(e) = renderer.await {
        tracing::warn!(error = %e, "Renderer task failed");
    }
    if logged_out {
        println!("{}", render::LOGOUT_NOTICE);
    }

    drop(input);
    if let Ok(view) = Arc::try_unwrap(view) {
        view.unmount();
    }
    tracing::info!("Crop Chat stopped");

    Ok(())
}
