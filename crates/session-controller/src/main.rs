//! Session Controller Demo
//!
//! Interactive harness that drives one publish and one play controller
//! against the in-process loopback media server.
//!
//! # Commands (one per line on stdin)
//!
//! - `publish <id>` / `play <id>` - set an active intent
//! - `stop` - set both intents inactive
//! - `end <id>` - end a stream server-side (remote termination)
//! - `offline` / `online` - drop or restore the signaling connection
//! - `status` - print both controllers' state
//! - `quit` - dispose both controllers and exit
//!
//! # Startup Flow
//!
//! 1. Initialize tracing (`RUST_LOG`, default `session_controller=debug`)
//! 2. Load configuration from environment
//! 3. Start the loopback server and spawn both controllers
//! 4. Read commands until `quit`, EOF, or ctrl-c

#![warn(clippy::pedantic)]

use anyhow::Context;
use session_controller::adaptor::loopback::LoopbackServer;
use session_controller::observer::{Diagnostic, StatusObserver, StatusUpdate};
use session_controller::{Config, SessionControllerHandle, SessionMode, VideoSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints status updates for one controller.
struct ConsoleObserver;

impl StatusObserver for ConsoleObserver {
    fn on_status_update(&mut self, update: &StatusUpdate) {
        let id = update.stream_id.as_deref().unwrap_or("-");
        match (&update.error, update.is_active) {
            (Some(err), _) => println!("[{}] error {id}: {err}", update.phase),
            (None, true) => println!("[live] {id}"),
            (None, false) => println!("[ended] {id}"),
        }
    }

    fn on_diagnostic(&mut self, mode: SessionMode, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::Connected | Diagnostic::Disconnected => {
                println!("[{mode}] {}", diagnostic.as_str());
            }
            Diagnostic::StreamIdMismatch {
                requested,
                assigned,
            } => println!("[{mode}] server assigned {assigned} (requested {requested})"),
            Diagnostic::MissingTargetId => println!("[{mode}] no stream id given"),
            Diagnostic::StaleEvent { .. } => {}
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_controller=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting session controller demo");

    let config = Config::from_env()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))
        .context("loading configuration")?;

    info!(
        controller_id = %config.controller_id,
        ice_servers = ?config.ice_servers,
        mailbox_warn_depth = config.mailbox_warn_depth,
        "Configuration loaded successfully"
    );

    let server = LoopbackServer::new();
    let publisher = SessionControllerHandle::spawn(
        SessionMode::Publish,
        VideoSink::new("localVideo"),
        ConsoleObserver,
        server.adaptor(),
        &config,
    );
    let player = SessionControllerHandle::spawn(
        SessionMode::Play,
        VideoSink::new("remoteVideo"),
        ConsoleObserver,
        server.adaptor(),
        &config,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = signal::ctrl_c() => {
                info!("Received ctrl-c");
                None
            }
        };
        let Some(line) = line else { break };

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("publish"), id) => publisher.set_intent(true, id.unwrap_or_default()),
            (Some("play"), id) => player.set_intent(true, id.unwrap_or_default()),
            (Some("stop"), _) => {
                let publishing = publisher.status().await?.intent.target_id;
                let playing = player.status().await?.intent.target_id;
                publisher.set_intent(false, publishing);
                player.set_intent(false, playing);
            }
            (Some("end"), Some(id)) => {
                if !server.end_stream(id) {
                    println!("no live stream {id}");
                }
            }
            (Some("offline"), _) => server.shutdown(),
            (Some("online"), _) => server.bring_online(),
            (Some("status"), _) => {
                for handle in [&publisher, &player] {
                    let status = handle.status().await?;
                    println!(
                        "{}: {} (phase={}, stream={})",
                        status.mode,
                        status.label(),
                        status.phase,
                        status.active_id.as_deref().unwrap_or("-")
                    );
                }
            }
            (Some("quit"), _) => break,
            (None, _) => {}
            (Some(other), _) => warn!(command = other, "Unknown command"),
        }
    }

    info!("Shutting down");
    publisher.shutdown().await;
    player.shutdown().await;
    info!("Session controller demo stopped");

    Ok(())
}
