//! Signaling adaptor boundary.
//!
//! The adaptor owns the control channel to the media server. Commands are
//! fire-and-forget: the adaptor performs I/O on its own and reports progress
//! later through the [`EventSink`] handed to it on [`SignalingAdaptor::connect`].
//! Events go into the controller's mailbox, behind any intent changes that
//! arrived first, so the controller sees one ordered stream of inputs.
//!
//! - [`bridge`] - translates the media server's native callbacks into
//!   [`AdaptorEvent`]s
//! - [`loopback`] - in-process media server for local development and tests

pub mod bridge;
pub mod loopback;

use crate::actors::messages::ControllerMessage;
use crate::config::Config;
use crate::session::{ErrorInfo, SessionMode};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Event reported by a signaling adaptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptorEvent {
    /// The control channel is ready.
    Initialized,
    /// A publish or play session started. `stream_id` is the id the server
    /// bound, when it reported one.
    Started { stream_id: Option<String> },
    /// A publish or play session finished.
    Ended { stream_id: Option<String> },
    /// A command or session failed.
    Error {
        error: ErrorInfo,
        stream_id: Option<String>,
    },
    /// The control channel closed.
    Disconnected,
}

impl AdaptorEvent {
    /// Returns the event name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AdaptorEvent::Initialized => "initialized",
            AdaptorEvent::Started { .. } => "started",
            AdaptorEvent::Ended { .. } => "ended",
            AdaptorEvent::Error { .. } => "error",
            AdaptorEvent::Disconnected => "disconnected",
        }
    }
}

/// Delivers adaptor events into a controller's mailbox.
#[derive(Clone, Debug)]
pub struct EventSink {
    sender: mpsc::UnboundedSender<ControllerMessage>,
}

impl EventSink {
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<ControllerMessage>) -> Self {
        Self { sender }
    }

    /// Queue `event` for the controller. Returns `false` once the controller
    /// has shut down.
    pub fn emit(&self, event: AdaptorEvent) -> bool {
        let name = event.as_str();
        if self.sender.send(ControllerMessage::Adaptor(event)).is_err() {
            debug!(target: "session.adaptor", event = name, "Controller gone, dropping adaptor event");
            return false;
        }
        true
    }

    /// Whether the controller stopped receiving events.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Opaque handle of the video element or sink the adaptor renders into
/// (local preview for publish, remote video for play).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSink(String);

impl VideoSink {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Which media directions the peer connection negotiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaConstraints {
    pub send_audio: bool,
    pub send_video: bool,
    pub receive_audio: bool,
    pub receive_video: bool,
}

impl MediaConstraints {
    /// Publish captures and sends; play only receives.
    #[must_use]
    pub const fn for_mode(mode: SessionMode) -> Self {
        match mode {
            SessionMode::Publish => Self {
                send_audio: true,
                send_video: true,
                receive_audio: false,
                receive_video: false,
            },
            SessionMode::Play => Self {
                send_audio: false,
                send_video: false,
                receive_audio: true,
                receive_video: true,
            },
        }
    }
}

/// Everything an adaptor needs to open its control channel.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub mode: SessionMode,
    pub sink: VideoSink,
    pub websocket_url: String,
    pub ice_servers: Vec<String>,
    pub media: MediaConstraints,
}

impl ConnectParams {
    #[must_use]
    pub fn new(mode: SessionMode, sink: VideoSink, config: &Config) -> Self {
        Self {
            mode,
            sink,
            websocket_url: config.websocket_url.clone(),
            ice_servers: config.ice_servers.clone(),
            media: MediaConstraints::for_mode(mode),
        }
    }
}

/// Command surface of a signaling adaptor.
///
/// One instance per controller; never shared. Calls must not block and must
/// not deliver events re-entrantly: results arrive later via the sink.
pub trait SignalingAdaptor: Send + 'static {
    /// Open the control channel. Emits [`AdaptorEvent::Initialized`] once ready.
    fn connect(&mut self, params: &ConnectParams, events: EventSink);

    fn start_publish(&mut self, stream_id: &str);

    fn start_play(&mut self, stream_id: &str);

    fn stop(&mut self, stream_id: &str);

    /// Release the control channel. Called once, after any final stop.
    fn close(&mut self);
}
