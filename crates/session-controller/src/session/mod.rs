//! Session data model.
//!
//! The caller owns a [`SessionIntent`] (what should be running), the
//! controller owns a [`SessionState`] (what the adaptor says is running).
//! [`machine::SessionMachine`] reconciles the two.
//!
//! # Phases
//!
//! ```text
//!            start                started
//!   Idle ───────────▶ Connecting ─────────▶ Active
//!    ▲                  │    │                │  │
//!    │   session ended  │    │ failure        │  │ intent off / retarget
//!    ├──────────────────┘    ▼                │  ▼
//!    │                    Errored ◀───────────┘ Stopping
//!    │                       │     failure       │
//!    │     fresh intent      ▼                   │ ended
//!    │                   Connecting              │
//!    └───────────────────────────────────────────┘
//! ```
//!
//! Any phase may drop to `Idle` when the control channel disconnects.

pub mod machine;

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Direction of the media session. Fixed per controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Send a local media stream to the server.
    Publish,
    /// Receive a remote media stream from the server.
    Play,
}

impl SessionMode {
    /// Returns the mode as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Publish => "publish",
            SessionMode::Play => "play",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired session state, supplied by the caller. Replaced wholesale on change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIntent {
    /// Whether a session should currently be running.
    pub active: bool,
    /// Stream identifier to publish to or play from.
    pub target_id: String,
}

impl SessionIntent {
    /// An intent to run a session against `target_id`.
    #[must_use]
    pub fn active(target_id: impl Into<String>) -> Self {
        Self {
            active: true,
            target_id: target_id.into(),
        }
    }

    /// An intent to have no session running.
    ///
    /// The target is kept so that UIs can round-trip the last selected stream.
    #[must_use]
    pub fn inactive(target_id: impl Into<String>) -> Self {
        Self {
            active: false,
            target_id: target_id.into(),
        }
    }
}

/// Lifecycle phase of the controlled session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    Active,
    Stopping,
    /// Terminal until the caller supplies a different intent.
    Errored,
}

impl Phase {
    /// Returns the phase as a string for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::Active => "active",
            Phase::Stopping => "stopping",
            Phase::Errored => "errored",
        }
    }

    /// Whether a start or stop command is outstanding or a session is bound.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Phase::Connecting | Phase::Active | Phase::Stopping)
    }

    /// Whether `self -> to` is an edge of the session state machine.
    ///
    /// Every phase other than `Idle` may fall back to `Idle`: on disconnect,
    /// on a session-ended error, or on `ended`.
    #[must_use]
    pub const fn can_transition(&self, to: Phase) -> bool {
        matches!(
            (self, to),
            (Phase::Idle, Phase::Connecting)
                | (Phase::Connecting, Phase::Active)
                | (Phase::Connecting, Phase::Errored)
                | (Phase::Connecting, Phase::Idle)
                | (Phase::Active, Phase::Stopping)
                | (Phase::Active, Phase::Idle)
                | (Phase::Active, Phase::Errored)
                | (Phase::Stopping, Phase::Idle)
                | (Phase::Errored, Phase::Connecting)
                | (Phase::Errored, Phase::Idle)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the adaptor's control channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Effect class of an adaptor error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The target does not exist or the remote side already ended it.
    /// Resets the controller to `Idle`.
    SessionEnded,
    /// Timeout, negotiation or transport failure. Moves to `Errored`.
    Failure,
}

impl ErrorClass {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::SessionEnded => "session_ended",
            ErrorClass::Failure => "failure",
        }
    }
}

/// Error code reported by the signaling adaptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    NotFound,
    AlreadyEnded,
    Timeout,
    Negotiation,
    Transport,
    /// Unrecognised code, kept verbatim.
    Other(String),
}

impl ErrorCode {
    /// Parse the media server's error code vocabulary.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "no_stream_exist" | "not_found" | "stream_not_exist" => ErrorCode::NotFound,
            "already_ended" | "publish_finished" | "play_finished" => ErrorCode::AlreadyEnded,
            "publishTimeoutError" | "timeout" => ErrorCode::Timeout,
            "notSetRemoteDescription" | "notSetLocalDescription" | "negotiation_failed" => {
                ErrorCode::Negotiation
            }
            "WebSocketNotConnected" | "closed" | "transport_error" => ErrorCode::Transport,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyEnded => "already_ended",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Negotiation => "negotiation_failed",
            ErrorCode::Transport => "transport_error",
            ErrorCode::Other(code) => code,
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            ErrorCode::NotFound | ErrorCode::AlreadyEnded => ErrorClass::SessionEnded,
            ErrorCode::Timeout
            | ErrorCode::Negotiation
            | ErrorCode::Transport
            | ErrorCode::Other(_) => ErrorClass::Failure,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An adaptor error as surfaced to the observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        self.code.class()
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Controller-owned session state.
///
/// `active_id` is `Some` iff `phase` is `Active` or `Stopping`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub phase: Phase,
    /// Stream id bound by the adaptor. May differ from the requested target.
    pub active_id: Option<String>,
    pub last_error: Option<ErrorInfo>,
}

/// Point-in-time view of a controller, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub mode: SessionMode,
    pub phase: Phase,
    pub active_id: Option<String>,
    pub last_error: Option<ErrorInfo>,
    pub connection: ConnectionState,
    pub intent: SessionIntent,
}

impl StatusSnapshot {
    /// Short user-facing label: connecting / live / ended / error.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.phase, &self.last_error) {
            (Phase::Errored, Some(err)) => format!("error: {}", err.message),
            (Phase::Errored, None) => "error".to_string(),
            (Phase::Connecting, _) => "connecting".to_string(),
            (Phase::Active, _) => "live".to_string(),
            (Phase::Stopping, _) => "stopping".to_string(),
            (Phase::Idle, _) if self.connection == ConnectionState::Disconnected => {
                "disconnected".to_string()
            }
            (Phase::Idle, Some(_)) => "ended".to_string(),
            (Phase::Idle, None) => "idle".to_string(),
        }
    }
}
