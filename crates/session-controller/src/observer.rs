//! Status reporting to the caller.
//!
//! The controller invokes the observer synchronously from its actor task,
//! in the same step that processed the triggering intent or adaptor event.
//! `on_status_update` fires at most once per transition into or out of
//! `Active`, and once per adaptor error. Intermediate `Connecting` and
//! `Stopping` phases are not reported.

use crate::session::{ErrorInfo, Phase, SessionMode};
use serde::Serialize;
use tracing::debug;

/// Notification that the session went live or stopped being live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub is_active: bool,
    /// Bound stream id when going live; last bound id (if any) when stopping.
    pub stream_id: Option<String>,
    /// Phase after the transition.
    pub phase: Phase,
    /// Set when the update was caused by an adaptor error.
    pub error: Option<ErrorInfo>,
}

/// Non-fatal conditions surfaced alongside status updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The control channel is ready; starts may be issued.
    Connected,
    /// The control channel is not (or no longer) connected. Persistent until
    /// `Connected` is reported.
    Disconnected,
    /// The adaptor bound a different id than the one requested.
    StreamIdMismatch { requested: String, assigned: String },
    /// The intent is active but carries no target id; nothing was started.
    MissingTargetId,
    /// An adaptor event did not match the current phase and was discarded.
    StaleEvent {
        event: &'static str,
        phase: Phase,
        stream_id: Option<String>,
        error: Option<ErrorInfo>,
    },
}

impl Diagnostic {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Diagnostic::Connected => "connected",
            Diagnostic::Disconnected => "disconnected",
            Diagnostic::StreamIdMismatch { .. } => "stream_id_mismatch",
            Diagnostic::MissingTargetId => "missing_target_id",
            Diagnostic::StaleEvent { .. } => "stale_event",
        }
    }
}

/// Caller-supplied receiver of controller status.
pub trait StatusObserver: Send + 'static {
    /// The session went live, or stopped being live, or an adaptor error was
    /// processed.
    fn on_status_update(&mut self, update: &StatusUpdate);

    /// Non-fatal condition. Ignored by default.
    fn on_diagnostic(&mut self, _mode: SessionMode, _diagnostic: &Diagnostic) {}
}

type DiagnosticFn = Box<dyn FnMut(SessionMode, &Diagnostic) + Send>;

/// Adapts a plain `(is_active, stream_id)` callback into a [`StatusObserver`].
///
/// Diagnostics such as `Disconnected` or a discarded stale error never reach
/// the status callback. They are logged at debug level unless a handler is
/// attached with [`FnObserver::with_diagnostics`].
pub struct FnObserver<F> {
    on_status: F,
    on_diagnostic: Option<DiagnosticFn>,
}

/// Wrap `f` as an observer that only receives `(is_active, stream_id)`.
///
/// Implement [`StatusObserver`] directly, or use
/// [`FnObserver::with_diagnostics`], to see connection changes and stale
/// adaptor errors.
pub fn from_fn<F>(f: F) -> FnObserver<F>
where
    F: FnMut(bool, Option<&str>) + Send + 'static,
{
    FnObserver {
        on_status: f,
        on_diagnostic: None,
    }
}

impl<F> FnObserver<F> {
    /// Route diagnostics to `g` as well.
    #[must_use]
    pub fn with_diagnostics<G>(mut self, g: G) -> Self
    where
        G: FnMut(SessionMode, &Diagnostic) + Send + 'static,
    {
        self.on_diagnostic = Some(Box::new(g));
        self
    }
}

impl<F> StatusObserver for FnObserver<F>
where
    F: FnMut(bool, Option<&str>) + Send + 'static,
{
    fn on_status_update(&mut self, update: &StatusUpdate) {
        (self.on_status)(update.is_active, update.stream_id.as_deref());
    }

    fn on_diagnostic(&mut self, mode: SessionMode, diagnostic: &Diagnostic) {
        match self.on_diagnostic.as_mut() {
            Some(handler) => handler(mode, diagnostic),
            None => debug!(
                target: "session.observer",
                mode = %mode,
                diagnostic = diagnostic.as_str(),
                "Diagnostic not forwarded to status callback"
            ),
        }
    }
}
