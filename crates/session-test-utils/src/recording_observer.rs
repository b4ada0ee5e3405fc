//! Observer that records everything the controller reports.

use session_controller::observer::{Diagnostic, StatusObserver, StatusUpdate};
use session_controller::session::SessionMode;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Recorded {
    updates: Vec<StatusUpdate>,
    diagnostics: Vec<(SessionMode, Diagnostic)>,
}

/// Recording [`StatusObserver`]. Clones share the same record, so keep one
/// clone in the test and hand the other to the controller.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status updates received, in order.
    #[must_use]
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.lock().updates.clone()
    }

    /// `(is_active, stream_id)` pairs, in order.
    #[must_use]
    pub fn transitions(&self) -> Vec<(bool, Option<String>)> {
        self.lock()
            .updates
            .iter()
            .map(|u| (u.is_active, u.stream_id.clone()))
            .collect()
    }

    #[must_use]
    pub fn last_update(&self) -> Option<StatusUpdate> {
        self.lock().updates.last().cloned()
    }

    /// Diagnostics received, in order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock()
            .diagnostics
            .iter()
            .map(|(_, d)| d.clone())
            .collect()
    }

    /// Diagnostics of kind `kind` (see `Diagnostic::as_str`).
    #[must_use]
    pub fn diagnostics_of(&self, kind: &str) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.as_str() == kind)
            .collect()
    }

    /// Total callbacks received (updates and diagnostics).
    #[must_use]
    pub fn callback_count(&self) -> usize {
        let recorded = self.lock();
        recorded.updates.len() + recorded.diagnostics.len()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StatusObserver for RecordingObserver {
    fn on_status_update(&mut self, update: &StatusUpdate) {
        self.lock().updates.push(update.clone());
    }

    fn on_diagnostic(&mut self, mode: SessionMode, diagnostic: &Diagnostic) {
        self.lock().diagnostics.push((mode, diagnostic.clone()));
    }
}
