//! Message types for the controller mailbox.
//!
//! Caller intents and adaptor events share one `tokio::sync::mpsc` queue so
//! the actor processes them strictly in arrival order. Status queries use
//! `tokio::sync::oneshot` for request-reply.

use crate::adaptor::AdaptorEvent;
use crate::session::{SessionIntent, StatusSnapshot};
use tokio::sync::oneshot;

/// Messages sent to `SessionControllerActor`.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Replace the desired session state (latest wins).
    SetIntent { intent: SessionIntent },

    /// Event reported by the signaling adaptor.
    Adaptor(AdaptorEvent),

    /// Get a snapshot of the controller state.
    GetStatus {
        /// Response channel for the snapshot.
        respond_to: oneshot::Sender<StatusSnapshot>,
    },
}
