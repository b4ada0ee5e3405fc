//! Callback bridge for media-server adaptors.
//!
//! Native adaptors report progress through two callbacks: `(info, payload)`
//! for lifecycle notifications and `(error, message)` for failures. An
//! embedding that wraps such an adaptor forwards both into an
//! [`AdaptorCallbacks`], which translates them into [`AdaptorEvent`]s and
//! queues them on the controller.
//!
//! | info               | event                         |
//! |--------------------|-------------------------------|
//! | `initialized`      | `Initialized`                 |
//! | `publish_started`  | `Started` (publish mode only) |
//! | `play_started`     | `Started` (play mode only)    |
//! | `publish_finished` | `Ended` (publish mode only)   |
//! | `play_finished`    | `Ended` (play mode only)      |
//! | `closed`           | `Disconnected`                |
//!
//! Other notifications (ice state, bitrate, ...) are logged and dropped.

use super::{AdaptorEvent, EventSink};
use crate::session::{ErrorCode, ErrorInfo, SessionMode};
use serde_json::Value;
use tracing::{debug, trace};

/// Translate a lifecycle callback into an event for a controller in `mode`.
///
/// Returns `None` for notifications the controller does not act on,
/// including lifecycle notifications for the opposite direction.
#[must_use]
pub fn translate_callback(mode: SessionMode, info: &str, payload: &Value) -> Option<AdaptorEvent> {
    let stream_id = stream_id_of(payload);
    match (info, mode) {
        ("initialized", _) => Some(AdaptorEvent::Initialized),
        ("closed", _) => Some(AdaptorEvent::Disconnected),
        ("publish_started", SessionMode::Publish) | ("play_started", SessionMode::Play) => {
            Some(AdaptorEvent::Started { stream_id })
        }
        ("publish_finished", SessionMode::Publish) | ("play_finished", SessionMode::Play) => {
            Some(AdaptorEvent::Ended { stream_id })
        }
        _ => None,
    }
}

/// Translate an error callback into an event.
///
/// `message` is either a plain string or an object carrying `message` (or
/// `definition`) and optionally `streamId`.
#[must_use]
pub fn translate_error(error: &str, message: &Value) -> AdaptorEvent {
    let text = match message {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("definition"))
            .and_then(Value::as_str)
            .map_or_else(|| message.to_string(), str::to_string),
        Value::Null => String::new(),
        other => other.to_string(),
    };

    AdaptorEvent::Error {
        error: ErrorInfo::new(ErrorCode::from_code(error), text),
        stream_id: stream_id_of(message),
    }
}

fn stream_id_of(payload: &Value) -> Option<String> {
    payload
        .get("streamId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Receives native adaptor callbacks and forwards them to a controller.
#[derive(Debug, Clone)]
pub struct AdaptorCallbacks {
    mode: SessionMode,
    sink: EventSink,
}

impl AdaptorCallbacks {
    #[must_use]
    pub fn new(mode: SessionMode, sink: EventSink) -> Self {
        Self { mode, sink }
    }

    /// Lifecycle notification.
    pub fn callback(&self, info: &str, payload: &Value) {
        match translate_callback(self.mode, info, payload) {
            Some(event) => {
                debug!(
                    target: "session.adaptor",
                    mode = %self.mode,
                    info = info,
                    event = event.as_str(),
                    "Adaptor callback"
                );
                self.sink.emit(event);
            }
            None => {
                trace!(target: "session.adaptor", mode = %self.mode, info = info, "Ignoring adaptor callback");
            }
        }
    }

    /// Error notification. Every error is forwarded.
    pub fn callback_error(&self, error: &str, message: &Value) {
        debug!(
            target: "session.adaptor",
            mode = %self.mode,
            error = error,
            "Adaptor error callback"
        );
        self.sink.emit(translate_error(error, message));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::actors::messages::ControllerMessage;
    use serde_json::json;
    use tokio::sync::mpsc;

    #[test]
    fn test_started_carries_bound_stream_id() {
        let event = translate_callback(
            SessionMode::Publish,
            "publish_started",
            &json!({ "streamId": "s1-assigned" }),
        );
        assert_eq!(
            event,
            Some(AdaptorEvent::Started {
                stream_id: Some("s1-assigned".to_string())
            })
        );
    }

    #[test]
    fn test_started_without_stream_id() {
        let event = translate_callback(SessionMode::Play, "play_started", &Value::Null);
        assert_eq!(event, Some(AdaptorEvent::Started { stream_id: None }));

        let event = translate_callback(SessionMode::Play, "play_started", &json!({ "streamId": "" }));
        assert_eq!(event, Some(AdaptorEvent::Started { stream_id: None }));
    }

    #[test]
    fn test_opposite_direction_notifications_are_ignored() {
        assert_eq!(
            translate_callback(SessionMode::Play, "publish_started", &Value::Null),
            None
        );
        assert_eq!(
            translate_callback(SessionMode::Publish, "play_finished", &Value::Null),
            None
        );
        assert_eq!(
            translate_callback(SessionMode::Publish, "ice_connection_state_changed", &Value::Null),
            None
        );
    }

    #[test]
    fn test_connection_notifications() {
        assert_eq!(
            translate_callback(SessionMode::Play, "initialized", &Value::Null),
            Some(AdaptorEvent::Initialized)
        );
        assert_eq!(
            translate_callback(SessionMode::Publish, "closed", &Value::Null),
            Some(AdaptorEvent::Disconnected)
        );
    }

    #[test]
    fn test_error_with_plain_message() {
        let event = translate_error("no_stream_exist", &json!("no stream"));
        assert_eq!(
            event,
            AdaptorEvent::Error {
                error: ErrorInfo::new(ErrorCode::NotFound, "no stream"),
                stream_id: None,
            }
        );
    }

    #[test]
    fn test_error_with_object_message() {
        let event = translate_error(
            "publishTimeoutError",
            &json!({ "definition": "publish timed out", "streamId": "s1" }),
        );
        assert_eq!(
            event,
            AdaptorEvent::Error {
                error: ErrorInfo::new(ErrorCode::Timeout, "publish timed out"),
                stream_id: Some("s1".to_string()),
            }
        );
    }

    #[test]
    fn test_callbacks_forward_to_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callbacks = AdaptorCallbacks::new(SessionMode::Publish, EventSink::new(tx));

        callbacks.callback("initialized", &Value::Null);
        callbacks.callback("bitrateMeasurement", &json!({ "videoBitrate": 1200 }));
        callbacks.callback_error("WebSocketNotConnected", &Value::Null);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ControllerMessage::Adaptor(AdaptorEvent::Initialized)
        ));
        match rx.try_recv().unwrap() {
            ControllerMessage::Adaptor(AdaptorEvent::Error { error, .. }) => {
                assert_eq!(error.code, ErrorCode::Transport);
                assert!(error.message.is_empty());
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
