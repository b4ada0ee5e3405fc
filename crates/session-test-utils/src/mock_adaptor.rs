//! Mock signaling adaptor for controller testing.
//!
//! Records every command the controller issues and lets the test inject
//! adaptor events. Can be configured to:
//! - Report `initialized` as soon as the controller connects
//! - Answer starts with `started` (echoing or rewriting the id)
//! - Answer stops with `ended`
//!
//! # Example
//!
//! ```rust,ignore
//! use session_test_utils::MockAdaptor;
//!
//! let (adaptor, mock) = MockAdaptor::builder()
//!     .initialize_on_connect()
//!     .auto_start()
//!     .build();
//!
//! // Hand `adaptor` to SessionControllerHandle::spawn, then drive events:
//! mock.ended("s1");
//! assert_eq!(mock.stops(), vec!["s1"]);
//! ```

use session_controller::adaptor::{ConnectParams, EventSink, SignalingAdaptor};
use session_controller::session::{ErrorCode, ErrorInfo, SessionMode};
use session_controller::AdaptorEvent;
use std::sync::{Arc, Mutex, MutexGuard};

/// A command received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdaptorCall {
    Connect { mode: SessionMode, sink: String },
    StartPublish(String),
    StartPlay(String),
    Stop(String),
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<AdaptorCall>,
    sink: Option<EventSink>,
}

#[derive(Debug, Default, Clone)]
struct Behaviour {
    initialize_on_connect: bool,
    auto_start: bool,
    assign_suffix: Option<String>,
    auto_end: bool,
}

/// Mock adaptor handed to the controller.
#[derive(Debug)]
pub struct MockAdaptor {
    state: Arc<Mutex<MockState>>,
    behaviour: Behaviour,
}

impl MockAdaptor {
    /// Create a new `MockAdaptor` builder.
    #[must_use]
    pub fn builder() -> MockAdaptorBuilder {
        MockAdaptorBuilder::default()
    }

    fn record(&self, call: AdaptorCall) {
        lock(&self.state).calls.push(call);
    }

    fn emit(&self, event: AdaptorEvent) {
        if let Some(sink) = &lock(&self.state).sink {
            sink.emit(event);
        }
    }
}

impl SignalingAdaptor for MockAdaptor {
    fn connect(&mut self, params: &ConnectParams, events: EventSink) {
        {
            let mut state = lock(&self.state);
            state.calls.push(AdaptorCall::Connect {
                mode: params.mode,
                sink: params.sink.as_str().to_string(),
            });
            state.sink = Some(events);
        }
        if self.behaviour.initialize_on_connect {
            self.emit(AdaptorEvent::Initialized);
        }
    }

    fn start_publish(&mut self, stream_id: &str) {
        self.record(AdaptorCall::StartPublish(stream_id.to_string()));
        self.answer_start(stream_id);
    }

    fn start_play(&mut self, stream_id: &str) {
        self.record(AdaptorCall::StartPlay(stream_id.to_string()));
        self.answer_start(stream_id);
    }

    fn stop(&mut self, stream_id: &str) {
        self.record(AdaptorCall::Stop(stream_id.to_string()));
        if self.behaviour.auto_end {
            self.emit(AdaptorEvent::Ended {
                stream_id: Some(stream_id.to_string()),
            });
        }
    }

    fn close(&mut self) {
        self.record(AdaptorCall::Close);
        lock(&self.state).sink = None;
    }
}

impl MockAdaptor {
    fn answer_start(&self, stream_id: &str) {
        if !self.behaviour.auto_start {
            return;
        }
        let bound = match &self.behaviour.assign_suffix {
            Some(suffix) => format!("{stream_id}{suffix}"),
            None => stream_id.to_string(),
        };
        self.emit(AdaptorEvent::Started {
            stream_id: Some(bound),
        });
    }
}

/// Builder for `MockAdaptor`.
#[derive(Debug, Default)]
pub struct MockAdaptorBuilder {
    behaviour: Behaviour,
}

impl MockAdaptorBuilder {
    /// Report `initialized` from `connect`.
    #[must_use]
    pub fn initialize_on_connect(mut self) -> Self {
        self.behaviour.initialize_on_connect = true;
        self
    }

    /// Answer every start with `started` for the requested id.
    #[must_use]
    pub fn auto_start(mut self) -> Self {
        self.behaviour.auto_start = true;
        self
    }

    /// Answer every start with `started` for `<requested><suffix>`.
    #[must_use]
    pub fn assign_ids_with_suffix(mut self, suffix: &str) -> Self {
        self.behaviour.auto_start = true;
        self.behaviour.assign_suffix = Some(suffix.to_string());
        self
    }

    /// Answer every stop with `ended`.
    #[must_use]
    pub fn auto_end(mut self) -> Self {
        self.behaviour.auto_end = true;
        self
    }

    /// Build the adaptor and the test's handle to it.
    #[must_use]
    pub fn build(self) -> (MockAdaptor, MockAdaptorHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        let adaptor = MockAdaptor {
            state: Arc::clone(&state),
            behaviour: self.behaviour,
        };
        (adaptor, MockAdaptorHandle { state })
    }
}

/// Test-side handle: inspect commands and inject events.
#[derive(Debug, Clone)]
pub struct MockAdaptorHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockAdaptorHandle {
    /// Every command received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AdaptorCall> {
        lock(&self.state).calls.clone()
    }

    /// Stream ids passed to `start_publish` or `start_play`, in order.
    #[must_use]
    pub fn starts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AdaptorCall::StartPublish(id) | AdaptorCall::StartPlay(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Stream ids passed to `stop`, in order.
    #[must_use]
    pub fn stops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                AdaptorCall::Stop(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Number of `close` calls received.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == AdaptorCall::Close)
            .count()
    }

    /// Whether the controller connected and has not closed the adaptor.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        lock(&self.state).sink.is_some()
    }

    /// Inject an event. Returns `false` if the controller is gone or the
    /// adaptor was never connected.
    pub fn emit(&self, event: AdaptorEvent) -> bool {
        match &lock(&self.state).sink {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    pub fn initialized(&self) -> bool {
        self.emit(AdaptorEvent::Initialized)
    }

    pub fn started(&self, stream_id: &str) -> bool {
        self.emit(AdaptorEvent::Started {
            stream_id: Some(stream_id.to_string()),
        })
    }

    pub fn ended(&self, stream_id: &str) -> bool {
        self.emit(AdaptorEvent::Ended {
            stream_id: Some(stream_id.to_string()),
        })
    }

    /// Inject an error using the media server's code vocabulary.
    pub fn error(&self, code: &str, message: &str, stream_id: Option<&str>) -> bool {
        self.emit(AdaptorEvent::Error {
            error: ErrorInfo::new(ErrorCode::from_code(code), message),
            stream_id: stream_id.map(str::to_string),
        })
    }

    pub fn disconnected(&self) -> bool {
        self.emit(AdaptorEvent::Disconnected)
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
