//! Test fixtures for session controller tests.
//!
//! Provides a deterministic configuration, a spawn helper wiring a
//! controller to a [`MockAdaptor`] and a [`RecordingObserver`], and
//! helpers for waiting on the controller's mailbox.

use crate::mock_adaptor::{MockAdaptor, MockAdaptorBuilder, MockAdaptorHandle};
use crate::recording_observer::RecordingObserver;
use session_controller::session::{Phase, SessionMode, StatusSnapshot};
use session_controller::{Config, SessionControllerHandle, VideoSink};
use std::time::Duration;

/// How long [`wait_for_phase`] waits before failing the test.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Round trips [`settle`] makes through the mailbox.
const SETTLE_ROUNDS: usize = 8;

/// Configuration with a fixed controller id.
#[must_use]
pub fn test_config() -> Config {
    Config {
        controller_id: "session-test".to_string(),
        ..Config::default()
    }
}

/// A controller under test with its mock adaptor and observer.
pub struct TestController {
    pub handle: SessionControllerHandle,
    pub mock: MockAdaptorHandle,
    pub observer: RecordingObserver,
}

impl TestController {
    /// Spawn a controller whose adaptor initializes on connect and answers
    /// starts and stops automatically.
    #[must_use]
    pub fn responsive(mode: SessionMode) -> Self {
        Self::spawn(
            mode,
            MockAdaptor::builder()
                .initialize_on_connect()
                .auto_start()
                .auto_end(),
        )
    }

    /// Spawn a controller whose adaptor only records commands.
    #[must_use]
    pub fn manual(mode: SessionMode) -> Self {
        Self::spawn(mode, MockAdaptor::builder())
    }

    #[must_use]
    pub fn spawn(mode: SessionMode, builder: MockAdaptorBuilder) -> Self {
        let (adaptor, mock) = builder.build();
        let observer = RecordingObserver::new();
        let sink = match mode {
            SessionMode::Publish => "localVideo",
            SessionMode::Play => "remoteVideo",
        };
        let handle = SessionControllerHandle::spawn(
            mode,
            VideoSink::new(sink),
            observer.clone(),
            adaptor,
            &test_config(),
        );
        Self {
            handle,
            mock,
            observer,
        }
    }

    /// Wait for the controller to connect its adaptor, then report
    /// `initialized` and process it.
    pub async fn connect(&self) -> StatusSnapshot {
        self.settle().await;
        assert!(self.mock.initialized(), "adaptor should be connected");
        self.settle().await
    }

    /// Process everything queued, including events the adaptor emitted in
    /// response, and return the resulting state.
    pub async fn settle(&self) -> StatusSnapshot {
        settle(&self.handle).await
    }
}

/// Drain the mailbox: each status query is answered only after everything
/// queued before it, including events emitted while handling earlier
/// messages.
pub async fn settle(handle: &SessionControllerHandle) -> StatusSnapshot {
    let mut snapshot = handle.status().await.expect("controller should be running");
    for _ in 1..SETTLE_ROUNDS {
        snapshot = handle.status().await.expect("controller should be running");
    }
    snapshot
}

/// Poll until the controller reaches `phase`, failing after [`WAIT_TIMEOUT`].
pub async fn wait_for_phase(handle: &SessionControllerHandle, phase: Phase) -> StatusSnapshot {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        loop {
            let snapshot = handle.status().await.expect("controller should be running");
            if snapshot.phase == phase {
                return snapshot;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("controller did not reach {phase} within {WAIT_TIMEOUT:?}"))
}
