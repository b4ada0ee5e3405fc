//! Controller behaviour against a scripted adaptor.
//!
//! Each test spawns a real `SessionControllerActor` wired to a
//! `MockAdaptor` and a `RecordingObserver`, injects adaptor events, and
//! checks commands, phases, and observer callbacks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use session_controller::session::{ErrorCode, Phase, SessionMode};
use session_controller::{Diagnostic, SessionError};
use session_test_utils::{AdaptorCall, MockAdaptor, TestController};

// ============================================================================
// Lifecycle Scenarios
// ============================================================================

#[tokio::test]
async fn test_happy_path_publish() {
    let t = TestController::manual(SessionMode::Publish);
    t.connect().await;

    t.handle.set_intent(true, "s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert_eq!(t.mock.starts(), vec!["s1"]);
    assert!(t.observer.updates().is_empty());

    t.mock.started("s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Active);
    assert_eq!(status.active_id.as_deref(), Some("s1"));
    assert_eq!(status.label(), "live");
    assert_eq!(t.observer.transitions(), vec![(true, Some("s1".to_string()))]);
}

#[tokio::test]
async fn test_playback_ended_remotely_resets_without_retry() {
    let t = TestController::manual(SessionMode::Play);
    t.connect().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;
    t.mock.started("s1");
    t.settle().await;

    t.mock.error("not_found", "stream s1 does not exist", None);
    let status = t.settle().await;

    assert_eq!(status.phase, Phase::Idle);
    assert_eq!(status.active_id, None);
    assert_eq!(status.label(), "ended");
    assert_eq!(
        t.observer.transitions(),
        vec![(true, Some("s1".to_string())), (false, Some("s1".to_string()))]
    );
    let last = t.observer.last_update().unwrap();
    assert_eq!(last.error.unwrap().code, ErrorCode::NotFound);

    // No automatic retry
    t.mock.initialized();
    t.settle().await;
    assert_eq!(t.mock.starts(), vec!["s1"]);
}

#[tokio::test]
async fn test_start_waits_for_initialized() {
    let t = TestController::manual(SessionMode::Publish);
    t.settle().await;

    t.handle.set_intent(true, "s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Idle);
    assert_eq!(status.label(), "disconnected");
    assert!(t.mock.starts().is_empty());
    assert_eq!(t.observer.diagnostics(), vec![Diagnostic::Disconnected]);

    t.mock.initialized();
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert_eq!(t.mock.starts(), vec!["s1"]);
    assert_eq!(
        t.observer.diagnostics(),
        vec![Diagnostic::Disconnected, Diagnostic::Connected]
    );
}

#[tokio::test]
async fn test_rapid_toggle_stops_without_announcing() {
    let t = TestController::manual(SessionMode::Publish);
    t.connect().await;

    t.handle.set_intent(true, "s1");
    t.handle.set_intent(false, "s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert!(t.mock.stops().is_empty());

    t.mock.started("s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Stopping);
    assert_eq!(t.mock.stops(), vec!["s1"]);

    t.mock.ended("s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Idle);
    assert!(t.observer.updates().is_empty());
}

#[tokio::test]
async fn test_dispose_mid_session_stops_once_and_goes_quiet() {
    let TestController {
        handle,
        mock,
        observer,
    } = TestController::responsive(SessionMode::Play);

    handle.set_intent(true, "s1");
    let status = session_test_utils::settle(&handle).await;
    assert_eq!(status.phase, Phase::Active);
    let callbacks = observer.callback_count();

    handle.dispose();
    handle.dispose();
    handle.set_intent(false, "s1");
    assert!(matches!(handle.status().await, Err(SessionError::Disposed)));
    handle.shutdown().await;

    assert_eq!(mock.stops(), vec!["s1"]);
    assert_eq!(mock.close_count(), 1);
    assert_eq!(mock.calls().last(), Some(&AdaptorCall::Close));
    assert_eq!(observer.callback_count(), callbacks);
}

#[tokio::test]
async fn test_dispose_while_idle_only_closes() {
    let TestController { handle, mock, .. } = TestController::responsive(SessionMode::Publish);
    session_test_utils::settle(&handle).await;

    handle.shutdown().await;

    assert!(mock.stops().is_empty());
    assert_eq!(mock.close_count(), 1);
}

// ============================================================================
// Reconciliation Properties
// ============================================================================

#[tokio::test]
async fn test_identical_intent_issues_no_extra_commands() {
    let t = TestController::responsive(SessionMode::Publish);

    t.handle.set_intent(true, "s1");
    t.handle.set_intent(true, "s1");
    t.settle().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;

    assert_eq!(t.mock.starts(), vec!["s1"]);
    assert!(t.mock.stops().is_empty());
    assert_eq!(t.observer.updates().len(), 1);
}

#[tokio::test]
async fn test_at_most_one_session_outstanding() {
    let t = TestController::responsive(SessionMode::Publish);
    let intents = [
        (true, "s1"),
        (true, "s2"),
        (false, "s2"),
        (true, "s3"),
        (true, "s1"),
        (false, "s1"),
        (true, "s2"),
    ];
    t.settle().await;

    for (active, target) in intents {
        t.handle.set_intent(active, target);
    }
    let status = t.settle().await;

    let mut outstanding = 0_i32;
    for call in t.mock.calls() {
        match call {
            AdaptorCall::StartPublish(_) | AdaptorCall::StartPlay(_) => outstanding += 1,
            AdaptorCall::Stop(_) => outstanding -= 1,
            _ => {}
        }
        assert!((0..=1).contains(&outstanding), "calls: {:?}", t.mock.calls());
    }

    // Latest intent wins
    assert_eq!(status.phase, Phase::Active);
    assert_eq!(status.active_id.as_deref(), Some("s2"));
    assert_eq!(t.observer.last_update().unwrap().stream_id.as_deref(), Some("s2"));
}

#[tokio::test]
async fn test_retarget_while_live_switches_stream() {
    let t = TestController::responsive(SessionMode::Play);
    t.handle.set_intent(true, "s1");
    t.settle().await;

    t.handle.set_intent(true, "s2");
    let status = t.settle().await;

    assert_eq!(status.active_id.as_deref(), Some("s2"));
    assert_eq!(t.mock.starts(), vec!["s1", "s2"]);
    assert_eq!(t.mock.stops(), vec!["s1"]);
    assert_eq!(
        t.observer.transitions(),
        vec![
            (true, Some("s1".to_string())),
            (false, Some("s1".to_string())),
            (true, Some("s2".to_string())),
        ]
    );
}

// ============================================================================
// Error Handling
// ============================================================================

#[tokio::test]
async fn test_failure_while_connecting_requires_new_intent() {
    let t = TestController::manual(SessionMode::Publish);
    t.connect().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;

    t.mock
        .error("notSetRemoteDescription", "negotiation failed", Some("s1"));
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Errored);
    assert_eq!(status.label(), "error: negotiation failed");
    assert_eq!(t.observer.transitions(), vec![(false, None)]);

    // Same intent again does not retry
    t.handle.set_intent(true, "s1");
    t.settle().await;
    assert_eq!(t.mock.starts(), vec!["s1"]);

    // A fresh intent does, and clears the error
    t.handle.set_intent(false, "s1");
    t.handle.set_intent(true, "s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert_eq!(status.last_error, None);
    assert_eq!(t.mock.starts(), vec!["s1", "s1"]);
}

#[tokio::test]
async fn test_every_error_reaches_the_observer_once() {
    let t = TestController::manual(SessionMode::Play);
    t.connect().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;
    t.mock.started("s1");
    t.settle().await;
    let before = t.observer.callback_count();

    // Error for a stream this controller no longer tracks
    t.mock.error("publishTimeoutError", "timed out", Some("old"));
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Active);
    assert_eq!(t.observer.callback_count(), before + 1);
    assert_eq!(t.observer.diagnostics_of("stale_event").len(), 1);

    // Error for the live session
    t.mock.error("WebSocketNotConnected", "socket closed", Some("s1"));
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Errored);
    assert_eq!(t.observer.callback_count(), before + 2);
    assert_eq!(
        t.observer.last_update().unwrap().error.unwrap().code,
        ErrorCode::Transport
    );
}

#[tokio::test]
async fn test_remote_end_latches_until_intent_changes() {
    let t = TestController::responsive(SessionMode::Publish);
    t.handle.set_intent(true, "s1");
    t.settle().await;

    t.mock.ended("s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Idle);
    assert_eq!(t.mock.starts(), vec!["s1"]);

    t.handle.set_intent(true, "s2");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Active);
    assert_eq!(t.mock.starts(), vec!["s1", "s2"]);
}

#[tokio::test]
async fn test_disconnect_resets_and_reinitialize_resumes() {
    let t = TestController::manual(SessionMode::Publish);
    t.connect().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;
    t.mock.started("s1");
    t.settle().await;

    t.mock.disconnected();
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Idle);
    assert_eq!(status.label(), "disconnected");
    assert!(t.mock.stops().is_empty());
    assert_eq!(
        t.observer.transitions().last(),
        Some(&(false, Some("s1".to_string())))
    );

    t.mock.initialized();
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert_eq!(t.mock.starts(), vec!["s1", "s1"]);
}

#[tokio::test]
async fn test_start_completing_after_disconnect_and_retarget_is_discarded() {
    let t = TestController::manual(SessionMode::Publish);
    t.connect().await;
    t.handle.set_intent(true, "s1");
    t.settle().await;

    t.mock.disconnected();
    t.handle.set_intent(true, "s2");
    t.settle().await;
    t.mock.initialized();
    t.settle().await;
    assert_eq!(t.mock.starts(), vec!["s1", "s2"]);

    t.mock.started("s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Connecting);
    assert_eq!(status.active_id, None);
    assert!(t.observer.updates().is_empty());
    assert_eq!(t.observer.diagnostics_of("stale_event").len(), 1);

    t.mock.started("s2");
    let status = t.settle().await;
    assert_eq!(status.active_id.as_deref(), Some("s2"));
    assert_eq!(t.observer.transitions(), vec![(true, Some("s2".to_string()))]);

    t.handle.set_intent(false, "s2");
    t.settle().await;
    assert_eq!(t.mock.stops(), vec!["s2"]);
}

#[tokio::test]
async fn test_empty_target_is_reported_not_started() {
    let t = TestController::responsive(SessionMode::Play);

    t.handle.set_intent(true, "");
    let status = t.settle().await;

    assert_eq!(status.phase, Phase::Idle);
    assert!(t.mock.starts().is_empty());
    assert_eq!(t.observer.diagnostics_of("missing_target_id").len(), 1);
}

#[tokio::test]
async fn test_assigned_stream_id_is_trusted() {
    let t = TestController::spawn(
        SessionMode::Publish,
        MockAdaptor::builder()
            .initialize_on_connect()
            .assign_ids_with_suffix("-7")
            .auto_end(),
    );

    t.handle.set_intent(true, "s1");
    let status = t.settle().await;
    assert_eq!(status.active_id.as_deref(), Some("s1-7"));
    assert_eq!(
        t.observer.diagnostics_of("stream_id_mismatch"),
        vec![Diagnostic::StreamIdMismatch {
            requested: "s1".to_string(),
            assigned: "s1-7".to_string(),
        }]
    );

    t.handle.set_intent(false, "s1");
    let status = t.settle().await;
    assert_eq!(status.phase, Phase::Idle);
    assert_eq!(t.mock.stops(), vec!["s1-7"]);
    assert_eq!(
        t.observer.transitions(),
        vec![
            (true, Some("s1-7".to_string())),
            (false, Some("s1-7".to_string())),
        ]
    );
}
