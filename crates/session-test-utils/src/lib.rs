//! # Session Test Utilities
//!
//! Shared test utilities for the media session controller.
//!
//! This crate provides a mock signaling adaptor, a recording observer, and
//! fixtures for driving a controller without a media server.
//!
//! ## Modules
//!
//! - `mock_adaptor` - Mock signaling adaptor with event injection
//! - `recording_observer` - Observer that records status and diagnostics
//! - `fixtures` - Test configuration and spawn/settle helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use session_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let t = TestController::responsive(SessionMode::Publish);
//!     t.handle.set_intent(true, "s1");
//!
//!     let status = t.settle().await;
//!     assert_eq!(status.phase, Phase::Active);
//!     assert_eq!(t.observer.transitions(), vec![(true, Some("s1".into()))]);
//! }
//! ```
//!
//! ### Driving Events by Hand
//!
//! ```rust,ignore
//! let t = TestController::manual(SessionMode::Play);
//! t.mock.initialized();
//! t.handle.set_intent(true, "s1");
//! t.settle().await;
//!
//! t.mock.error("no_stream_exist", "no stream", Some("s1"));
//! let status = t.settle().await;
//! assert_eq!(status.phase, Phase::Idle);
//! ```

pub mod fixtures;
pub mod mock_adaptor;
pub mod recording_observer;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_adaptor::*;
pub use recording_observer::*;
