//! Media Session Controller Library
//!
//! Client-side lifecycle controller for live media sessions against a
//! WebRTC signaling server. A caller states what it wants (publish or play
//! stream `X`, or nothing) and the controller reconciles that intent with
//! what the signaling adaptor reports, asynchronously and without ever
//! leaving a session half-open.
//!
//! # Architecture
//!
//! ```text
//! caller ──set_intent──▶ SessionControllerHandle
//!                              │ mailbox (intents + adaptor events)
//!                              ▼
//!                     SessionControllerActor ──commands──▶ SignalingAdaptor
//!                              │                                 │
//!                              │◀──────────── events ────────────┘
//!                              ▼
//!                        StatusObserver
//! ```
//!
//! # Key Design Decisions
//!
//! - **Pure state machine**: `session::machine` turns inputs into ordered
//!   effects; the actor only carries them out
//! - **Single ordered mailbox**: intents and adaptor events are processed
//!   one at a time, so no transition interleaves with another
//! - **No automatic retry**: a failed or remotely ended session is not
//!   restarted until the caller changes the intent
//!
//! # Modules
//!
//! - [`session`] - Session model and state machine
//! - [`adaptor`] - Signaling adaptor boundary, callback bridge, loopback server
//! - [`actors`] - Controller actor and caller handle
//! - [`observer`] - Status notifications and diagnostics
//! - [`config`] - Configuration from environment
//! - [`errors`] - Error types with error codes
//! - [`observability`] - Metrics

pub mod actors;
pub mod adaptor;
pub mod config;
pub mod errors;
pub mod observability;
pub mod observer;
pub mod session;

pub use actors::SessionControllerHandle;
pub use adaptor::{AdaptorEvent, EventSink, SignalingAdaptor, VideoSink};
pub use config::Config;
pub use errors::SessionError;
pub use observer::{Diagnostic, StatusObserver, StatusUpdate};
pub use session::{Phase, SessionIntent, SessionMode, StatusSnapshot};
