//! Actor implementation for the session controller.
//!
//! One `SessionControllerActor` per media session (publish or play):
//!
//! ```text
//! SessionControllerHandle (caller side: set_intent, dispose, status)
//! └── SessionControllerActor (tokio task)
//!     ├── owns SessionMachine (pure state transitions)
//!     ├── owns the SignalingAdaptor (commands out)
//!     └── drains one mailbox: intents + adaptor events, in arrival order
//! ```
//!
//! Publish and play controllers are independent; neither observes the
//! other's state.

pub mod controller;
pub mod messages;

pub use controller::{SessionControllerActor, SessionControllerHandle};
pub use messages::ControllerMessage;
