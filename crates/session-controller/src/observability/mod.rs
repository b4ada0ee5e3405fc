//! Observability for the session controller.
//!
//! Logging goes through `tracing` (targets `session.actor.controller`,
//! `session.machine`, `session.adaptor`). Metrics go through the `metrics`
//! facade; the embedding application installs whichever recorder it wants.
//! Without a recorder every call is a no-op.
//!
//! # Privacy by Default
//!
//! Stream ids appear in logs but never in metric labels. Labels are bounded:
//! - `mode`: 2 values (publish, play)
//! - `command`: 3 values (start_publish, start_play, stop)
//! - `from`/`to`: 5 phases
//! - `class`: 2 values (session_ended, failure)
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `session_controllers_active` | Gauge | `mode` | Running controllers |
//! | `session_mailbox_depth` | Gauge | `mode` | Backpressure indicator |
//! | `session_commands_total` | Counter | `mode`, `command` | Adaptor commands issued |
//! | `session_transitions_total` | Counter | `mode`, `from`, `to` | Phase transitions |
//! | `session_adaptor_errors_total` | Counter | `mode`, `class` | Adaptor errors surfaced |
//! | `session_stale_events_total` | Counter | `mode` | Events dropped as stale |

pub mod metrics;
