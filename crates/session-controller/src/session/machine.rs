//! Reconciliation state machine.
//!
//! [`SessionMachine`] owns the [`SessionState`] of one controller. It consumes
//! intent changes and adaptor events in arrival order and returns the ordered
//! [`Effect`]s the actor must carry out. It performs no I/O itself.
//!
//! After every input the machine reconciles: start when the intent is active,
//! the phase is `Idle`/`Errored` and the channel is connected; stop when the
//! phase is `Active` and the intent no longer wants the bound session.
//! In-flight phases (`Connecting`, `Stopping`) never issue commands; the
//! latest intent is picked up once they resolve.
//!
//! # No automatic retry
//!
//! Each intent change bumps a generation. A start records the generation it
//! was issued under. When that session ends remotely or fails and the intent
//! has not changed since, the generation is latched and no further start is
//! issued until the caller supplies a different intent.

use crate::adaptor::AdaptorEvent;
use crate::observer::{Diagnostic, StatusUpdate};
use crate::session::{
    ConnectionState, ErrorClass, ErrorInfo, Phase, SessionIntent, SessionMode, SessionState,
    StatusSnapshot,
};
use tracing::{debug, warn};

/// Command to issue on the signaling adaptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartPublish(String),
    StartPlay(String),
    Stop(String),
}

impl Command {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Command::StartPublish(_) => "start_publish",
            Command::StartPlay(_) => "start_play",
            Command::Stop(_) => "stop",
        }
    }

    #[must_use]
    pub fn stream_id(&self) -> &str {
        match self {
            Command::StartPublish(id) | Command::StartPlay(id) | Command::Stop(id) => id,
        }
    }
}

/// Output of a machine step, applied by the actor in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Command(Command),
    Notify(StatusUpdate),
    Diagnostic(Diagnostic),
    Transition { from: Phase, to: Phase },
}

/// Reconciles a [`SessionIntent`] against adaptor-reported state.
#[derive(Debug)]
pub struct SessionMachine {
    mode: SessionMode,
    intent: SessionIntent,
    state: SessionState,
    connection: ConnectionState,
    /// Target of the outstanding or bound session.
    requested_id: Option<String>,
    /// Whether the observer was told the current session is active.
    announced: bool,
    intent_generation: u64,
    start_generation: u64,
    latched_generation: Option<u64>,
    starts_issued: u64,
    /// Targets whose start was dropped by a disconnect or error without a
    /// terminal event. A late `started` for one of these is stale.
    abandoned: Vec<String>,
    disposed: bool,
}

/// Oldest abandoned targets are forgotten past this many.
const ABANDONED_LIMIT: usize = 8;

impl SessionMachine {
    #[must_use]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            intent: SessionIntent::default(),
            state: SessionState::default(),
            connection: ConnectionState::Disconnected,
            requested_id: None,
            announced: false,
            intent_generation: 0,
            start_generation: 0,
            latched_generation: None,
            starts_issued: 0,
            abandoned: Vec::new(),
            disposed: false,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    #[must_use]
    pub fn intent(&self) -> &SessionIntent {
        &self.intent
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of start commands issued over the machine's lifetime.
    #[must_use]
    pub fn starts_issued(&self) -> u64 {
        self.starts_issued
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.mode,
            phase: self.state.phase,
            active_id: self.state.active_id.clone(),
            last_error: self.state.last_error.clone(),
            connection: self.connection,
            intent: self.intent.clone(),
        }
    }

    /// Replace the intent. Identical intents are ignored.
    pub fn set_intent(&mut self, intent: SessionIntent) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.disposed || intent == self.intent {
            return effects;
        }

        debug!(
            target: "session.machine",
            mode = %self.mode,
            active = intent.active,
            target_id = %intent.target_id,
            phase = %self.state.phase,
            "Intent changed"
        );

        self.intent = intent;
        self.intent_generation += 1;
        self.latched_generation = None;
        self.reconcile(&mut effects);
        effects
    }

    /// Apply one adaptor event.
    pub fn handle_event(&mut self, event: AdaptorEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.disposed {
            return effects;
        }

        match event {
            AdaptorEvent::Initialized => self.on_initialized(&mut effects),
            AdaptorEvent::Disconnected => self.on_disconnected(&mut effects),
            AdaptorEvent::Started { stream_id } => self.on_started(stream_id, &mut effects),
            AdaptorEvent::Ended { stream_id } => self.on_ended(stream_id, &mut effects),
            AdaptorEvent::Error { error, stream_id } => {
                self.on_error(error, stream_id, &mut effects);
            }
        }

        self.reconcile(&mut effects);
        effects
    }

    /// Final step before the adaptor is released. Runs once; afterwards every
    /// input is ignored.
    ///
    /// A stop is issued for any outstanding or bound session regardless of
    /// phase. No observer notifications are produced.
    pub fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.disposed {
            return effects;
        }
        self.disposed = true;

        if self.state.phase.is_live() {
            let stream_id = self
                .state
                .active_id
                .clone()
                .or_else(|| self.requested_id.clone());
            if let Some(stream_id) = stream_id {
                effects.push(Effect::Command(Command::Stop(stream_id)));
            }
        }

        effects
    }

    fn on_initialized(&mut self, effects: &mut Vec<Effect>) {
        if self.connection == ConnectionState::Connected {
            debug!(target: "session.machine", mode = %self.mode, "Duplicate initialized event");
            return;
        }
        self.connection = ConnectionState::Connected;
        effects.push(Effect::Diagnostic(Diagnostic::Connected));
    }

    fn on_disconnected(&mut self, effects: &mut Vec<Effect>) {
        let was_connected = self.connection == ConnectionState::Connected;
        self.connection = ConnectionState::Disconnected;

        if self.state.phase != Phase::Idle {
            let last_id = self.state.active_id.take();
            let requested = self.requested_id.take();
            self.abandon(requested);
            self.abandon(last_id.clone());
            self.transition(Phase::Idle, effects);
            if self.announced {
                self.announced = false;
                effects.push(Effect::Notify(StatusUpdate {
                    is_active: false,
                    stream_id: last_id,
                    phase: Phase::Idle,
                    error: None,
                }));
            }
        }

        if was_connected {
            effects.push(Effect::Diagnostic(Diagnostic::Disconnected));
        }
    }

    fn on_started(&mut self, stream_id: Option<String>, effects: &mut Vec<Effect>) {
        if self.state.phase != Phase::Connecting || self.is_abandoned(&stream_id) {
            self.stale("started", stream_id, None, effects);
            return;
        }

        let requested = self.requested_id.clone().unwrap_or_default();
        let bound = stream_id.unwrap_or_else(|| requested.clone());
        if bound != requested {
            warn!(
                target: "session.machine",
                mode = %self.mode,
                requested = %requested,
                assigned = %bound,
                "Adaptor bound a different stream id than requested"
            );
            effects.push(Effect::Diagnostic(Diagnostic::StreamIdMismatch {
                requested,
                assigned: bound.clone(),
            }));
        }

        self.state.active_id = Some(bound.clone());
        self.transition(Phase::Active, effects);

        if self.wants_stop() {
            // Superseded while connecting: stop before announcing.
            self.issue_stop(bound, effects);
        } else {
            self.announced = true;
            effects.push(Effect::Notify(StatusUpdate {
                is_active: true,
                stream_id: Some(bound),
                phase: Phase::Active,
                error: None,
            }));
        }
    }

    fn on_ended(&mut self, stream_id: Option<String>, effects: &mut Vec<Effect>) {
        let phase = self.state.phase;
        if !matches!(phase, Phase::Active | Phase::Stopping) || !self.matches_session(&stream_id) {
            self.stale("ended", stream_id, None, effects);
            return;
        }

        let last_id = self.state.active_id.take();
        self.requested_id = None;
        if phase == Phase::Active {
            // Ended remotely, not by our own stop.
            self.latch_if_unchanged();
        }
        self.transition(Phase::Idle, effects);

        if self.announced {
            self.announced = false;
            effects.push(Effect::Notify(StatusUpdate {
                is_active: false,
                stream_id: last_id,
                phase: Phase::Idle,
                error: None,
            }));
        }
    }

    fn on_error(&mut self, error: ErrorInfo, stream_id: Option<String>, effects: &mut Vec<Effect>) {
        let phase = self.state.phase;
        if !phase.is_live() || !self.matches_session(&stream_id) {
            self.stale("error", stream_id, Some(error), effects);
            return;
        }

        warn!(
            target: "session.machine",
            mode = %self.mode,
            phase = %phase,
            code = %error.code,
            message = %error.message,
            "Adaptor reported an error"
        );

        let last_id = self.state.active_id.take();
        let requested = self.requested_id.take();
        self.abandon(requested);
        self.abandon(last_id.clone());
        self.announced = false;
        self.state.last_error = Some(error.clone());

        let next = match (phase, error.class()) {
            (Phase::Stopping, _) | (_, ErrorClass::SessionEnded) => Phase::Idle,
            (_, ErrorClass::Failure) => Phase::Errored,
        };
        if phase != Phase::Stopping {
            self.latch_if_unchanged();
        }
        self.transition(next, effects);

        effects.push(Effect::Notify(StatusUpdate {
            is_active: false,
            stream_id: last_id,
            phase: next,
            error: Some(error),
        }));
    }

    fn reconcile(&mut self, effects: &mut Vec<Effect>) {
        match self.state.phase {
            Phase::Idle | Phase::Errored => {
                if !self.intent.active
                    || self.connection != ConnectionState::Connected
                    || self.latched_generation == Some(self.intent_generation)
                {
                    return;
                }
                if self.intent.target_id.is_empty() {
                    warn!(target: "session.machine", mode = %self.mode, "Active intent without a target id");
                    self.latched_generation = Some(self.intent_generation);
                    effects.push(Effect::Diagnostic(Diagnostic::MissingTargetId));
                    return;
                }
                self.issue_start(effects);
            }
            Phase::Active => {
                if self.wants_stop() {
                    if let Some(active_id) = self.state.active_id.clone() {
                        self.issue_stop(active_id, effects);
                    }
                }
            }
            Phase::Connecting | Phase::Stopping => {}
        }
    }

    fn issue_start(&mut self, effects: &mut Vec<Effect>) {
        let target = self.intent.target_id.clone();
        self.abandoned.retain(|id| *id != target);
        self.requested_id = Some(target.clone());
        self.start_generation = self.intent_generation;
        self.starts_issued += 1;
        self.state.last_error = None;
        self.transition(Phase::Connecting, effects);

        let command = match self.mode {
            SessionMode::Publish => Command::StartPublish(target),
            SessionMode::Play => Command::StartPlay(target),
        };
        effects.push(Effect::Command(command));
    }

    fn issue_stop(&mut self, stream_id: String, effects: &mut Vec<Effect>) {
        self.transition(Phase::Stopping, effects);
        effects.push(Effect::Command(Command::Stop(stream_id)));
    }

    /// Whether the bound session no longer matches the intent.
    fn wants_stop(&self) -> bool {
        !self.intent.active || self.requested_id.as_deref() != Some(self.intent.target_id.as_str())
    }

    /// An event without a stream id refers to the current session.
    fn matches_session(&self, stream_id: &Option<String>) -> bool {
        match stream_id {
            None => true,
            Some(id) => {
                self.state.active_id.as_ref() == Some(id) || self.requested_id.as_ref() == Some(id)
            }
        }
    }

    /// A `started` for a dropped target that is not the current request.
    fn is_abandoned(&self, stream_id: &Option<String>) -> bool {
        match stream_id {
            Some(id) => self.requested_id.as_ref() != Some(id) && self.abandoned.contains(id),
            None => false,
        }
    }

    fn abandon(&mut self, stream_id: Option<String>) {
        let Some(stream_id) = stream_id else { return };
        if self.abandoned.contains(&stream_id) {
            return;
        }
        self.abandoned.push(stream_id);
        if self.abandoned.len() > ABANDONED_LIMIT {
            self.abandoned.remove(0);
        }
    }

    fn latch_if_unchanged(&mut self) {
        if self.intent.active && self.start_generation == self.intent_generation {
            self.latched_generation = Some(self.intent_generation);
        }
    }

    fn stale(
        &self,
        event: &'static str,
        stream_id: Option<String>,
        error: Option<ErrorInfo>,
        effects: &mut Vec<Effect>,
    ) {
        debug!(
            target: "session.machine",
            mode = %self.mode,
            event = event,
            phase = %self.state.phase,
            stream_id = ?stream_id,
            "Discarding stale adaptor event"
        );
        effects.push(Effect::Diagnostic(Diagnostic::StaleEvent {
            event,
            phase: self.state.phase,
            stream_id,
            error,
        }));
    }

    fn transition(&mut self, to: Phase, effects: &mut Vec<Effect>) {
        let from = self.state.phase;
        if !from.can_transition(to) {
            warn!(
                target: "session.machine",
                mode = %self.mode,
                from = %from,
                to = %to,
                "Unexpected phase transition"
            );
        }
        self.state.phase = to;
        effects.push(Effect::Transition { from, to });
    }
}
