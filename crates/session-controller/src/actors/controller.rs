//! `SessionControllerActor` - one media session per actor.
//!
//! Each `SessionControllerActor`:
//! - Owns exactly one signaling adaptor instance and one video sink binding
//! - Owns the `SessionMachine`; nothing else mutates session state
//! - Drains a single mailbox carrying caller intents and adaptor events
//! - Reports status transitions to the caller's observer
//!
//! # Lifecycle
//!
//! 1. Spawned by `SessionControllerHandle::spawn`; connects the adaptor
//! 2. Runs until `dispose()` cancels it or every handle is dropped
//! 3. Teardown issues a final best-effort stop (if a session is live)
//!    and closes the adaptor, exactly once

use crate::adaptor::{ConnectParams, EventSink, SignalingAdaptor, VideoSink};
use crate::config::Config;
use crate::errors::SessionError;
use crate::observability::metrics;
use crate::observer::{Diagnostic, StatusObserver};
use crate::session::machine::{Command, Effect, SessionMachine};
use crate::session::{SessionIntent, SessionMode, StatusSnapshot};

use super::messages::ControllerMessage;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Caller-facing handle to a `SessionControllerActor`.
///
/// `set_intent` and `dispose` never block and never fail; failures are
/// reported through the observer. Dropping the handle disposes the
/// controller.
#[derive(Debug)]
pub struct SessionControllerHandle {
    sender: mpsc::UnboundedSender<ControllerMessage>,
    cancel_token: CancellationToken,
    controller_id: String,
    mode: SessionMode,
    task: Option<JoinHandle<()>>,
}

impl SessionControllerHandle {
    /// Spawn a controller for `mode` driving `adaptor`, rendering into `sink`
    /// and reporting to `observer`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<A, O>(
        mode: SessionMode,
        sink: VideoSink,
        observer: O,
        adaptor: A,
        config: &Config,
    ) -> Self
    where
        A: SignalingAdaptor,
        O: StatusObserver,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let controller_id = format!("{}-{}", config.controller_id, mode);

        let actor = SessionControllerActor {
            controller_id: controller_id.clone(),
            machine: SessionMachine::new(mode),
            adaptor: Box::new(adaptor),
            observer: Box::new(observer),
            receiver,
            cancel_token: cancel_token.clone(),
            mailbox_warn_depth: config.mailbox_warn_depth,
            messages_processed: 0,
        };

        let params = ConnectParams::new(mode, sink, config);
        let events = EventSink::new(sender.clone());
        let task = tokio::spawn(actor.run(params, events));

        Self {
            sender,
            cancel_token,
            controller_id,
            mode,
            task: Some(task),
        }
    }

    /// Get the controller ID.
    #[must_use]
    pub fn controller_id(&self) -> &str {
        &self.controller_id
    }

    /// Get the session mode.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Replace the desired state. May be called at any time; the latest
    /// intent wins. A no-op after `dispose`.
    pub fn set_intent(&self, active: bool, target_id: impl Into<String>) {
        let intent = SessionIntent {
            active,
            target_id: target_id.into(),
        };

        if self.is_disposed() {
            warn!(
                target: "session.actor.controller",
                controller_id = %self.controller_id,
                active = intent.active,
                target_id = %intent.target_id,
                "set_intent called after dispose, ignoring"
            );
            return;
        }

        if self
            .sender
            .send(ControllerMessage::SetIntent { intent })
            .is_err()
        {
            warn!(
                target: "session.actor.controller",
                controller_id = %self.controller_id,
                "Controller task gone, dropping intent"
            );
        }
    }

    /// Tear the controller down. Idempotent.
    pub fn dispose(&self) {
        if self.is_disposed() {
            debug!(
                target: "session.actor.controller",
                controller_id = %self.controller_id,
                "Controller already disposed"
            );
            return;
        }
        debug!(
            target: "session.actor.controller",
            controller_id = %self.controller_id,
            "Disposing controller"
        );
        self.cancel_token.cancel();
    }

    /// Check if the controller was disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a snapshot of the controller state.
    ///
    /// Answered after every message queued before it has been processed.
    pub async fn status(&self) -> Result<StatusSnapshot, SessionError> {
        if self.is_disposed() {
            return Err(SessionError::Disposed);
        }

        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ControllerMessage::GetStatus { respond_to: tx })
            .map_err(|e| SessionError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| SessionError::Internal(format!("response receive failed: {e}")))
    }

    /// Dispose and wait for teardown to complete.
    pub async fn shutdown(mut self) {
        self.dispose();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(
                    target: "session.actor.controller",
                    controller_id = %self.controller_id,
                    error = %e,
                    "Controller task failed"
                );
            }
        }
    }
}

impl Drop for SessionControllerHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// The `SessionControllerActor` implementation.
pub struct SessionControllerActor {
    /// Controller ID (for logs).
    controller_id: String,
    /// Session state machine.
    machine: SessionMachine,
    /// The adaptor this controller owns.
    adaptor: Box<dyn SignalingAdaptor>,
    /// Caller-supplied observer.
    observer: Box<dyn StatusObserver>,
    /// Mailbox receiver.
    receiver: mpsc::UnboundedReceiver<ControllerMessage>,
    /// Cancellation token (dispose).
    cancel_token: CancellationToken,
    /// Queue depth above which a warning is logged.
    mailbox_warn_depth: usize,
    /// Total messages processed.
    messages_processed: u64,
}

impl SessionControllerActor {
    /// Run the actor message loop.
    #[instrument(
        skip_all,
        name = "session.actor.controller",
        fields(controller_id = %self.controller_id, mode = %self.machine.mode())
    )]
    async fn run(mut self, params: ConnectParams, events: EventSink) {
        let mode = self.machine.mode();
        info!(
            target: "session.actor.controller",
            controller_id = %self.controller_id,
            mode = %mode,
            sink = params.sink.as_str(),
            ice_servers = params.ice_servers.len(),
            "SessionControllerActor started"
        );
        metrics::increment_controllers_active(mode);

        // Disconnected until the adaptor reports `initialized`
        self.observer.on_diagnostic(mode, &Diagnostic::Disconnected);
        self.adaptor.connect(&params, events);

        loop {
            tokio::select! {
                biased;

                // Handle dispose
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "session.actor.controller",
                        controller_id = %self.controller_id,
                        "SessionControllerActor received dispose signal"
                    );
                    break;
                }

                // Handle messages
                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => self.handle_message(message),
                        None => {
                            debug!(
                                target: "session.actor.controller",
                                controller_id = %self.controller_id,
                                "SessionControllerActor channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.teardown();
        metrics::decrement_controllers_active(mode);

        info!(
            target: "session.actor.controller",
            controller_id = %self.controller_id,
            messages_processed = self.messages_processed,
            "SessionControllerActor stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: ControllerMessage) {
        self.messages_processed += 1;

        let depth = self.receiver.len();
        metrics::set_mailbox_depth(self.machine.mode(), depth);
        if depth > self.mailbox_warn_depth {
            warn!(
                target: "session.actor.controller",
                controller_id = %self.controller_id,
                depth = depth,
                threshold = self.mailbox_warn_depth,
                "Mailbox depth above threshold"
            );
        }

        match message {
            ControllerMessage::SetIntent { intent } => {
                let effects = self.machine.set_intent(intent);
                self.apply(effects);
            }

            ControllerMessage::Adaptor(event) => {
                debug!(
                    target: "session.actor.controller",
                    controller_id = %self.controller_id,
                    event = event.as_str(),
                    phase = %self.machine.phase(),
                    "Adaptor event"
                );
                let effects = self.machine.handle_event(event);
                self.apply(effects);
            }

            ControllerMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.machine.snapshot());
            }
        }
    }

    /// Carry out machine effects in order.
    fn apply(&mut self, effects: Vec<Effect>) {
        let mode = self.machine.mode();
        for effect in effects {
            match effect {
                Effect::Command(command) => self.issue(&command),

                Effect::Notify(update) => {
                    info!(
                        target: "session.actor.controller",
                        controller_id = %self.controller_id,
                        is_active = update.is_active,
                        stream_id = ?update.stream_id,
                        error = ?update.error.as_ref().map(ToString::to_string),
                        "Status update"
                    );
                    if let Some(error) = &update.error {
                        metrics::record_adaptor_error(mode, error.class());
                    }
                    self.observer.on_status_update(&update);
                }

                Effect::Diagnostic(diagnostic) => {
                    debug!(
                        target: "session.actor.controller",
                        controller_id = %self.controller_id,
                        diagnostic = diagnostic.as_str(),
                        "Diagnostic"
                    );
                    if let Diagnostic::StaleEvent { .. } = diagnostic {
                        metrics::record_stale_event(mode);
                    }
                    self.observer.on_diagnostic(mode, &diagnostic);
                }

                Effect::Transition { from, to } => {
                    debug!(
                        target: "session.actor.controller",
                        controller_id = %self.controller_id,
                        from = %from,
                        to = %to,
                        "Phase transition"
                    );
                    metrics::record_transition(mode, from, to);
                }
            }
        }
    }

    /// Issue a command on the adaptor. Fire-and-forget.
    fn issue(&mut self, command: &Command) {
        info!(
            target: "session.actor.controller",
            controller_id = %self.controller_id,
            command = command.as_str(),
            stream_id = command.stream_id(),
            "Issuing adaptor command"
        );
        metrics::record_command(self.machine.mode(), command.as_str());

        match command {
            Command::StartPublish(id) => self.adaptor.start_publish(id),
            Command::StartPlay(id) => self.adaptor.start_play(id),
            Command::Stop(id) => self.adaptor.stop(id),
        }
    }

    /// Final stop (if any) and adaptor release. Observers hear nothing.
    fn teardown(&mut self) {
        for effect in self.machine.teardown() {
            if let Effect::Command(command) = effect {
                self.issue(&command);
            }
        }
        self.adaptor.close();
    }
}
