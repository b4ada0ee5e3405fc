//! In-process loopback media server.
//!
//! [`LoopbackServer`] simulates the media server's signaling behaviour
//! without any network I/O, and hands out one [`LoopbackAdaptor`] per
//! controller. Publishing registers a live stream; playing an unknown
//! stream fails with `no_stream_exist`; stopping a publication ends every
//! player attached to it.
//!
//! All events are queued on the controllers' mailboxes, never delivered
//! re-entrantly from inside a command.

use super::{AdaptorEvent, ConnectParams, EventSink, SignalingAdaptor};
use crate::session::{ErrorCode, ErrorInfo};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

type ClientId = u64;

#[derive(Debug)]
struct Publication {
    owner: ClientId,
    /// Id the publisher asked for; differs from the key under assigned ids.
    requested: String,
}

#[derive(Debug, Default)]
struct ServerState {
    online: bool,
    assign_ids: bool,
    next_client: ClientId,
    next_assigned: u64,
    clients: HashMap<ClientId, EventSink>,
    /// Bound stream id -> publication.
    publishers: HashMap<String, Publication>,
    /// Stream id -> playing clients. Never holds an empty list.
    players: HashMap<String, Vec<ClientId>>,
}

impl ServerState {
    /// Whether `stream_id` is live, as a bound id or as the requested id of
    /// an assigned publication.
    fn is_published(&self, stream_id: &str) -> bool {
        self.publishers
            .iter()
            .any(|(bound, publication)| bound == stream_id || publication.requested == stream_id)
    }

    fn emit(&self, client: ClientId, event: AdaptorEvent) {
        if let Some(sink) = self.clients.get(&client) {
            sink.emit(event);
        }
    }

    fn error(&self, client: ClientId, code: &str, message: &str, stream_id: Option<&str>) {
        self.emit(
            client,
            AdaptorEvent::Error {
                error: ErrorInfo::new(ErrorCode::from_code(code), message),
                stream_id: stream_id.map(str::to_string),
            },
        );
    }

    /// End a publication and every player attached to it.
    fn end_publication(&mut self, stream_id: &str) -> Option<ClientId> {
        let publisher = self.publishers.remove(stream_id)?.owner;
        for player in self.players.remove(stream_id).unwrap_or_default() {
            self.emit(
                player,
                AdaptorEvent::Ended {
                    stream_id: Some(stream_id.to_string()),
                },
            );
        }
        Some(publisher)
    }
}

/// Shared loopback media server. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopbackServer {
    inner: Arc<Mutex<ServerState>>,
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackServer {
    /// A reachable server. Adaptors are initialized as soon as they connect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServerState {
                online: true,
                ..ServerState::default()
            })),
        }
    }

    /// An unreachable server. Adaptors stay disconnected until
    /// [`bring_online`](Self::bring_online).
    #[must_use]
    pub fn offline() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Bind server-assigned ids (`<requested>-<n>`) on publish.
    #[must_use]
    pub fn with_assigned_ids(self) -> Self {
        self.lock().assign_ids = true;
        self
    }

    /// Create an adaptor bound to this server.
    #[must_use]
    pub fn adaptor(&self) -> LoopbackAdaptor {
        LoopbackAdaptor {
            server: self.clone(),
            client: None,
        }
    }

    /// Make the server reachable and initialize every connected adaptor.
    pub fn bring_online(&self) {
        let mut state = self.lock();
        if state.online {
            return;
        }
        state.online = true;
        info!(target: "session.adaptor", clients = state.clients.len(), "Loopback server online");
        for sink in state.clients.values() {
            sink.emit(AdaptorEvent::Initialized);
        }
    }

    /// Drop every control channel and live stream.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.online = false;
        state.publishers.clear();
        state.players.clear();
        info!(target: "session.adaptor", clients = state.clients.len(), "Loopback server shut down");
        for sink in state.clients.values() {
            sink.emit(AdaptorEvent::Disconnected);
        }
    }

    /// End a publication from the server side. Returns `false` if the
    /// stream was not live.
    pub fn end_stream(&self, stream_id: &str) -> bool {
        let mut state = self.lock();
        match state.end_publication(stream_id) {
            Some(publisher) => {
                state.emit(
                    publisher,
                    AdaptorEvent::Ended {
                        stream_id: Some(stream_id.to_string()),
                    },
                );
                true
            }
            None => false,
        }
    }

    /// Currently published stream ids, sorted.
    #[must_use]
    pub fn live_streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self.lock().publishers.keys().cloned().collect();
        streams.sort();
        streams
    }

    /// Number of adaptors playing `stream_id`.
    #[must_use]
    pub fn viewer_count(&self, stream_id: &str) -> usize {
        self.lock().players.get(stream_id).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// [`SignalingAdaptor`] backed by a [`LoopbackServer`].
#[derive(Debug)]
pub struct LoopbackAdaptor {
    server: LoopbackServer,
    client: Option<ClientId>,
}

impl LoopbackAdaptor {
    fn with_client(&self, f: impl FnOnce(&mut ServerState, ClientId)) {
        let Some(client) = self.client else {
            debug!(target: "session.adaptor", "Loopback command before connect");
            return;
        };
        let mut state = self.server.lock();
        if !state.online {
            state.error(client, "WebSocketNotConnected", "server unreachable", None);
            return;
        }
        f(&mut state, client);
    }
}

impl SignalingAdaptor for LoopbackAdaptor {
    fn connect(&mut self, params: &ConnectParams, events: EventSink) {
        let mut state = self.server.lock();
        let client = state.next_client;
        state.next_client += 1;
        state.clients.insert(client, events);
        self.client = Some(client);

        debug!(
            target: "session.adaptor",
            client = client,
            mode = %params.mode,
            sink = params.sink.as_str(),
            online = state.online,
            "Loopback adaptor connected"
        );
        if state.online {
            state.emit(client, AdaptorEvent::Initialized);
        }
    }

    fn start_publish(&mut self, stream_id: &str) {
        self.with_client(|state, client| {
            if state.is_published(stream_id) {
                state.error(client, "streamIdInUse", "stream id already published", Some(stream_id));
                return;
            }
            let bound = if state.assign_ids {
                state.next_assigned += 1;
                format!("{stream_id}-{}", state.next_assigned)
            } else {
                stream_id.to_string()
            };
            state.publishers.insert(
                bound.clone(),
                Publication {
                    owner: client,
                    requested: stream_id.to_string(),
                },
            );
            state.emit(
                client,
                AdaptorEvent::Started {
                    stream_id: Some(bound),
                },
            );
        });
    }

    fn start_play(&mut self, stream_id: &str) {
        self.with_client(|state, client| {
            if !state.publishers.contains_key(stream_id) {
                state.error(client, "no_stream_exist", "no stream exists", Some(stream_id));
                return;
            }
            state
                .players
                .entry(stream_id.to_string())
                .or_default()
                .push(client);
            state.emit(
                client,
                AdaptorEvent::Started {
                    stream_id: Some(stream_id.to_string()),
                },
            );
        });
    }

    fn stop(&mut self, stream_id: &str) {
        self.with_client(|state, client| {
            let ended = AdaptorEvent::Ended {
                stream_id: Some(stream_id.to_string()),
            };

            if state
                .publishers
                .get(stream_id)
                .is_some_and(|publication| publication.owner == client)
            {
                state.end_publication(stream_id);
                state.emit(client, ended);
                return;
            }

            if let Some(players) = state.players.get_mut(stream_id) {
                if let Some(pos) = players.iter().position(|p| *p == client) {
                    players.swap_remove(pos);
                    if players.is_empty() {
                        state.players.remove(stream_id);
                    }
                    state.emit(client, ended);
                    return;
                }
            }

            debug!(target: "session.adaptor", client = client, stream_id = stream_id, "Loopback stop for unknown session");
        });
    }

    fn close(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        let mut state = self.server.lock();

        let owned: Vec<String> = state
            .publishers
            .iter()
            .filter(|(_, publication)| publication.owner == client)
            .map(|(id, _)| id.clone())
            .collect();
        for stream_id in owned {
            state.end_publication(&stream_id);
        }
        state.players.retain(|_, players| {
            players.retain(|p| *p != client);
            !players.is_empty()
        });
        state.clients.remove(&client);

        debug!(target: "session.adaptor", client = client, "Loopback adaptor closed");
    }
}
