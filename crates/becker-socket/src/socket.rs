//! Connection state machine and request/response correlator.
//!
//! The socket is in one of three states: disconnected, connecting, or
//! connected with a live session. Every connection attempt is tagged with
//! a generation number; transport events carry the generation they belong to,
//! and events from a superseded attempt or session are ignored. A session
//! owns the split websocket halves: the write half sits behind an async lock
//! used by the sender, the read half is driven by a dedicated reader task
//! that feeds the correlator.
//!
//! Correlation itself is a single slot: the one in-flight request parks a
//! oneshot sender under the session, and the reader completes it when a
//! response with the matching id arrives. Responses with any other id are
//! logged and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use becker_protocol::{self as protocol, CodecError, Command, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::config::SocketConfig;
use crate::error::SocketError;
use crate::transport::{self, WsStream};

/// Lifecycle notifications emitted by the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// A session is established; commands may be sent.
    Connected,
    /// The session, or the attempt to establish one, ended. `cause` is
    /// `None` only for a caller-initiated [`Socket::close`].
    Disconnected { cause: Option<String> },
}

type WsSink = SplitSink<WsStream, Message>;

/// Socket to the gateway's JSON-RPC service.
///
/// Cheap to clone; all clones share one connection. Lifecycle methods spawn
/// onto the ambient tokio runtime and must be called within one.
#[derive(Clone)]
pub struct Socket {
    shared: Arc<Shared>,
}

struct Shared {
    config: SocketConfig,
    state: Mutex<State>,
    /// Serializes senders so the transport sees one request at a time.
    send_gate: tokio::sync::Mutex<()>,
    /// Source of connection generations.
    generation: AtomicU64,
    events: mpsc::UnboundedSender<SocketEvent>,
}

enum State {
    Disconnected,
    Connecting {
        generation: u64,
        attempt: JoinHandle<()>,
    },
    Connected(Session),
}

impl State {
    fn generation(&self) -> Option<u64> {
        match self {
            State::Disconnected => None,
            State::Connecting { generation, .. } => Some(*generation),
            State::Connected(session) => Some(session.generation),
        }
    }
}

/// One live websocket session.
struct Session {
    generation: u64,
    sink: Arc<tokio::sync::Mutex<WsSink>>,
    reader: JoinHandle<()>,
    /// Next request id; strictly increasing, never reused within the session.
    next_id: i64,
    /// The single in-flight request awaiting its response.
    pending: Option<Pending>,
}

struct Pending {
    id: i64,
    tx: oneshot::Sender<Response>,
}

impl Socket {
    /// Creates a disconnected socket and the receiver its lifecycle events
    /// are delivered on.
    pub fn new(config: SocketConfig) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let socket = Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::Disconnected),
                send_gate: tokio::sync::Mutex::new(()),
                generation: AtomicU64::new(0),
                events,
            }),
        };
        (socket, rx)
    }

    /// Starts a connection attempt. Does nothing unless the socket is
    /// disconnected; the outcome arrives as a [`SocketEvent`].
    pub fn connect(&self) {
        let shared = Arc::clone(&self.shared);
        let mut state = self.shared.state.lock().unwrap();
        if !matches!(*state, State::Disconnected) {
            debug!("attempt to connect while connected or connecting");
            return;
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed);
        let endpoint = self.shared.config.endpoint();
        let connect_timeout = self.shared.config.connect_timeout;
        debug!(%endpoint, "connecting");

        let attempt = tokio::spawn(async move {
            match transport::open(&endpoint, connect_timeout).await {
                Ok(stream) => shared.on_opened(generation, stream),
                Err(e) => shared.teardown(Some(generation), Some(e.to_string())),
            }
        });
        *state = State::Connecting {
            generation,
            attempt,
        };
    }

    /// Closes the connection without a cause. Idempotent; a send blocked on
    /// its response is unblocked with a transport error.
    pub fn close(&self) {
        self.shared.teardown(None, None);
    }

    /// Closes the connection reporting an abnormal cause, so a supervising
    /// layer can schedule a reconnect.
    pub fn fail(&self, cause: impl Into<String>) {
        self.shared.teardown(None, Some(cause.into()));
    }

    /// Whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        matches!(*self.shared.state.lock().unwrap(), State::Connected(_))
    }

    /// Executes `command` and returns its typed result.
    ///
    /// Fails fast with [`SocketError::NotConnected`] when no session is
    /// live. At most one request is in flight at a time; concurrent callers
    /// wait their turn. A timeout leaves the session untouched, so the next
    /// send on the same session can still succeed.
    pub async fn send<C: Command>(&self, command: &C) -> Result<C::Output, SocketError> {
        let _gate = self.shared.send_gate.lock().await;
        debug!(%command, "sending command");

        let (generation, sink, bytes, id, rx) = {
            let mut state = self.shared.state.lock().unwrap();
            let State::Connected(session) = &mut *state else {
                debug!(%command, "attempt to send while disconnected");
                return Err(SocketError::NotConnected);
            };

            let id = session.next_id;
            session.next_id += 1;
            let bytes = protocol::encode_request(command, id).map_err(SocketError::Encode)?;

            // Replace any stale slot before transmitting so an old response
            // cannot satisfy this wait.
            let (tx, rx) = oneshot::channel();
            session.pending = Some(Pending { id, tx });

            (
                session.generation,
                Arc::clone(&session.sink),
                bytes,
                id,
                rx,
            )
        };

        trace!(id, "sending message");
        if let Err(e) = sink.lock().await.send(Message::Binary(bytes)).await {
            let cause = format!("send failed: {e}");
            self.shared.teardown(Some(generation), Some(cause.clone()));
            return Err(SocketError::Transport(cause));
        }

        trace!(id, "waiting for response");
        match tokio::time::timeout(self.shared.config.request_timeout, rx).await {
            Ok(Ok(response)) => match response.result {
                Some(result) => {
                    trace!(id, "completing command");
                    command.decode_result(result).map_err(SocketError::Decode)
                }
                None => {
                    let error = response
                        .error
                        .map(|body| body.to_string())
                        .unwrap_or_else(|| "response without result".into());
                    debug!(id, %error, "command failed");
                    Err(SocketError::Protocol(error))
                }
            },
            Ok(Err(_)) => Err(SocketError::Transport(
                "connection closed while waiting for response".into(),
            )),
            Err(_) => {
                debug!(id, "timeout waiting for response");
                self.shared.abandon(generation, id);
                Err(SocketError::Timeout)
            }
        }
    }
}

impl Shared {
    /// The transport reported an open connection for attempt `generation`.
    fn on_opened(self: &Arc<Self>, generation: u64, stream: WsStream) {
        let mut state = self.state.lock().unwrap();
        match &*state {
            State::Connecting {
                generation: current,
                ..
            } if *current == generation => {}
            State::Connected(_) => {
                debug!("dropping connection confirmation while connected");
                drop(state);
                close_stream(stream);
                return;
            }
            _ => {
                debug!("dropping stale connection confirmation");
                drop(state);
                close_stream(stream);
                return;
            }
        }

        debug!("connected");
        let (sink, source) = stream.split();
        let reader = tokio::spawn(read_loop(Arc::clone(self), generation, source));
        *state = State::Connected(Session {
            generation,
            sink: Arc::new(tokio::sync::Mutex::new(sink)),
            reader,
            next_id: 0,
            pending: None,
        });
        drop(state);

        let _ = self.events.send(SocketEvent::Connected);
    }

    /// Tears down the current attempt or session and emits exactly one
    /// `Disconnected` event. `generation` restricts the teardown to a
    /// specific connection; `None` means the caller closes whatever is live.
    fn teardown(&self, generation: Option<u64>, cause: Option<String>) {
        let previous = {
            let mut state = self.state.lock().unwrap();
            match (state.generation(), generation) {
                (None, _) => return, // already disconnected
                (Some(current), Some(expected)) if current != expected => {
                    debug!(current, expected, "ignoring teardown for stale connection");
                    return;
                }
                _ => {}
            }
            std::mem::replace(&mut *state, State::Disconnected)
        };

        match previous {
            State::Disconnected => {}
            State::Connecting { attempt, .. } => {
                debug!("cancelling connection attempt");
                attempt.abort();
            }
            State::Connected(session) => {
                debug!("closing connection");
                session.reader.abort();
                let sink = session.sink;
                tokio::spawn(async move {
                    let _ = sink.lock().await.close().await;
                });
                // Dropping `session.pending` here wakes a sender blocked on
                // its response.
            }
        }

        match &cause {
            Some(cause) => debug!(%cause, "disconnected"),
            None => debug!("disconnected"),
        }
        let _ = self.events.send(SocketEvent::Disconnected { cause });
    }

    /// Clears the pending slot for `id` if it is still the awaited request,
    /// after its waiter gave up.
    fn abandon(&self, generation: u64, id: i64) {
        let mut state = self.state.lock().unwrap();
        if let State::Connected(session) = &mut *state {
            if session.generation == generation
                && session.pending.as_ref().map(|p| p.id) == Some(id)
            {
                session.pending = None;
            }
        }
    }

    /// Routes one physical frame received on session `generation` to the
    /// correlator, one logical message at a time.
    fn on_frame(&self, generation: u64, frame: &[u8]) {
        for message in protocol::split_frame(frame) {
            match protocol::decode_response(message) {
                Ok(response) => self.on_response(generation, response),
                Err(CodecError::MissingId) => {
                    debug!(
                        message = %String::from_utf8_lossy(message),
                        "ignoring unexpected message"
                    );
                }
                Err(e) => {
                    warn!(
                        message = %String::from_utf8_lossy(message),
                        "ignoring invalid message: {e}"
                    );
                }
            }
        }
    }

    fn on_response(&self, generation: u64, response: Response) {
        let mut state = self.state.lock().unwrap();
        let State::Connected(session) = &mut *state else {
            debug!(id = response.id, "ignoring response while disconnected");
            return;
        };
        if session.generation != generation {
            debug!(id = response.id, "ignoring response from stale session");
            return;
        }

        if session.pending.as_ref().map(|p| p.id) == Some(response.id) {
            if let Some(pending) = session.pending.take() {
                let _ = pending.tx.send(response);
            }
        } else {
            debug!(id = response.id, "ignoring message with unexpected id");
        }
    }
}

/// Reader task for one session. Delivers inbound frames to the correlator
/// and tears the session down on error, close, or idle expiry.
async fn read_loop(shared: Arc<Shared>, generation: u64, mut source: SplitStream<WsStream>) {
    let idle_timeout = shared.config.idle_timeout;
    loop {
        let item = match tokio::time::timeout(idle_timeout, source.next()).await {
            Ok(item) => item,
            Err(_) => {
                shared.teardown(Some(generation), Some("idle timeout expired".into()));
                return;
            }
        };

        match item {
            Some(Ok(Message::Binary(data))) => shared.on_frame(generation, &data),
            Some(Ok(Message::Text(text))) => shared.on_frame(generation, text.as_bytes()),
            // tungstenite queues the pong for us.
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Ok(Message::Close(frame))) => {
                let cause = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                    .unwrap_or_else(|| "connection closed by gateway".into());
                shared.teardown(Some(generation), Some(cause));
                return;
            }
            Some(Err(e)) => {
                shared.teardown(Some(generation), Some(format!("communication failed: {e}")));
                return;
            }
            None => {
                shared.teardown(Some(generation), Some("connection closed by gateway".into()));
                return;
            }
        }
    }
}

/// Closes a websocket that lost the race against the tracked connection.
fn close_stream(stream: WsStream) {
    tokio::spawn(async move {
        let mut stream = stream;
        let _ = stream.close(None).await;
    });
}
