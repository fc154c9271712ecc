use atlas_core::{encode_query, Query, DEFAULT_MAX_FRAME_BYTES};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

const OUTBOUND_QUEUE_CAPACITY: usize = 64;
const INBOUND_QUEUE_CAPACITY: usize = 256;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    /// Terminal. The session never reconnects.
    Closed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    Frame(String),
    Closed { reason: String },
}

/// The single connection to the node. Owned by the app; the socket itself
/// lives in a spawned task that exchanges queries and frames over channels.
pub struct SocketSession {
    endpoint: String,
    state: ConnectionState,
    outbound_tx: Option<mpsc::Sender<Query>>,
    task: Option<JoinHandle<()>>,
}

impl SocketSession {
    pub fn connect(url: &Url) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(INBOUND_QUEUE_CAPACITY);
        let task = tokio::spawn(connection_loop(url.clone(), outbound_rx, event_tx));
        let mut session = Self::detached(url.as_str(), outbound_tx);
        session.task = Some(task);
        (session, event_rx)
    }

    /// A session whose transport is whatever drains `outbound_tx`.
    pub fn detached(endpoint: &str, outbound_tx: mpsc::Sender<Query>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            state: ConnectionState::Connecting,
            outbound_tx: Some(outbound_tx),
            task: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Tracks connection lifecycle. Issues the bootstrap snapshot queries
    /// the first time the connection opens.
    pub fn observe(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Opened => {
                if self.state != ConnectionState::Connecting {
                    return;
                }
                self.state = ConnectionState::Open;
                info!(event = "session_open", endpoint = %self.endpoint);
                self.send(Query::chain());
                self.send(Query::cache());
            }
            SessionEvent::Frame(_) => {}
            SessionEvent::Closed { reason } => {
                if self.state != ConnectionState::Closed {
                    warn!(event = "session_closed", endpoint = %self.endpoint, reason = %reason);
                }
                self.state = ConnectionState::Closed;
                self.outbound_tx = None;
            }
        }
    }

    /// Fire-and-forget. Returns whether the query reached the connection;
    /// anything sent while not open is dropped.
    pub fn send(&self, query: Query) -> bool {
        if self.state != ConnectionState::Open {
            debug!(event = "query_dropped", reason = "not_open", command = %query.data);
            return false;
        }
        let Some(tx) = self.outbound_tx.as_ref() else {
            return false;
        };
        let command = query.data;
        match tx.try_send(query) {
            Ok(()) => {
                debug!(event = "query_sent", command = %command);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    event = "query_dropped",
                    reason = "queue_full",
                    command = %command,
                    capacity = OUTBOUND_QUEUE_CAPACITY
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(event = "query_dropped", reason = "connection_gone", command = %command);
                false
            }
        }
    }

    /// Drops the outbound channel and waits for the connection task to send
    /// its close frame. Gives up after a short grace period.
    pub async fn shutdown(&mut self) {
        self.outbound_tx = None;
        self.state = ConnectionState::Closed;
        let Some(task) = self.task.take() else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
            Ok(Ok(())) => debug!(event = "session_shutdown", endpoint = %self.endpoint),
            Ok(Err(err)) => warn!(event = "session_task_failed", error = %err),
            Err(_) => warn!(
                event = "session_shutdown_timeout",
                endpoint = %self.endpoint,
                grace_ms = SHUTDOWN_GRACE.as_millis() as u64
            ),
        }
    }
}

async fn connection_loop(
    url: Url,
    mut outbound_rx: mpsc::Receiver<Query>,
    events: mpsc::Sender<SessionEvent>,
) {
    let mut ws = match connect_async(url.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(err) => {
            warn!(event = "node_connect_error", endpoint = %url, error = %err);
            let _ = events
                .send(SessionEvent::Closed {
                    reason: format!("connect failed: {err}"),
                })
                .await;
            return;
        }
    };
    if events.send(SessionEvent::Opened).await.is_err() {
        let _ = ws.close(None).await;
        return;
    }

    // Each pass yields `Some(reason)` once the connection is done.
    let reason = loop {
        let finished: Option<String> = tokio::select! {
            inbound = ws.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if events.send(SessionEvent::Frame(text)).await.is_err() {
                            let _ = ws.close(None).await;
                            Some("monitor stopped".to_string())
                        } else {
                            None
                        }
                    }
                    Some(Ok(Message::Close(frame))) => Some(
                        frame
                            .map(|frame| frame.reason.to_string())
                            .filter(|text| !text.is_empty())
                            .unwrap_or_else(|| "closed by node".to_string()),
                    ),
                    Some(Ok(_)) => None,
                    Some(Err(err)) => Some(format!("read error: {err}")),
                    None => Some("stream ended".to_string()),
                }
            }
            maybe_query = outbound_rx.recv() => {
                match maybe_query {
                    Some(query) => match encode_query(&query, DEFAULT_MAX_FRAME_BYTES) {
                        Ok(frame) => match ws.send(Message::Text(frame)).await {
                            Ok(()) => None,
                            Err(err) => Some(format!("write error: {err}")),
                        },
                        Err(err) => {
                            warn!(event = "query_encode_error", command = %query.data, error = %err);
                            None
                        }
                    },
                    None => {
                        let _ = ws.close(None).await;
                        Some("session shut down".to_string())
                    }
                }
            }
        };
        if let Some(reason) = finished {
            break reason;
        }
    };

    let _ = events.send(SessionEvent::Closed { reason }).await;
}
