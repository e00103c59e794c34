//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, HealthInfo, ServerMessage};
use crate::session::{MatchSession, SessionError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_hdr_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// The one match; every action runs to completion under this lock
    session: Mutex<MatchSession>,
    /// Mapping from connection ID to its message sender
    pub viewers: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    pub config: ServerConfig,
}

impl ServerState {
    pub fn new(session: MatchSession, config: ServerConfig) -> Self {
        Self {
            session: Mutex::new(session),
            viewers: DashMap::new(),
            config,
        }
    }

    /// Lock the match session.
    pub fn session(&self) -> MutexGuard<'_, MatchSession> {
        // A panicking action never leaves a half-applied state behind, since
        // actions are validated before anything is mutated
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send a message to a specific viewer.
    pub fn send_to_viewer(&self, viewer_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.viewers.get(&viewer_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to every connected viewer.
    pub fn broadcast(&self, msg: ServerMessage) {
        for viewer in self.viewers.iter() {
            let _ = viewer.value().send(msg.clone());
        }
    }

    /// Send the current snapshot to one viewer.
    pub fn send_snapshot(&self, viewer_id: Uuid) {
        // Enqueue under the lock, a concurrent broadcast must not overtake it
        let session = self.session();
        self.send_to_viewer(
            viewer_id,
            ServerMessage::BoardState {
                state: session.snapshot(),
            },
        );
        self.send_to_viewer(
            viewer_id,
            ServerMessage::ValidActions {
                actions: session.valid_actions(),
            },
        );
    }

    pub fn health(&self) -> HealthInfo {
        self.session().health(self.viewers.len(), &self.config)
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Feud board server listening on {}", addr);
    info!(origins = ?state.config.allowed_origins, "allowed origins");

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    if is_plain_health_check(&stream).await {
        debug!("Health check from {}", addr);
        let body = serde_json::to_string(&state.health())?;
        stream.write_all(health_response(&body).as_bytes()).await?;
        stream.shutdown().await?;
        return Ok(());
    }

    let check_origin = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        if state.config.is_origin_allowed(origin) {
            Ok(resp)
        } else {
            warn!("Rejected socket from {} with origin {:?}", addr, origin);
            let mut denied = ErrorResponse::new(Some("Origin not allowed".to_string()));
            *denied.status_mut() = StatusCode::FORBIDDEN;
            Err(denied)
        }
    };

    let ws_stream = accept_hdr_async(stream, check_origin).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a connection ID
    let viewer_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.viewers.insert(viewer_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome {
        connection_id: viewer_id,
    };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // New viewers see the board immediately
    state.send_snapshot(viewer_id);

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message: {}", e),
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(viewer_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", viewer_id, text);
                    state.send_to_viewer(
                        viewer_id,
                        ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", viewer_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", viewer_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    state.viewers.remove(&viewer_id);
    send_task.abort();

    info!("Connection closed for {}", viewer_id);
    Ok(())
}

/// A plain HTTP `GET /health` (no WebSocket upgrade), as sent by hosting
/// platforms and load balancers.
async fn is_plain_health_check(stream: &TcpStream) -> bool {
    let mut buf = [0u8; 1024];
    match stream.peek(&mut buf).await {
        Ok(n) => is_health_request(&buf[..n]),
        Err(_) => false,
    }
}

fn is_health_request(head: &[u8]) -> bool {
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let path_ok = head.starts_with("get /health ") || head.starts_with("get /health?");
    path_ok && !head.contains("upgrade: websocket")
}

fn health_response(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Handle a client message.
fn handle_message(viewer_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::HostAction { action } => {
            let kind = action
                .get("type")
                .and_then(|t| t.as_str())
                .map(str::to_string);
            let mut session = state.session();

            match session.apply_action(action) {
                Ok(applied) => {
                    info!(
                        action = applied.kind,
                        phase = ?applied.state.phase,
                        round = applied.state.round,
                        "host action applied"
                    );

                    // Broadcast while still holding the session so snapshots
                    // reach viewers in the order actions were applied
                    state.broadcast(ServerMessage::BoardState {
                        state: applied.state,
                    });
                    state.broadcast(ServerMessage::events(applied.events));
                    state.broadcast(ServerMessage::ValidActions {
                        actions: applied.valid_actions,
                    });
                }
                Err(e) => {
                    drop(session);
                    match &e {
                        SessionError::Payload(_) => {
                            warn!("Malformed action from {}: {}", viewer_id, e)
                        }
                        SessionError::Rejected(_) => {
                            debug!("Rejected {:?} from {}: {}", kind, viewer_id, e)
                        }
                    }
                    state.send_to_viewer(
                        viewer_id,
                        ServerMessage::ActionRejected {
                            action: kind,
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }

        ClientMessage::GetState => state.send_snapshot(viewer_id),

        ClientMessage::Health => {
            state.send_to_viewer(viewer_id, ServerMessage::Health(state.health()));
        }

        ClientMessage::Ping => {
            state.send_to_viewer(viewer_id, ServerMessage::Pong);
        }
    }
}
