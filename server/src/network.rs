//! WebSocket transport and the lobby event loop
//!
//! Architecture: channel-fed single event loop.
//!
//! - **Accept loop** (`Server::run`): accepts TCP connections and spawns one
//!   task per connection for the WebSocket handshake and read side.
//! - **Reader tasks** (one per client): forward parsed frames as
//!   `NetworkEvent::MessageFrom` to the lobby loop and emit
//!   `NetworkEvent::Disconnected` on close or transport error; both paths
//!   converge on the same event.
//! - **Writer tasks** (one per client): own the sink half and drain an
//!   unbounded channel, so any part of the server can send to a client by
//!   holding the channel's sender.
//! - **Lobby loop**: the only task that touches the `Lobby` and the
//!   id-to-sender map. All matchmaking and relay mutation is serialized
//!   here, so two pairing attempts can never interleave.
//!
//! A failed channel send means the writer is gone; it is converted into a
//! `Disconnected` event rather than handled inline, keeping the in-memory
//! state consistent even when a notification races a disconnect. The sender
//! map absorbs duplicate `Disconnected` events: disconnect handling runs at
//! most once per connection.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::ClientMessage;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use crate::lobby::{Lobby, Outbound};
use crate::registry::ConnectionId;

/// Events sent from connection tasks to the lobby loop.
enum NetworkEvent {
    NewConnection {
        sender: mpsc::UnboundedSender<Message>,
        respond_to: oneshot::Sender<ConnectionId>,
    },
    MessageFrom {
        id: ConnectionId,
        text: String,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// WebSocket relay server bound to a local address.
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds the listener. Port 0 asks the OS for a free port; use
    /// [`Server::local_addr`] to discover the assignment.
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop and the lobby loop until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(lobby_loop(event_rx, event_tx.clone()));

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, event_tx.clone()));
                }
                Err(error) => {
                    error!("Failed to accept connection: {}", error);
                }
            }
        }
    }
}

/// Owns all mutable server state. Connection ids are issued here and handed
/// back to the reader task over a oneshot.
async fn lobby_loop(
    mut events: mpsc::UnboundedReceiver<NetworkEvent>,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    let mut lobby = Lobby::new();
    let mut senders: HashMap<ConnectionId, mpsc::UnboundedSender<Message>> = HashMap::new();
    let mut rng = StdRng::from_entropy();

    while let Some(event) = events.recv().await {
        match event {
            NetworkEvent::NewConnection { sender, respond_to } => {
                let id = lobby.register();
                senders.insert(id, sender);
                let _ = respond_to.send(id);
            }
            NetworkEvent::MessageFrom { id, text } => {
                let outbound = dispatch(&mut lobby, id, &text, &mut rng);
                deliver(&senders, &event_tx, outbound);
            }
            NetworkEvent::Disconnected { id } => {
                // The map entry is the run-once guard: close and error paths
                // both emit this event, and sends can schedule it too.
                if senders.remove(&id).is_some() {
                    let outbound = lobby.disconnect(id);
                    deliver(&senders, &event_tx, outbound);
                }
            }
        }
    }
}

/// Parses one text frame and routes it to the lobby. Malformed JSON and
/// unrecognized `type` discriminants are logged and ignored; the connection
/// stays open and no error is sent back.
fn dispatch<R: Rng>(
    lobby: &mut Lobby,
    id: ConnectionId,
    text: &str,
    rng: &mut R,
) -> Vec<Outbound> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SetNickname { nickname }) => lobby.set_nickname(id, &nickname, rng),
        Ok(action) => lobby.relay_action(id, action),
        Err(error) => {
            warn!(
                "Ignoring unparseable message from connection {}: {}",
                id, error
            );
            Vec::new()
        }
    }
}

/// Serializes and queues outbound notifications. A send failure is turned
/// into a `Disconnected` event for that connection, equivalent to an async
/// disconnect, and never corrupts lobby state.
fn deliver(
    senders: &HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    event_tx: &mpsc::UnboundedSender<NetworkEvent>,
    outbound: Vec<Outbound>,
) {
    for Outbound { to, message } in outbound {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(error) => {
                error!("Failed to encode message for connection {}: {}", to, error);
                continue;
            }
        };

        match senders.get(&to) {
            Some(sender) => {
                if sender.send(Message::Text(text)).is_err() {
                    warn!("Send to connection {} failed, scheduling disconnect", to);
                    let _ = event_tx.send(NetworkEvent::Disconnected { id: to });
                }
            }
            None => {
                debug!("Dropping notification for closed connection {}", to);
            }
        }
    }
}

/// Performs the WebSocket handshake, registers with the lobby loop, spawns
/// the writer task, and runs the read loop until the peer goes away.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    event_tx: mpsc::UnboundedSender<NetworkEvent>,
) {
    let websocket = match accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(error) => {
            warn!("WebSocket handshake with {} failed: {}", addr, error);
            return;
        }
    };

    let (sink, mut stream) = websocket.split();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Message>();
    let (id_tx, id_rx) = oneshot::channel();

    if event_tx
        .send(NetworkEvent::NewConnection {
            sender: out_tx.clone(),
            respond_to: id_tx,
        })
        .is_err()
    {
        return;
    }
    let id = match id_rx.await {
        Ok(id) => id,
        Err(_) => return,
    };
    info!("Connection {} opened from {}", id, addr);

    let writer = tokio::spawn(writer_task(sink, out_rx));

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if event_tx
                    .send(NetworkEvent::MessageFrom { id, text })
                    .is_err()
                {
                    break;
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = out_tx.send(Message::Pong(payload));
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close frame", id);
                break;
            }
            Ok(other) => {
                debug!("Ignoring non-text frame from connection {}: {:?}", id, other);
            }
            Err(error) => {
                warn!("Connection {} transport error: {}", id, error);
                break;
            }
        }
    }

    let _ = event_tx.send(NetworkEvent::Disconnected { id });
    writer.abort();
    info!("Connection {} closed", id);
}

/// Drains the outbound channel into the WebSocket sink. Exits when the
/// channel closes or a send fails; the reader side notices the broken
/// transport and reports the disconnect.
async fn writer_task(
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut messages: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = messages.recv().await {
        if sink.send(message).await.is_err() {
            break;
        }
    }
}
