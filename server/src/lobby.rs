//! Lobby state and event dispatch
//!
//! The `Lobby` is the single owned server-state struct: it holds the
//! connection registry and the matchmaking slot, and every mutation funnels
//! through its methods from the one lobby task. Each handler is synchronous
//! and returns the notifications to deliver as plain data; the network layer
//! performs the actual sends. A failed send is reported back to the lobby as
//! a disconnect, never as corrupted state.
//!
//! The relay does not interpret `move`/`attack`/`skill` semantics, does not
//! validate board coordinates, and does not enforce turn order; that state
//! lives entirely on the clients, which trust each other.

use log::{debug, warn};
use rand::Rng;
use shared::{ClientMessage, ServerMessage};

use crate::matchmaker::Matchmaker;
use crate::registry::{ConnectionId, Registry, Status};

/// A notification queued for delivery to one connection.
#[derive(Debug)]
pub struct Outbound {
    pub to: ConnectionId,
    pub message: ServerMessage,
}

/// Central server state: registry plus matchmaking slot.
pub struct Lobby {
    registry: Registry,
    matchmaker: Matchmaker,
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            matchmaker: Matchmaker::new(),
        }
    }

    /// Registers a newly accepted connection.
    pub fn register(&mut self) -> ConnectionId {
        self.registry.register()
    }

    /// Handles a `setNickname` request
    ///
    /// On success the connection becomes `Waiting` and a matchmaking attempt
    /// runs immediately. On failure the sender gets an `error` event and
    /// stays in its pre-waiting state, free to retry.
    pub fn set_nickname<R: Rng>(
        &mut self,
        id: ConnectionId,
        raw_name: &str,
        rng: &mut R,
    ) -> Vec<Outbound> {
        match self.registry.set_nickname(id, raw_name) {
            Ok(()) => self.matchmaker.try_match(&mut self.registry, id, rng),
            Err(error) => {
                warn!("Connection {} rejected nickname {:?}: {}", id, raw_name, error);
                vec![Outbound {
                    to: id,
                    message: ServerMessage::Error {
                        message: error.to_string(),
                    },
                }]
            }
        }
    }

    /// Relays a turn action to the sender's opponent
    ///
    /// The sender must be `Playing` with a live opponent link, and the
    /// opponent must still be `Playing`. Anything else drops the action with
    /// a server-side warning; the sender is not notified.
    pub fn relay_action(&self, sender: ConnectionId, action: ClientMessage) -> Vec<Outbound> {
        let connection = match self.registry.get(sender) {
            Some(connection) => connection,
            None => {
                warn!("Dropping action from unknown connection {}", sender);
                return Vec::new();
            }
        };

        if connection.status != Status::Playing {
            warn!(
                "Dropping action from {}: not in a game",
                connection.display_name()
            );
            return Vec::new();
        }

        let opponent_id = match connection.opponent {
            Some(opponent_id) => opponent_id,
            None => {
                warn!(
                    "Dropping action from {}: no opponent linked",
                    connection.display_name()
                );
                return Vec::new();
            }
        };

        match self.registry.get(opponent_id) {
            Some(opponent) if opponent.status == Status::Playing => {
                debug!(
                    "Relaying action from {} to {}",
                    connection.display_name(),
                    opponent.display_name()
                );
                vec![Outbound {
                    to: opponent_id,
                    message: ServerMessage::OpponentMove { action },
                }]
            }
            _ => {
                warn!(
                    "Dropping action from {}: opponent {} unavailable",
                    connection.display_name(),
                    opponent_id
                );
                Vec::new()
            }
        }
    }

    /// Handles a connection's termination
    ///
    /// Runs once per connection, whether the transport closed cleanly or
    /// errored. Clears the matchmaking slot if the leaver held it; otherwise,
    /// if a match was in progress, the surviving opponent is notified it won
    /// and reverted to `Connected` with its link cleared, so it can re-enter
    /// matchmaking on the same connection. The leaver's record is removed
    /// unconditionally.
    pub fn disconnect(&mut self, id: ConnectionId) -> Vec<Outbound> {
        let mut outbound = Vec::new();

        if self.matchmaker.clear(id) {
            debug!("Waiting connection {} left the queue", id);
        } else if let Some((status, opponent_id)) = self
            .registry
            .get(id)
            .map(|c| (c.status, c.opponent))
        {
            if status == Status::Playing {
                if let Some(opponent_id) = opponent_id {
                    if let Some(opponent) = self.registry.get_mut(opponent_id) {
                        opponent.status = Status::Connected;
                        opponent.opponent = None;
                        outbound.push(Outbound {
                            to: opponent_id,
                            message: ServerMessage::OpponentDisconnected {
                                message: "Opponent disconnected. You win!".to_string(),
                            },
                        });
                    }
                    if let Some(leaver) = self.registry.get_mut(id) {
                        leaver.opponent = None;
                    }
                }
            }
        }

        self.registry.remove(id);
        outbound
    }

    /// Read access for monitoring and tests.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The connection currently waiting for an opponent, if any.
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.matchmaker.waiting()
    }
}

impl Default for Lobby {
    fn default() -> Self {
        Self::new()
    }
}
