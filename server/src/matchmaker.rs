//! Single-slot matchmaking queue
//!
//! Pairing uses one global waiting slot rather than a real queue: at most one
//! connection is ever waiting, and a newly ready connection either pairs with
//! it or takes its place. A held entry can go stale (the connection behind
//! it may have disconnected or changed state without the slot being cleared),
//! so it is revalidated against the registry before a match forms. A stale
//! entry is silently replaced, not rejected.
//!
//! The matchmaker mutates registry state synchronously and returns the
//! notifications to deliver; it performs no I/O itself, so the check-slot /
//! mutate-slot critical section can never interleave with another pairing
//! attempt on the single lobby task.

use log::{debug, info};
use rand::Rng;
use shared::{Color, ServerMessage};

use crate::lobby::Outbound;
use crate::registry::{ConnectionId, Registry, Status};

/// The matchmaking queue slot.
pub struct Matchmaker {
    waiting: Option<ConnectionId>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self { waiting: None }
    }

    /// The connection currently occupying the slot, if any.
    pub fn waiting(&self) -> Option<ConnectionId> {
        self.waiting
    }

    /// Empties the slot if it holds `id`. Returns true if it was cleared.
    pub fn clear(&mut self, id: ConnectionId) -> bool {
        if self.waiting == Some(id) {
            self.waiting = None;
            true
        } else {
            false
        }
    }

    /// Attempts to pair `candidate` with the held connection
    ///
    /// Called after a connection becomes `Waiting`. No-op if the candidate
    /// already left the waiting state (e.g. a race with its disconnect). If
    /// the slot holds a different, still-waiting connection, a match forms;
    /// if the held entry is stale, the candidate replaces it; otherwise the
    /// candidate occupies the slot and is told to wait.
    pub fn try_match<R: Rng>(
        &mut self,
        registry: &mut Registry,
        candidate: ConnectionId,
        rng: &mut R,
    ) -> Vec<Outbound> {
        if registry.get(candidate).map(|c| c.status) != Some(Status::Waiting) {
            return Vec::new();
        }

        match self.waiting {
            Some(held) if held != candidate => {
                if registry.get(held).map(|c| c.status) == Some(Status::Waiting) {
                    self.waiting = None;
                    form_match(registry, held, candidate, rng)
                } else {
                    debug!("Replacing stale queue entry {} with {}", held, candidate);
                    self.enqueue(candidate)
                }
            }
            _ => self.enqueue(candidate),
        }
    }

    fn enqueue(&mut self, candidate: ConnectionId) -> Vec<Outbound> {
        self.waiting = Some(candidate);
        vec![Outbound {
            to: candidate,
            message: ServerMessage::WaitingForOpponent,
        }]
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Pairs two waiting connections: flips a coin for white, moves both to
/// `Playing` with mutual opponent links, and builds each side's
/// `matchFound` notification.
fn form_match<R: Rng>(
    registry: &mut Registry,
    held: ConnectionId,
    candidate: ConnectionId,
    rng: &mut R,
) -> Vec<Outbound> {
    let held_nickname = registry
        .get(held)
        .and_then(|c| c.nickname.clone())
        .unwrap_or_default();
    let candidate_nickname = registry
        .get(candidate)
        .and_then(|c| c.nickname.clone())
        .unwrap_or_default();

    if let Some(connection) = registry.get_mut(held) {
        connection.status = Status::Playing;
        connection.opponent = Some(candidate);
    }
    if let Some(connection) = registry.get_mut(candidate) {
        connection.status = Status::Playing;
        connection.opponent = Some(held);
    }

    let held_color = if rng.gen_bool(0.5) {
        Color::White
    } else {
        Color::Black
    };

    info!(
        "Match found: {} ({:?}) vs {} ({:?})",
        held_nickname,
        held_color,
        candidate_nickname,
        held_color.other()
    );

    vec![
        Outbound {
            to: held,
            message: ServerMessage::MatchFound {
                opponent_nickname: candidate_nickname,
                color: held_color,
            },
        },
        Outbound {
            to: candidate,
            message: ServerMessage::MatchFound {
                opponent_nickname: held_nickname,
                color: held_color.other(),
            },
        },
    ]
}
