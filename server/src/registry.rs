//! Connection registry for the matchmaking relay
//!
//! This module handles the server-side bookkeeping for every live connection,
//! including:
//! - Connection lifecycle (register, nickname assignment, removal)
//! - The explicit status machine (Connected -> Waiting -> Playing)
//! - Opponent linkage between paired connections
//!
//! The registry performs no I/O; it is pure in-memory state mutated from the
//! single lobby task. Opponent links are stored as connection ids and looked
//! up on each use, so a removed peer is observed as an ordinary `None`.

use log::info;
use shared::MAX_NICKNAME_LEN;
use std::collections::HashMap;
use std::fmt;

/// Unique identifier assigned to each transport-level connection.
pub type ConnectionId = u32;

/// Lifecycle state of a connection.
///
/// Transitions: `Connected` on registration, `Waiting` once a nickname is
/// accepted, `Playing` when the matchmaker pairs it, and back to `Connected`
/// when its opponent disconnects mid-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Connected,
    Waiting,
    Playing,
}

/// Why a `set_nickname` request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetNicknameError {
    /// Empty after trimming surrounding whitespace.
    Empty,
    /// Longer than [`MAX_NICKNAME_LEN`] characters after trimming.
    TooLong,
    /// The connection id is not present in the registry.
    UnknownConnection,
}

impl fmt::Display for SetNicknameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetNicknameError::Empty | SetNicknameError::TooLong => {
                write!(f, "Invalid nickname")
            }
            SetNicknameError::UnknownConnection => write!(f, "Connection not registered"),
        }
    }
}

impl std::error::Error for SetNicknameError {}

/// Represents one live connection and its session metadata
///
/// Each connection tracks:
/// - Its registry-assigned id
/// - The nickname chosen by the player (unset until assigned)
/// - Its position in the status machine
/// - The id of its opponent while a match is in progress
#[derive(Debug)]
pub struct Connection {
    /// Unique connection identifier assigned by the registry
    pub id: ConnectionId,
    /// Player nickname, `None` until `set_nickname` succeeds
    pub nickname: Option<String>,
    /// Current lifecycle status
    pub status: Status,
    /// Opponent connection id, set only while a match is in progress
    pub opponent: Option<ConnectionId>,
}

impl Connection {
    /// Creates a fresh connection record in the `Connected` state.
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            nickname: None,
            status: Status::Connected,
            opponent: None,
        }
    }

    /// Nickname for log output; placeholder before one is assigned.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or("<unnamed>")
    }
}

/// Tracks every live connection and its session metadata
///
/// The registry provides centralized control over connection records and
/// funnels all mutation through its methods, preserving the single-writer
/// model of the lobby task. It assigns ids monotonically starting from 1.
pub struct Registry {
    /// Live connections indexed by their unique id
    connections: HashMap<ConnectionId, Connection>,
    /// Next id to hand out
    next_id: ConnectionId,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
        }
    }

    /// Registers a new connection and returns its assigned id
    ///
    /// The record starts with status `Connected` and no nickname; there are
    /// no side effects beyond bookkeeping.
    pub fn register(&mut self) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;

        self.connections.insert(id, Connection::new(id));
        info!("Connection {} registered", id);

        id
    }

    /// Validates and assigns a nickname, moving the connection to `Waiting`
    ///
    /// The raw input is trimmed first; the result must be 1 to
    /// [`MAX_NICKNAME_LEN`] characters. On success the connection is ready
    /// for matchmaking; triggering the matchmaker is the caller's job.
    pub fn set_nickname(
        &mut self,
        id: ConnectionId,
        raw_name: &str,
    ) -> Result<(), SetNicknameError> {
        let trimmed = raw_name.trim();
        if trimmed.is_empty() {
            return Err(SetNicknameError::Empty);
        }
        if trimmed.chars().count() > MAX_NICKNAME_LEN {
            return Err(SetNicknameError::TooLong);
        }

        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(SetNicknameError::UnknownConnection)?;

        connection.nickname = Some(trimmed.to_string());
        connection.status = Status::Waiting;
        info!("Connection {} set nickname: {}", id, trimmed);

        Ok(())
    }

    /// Removes a connection record
    ///
    /// Unconditional and idempotent: returns true if the record existed,
    /// false if it was already gone. Opponent links held by other records
    /// are not touched here; the disconnect handler clears them before the
    /// removal.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        if let Some(connection) = self.connections.remove(&id) {
            info!(
                "Connection {} ({}) removed",
                connection.id,
                connection.display_name()
            );
            true
        } else {
            false
        }
    }

    /// Looks up a connection by id.
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Looks up a connection by id for mutation.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Returns the number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_creation() {
        let connection = Connection::new(1);

        assert_eq!(connection.id, 1);
        assert_eq!(connection.nickname, None);
        assert_eq!(connection.status, Status::Connected);
        assert_eq!(connection.opponent, None);
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = Registry::new();

        let first = registry.register();
        let second = registry.register();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_set_nickname_trims_and_moves_to_waiting() {
        let mut registry = Registry::new();
        let id = registry.register();

        registry.set_nickname(id, "  Alice  ").unwrap();

        let connection = registry.get(id).unwrap();
        assert_eq!(connection.nickname.as_deref(), Some("Alice"));
        assert_eq!(connection.status, Status::Waiting);
    }

    #[test]
    fn test_set_nickname_rejects_empty() {
        let mut registry = Registry::new();
        let id = registry.register();

        assert_eq!(registry.set_nickname(id, ""), Err(SetNicknameError::Empty));
        assert_eq!(
            registry.set_nickname(id, "   \t  "),
            Err(SetNicknameError::Empty)
        );

        // Rejected input leaves the record untouched.
        let connection = registry.get(id).unwrap();
        assert_eq!(connection.nickname, None);
        assert_eq!(connection.status, Status::Connected);
    }

    #[test]
    fn test_set_nickname_length_boundary() {
        let mut registry = Registry::new();
        let id = registry.register();

        let exactly_16 = "a".repeat(16);
        assert!(registry.set_nickname(id, &exactly_16).is_ok());

        let seventeen = "a".repeat(17);
        assert_eq!(
            registry.set_nickname(id, &seventeen),
            Err(SetNicknameError::TooLong)
        );
    }

    #[test]
    fn test_set_nickname_trims_before_length_check() {
        let mut registry = Registry::new();
        let id = registry.register();

        // 16 characters once padding is stripped.
        let padded = format!("   {}   ", "b".repeat(16));
        assert!(registry.set_nickname(id, &padded).is_ok());
        assert_eq!(
            registry.get(id).unwrap().nickname.as_deref(),
            Some("b".repeat(16).as_str())
        );
    }

    #[test]
    fn test_set_nickname_unknown_connection() {
        let mut registry = Registry::new();

        assert_eq!(
            registry.set_nickname(999, "Alice"),
            Err(SetNicknameError::UnknownConnection)
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = Registry::new();
        let id = registry.register();

        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_remove_unknown_connection() {
        let mut registry = Registry::new();

        assert!(!registry.remove(999));
    }

    #[test]
    fn test_get_mut_allows_status_updates() {
        let mut registry = Registry::new();
        let id = registry.register();

        registry.get_mut(id).unwrap().status = Status::Playing;
        assert_eq!(registry.get(id).unwrap().status, Status::Playing);
    }

    #[test]
    fn test_display_name_placeholder() {
        let mut registry = Registry::new();
        let id = registry.register();

        assert_eq!(registry.get(id).unwrap().display_name(), "<unnamed>");

        registry.set_nickname(id, "Carol").unwrap();
        assert_eq!(registry.get(id).unwrap().display_name(), "Carol");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(SetNicknameError::Empty.to_string(), "Invalid nickname");
        assert_eq!(SetNicknameError::TooLong.to_string(), "Invalid nickname");
        assert_eq!(
            SetNicknameError::UnknownConnection.to_string(),
            "Connection not registered"
        );
    }
}
