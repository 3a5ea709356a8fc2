//! # Matchmaking Relay Server Library
//!
//! This library implements the server side of a two-player turn-based game:
//! it pairs players and forwards their turn actions, and nothing more. Move
//! legality, turn order, and board state live entirely on the clients, which
//! trust each other; the server is authoritative only for pairing.
//!
//! ## Core Responsibilities
//!
//! ### Connection Management
//! Handles the complete lifecycle of client connections including:
//! - Registration on transport accept
//! - Nickname assignment and validation
//! - Disconnection handling and cleanup
//!
//! ### Matchmaking
//! A single global waiting slot pairs the two most recent ready connections,
//! assigns colors by coin flip, and links the pair for the length of the
//! match. There is no FIFO queue and no matchmaking timeout.
//!
//! ### Action Relay
//! Validated-shape `move`/`attack`/`skill` messages from one side of a match
//! are wrapped as `opponentMove` and forwarded verbatim to the other side.
//! Unreachable recipients cause the action to be dropped with a server-side
//! log; transport loss is handled exclusively by disconnect recovery.
//!
//! ## Architecture Design
//!
//! All shared state (the connection registry and the matchmaking slot) is
//! owned by a single lobby task fed by an event channel. Reader and writer
//! tasks per connection only shuttle frames, so state mutation is serialized
//! without locks and no two matchmaking attempts can interleave. One
//! connection's transport failure never affects another connection or the
//! process.
//!
//! ## Module Organization
//!
//! ### Registry Module (`registry`)
//! Connection records, the Connected/Waiting/Playing status machine, and
//! nickname validation.
//!
//! ### Matchmaker Module (`matchmaker`)
//! The single-slot queue: stale-entry revalidation, match formation, color
//! assignment.
//!
//! ### Lobby Module (`lobby`)
//! The owned server-state struct and the event handlers: nickname requests,
//! action relay, disconnect recovery. Pure state in, notifications out.
//!
//! ### Network Module (`network`)
//! WebSocket transport: accept loop, per-connection reader/writer tasks, the
//! lobby event loop, JSON frame parsing, and delivery with disconnect
//! routing on send failure.

pub mod lobby;
pub mod matchmaker;
pub mod network;
pub mod registry;
