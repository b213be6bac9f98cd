//! Packet definitions for the arena protocol.
//!
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join game with nickname and color.
    Join = 0x00,
    /// Steering direction update.
    Direction = 0x10,
    /// Split every eligible cell.
    Split = 0x11,
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Full world snapshot (cells + food).
    WorldUpdate = 0x10,
    /// Join acknowledgement carrying the owner id.
    Joined = 0x20,
    /// Ranked leaderboard.
    Leaderboard = 0x31,
    /// Map dimensions.
    SetBorder = 0x40,
}
