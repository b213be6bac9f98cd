//! Cell arena game server library.
//!
//! The simulation core (`world`, `entity`, `session`, `collision`,
//! `leaderboard`) is synchronous and owns no I/O. The `server` module is the
//! gateway that feeds it commands and fans out its snapshots.

pub mod collision;
pub mod config;
pub mod entity;
pub mod leaderboard;
pub mod server;
pub mod session;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use leaderboard::LeaderboardEntry;
pub use server::{run, GameState, TargetedMessage, TargetedMessageType};
pub use world::{World, WorldSnapshot};
