//! Shared protocol crate for the cell arena server.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Packet definitions and builders
//! - Shared types (Color)

mod binary;
mod error;
pub mod packets;

use std::fmt;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;

/// RGB color used for cells and food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` (or `RRGGBB`) hex string. Case-insensitive.
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}
