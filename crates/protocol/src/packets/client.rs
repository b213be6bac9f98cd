//! Client -> Server packet parsing.

use super::ClientOpcode;
use crate::{BinaryReader, ProtocolError};

/// Parsed client packet.
///
/// This is the complete set of commands a client may issue; anything else on
/// the wire is rejected at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    /// Join game (0x00). `color` is the raw string the client sent, if any.
    Join { name: String, color: Option<String> },
    /// Steering direction (0x10). Not normalized.
    Direction { dx: f64, dy: f64 },
    /// Split (0x11).
    Split,
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.try_get_u8().ok_or(ProtocolError::UnexpectedEof)?;

        match opcode {
            op if op == ClientOpcode::Join as u8 => {
                let name = reader.try_get_string_utf8().unwrap_or_default();
                let color = reader.try_get_string_utf8().filter(|c| !c.is_empty());
                Ok(ClientPacket::Join { name, color })
            }
            op if op == ClientOpcode::Direction as u8 => {
                // Two layouts: f32 pair (9 bytes) or f64 pair (17 bytes)
                let (dx, dy) = match data.len() {
                    9 => {
                        let dx = reader.try_get_f32().ok_or(ProtocolError::UnexpectedEof)?;
                        let dy = reader.try_get_f32().ok_or(ProtocolError::UnexpectedEof)?;
                        (dx as f64, dy as f64)
                    }
                    17 => {
                        let dx = reader.try_get_f64().ok_or(ProtocolError::UnexpectedEof)?;
                        let dy = reader.try_get_f64().ok_or(ProtocolError::UnexpectedEof)?;
                        (dx, dy)
                    }
                    _ => return Err(ProtocolError::InvalidPayload("direction length")),
                };
                Ok(ClientPacket::Direction {
                    dx: finite_or_zero(dx),
                    dy: finite_or_zero(dy),
                })
            }
            // Split carries no payload; trailing bytes are ignored
            op if op == ClientOpcode::Split as u8 => Ok(ClientPacket::Split),
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }
}

#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Build a Join packet (0x00).
pub fn build_join(name: &str, color: Option<&str>) -> crate::BinaryWriter {
    let mut w = crate::BinaryWriter::with_capacity(name.len() + 10);
    w.put_u8(ClientOpcode::Join as u8);
    w.put_string_utf8(name);
    if let Some(color) = color {
        w.put_string_utf8(color);
    }
    w
}

/// Build a Direction packet (0x10) in the f32 layout.
pub fn build_direction(dx: f32, dy: f32) -> crate::BinaryWriter {
    let mut w = crate::BinaryWriter::with_capacity(9);
    w.put_u8(ClientOpcode::Direction as u8);
    w.put_f32(dx);
    w.put_f32(dy);
    w
}

/// Build a Split packet (0x11).
pub fn build_split() -> crate::BinaryWriter {
    let mut w = crate::BinaryWriter::with_capacity(1);
    w.put_u8(ClientOpcode::Split as u8);
    w
}
