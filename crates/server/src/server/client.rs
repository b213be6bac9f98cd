//! Client session state.

use std::net::SocketAddr;

/// A connected client.
///
/// The client ID doubles as the owner ID of its cells in the world; name and
/// color live on the cells themselves.
#[derive(Debug)]
pub struct Client {
    /// Unique client ID.
    pub id: u32,
    /// Remote address.
    pub addr: SocketAddr,
}

impl Client {
    /// Create a new client session.
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self { id, addr }
    }
}

/// Trim a requested name and cap it at `max_len` characters, dropping control characters.
pub fn sanitize_name(raw: &str, max_len: usize) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect()
}
