//! Game server implementation.

use crate::config::Config;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;

pub use game::{run_game_loop, GameState};

/// A message targeted at a specific client.
#[derive(Debug, Clone)]
pub struct TargetedMessage {
    /// Target client ID.
    pub client_id: u32,
    /// The message type.
    pub message: TargetedMessageType,
}

/// Types of targeted messages.
#[derive(Debug, Clone)]
pub enum TargetedMessageType {
    /// Joined packet - acknowledges a join with the owner ID.
    Joined { owner_id: u32 },
    /// SetBorder packet - sent right after Joined.
    SetBorder { width: f64, height: f64 },
}

impl TargetedMessageType {
    fn encode(&self) -> Bytes {
        match *self {
            TargetedMessageType::Joined { owner_id } => protocol::packets::build_joined(owner_id).finish(),
            TargetedMessageType::SetBorder { width, height } => {
                protocol::packets::build_set_border(width, height).finish()
            }
        }
    }
}

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on ws://{}", config.server.name, addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));

    // Pre-encoded packets: every client receives the same bytes
    let (world_tx, _world_rx) = broadcast::channel::<Bytes>(5);
    let (lb_tx, _lb_rx) = broadcast::channel::<Bytes>(10);
    let (targeted_tx, _targeted_rx) = broadcast::channel::<TargetedMessage>(100);

    let game_state = Arc::new(RwLock::new(GameState::new(
        &config,
        world_tx.clone(),
        lb_tx.clone(),
        targeted_tx.clone(),
    )));

    let game_loop_state = Arc::clone(&game_state);
    let tick_interval = config.server.tick_interval_ms();
    tokio::spawn(async move {
        game::run_game_loop(game_loop_state, tick_interval).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let game_state = Arc::clone(&game_state);
        let conn_state = Arc::clone(&conn_state);
        let lb_rx = lb_tx.subscribe();
        let world_rx = world_tx.subscribe();
        let targeted_rx = targeted_tx.subscribe();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game_state, lb_rx, world_rx, targeted_rx).await;

            // Always remove from connection tracking when done
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    mut lb_rx: broadcast::Receiver<Bytes>,
    mut world_rx: broadcast::Receiver<Bytes>,
    mut targeted_rx: broadcast::Receiver<TargetedMessage>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let client_id = {
        let mut state = game_state.write().await;
        state.add_client(addr)
    };

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        let mut state = game_state.write().await;
                        if let Err(e) = state.handle_packet(client_id, &data) {
                            warn!("Packet error from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            world_msg = world_rx.recv() => {
                match world_msg {
                    Ok(packet) => {
                        if let Err(e) = write.send(Message::Binary(packet)).await {
                            warn!("Failed to send world update to {}: {}", addr, e);
                            break;
                        }
                    }
                    // Every update is a full snapshot, so dropping stale ones is harmless
                    Err(RecvError::Lagged(n)) => debug!("Client {} lagged, dropped {} world updates", addr, n),
                    Err(RecvError::Closed) => break,
                }
            }
            lb_msg = lb_rx.recv() => {
                match lb_msg {
                    Ok(packet) => {
                        if let Err(e) = write.send(Message::Binary(packet)).await {
                            warn!("Failed to send leaderboard to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                }
            }
            targeted_msg = targeted_rx.recv() => {
                match targeted_msg {
                    Ok(msg) => {
                        // Only process messages for this client
                        if msg.client_id != client_id {
                            continue;
                        }
                        if let Err(e) = write.send(Message::Binary(msg.message.encode())).await {
                            warn!("Failed to send {:?} to {}: {}", msg.message, addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => warn!("Client {} missed {} targeted messages", addr, n),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    {
        let mut state = game_state.write().await;
        state.remove_client(client_id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::packets::ServerOpcode;

    #[test]
    fn test_connection_limits() {
        let mut state = ConnectionState::new();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(state.try_add_connection(a, 3, 2));
        assert!(state.try_add_connection(a, 3, 2));
        assert!(!state.try_add_connection(a, 3, 2));
        assert!(state.try_add_connection(b, 3, 2));
        assert!(!state.try_add_connection(b, 3, 2));

        state.remove_connection(a);
        assert!(state.try_add_connection(b, 3, 2));
        state.remove_connection(b);
        state.remove_connection(b);
        state.remove_connection(a);
        assert_eq!(state.total_connections, 0);
        assert!(state.ip_connections.is_empty());
    }

    #[test]
    fn test_targeted_messages_encode() {
        let joined = TargetedMessageType::Joined { owner_id: 9 }.encode();
        assert_eq!(joined[0], ServerOpcode::Joined as u8);
        assert_eq!(&joined[1..], &9u32.to_le_bytes());

        let border = TargetedMessageType::SetBorder { width: 10.0, height: 20.0 }.encode();
        assert_eq!(border[0], ServerOpcode::SetBorder as u8);
        assert_eq!(border.len(), 17);
    }
}
