//! Game state and main loop.

use crate::config::Config;
use crate::leaderboard::{self, LeaderboardEntry};
use crate::world::{World, WorldSnapshot};
use bytes::Bytes;
use futures_util::FutureExt;
use protocol::packets::{self, ClientPacket, EatRecord, LeaderboardRow, UpdateCell, UpdateFood};
use protocol::Color;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::client::{sanitize_name, Client};
use super::{TargetedMessage, TargetedMessageType};

/// Ticks between periodic metrics lines.
const METRICS_INTERVAL: u64 = 600;

/// Encoded packets to publish after releasing the game state lock.
pub struct PendingBroadcasts {
    pub world_update: Bytes,
    pub leaderboard: Bytes,
}

/// Main game state.
pub struct GameState {
    pub config: Config,
    pub world: World,

    // ID counter (client IDs are also world owner IDs)
    next_client_id: u32,

    // Connected clients
    pub clients: HashMap<u32, Client>,

    // Average tick duration in milliseconds (exponential moving average).
    pub update_time_avg: f64,

    // Fallback for joins without a usable color
    default_color: Color,

    // Simulation clock origin; world time is milliseconds since this instant
    start_time: std::time::Instant,

    world_tx: broadcast::Sender<Bytes>,
    lb_tx: broadcast::Sender<Bytes>,
    targeted_tx: broadcast::Sender<TargetedMessage>,
}

impl GameState {
    /// Create a new game state.
    pub fn new(
        config: &Config,
        world_tx: broadcast::Sender<Bytes>,
        lb_tx: broadcast::Sender<Bytes>,
        targeted_tx: broadcast::Sender<TargetedMessage>,
    ) -> Self {
        let default_color = Color::from_hex(&config.player.default_color).unwrap_or_else(|| {
            warn!("Invalid player.default_color {:?}, using #FF0000", config.player.default_color);
            Color::new(255, 0, 0)
        });

        Self {
            config: config.clone(),
            world: World::new(config),
            next_client_id: 1,
            clients: HashMap::new(),
            update_time_avg: 0.0,
            default_color,
            start_time: std::time::Instant::now(),
            world_tx,
            lb_tx,
            targeted_tx,
        }
    }

    /// Milliseconds since the game state was created.
    pub fn uptime_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }

    /// Add a new client.
    pub fn add_client(&mut self, addr: SocketAddr) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        self.clients.insert(id, Client::new(id, addr));
        info!("Client {} connected from {}", id, addr);
        id
    }

    /// Remove a client and every cell it owns.
    pub fn remove_client(&mut self, id: u32) {
        if let Some(client) = self.clients.remove(&id) {
            info!("Client {} ({}) disconnected", id, client.addr);
            self.world.leave(id);
        }
    }

    /// Handle a packet from a client.
    pub fn handle_packet(&mut self, client_id: u32, data: &[u8]) -> anyhow::Result<()> {
        if !self.clients.contains_key(&client_id) {
            anyhow::bail!("Client not found");
        }

        let packet = ClientPacket::parse(data)?;
        if !matches!(packet, ClientPacket::Direction { .. }) {
            // Direction packets are very frequent; avoid logging them
            debug!("Client {} sent {:?}", client_id, packet);
        }

        // The loop may have been idle; commands see the live time, not the last tick's
        self.world.sync_clock(self.uptime_ms());

        match packet {
            ClientPacket::Join { name, color } => {
                self.handle_join(client_id, &name, color.as_deref());
            }
            ClientPacket::Direction { dx, dy } => {
                self.world.set_direction(client_id, dx, dy);
            }
            ClientPacket::Split => {
                self.world.split(client_id);
            }
        }
        Ok(())
    }

    /// Handle join request.
    fn handle_join(&mut self, client_id: u32, raw_name: &str, raw_color: Option<&str>) {
        let name = sanitize_name(raw_name, self.config.player.max_name_length);
        let color = raw_color
            .and_then(Color::from_hex)
            .unwrap_or(self.default_color);

        self.world.join(client_id, &name, color);

        let _ = self.targeted_tx.send(TargetedMessage {
            client_id,
            message: TargetedMessageType::Joined { owner_id: client_id },
        });
        let _ = self.targeted_tx.send(TargetedMessage {
            client_id,
            message: TargetedMessageType::SetBorder {
                width: self.world.border.width,
                height: self.world.border.height,
            },
        });
    }

    /// Run a single game tick at simulation time `now_ms` and return encoded broadcasts.
    pub fn tick(&mut self, now_ms: f64) -> PendingBroadcasts {
        let tick_start = std::time::Instant::now();

        let snapshot = self.world.tick(now_ms);
        let sim_time = tick_start.elapsed();

        let board = leaderboard::rank(&self.world, &self.config.leaderboard);
        let world_update = encode_world_update(&snapshot);
        let leaderboard = encode_leaderboard(&board);
        let total_time = tick_start.elapsed();

        if snapshot.tick % METRICS_INTERVAL == 0 {
            let counts = self.world.counts();
            debug!(
                "Tick #{}: {:.2}ms total | sim={:.2}ms avg={:.2}ms | {} cells, {} food, {} sessions, {} clients",
                snapshot.tick,
                total_time.as_secs_f64() * 1000.0,
                sim_time.as_secs_f64() * 1000.0,
                self.update_time_avg,
                counts.cells,
                counts.food,
                counts.sessions,
                self.clients.len()
            );
        }

        PendingBroadcasts { world_update, leaderboard }
    }
}

/// Encode a tick snapshot as a WorldUpdate packet.
pub fn encode_world_update(snapshot: &WorldSnapshot) -> Bytes {
    let eat_records: Vec<EatRecord> = snapshot
        .eaten
        .iter()
        .map(|&(eaten_id, eater_id)| EatRecord { eater_id, eaten_id })
        .collect();

    let cells: Vec<UpdateCell> = snapshot
        .cells
        .iter()
        .map(|cell| UpdateCell {
            id: cell.id,
            owner_id: cell.owner_id,
            x: cell.position.x as f32,
            y: cell.position.y as f32,
            radius: cell.radius as f32,
            score: cell.score as f32,
            color: cell.color,
            name: cell.name.clone(),
        })
        .collect();

    let food: Vec<UpdateFood> = snapshot
        .food
        .iter()
        .map(|item| UpdateFood {
            id: item.id,
            x: item.position.x as f32,
            y: item.position.y as f32,
            radius: item.radius as f32,
            color: item.color,
        })
        .collect();

    packets::build_world_update(snapshot.tick, &eat_records, &cells, &food).finish()
}

/// Encode ranked entries as a Leaderboard packet.
pub fn encode_leaderboard(entries: &[LeaderboardEntry]) -> Bytes {
    let rows: Vec<LeaderboardRow> = entries
        .iter()
        .map(|e| LeaderboardRow {
            id: e.id,
            name: e.name.clone(),
            score: e.score as f32,
        })
        .collect();
    packets::build_leaderboard(&rows).finish()
}

/// Run the main game loop.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_interval_ms: f64) {
    let period = Duration::from_secs_f64(tick_interval_ms / 1000.0);
    let mut ticker = interval_at(Instant::now() + period, period);
    // Skip missed ticks instead of bursting to catch up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    {
        let game = state.read().await;
        let counts = game.world.counts();
        info!("World initialized: {} food, tick every {:.2}ms", counts.food, tick_interval_ms);
    }

    loop {
        let scheduled = ticker.tick().await;

        // Hibernate when no users are connected to reduce CPU usage
        {
            let game = state.read().await;
            if game.clients.is_empty() {
                drop(game);
                sleep((period * 4).max(Duration::from_millis(100))).await;
                continue;
            }
        }

        // Drain any backlog so we always process the most recent tick
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!("Skipped {} ticks to stay current (lag: {:?})", skipped, Instant::now().saturating_duration_since(scheduled));
        }

        let (broadcasts, world_tx, lb_tx) = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let now_ms = game.uptime_ms();
            let broadcasts = game.tick(now_ms);
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = tick_interval_ms * 0.9;
            if tick_ms > tick_budget {
                let counts = game.world.counts();
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} clients, {} cells total",
                    game.world.tick_count(),
                    tick_ms,
                    tick_budget,
                    game.clients.len(),
                    counts.cells
                );
            }

            (broadcasts, game.world_tx.clone(), game.lb_tx.clone())
        }; // Write lock released here

        // No receivers is fine; clients may all be mid-handshake
        let _ = world_tx.send(broadcasts.world_update);
        let _ = lb_tx.send(broadcasts.leaderboard);
    }
}
