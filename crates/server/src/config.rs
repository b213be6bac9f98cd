//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub border: BorderConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Server name shown in logs.
    #[serde(default = "default_name")]
    pub name: String,
}

impl ServerConfig {
    /// Fixed tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> f64 {
        1000.0 / self.tick_rate.max(1) as f64
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            tick_rate: default_tick_rate(),
            name: default_name(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    100
}
fn default_tick_rate() -> u32 {
    60
}
fn default_name() -> String {
    "Cell Arena".to_string()
}

/// World border configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorderConfig {
    #[serde(default = "default_border_size")]
    pub width: f64,
    #[serde(default = "default_border_size")]
    pub height: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: default_border_size(),
            height: default_border_size(),
        }
    }
}

fn default_border_size() -> f64 {
    3000.0
}

/// Player cell physics and split/merge tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    /// Radius of the main cell created on join.
    #[serde(default = "default_start_radius")]
    pub start_radius: f64,
    /// Cells below this radius do not split.
    #[serde(default = "default_min_split_radius")]
    pub min_split_radius: f64,
    /// Per-owner cell cap.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
    /// Launch speed given to the cell spawned by a split.
    #[serde(default = "default_split_impulse")]
    pub split_impulse: f64,
    /// Both cells must be older than this (since split) to merge.
    #[serde(default = "default_merge_time_ms")]
    pub merge_time_ms: f64,
    /// Cohesion pull starts once a cell is this old (since split).
    #[serde(default = "default_pull_delay_ms")]
    pub pull_delay_ms: f64,
    /// Velocity added per tick toward the main cell.
    #[serde(default = "default_pull_strength")]
    pub pull_strength: f64,
    /// Fraction of the sibling overlap corrected per tick.
    #[serde(default = "default_repulsion_stiffness")]
    pub repulsion_stiffness: f64,
    /// Fraction of the closing speed kept after a sibling contact.
    #[serde(default = "default_repulsion_damping")]
    pub repulsion_damping: f64,
    /// Velocity added per tick along the steering direction.
    #[serde(default = "default_acceleration")]
    pub acceleration: f64,
    /// Velocity multiplier applied after each move.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// An attacker must exceed the victim's radius by this factor.
    #[serde(default = "default_absorb_ratio")]
    pub absorb_ratio: f64,
    /// Color used when a join carries no valid color.
    #[serde(default = "default_color")]
    pub default_color: String,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            start_radius: default_start_radius(),
            min_split_radius: default_min_split_radius(),
            max_cells: default_max_cells(),
            split_impulse: default_split_impulse(),
            merge_time_ms: default_merge_time_ms(),
            pull_delay_ms: default_pull_delay_ms(),
            pull_strength: default_pull_strength(),
            repulsion_stiffness: default_repulsion_stiffness(),
            repulsion_damping: default_repulsion_damping(),
            acceleration: default_acceleration(),
            friction: default_friction(),
            absorb_ratio: default_absorb_ratio(),
            default_color: default_color(),
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_start_radius() -> f64 {
    40.0
}
fn default_min_split_radius() -> f64 {
    40.0
}
fn default_max_cells() -> usize {
    20
}
fn default_split_impulse() -> f64 {
    20.0
}
fn default_merge_time_ms() -> f64 {
    10_000.0
}
fn default_pull_delay_ms() -> f64 {
    2_000.0
}
fn default_pull_strength() -> f64 {
    0.05
}
fn default_repulsion_stiffness() -> f64 {
    1.0
}
fn default_repulsion_damping() -> f64 {
    0.6
}
fn default_acceleration() -> f64 {
    0.2
}
fn default_friction() -> f64 {
    0.9
}
fn default_absorb_ratio() -> f64 {
    1.1
}
fn default_color() -> String {
    "#FF0000".to_string()
}
fn default_max_name_length() -> usize {
    30
}

/// Food configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Regeneration tops the pellet count back up to this amount every tick.
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_food_min_radius")]
    pub min_radius: f64,
    /// Exclusive upper bound.
    #[serde(default = "default_food_max_radius")]
    pub max_radius: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            max_amount: default_food_max_amount(),
            min_radius: default_food_min_radius(),
            max_radius: default_food_max_radius(),
        }
    }
}

fn default_food_max_amount() -> usize {
    500
}
fn default_food_min_radius() -> f64 {
    1.0
}
fn default_food_max_radius() -> f64 {
    3.0
}

/// Leaderboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_leaderboard_size")]
    pub size: usize,
    /// Shown when a session's first cell no longer exists.
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: default_leaderboard_size(),
            placeholder_name: default_placeholder_name(),
        }
    }
}

fn default_leaderboard_size() -> usize {
    10
}
fn default_placeholder_name() -> String {
    "Anonymous".to_string()
}
