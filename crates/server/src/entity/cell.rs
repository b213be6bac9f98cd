//! Player-controlled cell.

use glam::DVec2;
use protocol::Color;

use crate::config::PlayerConfig;

/// Speed cap for a cell of the given radius: larger cells move slower,
/// never below 1 unit per tick.
#[inline]
pub fn speed_cap(radius: f64) -> f64 {
    (10.0 - radius / 50.0).max(1.0)
}

/// One circular mass controlled by a player.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Unique cell ID.
    pub id: u32,
    /// Session that controls this cell.
    pub owner_id: u32,
    /// Display name, copied from the owner on creation.
    pub name: String,
    /// Display color, copied from the owner on creation.
    pub color: Color,
    /// Position in world coordinates.
    pub position: DVec2,
    /// Integrated physical velocity (units per tick).
    pub velocity: DVec2,
    /// Last commanded heading (unit vector or zero).
    pub direction: DVec2,
    pub radius: f64,
    /// Additive ledger; only `grow` and `split` touch it.
    pub score: f64,
    pub alive: bool,
    /// Simulation time (ms) of the latest split affecting this cell.
    pub split_time: Option<f64>,
}

impl Cell {
    /// Create a new cell at rest with no heading.
    pub fn new(id: u32, owner_id: u32, name: String, color: Color, position: DVec2, radius: f64) -> Self {
        Self {
            id,
            owner_id,
            name,
            color,
            position,
            velocity: DVec2::ZERO,
            direction: DVec2::ZERO,
            radius,
            score: radius.floor(),
            alive: true,
            split_time: None,
        }
    }

    /// Milliseconds since this cell was last split. A cell that never split
    /// is infinitely old.
    #[inline]
    pub fn age_since_split(&self, now_ms: f64) -> f64 {
        match self.split_time {
            Some(t) => now_ms - t,
            None => f64::INFINITY,
        }
    }

    /// Store a steering heading, normalized. A zero vector means "stop steering".
    pub fn set_direction(&mut self, dx: f64, dy: f64) {
        let length = dx.hypot(dy);
        self.direction = if length > 0.0 && length.is_finite() {
            DVec2::new(dx / length, dy / length)
        } else {
            DVec2::ZERO
        };
    }

    /// Rescale velocity so its magnitude does not exceed `max`.
    #[inline]
    pub fn clamp_velocity(&mut self, max: f64) {
        let len = self.velocity.length();
        if len > max {
            self.velocity = self.velocity / len * max;
        }
    }

    /// Advance one tick: accelerate, clamp, translate, then apply friction.
    pub fn integrate(&mut self, physics: &PlayerConfig) {
        if !self.alive {
            return;
        }

        let speed = speed_cap(self.radius);
        self.velocity += self.direction * physics.acceleration;
        self.clamp_velocity(speed);
        self.position += self.velocity;
        self.velocity *= physics.friction;
    }

    /// Add to both radius and score.
    #[inline]
    pub fn grow(&mut self, amount: f64) {
        self.radius += amount;
        self.score += amount;
    }
}
