//! Food pellet.

use glam::DVec2;
use protocol::Color;

/// A static pellet; never changes after creation and is removed exactly once
/// when a cell eats it.
#[derive(Debug, Clone)]
pub struct Food {
    pub id: u32,
    pub position: DVec2,
    pub radius: f64,
    /// Reward granted to the eater (`floor(radius)`).
    pub points: f64,
    pub color: Color,
}

impl Food {
    /// Create a new food pellet. Points are derived from the radius.
    pub fn new(id: u32, position: DVec2, radius: f64, color: Color) -> Self {
        Self {
            id,
            position,
            radius,
            points: radius.floor(),
            color,
        }
    }

    /// Whether a cell at `center` with `radius` overlaps this pellet.
    #[inline]
    pub fn touches(&self, center: DVec2, radius: f64) -> bool {
        center.distance(self.position) < radius + self.radius
    }
}
