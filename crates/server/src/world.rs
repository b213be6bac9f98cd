//! World state and the fixed-step simulation.
//!
//! The world owns every cell, every food pellet and the session registry.
//! Session operations (`join`, `leave`, `set_direction`, `split`) and `tick`
//! are the only writers; the gateway serializes them so a tick never
//! observes a half-applied command.

use crate::collision::{can_absorb, can_merge, check_contact, separate};
use crate::config::{Config, FoodConfig, PlayerConfig};
use crate::entity::{speed_cap, Cell, Food};
use crate::session::{Session, SessionRegistry};
use fixedbitset::FixedBitSet;
use glam::DVec2;
use protocol::Color;
use rand::Rng;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tracing::{debug, info};

/// World border bounds. The map spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub width: f64,
    pub height: f64,
}

impl WorldBorder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: width,
            max_y: height,
            width,
            height,
        }
    }

    /// Center of the map (spawn point).
    #[inline]
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.min_x + self.width / 2.0, self.min_y + self.height / 2.0)
    }

    /// Get a random position within the border.
    #[inline]
    pub fn random_position(&self, rng: &mut impl Rng) -> DVec2 {
        DVec2::new(
            self.min_x + rng.random::<f64>() * self.width,
            self.min_y + rng.random::<f64>() * self.height,
        )
    }

    /// Keep a circle's full extent inside the border.
    ///
    /// Applied as `max(min + r, min(max - r, p))`; a circle wider than the
    /// map sticks to the low edge.
    #[inline]
    pub fn clamp_circle(&self, position: DVec2, radius: f64) -> DVec2 {
        DVec2::new(
            position.x.min(self.max_x - radius).max(self.min_x + radius),
            position.y.min(self.max_y - radius).max(self.min_y + radius),
        )
    }
}

/// Read-only result of one tick, handed to the gateway for broadcast.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    /// Tick number that produced this snapshot.
    pub tick: u64,
    /// Every live cell.
    pub cells: Vec<Cell>,
    /// Every food pellet.
    pub food: Vec<Food>,
    /// Cells merged or absorbed this tick: (eaten_id, eater_id).
    pub eaten: Vec<(u32, u32)>,
}

/// Entity count statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldCounts {
    pub cells: usize,
    pub food: usize,
    pub sessions: usize,
}

/// The game world containing all cells.
#[derive(Debug)]
pub struct World {
    /// Next node ID to assign (cells and food share the space).
    next_node_id: u32,
    /// Ticks advanced so far.
    tick_count: u64,
    /// Simulation clock (ms) as of the latest tick.
    now_ms: f64,

    /// All live cells by ID. IDs are allocated in increasing order, so
    /// iteration follows creation order.
    cells: BTreeMap<u32, Cell>,
    /// Food pellets in creation order.
    food: Vec<Food>,
    /// Owner -> cell list.
    sessions: SessionRegistry,

    /// World border.
    pub border: WorldBorder,

    player: PlayerConfig,
    food_config: FoodConfig,

    // Merges/absorptions recorded during the current tick
    eaten_this_tick: Vec<(u32, u32)>,
}

impl World {
    /// Create a new world and stock it with food.
    pub fn new(config: &Config) -> Self {
        let mut world = Self {
            next_node_id: 1,
            tick_count: 0,
            now_ms: 0.0,
            cells: BTreeMap::new(),
            food: Vec::with_capacity(config.food.max_amount),
            sessions: SessionRegistry::new(config.player.max_cells),
            border: WorldBorder::new(config.border.width, config.border.height),
            player: config.player.clone(),
            food_config: config.food.clone(),
            eaten_this_tick: Vec::new(),
        };
        world.regenerate_food();
        world
    }

    /// Get the next node ID.
    fn next_id(&mut self) -> u32 {
        let id = self.next_node_id;
        self.next_node_id = self.next_node_id.wrapping_add(1);
        if self.next_node_id == 0 {
            self.next_node_id = 1; // Skip 0
        }
        id
    }

    /// Simulation clock as of the latest tick.
    #[inline]
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Move the simulation clock forward to `now_ms` between ticks, so
    /// commands applied before the next tick are stamped with the live time.
    /// Never moves the clock backwards.
    pub fn sync_clock(&mut self, now_ms: f64) {
        if now_ms > self.now_ms {
            self.now_ms = now_ms;
        }
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Get a cell by ID.
    #[inline]
    pub fn cell(&self, id: u32) -> Option<&Cell> {
        self.cells.get(&id)
    }

    /// Get a mutable cell by ID.
    #[inline]
    pub fn cell_mut(&mut self, id: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&id)
    }

    /// Iterate over all live cells in creation order.
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    #[inline]
    pub fn food(&self) -> &[Food] {
        &self.food
    }

    #[inline]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    #[inline]
    pub fn session(&self, owner_id: u32) -> Option<&Session> {
        self.sessions.get(owner_id)
    }

    #[inline]
    pub fn counts(&self) -> WorldCounts {
        WorldCounts {
            cells: self.cells.len(),
            food: self.food.len(),
            sessions: self.sessions.len(),
        }
    }

    /// Start a session with one main cell at the map center. Joining again
    /// with a live session replaces it. Returns the main cell ID.
    pub fn join(&mut self, owner_id: u32, name: &str, color: Color) -> u32 {
        if self.sessions.contains(owner_id) {
            debug!("Owner {} joined again, replacing its session", owner_id);
            self.leave(owner_id);
        }

        let id = self.next_id();
        let cell = Cell::new(
            id,
            owner_id,
            name.to_string(),
            color,
            self.border.center(),
            self.player.start_radius,
        );
        self.cells.insert(id, cell);
        self.sessions.register(owner_id, id);

        info!("Spawned main cell {} for owner {} ({:?})", id, owner_id, name);
        id
    }

    /// End a session and delete every cell it owns. Returns false if the
    /// owner had no session.
    pub fn leave(&mut self, owner_id: u32) -> bool {
        let Some(session) = self.sessions.remove(owner_id) else {
            return false;
        };
        for cell_id in &session.cells {
            if let Some(mut cell) = self.cells.remove(cell_id) {
                cell.alive = false;
            }
        }
        info!("Owner {} left, removed {} cells", owner_id, session.cells.len());
        true
    }

    /// Steer every live cell of an owner along `(dx, dy)`, normalized.
    pub fn set_direction(&mut self, owner_id: u32, dx: f64, dy: f64) {
        let Some(session) = self.sessions.get(owner_id) else {
            return;
        };
        for cell_id in &session.cells {
            if let Some(cell) = self.cells.get_mut(cell_id) {
                if cell.alive {
                    cell.set_direction(dx, dy);
                }
            }
        }
    }

    /// Split every eligible cell of an owner. Returns the new cell IDs.
    ///
    /// Eligibility is decided against the cell list as it was when the call
    /// started, so cells spawned here cannot split again in the same call.
    /// At most `max_cells - current` cells split, keeping the cap intact.
    pub fn split(&mut self, owner_id: u32) -> Vec<u32> {
        let Some(current_ids) = self.sessions.snapshot(owner_id) else {
            return Vec::new();
        };
        let max_cells = self.sessions.max_cells();
        if current_ids.len() >= max_cells {
            return Vec::new();
        }
        let mut budget = max_cells - current_ids.len();

        let min_split_radius = self.player.min_split_radius;
        let split_impulse = self.player.split_impulse;
        let now = self.now_ms;
        let mut rng = rand::rng();
        let mut new_cells = Vec::new();

        for cell_id in current_ids {
            if budget == 0 {
                break;
            }

            let (position, direction, new_radius, name, color) = match self.cells.get_mut(&cell_id) {
                Some(cell) if cell.alive && cell.radius >= min_split_radius => {
                    let new_radius = cell.radius / 2.0;
                    cell.radius = new_radius;
                    cell.score = new_radius.floor();
                    cell.split_time = Some(now);
                    (cell.position, cell.direction, new_radius, cell.name.clone(), cell.color)
                }
                _ => continue,
            };

            let angle = if direction == DVec2::ZERO {
                rng.random_range(0.0..TAU)
            } else {
                direction.y.atan2(direction.x)
            };
            let heading = DVec2::from_angle(angle);

            let new_id = self.next_id();
            let mut child = Cell::new(
                new_id,
                owner_id,
                name,
                color,
                position + heading * (new_radius * 2.0),
                new_radius,
            );
            child.velocity = heading * split_impulse;
            child.split_time = Some(now);
            self.cells.insert(new_id, child);

            new_cells.push(new_id);
            budget -= 1;
        }

        self.sessions.append(owner_id, &new_cells);
        if !new_cells.is_empty() {
            debug!("Owner {} split into {} new cells", owner_id, new_cells.len());
        }
        new_cells
    }

    /// Advance the simulation one fixed step at simulation time `now_ms`.
    pub fn tick(&mut self, now_ms: f64) -> WorldSnapshot {
        self.tick_count += 1;
        self.now_ms = now_ms;
        self.eaten_this_tick.clear();

        self.integrate_cells();
        self.apply_cohesion();
        self.resolve_sibling_overlaps();
        self.consume_food();
        self.process_collisions();
        self.regenerate_food();

        self.snapshot()
    }

    /// Current state as a snapshot.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick_count,
            cells: self.cells.values().filter(|c| c.alive).cloned().collect(),
            food: self.food.clone(),
            eaten: self.eaten_this_tick.clone(),
        }
    }

    /// Phase 1: move every cell, then keep it inside the border.
    fn integrate_cells(&mut self) {
        for cell in self.cells.values_mut() {
            if !cell.alive {
                continue;
            }
            cell.integrate(&self.player);
            cell.position = self.border.clamp_circle(cell.position, cell.radius);
        }
    }

    /// Phase 2: pull split cells back toward their main cell once the pull delay has passed.
    fn apply_cohesion(&mut self) {
        let pull_delay = self.player.pull_delay_ms;
        let pull_strength = self.player.pull_strength;
        let now = self.now_ms;

        for (_, session) in self.sessions.iter() {
            if session.cells.len() < 2 {
                continue;
            }
            let main_position = match self.cells.get(&session.cells[0]) {
                Some(main) if main.alive => main.position,
                _ => continue,
            };

            for cell_id in &session.cells[1..] {
                let Some(cell) = self.cells.get_mut(cell_id) else {
                    continue;
                };
                if !cell.alive || cell.age_since_split(now) < pull_delay {
                    continue;
                }

                let toward = main_position - cell.position;
                let mut dist = toward.length();
                if dist == 0.0 {
                    dist = 1.0;
                }
                cell.velocity += toward / dist * pull_strength;
                cell.clamp_velocity(speed_cap(cell.radius));
            }
        }
    }

    /// Phase 3: push overlapping siblings apart and damp their closing speed.
    fn resolve_sibling_overlaps(&mut self) {
        let stiffness = self.player.repulsion_stiffness;
        let damping = self.player.repulsion_damping;

        for (_, session) in self.sessions.iter() {
            let ids = &session.cells;
            for i in 0..ids.len() {
                for j in (i + 1)..ids.len() {
                    let (Some(a), Some(b)) = (self.cells.get(&ids[i]), self.cells.get(&ids[j])) else {
                        continue;
                    };
                    if !a.alive || !b.alive {
                        continue;
                    }

                    let contact = check_contact(a.position, a.radius, b.position, b.radius);
                    let Some(sep) = separate(&contact, a.velocity, b.velocity, stiffness, damping) else {
                        continue;
                    };

                    if let Some(a) = self.cells.get_mut(&ids[i]) {
                        a.position -= sep.push;
                        a.velocity -= sep.impulse;
                    }
                    if let Some(b) = self.cells.get_mut(&ids[j]) {
                        b.position += sep.push;
                        b.velocity += sep.impulse;
                    }
                }
            }
        }
    }

    /// Phase 4: each cell, in order, eats every pellet it touches.
    fn consume_food(&mut self) {
        if self.food.is_empty() {
            return;
        }

        let mut eaten = FixedBitSet::with_capacity(self.food.len());
        for cell in self.cells.values_mut() {
            if !cell.alive {
                continue;
            }
            for (idx, item) in self.food.iter().enumerate() {
                if eaten.contains(idx) {
                    continue;
                }
                // Radius grows as pellets are eaten, widening later checks this tick
                if item.touches(cell.position, cell.radius) {
                    cell.grow(item.points);
                    eaten.insert(idx);
                }
            }
        }

        if eaten.is_clear() {
            return;
        }
        let mut idx = 0;
        self.food.retain(|_| {
            let keep = !eaten.contains(idx);
            idx += 1;
            keep
        });
    }

    /// Phase 5: pairwise merge (same owner) and absorption (different owners).
    fn process_collisions(&mut self) {
        let merge_time = self.player.merge_time_ms;
        let ratio = self.player.absorb_ratio;
        let now = self.now_ms;

        // Cells removed below vanish from the map, so later pairs skip them
        let ids: Vec<u32> = self.cells.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (Some(a), Some(b)) = (self.cells.get(&ids[i]), self.cells.get(&ids[j])) else {
                    continue;
                };
                if !a.alive || !b.alive {
                    continue;
                }

                let distance = a.position.distance(b.position);
                if a.owner_id == b.owner_id {
                    let merge = can_merge(
                        a.age_since_split(now),
                        b.age_since_split(now),
                        merge_time,
                        distance,
                        a.radius + b.radius,
                    );
                    if merge {
                        self.consume_cell(ids[i], ids[j]);
                    }
                } else if can_absorb(a.radius, b.radius, distance, ratio) {
                    self.consume_cell(ids[i], ids[j]);
                } else if can_absorb(b.radius, a.radius, distance, ratio) {
                    self.consume_cell(ids[j], ids[i]);
                }
            }
        }
    }

    /// Remove `eaten_id` from the world and its session, growing `eater_id` by its radius.
    fn consume_cell(&mut self, eater_id: u32, eaten_id: u32) {
        let Some(mut eaten) = self.cells.remove(&eaten_id) else {
            return;
        };
        eaten.alive = false;

        let Some(eater) = self.cells.get_mut(&eater_id) else {
            return;
        };
        eater.grow(eaten.radius);
        let same_owner = eater.owner_id == eaten.owner_id;

        let emptied = self.sessions.detach(eaten.owner_id, eaten_id);
        self.eaten_this_tick.push((eaten_id, eater_id));

        if same_owner {
            debug!("Cell {} merged into {} (owner {})", eaten_id, eater_id, eaten.owner_id);
        } else {
            debug!(
                "Cell {} (owner {}) absorbed by {} (owner {})",
                eaten_id, eaten.owner_id, eater_id, eater.owner_id
            );
            if emptied {
                info!("Owner {} lost its last cell", eaten.owner_id);
            }
        }
    }

    /// Phase 6: top food back up to the configured amount.
    fn regenerate_food(&mut self) {
        let max_amount = self.food_config.max_amount;
        let min_radius = self.food_config.min_radius;
        let max_radius = self.food_config.max_radius;

        let mut rng = rand::rng();
        while self.food.len() < max_amount {
            let radius = if max_radius > min_radius {
                rng.random_range(min_radius..max_radius)
            } else {
                min_radius
            };
            let position = self.border.random_position(&mut rng);
            let color = random_color(&mut rng);
            let id = self.next_id();
            self.food.push(Food::new(id, position, radius, color));
        }
    }
}

/// Generate a random color.
#[inline]
pub fn random_color(rng: &mut impl Rng) -> Color {
    Color::new(rng.random(), rng.random(), rng.random())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_without_food() -> Config {
        let mut config = Config::default();
        config.food.max_amount = 0;
        config
    }

    fn red() -> Color {
        Color::new(255, 0, 0)
    }

    /// Put a cell somewhere at rest.
    fn place(world: &mut World, id: u32, x: f64, y: f64) {
        let cell = world.cell_mut(id).unwrap();
        cell.position = DVec2::new(x, y);
        cell.velocity = DVec2::ZERO;
        cell.direction = DVec2::ZERO;
    }

    #[test]
    fn test_border_clamp_matches_reference_order() {
        let border = WorldBorder::new(100.0, 100.0);
        assert_eq!(border.clamp_circle(DVec2::new(-5.0, 120.0), 10.0), DVec2::new(10.0, 90.0));
        // Wider than the map: sticks to the low edge
        assert_eq!(border.clamp_circle(DVec2::new(50.0, 50.0), 80.0), DVec2::new(80.0, 80.0));
    }

    #[test]
    fn test_new_world_is_stocked_with_food() {
        let world = World::new(&Config::default());
        assert_eq!(world.food().len(), 500);
        for item in world.food() {
            assert!(item.radius >= 1.0 && item.radius < 3.0);
            assert_eq!(item.points, item.radius.floor());
            assert!(item.position.x >= 0.0 && item.position.x <= 3000.0);
            assert!(item.position.y >= 0.0 && item.position.y <= 3000.0);
        }
    }

    #[test]
    fn test_join_spawns_main_cell_at_center() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());

        let cell = world.cell(id).unwrap();
        assert_eq!(cell.position, DVec2::new(1500.0, 1500.0));
        assert_eq!(cell.radius, 40.0);
        assert_eq!(cell.score, 40.0);
        assert_eq!(cell.direction, DVec2::ZERO);
        assert_eq!(cell.split_time, None);
        assert_eq!(cell.name, "Ana");
        assert_eq!(cell.color, red());
        assert_eq!(world.session(1).unwrap().cells, vec![id]);
    }

    #[test]
    fn test_rejoin_replaces_session() {
        let mut world = World::new(&config_without_food());
        let first = world.join(1, "Ana", red());
        world.cell_mut(first).unwrap().radius = 100.0;
        world.split(1);
        assert_eq!(world.counts().cells, 2);

        let second = world.join(1, "Ana again", red());
        assert_eq!(world.counts().cells, 1);
        assert!(world.cell(first).is_none());
        assert_eq!(world.session(1).unwrap().cells, vec![second]);
    }

    #[test]
    fn test_leave_removes_cells_and_session() {
        let mut world = World::new(&config_without_food());
        let keep = world.join(2, "Bo", red());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 100.0;
        world.split(1);

        assert!(world.leave(1));
        assert!(world.session(1).is_none());
        assert_eq!(world.cells().map(|c| c.id).collect::<Vec<_>>(), vec![keep]);
        assert!(!world.leave(1));
    }

    #[test]
    fn test_set_direction_applies_to_every_cell() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 100.0;
        world.split(1);

        world.set_direction(1, 0.0, -5.0);
        for cell in world.cells() {
            assert_eq!(cell.direction, DVec2::new(0.0, -1.0));
        }

        world.set_direction(1, 0.0, 0.0);
        for cell in world.cells() {
            assert_eq!(cell.direction, DVec2::ZERO);
        }

        // Unknown owner is a no-op
        world.set_direction(99, 1.0, 0.0);
    }

    #[test]
    fn test_split_below_threshold_is_noop() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 39.9;

        assert!(world.split(1).is_empty());
        let cell = world.cell(id).unwrap();
        assert_eq!(cell.radius, 39.9);
        assert_eq!(cell.split_time, None);
        assert_eq!(world.session(1).unwrap().cells, vec![id]);
        assert!(world.split(42).is_empty());
    }

    #[test]
    fn test_split_halves_and_launches() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 100.0;
        world.set_direction(1, 1.0, 0.0);
        let origin = world.cell(id).unwrap().position;

        let new_ids = world.split(1);
        assert_eq!(new_ids.len(), 1);
        let parent = world.cell(id).unwrap();
        let child = world.cell(new_ids[0]).unwrap();

        assert_eq!(parent.radius, 50.0);
        assert_eq!(parent.score, 50.0);
        assert_eq!(parent.split_time, Some(0.0));
        assert_eq!(child.radius, 50.0);
        assert_eq!(child.owner_id, 1);
        assert_eq!(child.split_time, Some(0.0));
        // Launched along the parent's heading, but not steered by it
        assert_eq!(child.direction, DVec2::ZERO);
        assert!((child.position - (origin + DVec2::new(100.0, 0.0))).length() < 1e-9);
        assert!((child.velocity.length() - 20.0).abs() < 1e-9);
        assert!(child.velocity.x > 0.0);
        assert_eq!(world.session(1).unwrap().cells, vec![id, new_ids[0]]);
    }

    #[test]
    fn test_split_without_heading_uses_random_angle() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 80.0;
        let origin = world.cell(id).unwrap().position;

        let new_ids = world.split(1);
        let child = world.cell(new_ids[0]).unwrap();
        assert!((child.position.distance(origin) - 80.0).abs() < 1e-9);
        assert!((child.velocity.length() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_double_split_does_not_chain() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 160.0;

        assert_eq!(world.split(1).len(), 1);
        assert_eq!(world.counts().cells, 2);
        // Both 80-radius cells split next time, but their children do not
        assert_eq!(world.split(1).len(), 2);
        assert_eq!(world.counts().cells, 4);
        assert!(world.cells().all(|c| c.radius == 40.0));
    }

    #[test]
    fn test_split_respects_cell_cap() {
        let mut config = config_without_food();
        config.player.max_cells = 3;
        let mut world = World::new(&config);
        let id = world.join(1, "Ana", red());
        world.cell_mut(id).unwrap().radius = 400.0;

        world.split(1);
        assert_eq!(world.session(1).unwrap().cells.len(), 2);
        // Two eligible cells, room for one more
        world.split(1);
        assert_eq!(world.session(1).unwrap().cells.len(), 3);
        // At the cap: nothing happens
        let before: Vec<f64> = world.cells().map(|c| c.radius).collect();
        assert!(world.split(1).is_empty());
        let after: Vec<f64> = world.cells().map(|c| c.radius).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_tick_keeps_cells_inside_border() {
        let mut world = World::new(&config_without_food());
        let id = world.join(1, "Ana", red());
        place(&mut world, id, 5.0, 2995.0);
        world.tick(16.0);
        let cell = world.cell(id).unwrap();
        assert_eq!(cell.position, DVec2::new(40.0, 2960.0));
    }

    #[test]
    fn test_cohesion_waits_for_pull_delay() {
        let mut world = World::new(&config_without_food());
        let main = world.join(1, "Ana", red());
        world.cell_mut(main).unwrap().radius = 100.0;
        let child = world.split(1)[0];
        place(&mut world, main, 500.0, 500.0);
        place(&mut world, child, 800.0, 500.0);

        world.tick(1000.0);
        assert_eq!(world.cell(child).unwrap().velocity, DVec2::ZERO);

        world.tick(2000.0);
        let pulled = world.cell(child).unwrap().velocity;
        assert!((pulled.x - (-0.05)).abs() < 1e-12);
        assert_eq!(pulled.y, 0.0);
        // Main cell itself is never pulled
        assert_eq!(world.cell(main).unwrap().velocity, DVec2::ZERO);
    }

    #[test]
    fn test_cohesion_keeps_speed_under_cap() {
        let mut world = World::new(&config_without_food());
        let main = world.join(1, "Ana", red());
        world.cell_mut(main).unwrap().radius = 100.0;
        let child = world.split(1)[0];
        place(&mut world, main, 500.0, 500.0);
        place(&mut world, child, 800.0, 500.0);
        // Radius 50 caps speed at 9; already moving at the cap
        world.cell_mut(child).unwrap().velocity = DVec2::new(0.0, 9.0);
        world.now_ms = 5000.0;

        world.apply_cohesion();

        let velocity = world.cell(child).unwrap().velocity;
        assert!((velocity.length() - speed_cap(50.0)).abs() < 1e-12);
        assert!(velocity.x < 0.0);
    }

    #[test]
    fn test_split_after_idle_uses_live_clock() {
        let mut world = World::new(&config_without_food());
        let main = world.join(1, "Ana", red());
        world.cell_mut(main).unwrap().radius = 100.0;
        world.tick(16.0);

        // Long gap with no ticks, then a split stamped at the live time
        world.sync_clock(60_000.0);
        let child = world.split(1)[0];
        assert_eq!(world.cell(child).unwrap().split_time, Some(60_000.0));
        place(&mut world, main, 500.0, 500.0);
        place(&mut world, child, 800.0, 500.0);

        world.tick(60_016.0);
        assert_eq!(world.cell(child).unwrap().velocity, DVec2::ZERO);
    }

    #[test]
    fn test_sync_clock_never_goes_back() {
        let mut world = World::new(&config_without_food());
        world.tick(500.0);
        world.sync_clock(100.0);
        assert_eq!(world.now_ms(), 500.0);
        world.sync_clock(900.0);
        assert_eq!(world.now_ms(), 900.0);
    }

    #[test]
    fn test_siblings_repel_before_merge_time() {
        let mut world = World::new(&config_without_food());
        let main = world.join(1, "Ana", red());
        world.cell_mut(main).unwrap().radius = 100.0;
        let child = world.split(1)[0];
        place(&mut world, main, 500.0, 500.0);
        place(&mut world, child, 540.0, 500.0);

        world.tick(100.0);
        let a = world.cell(main).unwrap();
        let b = world.cell(child).unwrap();
        assert!((a.position.x - 470.0).abs() < 1e-9);
        assert!((b.position.x - 570.0).abs() < 1e-9);
        assert_eq!(world.counts().cells, 2);
    }

    #[test]
    fn test_overlapping_siblings_never_merge_early() {
        let mut world = World::new(&config_without_food());
        let main = world.join(1, "Ana", red());
        world.cell_mut(main).unwrap().radius = 100.0;
        let child = world.split(1)[0];
        place(&mut world, main, 500.0, 500.0);
        place(&mut world, child, 500.0, 500.0);

        world.tick(10_000.0);
        assert_eq!(world.counts().cells, 2);
        assert!(world.snapshot().eaten.is_empty());
    }

    /// Pellets this far from the edges can be reached by a start-sized cell.
    fn is_interior(item: &Food) -> bool {
        (100.0..=2900.0).contains(&item.position.x) && (100.0..=2900.0).contains(&item.position.y)
    }

    #[test]
    fn test_food_is_eaten_and_topped_up() {
        let mut config = Config::default();
        config.food.max_amount = 50;
        let mut world = World::new(&config);
        let id = world.join(1, "Ana", red());
        let target = world.food().iter().find(|f| is_interior(f)).unwrap().clone();
        place(&mut world, id, target.position.x, target.position.y);
        world.cell_mut(id).unwrap().radius = 40.0;

        world.tick(16.0);
        let cell = world.cell(id).unwrap();
        assert!(cell.radius >= 40.0 + target.points);
        assert!(world.food().iter().all(|f| f.id != target.id));
        assert_eq!(world.food().len(), 50);
    }

    #[test]
    fn test_food_goes_to_first_cell_only() {
        let mut config = Config::default();
        config.food.max_amount = 1;
        let mut world = loop {
            let world = World::new(&config);
            if is_interior(&world.food()[0]) {
                break world;
            }
        };
        let a = world.join(1, "Ana", red());
        let b = world.join(2, "Bo", red());
        let pellet = world.food()[0].clone();
        place(&mut world, a, pellet.position.x, pellet.position.y);
        place(&mut world, b, pellet.position.x, pellet.position.y);
        // Equal sizes: neither absorbs the other
        world.tick(16.0);

        let total_growth = world.cell(a).unwrap().radius + world.cell(b).unwrap().radius - 80.0;
        assert_eq!(total_growth, pellet.points);
        assert_eq!(world.cell(a).unwrap().radius, 40.0 + pellet.points);
    }

    #[test]
    fn test_absorbed_owner_keeps_empty_session() {
        let mut world = World::new(&config_without_food());
        let big = world.join(1, "Ana", red());
        let small = world.join(2, "Bo", red());
        world.cell_mut(big).unwrap().radius = 100.0;
        world.cell_mut(big).unwrap().score = 100.0;
        place(&mut world, big, 1000.0, 1000.0);
        place(&mut world, small, 1010.0, 1000.0);

        let snapshot = world.tick(16.0);
        assert!(world.cell(small).is_none());
        assert_eq!(world.cell(big).unwrap().radius, 140.0);
        assert_eq!(world.cell(big).unwrap().score, 140.0);
        assert!(world.session(2).unwrap().cells.is_empty());
        assert_eq!(snapshot.eaten, vec![(small, big)]);
        assert_eq!(snapshot.cells.len(), 1);
    }

    #[test]
    fn test_later_cell_can_absorb_earlier_one() {
        let mut world = World::new(&config_without_food());
        let small = world.join(1, "Ana", red());
        let big = world.join(2, "Bo", red());
        world.cell_mut(big).unwrap().radius = 100.0;
        place(&mut world, small, 1000.0, 1000.0);
        place(&mut world, big, 1050.0, 1000.0);

        world.tick(16.0);
        assert!(world.cell(small).is_none());
        assert_eq!(world.cell(big).unwrap().radius, 140.0);
    }

    #[test]
    fn test_snapshot_counts_ticks() {
        let mut world = World::new(&Config::default());
        assert_eq!(world.tick(16.0).tick, 1);
        let snapshot = world.tick(33.0);
        assert_eq!(snapshot.tick, 2);
        assert_eq!(snapshot.food.len(), 500);
        assert_eq!(world.now_ms(), 33.0);
        assert_eq!(world.tick_count(), 2);
    }
}
