//! Ranked session summary.

use crate::config::LeaderboardConfig;
use crate::world::World;

/// Leaderboard entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// Owner (session) ID.
    pub id: u32,
    pub name: String,
    /// Sum of the radii of the owner's live cells.
    pub score: f64,
}

/// Rank every session by total live radius, highest first.
///
/// Sessions without live cells are kept with score 0. Ties keep session
/// order.
pub fn rank(world: &World, config: &LeaderboardConfig) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = world
        .sessions()
        .iter()
        .map(|(owner_id, session)| {
            let score: f64 = session
                .cells
                .iter()
                .filter_map(|&id| world.cell(id))
                .filter(|cell| cell.alive)
                .map(|cell| cell.radius)
                .sum();

            let name = session
                .main_cell()
                .and_then(|id| world.cell(id))
                .map(|cell| cell.name.clone())
                .unwrap_or_else(|| config.placeholder_name.clone());

            LeaderboardEntry { id: owner_id, name, score }
        })
        .collect();

    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(config.size);
    entries
}
