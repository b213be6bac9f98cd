//! Server -> Client packet building.

use super::ServerOpcode;
use crate::{BinaryWriter, Color};

/// Build a Joined packet (0x20) acknowledging a join with the owner id.
pub fn build_joined(owner_id: u32) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(5);
    w.put_u8(ServerOpcode::Joined as u8);
    w.put_u32(owner_id);
    w
}

/// Build a SetBorder packet (0x40).
pub fn build_set_border(width: f64, height: f64) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(17);
    w.put_u8(ServerOpcode::SetBorder as u8);
    w.put_f64(width);
    w.put_f64(height);
    w
}

/// Leaderboard row as sent on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub id: u32,
    pub name: String,
    pub score: f32,
}

/// Build a Leaderboard packet (0x31).
pub fn build_leaderboard(entries: &[LeaderboardRow]) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::Leaderboard as u8);
    w.put_u32(entries.len() as u32);
    for entry in entries {
        w.put_u32(entry.id);
        w.put_f32(entry.score);
        w.put_string_utf8(&entry.name);
    }
    w
}

/// Cell data for the WorldUpdate packet.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCell {
    pub id: u32,
    pub owner_id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub score: f32,
    pub color: Color,
    pub name: String,
}

/// Food data for the WorldUpdate packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateFood {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: Color,
}

/// Eat record (cell was merged into or absorbed by another).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EatRecord {
    pub eater_id: u32,
    pub eaten_id: u32,
}

/// Build a WorldUpdate packet (0x10).
///
/// The packet format is:
/// - opcode 0x10
/// - tick: u64
/// - eat_count: u16, then [eater_id, eaten_id] × eat_count
/// - cell_count: u32, then per cell: id, owner, x, y, radius, score, rgb, name
/// - food_count: u32, then per food: id, x, y, radius, rgb
pub fn build_world_update(
    tick: u64,
    eat_records: &[EatRecord],
    cells: &[UpdateCell],
    food: &[UpdateFood],
) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(16 + cells.len() * 40 + food.len() * 19);
    w.put_u8(ServerOpcode::WorldUpdate as u8);
    w.put_u64(tick);

    // More than u16::MAX eat records in one tick is not reachable with the cell cap,
    // but never write a count that disagrees with the records that follow.
    let eat_count = eat_records.len().min(u16::MAX as usize);
    w.put_u16(eat_count as u16);
    for eat in &eat_records[..eat_count] {
        w.put_u32(eat.eater_id);
        w.put_u32(eat.eaten_id);
    }

    w.put_u32(cells.len() as u32);
    for cell in cells {
        w.put_u32(cell.id);
        w.put_u32(cell.owner_id);
        w.put_f32(cell.x);
        w.put_f32(cell.y);
        w.put_f32(cell.radius);
        w.put_f32(cell.score);
        w.put_color(cell.color);
        w.put_string_utf8(&cell.name);
    }

    w.put_u32(food.len() as u32);
    for item in food {
        w.put_u32(item.id);
        w.put_f32(item.x);
        w.put_f32(item.y);
        w.put_f32(item.radius);
        w.put_color(item.color);
    }

    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryReader;

    #[test]
    fn test_joined_and_border() {
        let data = build_joined(42).finish();
        assert_eq!(&data[..], &[0x20, 42, 0, 0, 0]);

        let mut r = BinaryReader::new(build_set_border(3000.0, 2000.0).finish());
        assert_eq!(r.try_get_u8(), Some(0x40));
        assert_eq!(r.try_get_f64(), Some(3000.0));
        assert_eq!(r.try_get_f64(), Some(2000.0));
    }

    #[test]
    fn test_leaderboard_layout() {
        let rows = vec![
            LeaderboardRow { id: 7, name: "Ana".into(), score: 120.5 },
            LeaderboardRow { id: 3, name: "Bo".into(), score: 40.0 },
        ];
        let mut r = BinaryReader::new(build_leaderboard(&rows).finish());
        assert_eq!(r.try_get_u8(), Some(0x31));
        assert_eq!(r.try_get_u32(), Some(2));
        assert_eq!(r.try_get_u32(), Some(7));
        assert_eq!(r.try_get_f32(), Some(120.5));
        assert_eq!(r.try_get_string_utf8().as_deref(), Some("Ana"));
        assert_eq!(r.try_get_u32(), Some(3));
        assert_eq!(r.try_get_f32(), Some(40.0));
        assert_eq!(r.try_get_string_utf8().as_deref(), Some("Bo"));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_world_update_layout() {
        let cells = vec![UpdateCell {
            id: 1,
            owner_id: 9,
            x: 10.0,
            y: 20.0,
            radius: 40.0,
            score: 40.0,
            color: Color::new(255, 0, 0),
            name: "Ana".into(),
        }];
        let food = vec![UpdateFood {
            id: 2,
            x: 5.0,
            y: 6.0,
            radius: 1.5,
            color: Color::new(0, 0, 255),
        }];
        let eats = vec![EatRecord { eater_id: 1, eaten_id: 4 }];

        let mut r = BinaryReader::new(build_world_update(77, &eats, &cells, &food).finish());
        assert_eq!(r.try_get_u8(), Some(0x10));
        assert_eq!(r.try_get_u64(), Some(77));
        assert_eq!(r.try_get_u16(), Some(1));
        assert_eq!((r.try_get_u32(), r.try_get_u32()), (Some(1), Some(4)));

        assert_eq!(r.try_get_u32(), Some(1));
        assert_eq!(r.try_get_u32(), Some(1));
        assert_eq!(r.try_get_u32(), Some(9));
        assert_eq!(r.try_get_f32(), Some(10.0));
        assert_eq!(r.try_get_f32(), Some(20.0));
        assert_eq!(r.try_get_f32(), Some(40.0));
        assert_eq!(r.try_get_f32(), Some(40.0));
        assert_eq!(r.try_get_color(), Some(Color::new(255, 0, 0)));
        assert_eq!(r.try_get_string_utf8().as_deref(), Some("Ana"));

        assert_eq!(r.try_get_u32(), Some(1));
        assert_eq!(r.try_get_u32(), Some(2));
        assert_eq!(r.try_get_f32(), Some(5.0));
        assert_eq!(r.try_get_f32(), Some(6.0));
        assert_eq!(r.try_get_f32(), Some(1.5));
        assert_eq!(r.try_get_color(), Some(Color::new(0, 0, 255)));
        assert_eq!(r.remaining(), 0);
    }
}
