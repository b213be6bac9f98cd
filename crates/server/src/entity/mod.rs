//! Game entities.

mod cell;
mod food;

pub use cell::{speed_cap, Cell};
pub use food::Food;
