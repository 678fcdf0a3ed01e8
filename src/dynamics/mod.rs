pub mod aoa;
pub mod eom;
pub mod state;

pub use aoa::{AoaSearch, AoaSolution};
pub use eom::ForceBreakdown;
pub use state::{StateVector, G0};
