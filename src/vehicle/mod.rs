pub mod aircraft;
pub mod propulsion;

pub use aircraft::{AeroConfiguration, Aircraft, AircraftBuilder};
pub use propulsion::{EngineRating, Propulsion, RatedTurbofan};
