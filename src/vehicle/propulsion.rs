use serde::Deserialize;

use crate::dynamics::state::SFC_TO_SI;
use crate::error::TrajectoryError;
use crate::physics::atmosphere;

// ---------------------------------------------------------------------------
// Propulsion interface
// ---------------------------------------------------------------------------

/// Engine rating a thrust query is made at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRating {
    TakeOff,
    Cruise,
    FlightIdle,
    GroundIdle,
}

/// Installed propulsion as seen by the trajectory engine.
///
/// Implement this to plug an engine deck into the calculators. Queries are
/// pure functions of their scalar inputs; a zero thrust answer is legal and
/// handled by the caller.
pub trait Propulsion {
    /// Total installed thrust of all engines, N.
    fn thrust(&self, rating: EngineRating, mach: f64, altitude: f64, delta_temperature: f64, throttle: f64) -> f64;

    /// Thrust specific fuel consumption, kg/(N·s).
    fn sfc(&self, rating: EngineRating, mach: f64, altitude: f64, delta_temperature: f64, throttle: f64) -> f64;

    fn engine_count(&self) -> usize;

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "engine"
    }
}

// ---------------------------------------------------------------------------
// Rated turbofan: static thrust with density and Mach lapse
// ---------------------------------------------------------------------------

/// Simple turbofan deck: sea-level static thrust per engine scaled by a
/// rating fraction, `sigma^0.7` and a linear Mach lapse.
#[derive(Debug, Clone, Deserialize)]
pub struct RatedTurbofan {
    pub name: String,
    pub engine_count: usize,
    pub static_thrust: f64,       // N per engine, take-off rating
    pub mach_lapse: f64,          // fractional thrust loss per unit Mach
    pub sfc_takeoff: f64,         // lb/(lbf·h) at take-off rating, static
    pub cruise_fraction: f64,     // of take-off thrust
    pub flight_idle_fraction: f64,
    pub ground_idle_fraction: f64,
}

impl RatedTurbofan {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if self.engine_count == 0 {
            return Err(TrajectoryError::invalid("engine count must be at least one"));
        }
        if !(self.static_thrust >= 0.0) {
            return Err(TrajectoryError::invalid(format!(
                "static thrust must be non-negative, got {}",
                self.static_thrust
            )));
        }
        if !(self.sfc_takeoff > 0.0) {
            return Err(TrajectoryError::invalid("take-off SFC must be positive"));
        }
        let fractions = [self.cruise_fraction, self.flight_idle_fraction, self.ground_idle_fraction];
        if fractions.iter().any(|f| !(0.0..=1.0).contains(f)) {
            return Err(TrajectoryError::invalid("rating fractions must lie in [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.mach_lapse) {
            return Err(TrajectoryError::invalid("Mach lapse must lie in [0, 1)"));
        }
        Ok(())
    }

    fn rating_fraction(&self, rating: EngineRating) -> f64 {
        match rating {
            EngineRating::TakeOff => 1.0,
            EngineRating::Cruise => self.cruise_fraction,
            EngineRating::FlightIdle => self.flight_idle_fraction,
            EngineRating::GroundIdle => self.ground_idle_fraction,
        }
    }
}

impl Propulsion for RatedTurbofan {
    fn thrust(&self, rating: EngineRating, mach: f64, altitude: f64, delta_temperature: f64, throttle: f64) -> f64 {
        let sigma = atmosphere::isa_offset(altitude, delta_temperature).sigma();
        let lapse = sigma.powf(0.7) * (1.0 - self.mach_lapse * mach.max(0.0)).max(0.0);
        self.engine_count as f64 * self.static_thrust * self.rating_fraction(rating) * lapse * throttle.max(0.0)
    }

    fn sfc(&self, rating: EngineRating, mach: f64, _altitude: f64, _delta_temperature: f64, _throttle: f64) -> f64 {
        let rating_factor = match rating {
            EngineRating::TakeOff => 1.0,
            EngineRating::Cruise => 1.1,
            EngineRating::FlightIdle => 1.6,
            EngineRating::GroundIdle => 1.8,
        };
        self.sfc_takeoff * rating_factor * (1.0 + 0.4 * mach.max(0.0)) * SFC_TO_SI
    }

    fn engine_count(&self) -> usize {
        self.engine_count
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Preset engines
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Twin high-bypass turbofan installation, ~105 kN per engine.
    pub fn twin_turbofan() -> RatedTurbofan {
        RatedTurbofan {
            name: "Twin HBPR turbofan".into(),
            engine_count: 2,
            static_thrust: 105_000.0,
            mach_lapse: 0.55,
            sfc_takeoff: 0.36,
            cruise_fraction: 0.75,
            flight_idle_fraction: 0.07,
            ground_idle_fraction: 0.05,
        }
    }
}
