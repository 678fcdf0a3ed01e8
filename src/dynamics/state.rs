use nalgebra::SVector;

// ---------------------------------------------------------------------------
// Physical constants and unit conversions
// ---------------------------------------------------------------------------

pub const G0: f64 = 9.80665;

pub const FOOT: f64 = 0.3048;              // m
pub const KNOT: f64 = 0.514_444;           // m/s
pub const FOOT_PER_MINUTE: f64 = 0.005_08; // m/s
pub const POUND: f64 = 0.453_592_37;       // kg
pub const POUND_FORCE: f64 = POUND * G0;   // N

/// Converts a specific fuel consumption in lb/(lbf·h) to kg/(N·s).
pub const SFC_TO_SI: f64 = POUND / (POUND_FORCE * 3600.0);

// ---------------------------------------------------------------------------
// Point-mass state: ground distance, speed, flight-path angle, altitude, fuel
// ---------------------------------------------------------------------------

pub const STATE_DIM: usize = 5;

pub const X: usize = 0;     // ground distance, m
pub const V: usize = 1;     // speed, m/s
pub const GAMMA: usize = 2; // flight-path angle, rad
pub const H: usize = 3;     // altitude, m
pub const FUEL: usize = 4;  // fuel used, kg

pub type StateVector = SVector<f64, STATE_DIM>;

/// Builds a state vector from its components.
pub fn state(distance: f64, speed: f64, gamma: f64, altitude: f64, fuel: f64) -> StateVector {
    StateVector::from([distance, speed, gamma, altitude, fuel])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn layout_matches_indices() {
        let x = state(1.0, 2.0, 3.0, 4.0, 5.0);
        assert_eq!(x[X], 1.0);
        assert_eq!(x[V], 2.0);
        assert_eq!(x[GAMMA], 3.0);
        assert_eq!(x[H], 4.0);
        assert_eq!(x[FUEL], 5.0);
    }

    #[test]
    fn sfc_conversion() {
        // 0.5 lb/(lbf·h) is about 1.416e-5 kg/(N·s)
        assert_relative_eq!(0.5 * SFC_TO_SI, 1.416e-5, max_relative = 1e-3);
    }
}
