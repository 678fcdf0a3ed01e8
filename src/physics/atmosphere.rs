use crate::dynamics::state::G0;

// ---------------------------------------------------------------------------
// ISA standard atmosphere with temperature offset (sea level to 20 km)
// ---------------------------------------------------------------------------

const R_AIR: f64 = 287.052_87; // specific gas constant for dry air, J/(kg·K)
const GAMMA: f64 = 1.4;        // ratio of specific heats

const T0: f64 = 288.15;        // sea-level temperature, K
const P0: f64 = 101_325.0;     // sea-level pressure, Pa
pub const RHO0: f64 = P0 / (R_AIR * T0); // sea-level density, ~1.225 kg/m^3

/// Atmospheric properties at a given geometric altitude.
#[derive(Debug, Clone, Copy)]
pub struct Atmo {
    pub density: f64,      // kg/m^3
    pub pressure: f64,     // Pa
    pub temperature: f64,  // K
    pub sound_speed: f64,  // m/s
}

impl Atmo {
    /// Density ratio to ISA sea level.
    pub fn sigma(&self) -> f64 {
        self.density / RHO0
    }
}

/// ISA standard atmosphere.
///
/// Clamps negative altitudes to sea level and holds the tropopause layer
/// above 20 km.
pub fn isa(altitude_m: f64) -> Atmo {
    isa_offset(altitude_m, 0.0)
}

/// Atmosphere at `ISA + delta_temperature`.
///
/// Pressure follows the standard profile; temperature is shifted by the
/// offset and density follows from the gas law.
pub fn isa_offset(altitude_m: f64, delta_temperature: f64) -> Atmo {
    let h = altitude_m.max(0.0);

    let (t_std, pressure) = if h < 11_000.0 {
        // Troposphere: lapse -6.5 K/km
        gradient_layer(h, 0.0, T0, -0.0065, P0)
    } else {
        // Tropopause: isothermal 216.65 K
        isothermal_layer(h.min(20_000.0), 11_000.0, 216.65, 22_632.1)
    };

    let temperature = t_std + delta_temperature;
    let density = if temperature > 0.0 {
        pressure / (R_AIR * temperature)
    } else {
        0.0
    };

    Atmo {
        density,
        pressure,
        temperature,
        sound_speed: (GAMMA * R_AIR * temperature.max(0.0)).sqrt(),
    }
}

/// Mach number of `speed` at the given altitude and temperature offset.
pub fn mach(speed: f64, altitude_m: f64, delta_temperature: f64) -> f64 {
    let a = isa_offset(altitude_m, delta_temperature).sound_speed;
    if a > 0.0 { speed / a } else { 0.0 }
}

/// Stall speed `sqrt(2 W / (rho S CLmax))`, m/s.
pub fn stall_speed(weight: f64, density: f64, wing_area: f64, cl_max: f64) -> f64 {
    let denom = density * wing_area * cl_max;
    if denom <= 0.0 || weight <= 0.0 {
        return 0.0;
    }
    (2.0 * weight / denom).sqrt()
}

// ---------------------------------------------------------------------------
// Layer helpers
// ---------------------------------------------------------------------------

/// Gradient layer: T = T_base + lapse * (h - h_base)
fn gradient_layer(h: f64, h_base: f64, t_base: f64, lapse: f64, p_base: f64) -> (f64, f64) {
    let t = t_base + lapse * (h - h_base);
    let p = p_base * (t / t_base).powf(-G0 / (lapse * R_AIR));
    (t, p)
}

/// Isothermal layer: T = const, pressure decays exponentially
fn isothermal_layer(h: f64, h_base: f64, t: f64, p_base: f64) -> (f64, f64) {
    let p = p_base * ((-G0 / (R_AIR * t)) * (h - h_base)).exp();
    (t, p)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_level_standard_values() {
        let a = isa(0.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
        assert!((a.pressure - 101_325.0).abs() < 1.0);
        assert!((a.density - 1.225).abs() < 0.001);
        assert!((a.sound_speed - 340.29).abs() < 0.1);
    }

    #[test]
    fn sigma_is_exactly_one_at_sea_level() {
        assert_eq!(isa(0.0).sigma(), 1.0);
        assert_eq!(isa(-50.0).sigma(), 1.0);
        assert!(isa_offset(0.0, 10.0).sigma() < 1.0);
    }

    #[test]
    fn tropopause_11km() {
        let a = isa(11_000.0);
        assert!((a.temperature - 216.65).abs() < 0.5);
        assert!((a.pressure - 22_632.0).abs() < 100.0);
    }

    #[test]
    fn hot_day_is_less_dense() {
        let std = isa(0.0);
        let hot = isa_offset(0.0, 10.0);
        assert_relative_eq!(hot.pressure, std.pressure);
        assert_relative_eq!(hot.density, std.density * 288.15 / 298.15, max_relative = 1e-9);
        assert!(hot.sound_speed > std.sound_speed);
    }

    #[test]
    fn negative_altitude_clamps_to_sea_level() {
        let a = isa(-500.0);
        assert!((a.temperature - 288.15).abs() < 0.01);
    }

    #[test]
    fn stall_speed_matches_definition() {
        let vs = stall_speed(600_000.0, 1.225, 120.0, 2.4);
        assert_relative_eq!(vs, (2.0 * 600_000.0 / (1.225 * 120.0 * 2.4_f64)).sqrt());
        assert_eq!(stall_speed(600_000.0, 1.225, 0.0, 2.4), 0.0);
    }

    #[test]
    fn mach_at_sea_level() {
        assert_relative_eq!(mach(340.29, 0.0, 0.0), 1.0, max_relative = 1e-3);
    }
}
