use crate::dynamics::state::{StateVector, FUEL, G0, GAMMA, H, V, X};

// ---------------------------------------------------------------------------
// Forces acting on the aircraft at one instant
// ---------------------------------------------------------------------------

/// Everything the point-mass equations need, evaluated by a calculator for
/// a given time, state and angle of attack.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ForceBreakdown {
    pub alpha: f64,         // deg
    pub cl: f64,
    pub cd: f64,
    pub lift: f64,          // N
    pub drag: f64,          // N
    pub thrust: f64,        // N
    pub friction: f64,      // N, runway friction (zero in the air)
    pub weight: f64,        // N
    pub fuel_flow: f64,     // kg/s
    pub on_ground: bool,
}

impl ForceBreakdown {
    /// Thrust component along the flight path.
    pub fn thrust_horizontal(&self) -> f64 {
        if self.on_ground {
            self.thrust
        } else {
            self.thrust * self.alpha.to_radians().cos()
        }
    }

    /// Thrust component normal to the flight path.
    pub fn thrust_vertical(&self) -> f64 {
        if self.on_ground {
            0.0
        } else {
            self.thrust * self.alpha.to_radians().sin()
        }
    }

    /// Load factor `(L + T sin α) / (W cos γ)`.
    pub fn load_factor(&self, gamma: f64) -> f64 {
        let denom = self.weight * gamma.cos();
        if denom.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.lift + self.thrust * self.alpha.to_radians().sin()) / denom
    }

    /// Net force along the flight path, N.
    pub fn total_force(&self, gamma: f64) -> f64 {
        if self.on_ground {
            self.thrust - self.drag - self.friction
        } else {
            self.thrust_horizontal() - self.drag - self.weight * gamma.sin()
        }
    }
}

// ---------------------------------------------------------------------------
// Point-mass equations of motion
// ---------------------------------------------------------------------------

/// Acceleration along the flight path, m/s^2.
pub fn acceleration(forces: &ForceBreakdown, gamma: f64) -> f64 {
    if forces.weight <= 0.0 {
        return 0.0;
    }
    G0 / forces.weight * forces.total_force(gamma)
}

/// Flight-path angle rate, rad/s. Zero on the runway.
pub fn gamma_rate(forces: &ForceBreakdown, speed: f64, gamma: f64) -> f64 {
    if forces.on_ground || forces.weight <= 0.0 || speed <= 0.0 {
        return 0.0;
    }
    G0 / (forces.weight * speed) * (forces.lift + forces.thrust_vertical() - forces.weight * gamma.cos())
}

/// State derivative `[x', V', γ', h', fuel']` for the given forces.
///
/// On the runway the flight-path angle and the altitude are frozen.
pub fn derivative(forces: &ForceBreakdown, x: &StateVector) -> StateVector {
    let speed = x[V];
    let gamma = x[GAMMA];
    let mut xdot = StateVector::zeros();
    xdot[X] = speed;
    xdot[V] = acceleration(forces, gamma);
    xdot[GAMMA] = gamma_rate(forces, speed, gamma);
    xdot[H] = if forces.on_ground { 0.0 } else { speed * gamma.sin() };
    xdot[FUEL] = forces.fuel_flow;
    xdot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::state::state;
    use approx::assert_relative_eq;

    fn airborne(alpha: f64) -> ForceBreakdown {
        ForceBreakdown {
            alpha,
            lift: 600_000.0,
            drag: 50_000.0,
            thrust: 200_000.0,
            weight: 700_000.0,
            fuel_flow: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn airborne_equations() {
        let f = airborne(5.0);
        let gamma = 0.1_f64;
        let x = state(0.0, 80.0, gamma, 100.0, 0.0);
        let xdot = derivative(&f, &x);
        let a = 5.0_f64.to_radians();
        assert_relative_eq!(xdot[X], 80.0);
        assert_relative_eq!(
            xdot[V],
            G0 / 700_000.0 * (200_000.0 * a.cos() - 50_000.0 - 700_000.0 * gamma.sin()),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            xdot[GAMMA],
            G0 / (700_000.0 * 80.0) * (600_000.0 + 200_000.0 * a.sin() - 700_000.0 * gamma.cos()),
            max_relative = 1e-12
        );
        assert_relative_eq!(xdot[H], 80.0 * gamma.sin());
        assert_relative_eq!(xdot[FUEL], 2.0);
    }

    #[test]
    fn ground_roll_freezes_flight_path() {
        let f = ForceBreakdown {
            lift: 100_000.0,
            drag: 10_000.0,
            thrust: 200_000.0,
            friction: 0.03 * 600_000.0,
            weight: 700_000.0,
            on_ground: true,
            ..Default::default()
        };
        let xdot = derivative(&f, &state(100.0, 40.0, 0.0, 0.0, 0.0));
        assert_eq!(xdot[GAMMA], 0.0);
        assert_eq!(xdot[H], 0.0);
        assert_relative_eq!(xdot[V], G0 / 700_000.0 * (200_000.0 - 10_000.0 - 18_000.0));
    }

    #[test]
    fn level_unaccelerated_load_factor_is_one() {
        let f = ForceBreakdown { lift: 700_000.0, weight: 700_000.0, ..Default::default() };
        assert_relative_eq!(f.load_factor(0.0), 1.0);
        assert_eq!(gamma_rate(&f, 70.0, 0.0), 0.0);
    }

    #[test]
    fn thrust_components() {
        let f = airborne(30.0);
        assert_relative_eq!(f.thrust_horizontal(), 200_000.0 * 30.0_f64.to_radians().cos());
        assert_relative_eq!(f.thrust_vertical(), 100_000.0, max_relative = 1e-12);
    }
}
