use serde::Deserialize;

use crate::error::TrajectoryError;

// ---------------------------------------------------------------------------
// Angle-of-attack search
// ---------------------------------------------------------------------------

/// Bracketing search for the angle of attack that zeroes a residual
/// (flight-path-angle rate or acceleration).
///
/// Starting from the previous angle, the search marches with a doubling
/// increment in the direction that shrinks the residual until the residual
/// changes sign, then refines the bracket with Illinois false position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AoaSearch {
    pub step: f64,              // deg, first bracketing increment
    pub tolerance: f64,         // residual units (deg/s or m/s^2)
    pub max_iterations: usize,  // residual evaluations
    pub max_excursion: f64,     // deg, largest move away from the starting angle
}

impl Default for AoaSearch {
    fn default() -> Self {
        Self {
            step: 0.01,
            tolerance: 5e-3,
            max_iterations: 200,
            max_excursion: 30.0,
        }
    }
}

/// Result of one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoaSolution {
    pub alpha: f64,       // deg
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Best evaluation seen so far, by residual magnitude.
struct Tracker {
    alpha: f64,
    residual: f64,
    iterations: usize,
}

impl Tracker {
    fn eval(&mut self, alpha: f64, residual: &mut impl FnMut(f64) -> f64) -> f64 {
        let r = residual(alpha);
        self.iterations += 1;
        if r.is_finite() && !(r.abs() >= self.residual.abs()) {
            self.alpha = alpha;
            self.residual = r;
        }
        r
    }

    fn finish(&self, tolerance: f64) -> AoaSolution {
        AoaSolution {
            alpha: self.alpha,
            residual: self.residual,
            iterations: self.iterations,
            converged: self.residual.abs() < tolerance,
        }
    }
}

fn same_sign(a: f64, b: f64) -> bool {
    (a > 0.0) == (b > 0.0)
}

impl AoaSearch {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        if !(self.step > 0.0) || !(self.tolerance > 0.0) || !(self.max_excursion > 0.0) {
            return Err(TrajectoryError::invalid(
                "AoA search step, tolerance and excursion must be positive",
            ));
        }
        if self.max_iterations < 2 {
            return Err(TrajectoryError::invalid("AoA search needs at least two iterations"));
        }
        Ok(())
    }

    /// Searches for `alpha` with `|residual(alpha)| < tolerance`, starting at `start`.
    ///
    /// When the iteration cap or the excursion limit is hit, the angle with
    /// the smallest residual is returned with `converged == false`.
    pub fn solve(&self, start: f64, mut residual: impl FnMut(f64) -> f64) -> AoaSolution {
        let mut best = Tracker { alpha: start, residual: f64::INFINITY, iterations: 0 };

        let r0 = best.eval(start, &mut residual);
        if !r0.is_finite() || r0.abs() < self.tolerance {
            return best.finish(self.tolerance);
        }

        // Bracket the root
        let up = start + self.step;
        let r_up = best.eval(up, &mut residual);
        if r_up.abs() < self.tolerance {
            return best.finish(self.tolerance);
        }

        let (mut a, mut fa, mut b, mut fb);
        if r_up.is_finite() && !same_sign(r0, r_up) {
            (a, fa, b, fb) = (start, r0, up, r_up);
        } else {
            let dir = if r_up.abs() < r0.abs() { 1.0 } else { -1.0 };
            let (mut last, mut f_last) = if dir > 0.0 { (up, r_up) } else { (start, r0) };
            let mut delta = self.step;
            loop {
                if best.iterations >= self.max_iterations {
                    return best.finish(self.tolerance);
                }
                delta *= 2.0;
                let mut next = last + dir * delta;
                let at_limit = (next - start).abs() >= self.max_excursion;
                if at_limit {
                    next = start + dir * self.max_excursion;
                }
                let f_next = best.eval(next, &mut residual);
                if f_next.abs() < self.tolerance {
                    return best.finish(self.tolerance);
                }
                if f_next.is_finite() && !same_sign(f_last, f_next) {
                    (a, fa, b, fb) = (last, f_last, next, f_next);
                    break;
                }
                if at_limit || !f_next.is_finite() {
                    return best.finish(self.tolerance);
                }
                last = next;
                f_last = f_next;
            }
        }

        // Illinois refinement
        let mut side = 0;
        while best.iterations < self.max_iterations && (b - a).abs() > 1e-12 {
            let mut c = (a * fb - b * fa) / (fb - fa);
            if !c.is_finite() || c <= a.min(b) || c >= a.max(b) {
                c = 0.5 * (a + b);
            }
            let fc = best.eval(c, &mut residual);
            if !fc.is_finite() || fc.abs() < self.tolerance {
                break;
            }
            if same_sign(fc, fb) {
                b = c;
                fb = fc;
                if side == -1 {
                    fa *= 0.5;
                }
                side = -1;
            } else {
                a = c;
                fa = fc;
                if side == 1 {
                    fb *= 0.5;
                }
                side = 1;
            }
        }
        best.finish(self.tolerance)
    }
}
