use serde::Deserialize;
use tracing::{error, info, warn};

use crate::dynamics::state::KNOT;
use crate::error::TrajectoryError;

// ---------------------------------------------------------------------------
// Acceptance band
// ---------------------------------------------------------------------------

/// Closed interval of acceptable terminal ratios.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ConvergenceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ConvergenceBand {
    pub fn new(lower: f64, upper: f64) -> Result<Self, TrajectoryError> {
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(TrajectoryError::invalid(format!(
                "convergence band [{lower}, {upper}] must be finite with lower < upper"
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn centered(center: f64, half_width: f64) -> Self {
        Self { lower: center - half_width, upper: center + half_width }
    }

    /// `[base + lo_kt/V_s, base + hi_kt/V_s]` with the offsets in knots.
    pub fn knots_above(base: f64, lo_kt: f64, hi_kt: f64, stall_speed: f64) -> Self {
        Self {
            lower: base + lo_kt * KNOT / stall_speed,
            upper: base + hi_kt * KNOT / stall_speed,
        }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.lower && ratio <= self.upper
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Judgement of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept,
    /// Run again with this parameter.
    Retry(f64),
    /// Keep this attempt and stop with a warning.
    GiveUp(TrajectoryError),
}

/// Final attempt of a shooting loop.
#[derive(Debug, Clone)]
pub struct ShootingOutcome<T> {
    pub attempt: T,
    pub parameter: f64,
    pub iterations: usize,
    pub converged: bool,
    pub warnings: Vec<TrajectoryError>,
}

/// Runs `run` with successive parameters until `judge` accepts or gives up.
///
/// A fatal error from `run` ends the loop. After `max_iterations` attempts
/// the last one is kept with a `ShootingLoopMaxIterationsExceeded` warning.
pub fn shoot<T, R, J>(
    initial: f64,
    max_iterations: usize,
    mut run: R,
    mut judge: J,
) -> Result<ShootingOutcome<T>, TrajectoryError>
where
    R: FnMut(f64) -> Result<T, TrajectoryError>,
    J: FnMut(&T, f64) -> Verdict,
{
    let max_iterations = max_iterations.max(1);
    let mut parameter = initial;
    let mut iteration = 0;

    loop {
        iteration += 1;
        let attempt = match run(parameter) {
            Ok(attempt) => attempt,
            Err(e) => {
                error!(iteration, parameter, error = %e, "shooting attempt failed");
                return Err(e);
            }
        };

        let outcome = |attempt: T, converged: bool, warnings: Vec<TrajectoryError>| ShootingOutcome {
            attempt,
            parameter,
            iterations: iteration,
            converged,
            warnings,
        };

        match judge(&attempt, parameter) {
            Verdict::Accept => {
                info!(iteration, parameter, "shooting loop converged");
                return Ok(outcome(attempt, true, Vec::new()));
            }
            Verdict::GiveUp(warning) => {
                warn!(iteration, parameter, %warning, "shooting loop stopped");
                return Ok(outcome(attempt, false, vec![warning]));
            }
            Verdict::Retry(next) => {
                if iteration >= max_iterations {
                    let warning = TrajectoryError::ShootingLoopMaxIterationsExceeded { iterations: iteration };
                    warn!(iteration, parameter, %warning, "keeping last attempt");
                    return Ok(outcome(attempt, false, vec![warning]));
                }
                info!(iteration, parameter, next, "shooting iteration");
                parameter = next;
            }
        }
    }
}
