use crate::error::TrajectoryError;

use super::context::Milestones;
use super::event::FiredEvent;
use super::resample::TrajectorySample;

// ---------------------------------------------------------------------------
// Run status and result container
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// The shooting loop met its acceptance criterion.
    Converged,
    /// A best-effort trajectory; see the result's warnings.
    Unconverged,
    /// A fatal condition short-circuited the calculation.
    Stopped(TrajectoryError),
}

/// Output of a take-off or landing calculation.
#[derive(Debug, Clone)]
pub struct TrajectoryResult<S> {
    pub status: RunStatus,
    pub samples: Vec<TrajectorySample>,
    pub breakpoints: Vec<f64>,
    pub events: Vec<FiredEvent>,
    pub summary: S,
    pub warnings: Vec<TrajectoryError>,
}

impl<S: Default> TrajectoryResult<S> {
    /// Zero-length result for a calculation that could not be carried out.
    pub fn stopped(error: TrajectoryError) -> Self {
        Self {
            status: RunStatus::Stopped(error),
            samples: Vec::new(),
            breakpoints: Vec::new(),
            events: Vec::new(),
            summary: S::default(),
            warnings: Vec::new(),
        }
    }
}

impl<S> TrajectoryResult<S> {
    pub fn is_converged(&self) -> bool {
        self.status == RunStatus::Converged
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.status, RunStatus::Stopped(_))
    }

    pub fn final_sample(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Characteristic speeds and milestones of a take-off run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TakeOffSummary {
    pub stall_speed: f64,             // m/s
    pub rotation_speed: f64,          // m/s
    pub lift_off_speed: f64,          // m/s
    pub v2: f64,                      // m/s, speed over the obstacle
    pub climb_speed: Option<f64>,     // m/s, at zero acceleration
    pub climb_ratio: Option<f64>,     // climb speed / stall speed
    pub alpha_reduction: f64,         // deg/s
    pub cutback_throttle: Option<f64>,
    pub final_distance: f64,          // m
    pub final_altitude: f64,          // m
    pub final_time: f64,              // s
    pub fuel_used: f64,               // kg
    pub iterations: usize,
    pub milestones: Milestones,
}

/// State snapshot where the approach crosses the certification altitude.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CertificationPoint {
    pub distance: f64,                // m
    pub altitude: f64,                // m
    pub true_airspeed: f64,           // m/s
    pub equivalent_airspeed: f64,     // m/s
    pub alpha: f64,                   // deg
    pub gamma: f64,                   // deg
    pub theta: f64,                   // deg
    pub thrust: f64,                  // N
}

/// Reference speeds and touchdown conditions of a landing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandingSummary {
    pub stall_speed: f64,             // m/s
    pub approach_speed: f64,          // m/s
    pub descent_speed: f64,           // m/s
    pub flare_speed: f64,             // m/s
    pub touchdown_speed: f64,         // m/s, reference value
    pub alpha_dot_flare: f64,         // deg/s
    pub touchdown_altitude: Option<f64>,       // m
    pub touchdown_rate_of_descent: Option<f64>, // m/s, negative when descending
    pub flare_ending_altitude: Option<f64>,    // m, when the flare turned into a climb
    pub positive_rate_of_climb: bool,
    pub max_cl_exceeded: bool,
    pub certification_point: Option<CertificationPoint>,
    pub ground_roll: Option<f64>,     // m, touchdown to full stop
    pub landing_distance: f64,        // m
    pub final_time: f64,              // s
    pub iterations: usize,
    pub milestones: Milestones,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_result_is_empty_and_zeroed() {
        let err = TrajectoryError::DegenerateThrustQuery { context: "static thrust".into(), thrust: 0.0 };
        let r: TrajectoryResult<TakeOffSummary> = TrajectoryResult::stopped(err.clone());
        assert!(r.is_stopped());
        assert!(!r.is_converged());
        assert!(r.samples.is_empty() && r.breakpoints.is_empty());
        assert_eq!(r.summary, TakeOffSummary::default());
        assert_eq!(r.status, RunStatus::Stopped(err));
        assert!(r.final_sample().is_none());
    }
}
