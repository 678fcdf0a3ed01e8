use thiserror::Error;

// ---------------------------------------------------------------------------
// Trajectory errors and warnings
// ---------------------------------------------------------------------------

/// Failure and warning conditions raised by the trajectory engine.
///
/// `IntegrationNonConvergence`, `DegenerateThrustQuery` and
/// `InvalidConfiguration` are fatal for the computation they occur in.
/// The shooting-loop and lift-limit variants are warnings reported next to
/// a best-effort result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("integration did not converge at t = {t:.6} s: {reason}")]
    IntegrationNonConvergence { t: f64, reason: String },

    #[error("shooting loop did not converge within {iterations} iterations, last trajectory kept")]
    ShootingLoopMaxIterationsExceeded { iterations: usize },

    #[error("shooting parameter {parameter} would leave its admissible range (limit {limit})")]
    ShootingParameterOutOfRange { parameter: f64, limit: f64 },

    #[error("lift coefficient exceeded its limit {limit:.3} with shooting parameter {parameter}, attempt kept")]
    LiftCoefficientLimitExceeded { limit: f64, parameter: f64 },

    #[error("degenerate thrust query while computing {context}: thrust = {thrust} N")]
    DegenerateThrustQuery { context: String, thrust: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl TrajectoryError {
    /// Whether the condition aborts the computation instead of qualifying it.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TrajectoryError::ShootingLoopMaxIterationsExceeded { .. }
                | TrajectoryError::ShootingParameterOutOfRange { .. }
                | TrajectoryError::LiftCoefficientLimitExceeded { .. }
        )
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TrajectoryError::InvalidConfiguration(msg.into())
    }
}
