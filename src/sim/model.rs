use crate::dynamics::state::StateVector;
use crate::error::TrajectoryError;

use super::context::SimulationContext;
use super::event::{EventKind, EventOutcome, EventSet};
use super::resample::TrajectorySample;

/// A trajectory problem the integrator can drive.
///
/// Implementations hold their configuration by reference and own one
/// `SimulationContext`; the integrator never touches the context except
/// through these calls and the breakpoint/event log.
pub trait TrajectoryModel {
    fn events(&self) -> &EventSet;

    fn context(&self) -> &SimulationContext;

    fn context_mut(&mut self) -> &mut SimulationContext;

    /// State derivative at `(t, x)` using the current control memory.
    fn derivative(&self, t: f64, x: &StateVector) -> StateVector;

    /// Switching function of `event`; the event fires when it changes sign.
    fn switching(&self, event: EventKind, t: f64, x: &StateVector) -> f64;

    /// Applies the transition of `event` at its located time.
    fn fire(&mut self, event: EventKind, t: f64, x: &StateVector) -> Result<EventOutcome, TrajectoryError>;

    /// Called at the end of every accepted step and after events fire.
    fn accept_step(&mut self, t: f64, x: &StateVector);

    /// Derived quantities for the output series at `(t, x)`.
    fn sample(&self, t: f64, x: &StateVector) -> TrajectorySample;
}
