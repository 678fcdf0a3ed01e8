use serde::Deserialize;
use tracing::debug;

use crate::dynamics::state::StateVector;
use crate::error::TrajectoryError;

use super::dense::{DenseSegment, DenseTrajectory};
use super::event::{sign_changed, EventKind, EventOutcome, FiredEvent};
use super::model::TrajectoryModel;

// ---------------------------------------------------------------------------
// Dormand–Prince 5(4) tableau
// ---------------------------------------------------------------------------

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19_372.0 / 6_561.0;
const A52: f64 = -25_360.0 / 2_187.0;
const A53: f64 = 64_448.0 / 6_561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9_017.0 / 3_168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46_732.0 / 5_247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5_103.0 / 18_656.0;

// 5th-order weights (also the last stage row)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1_113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2_187.0 / 6_784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus embedded 4th-order weights
const E1: f64 = 71.0 / 57_600.0;
const E3: f64 = -71.0 / 16_695.0;
const E4: f64 = 71.0 / 1_920.0;
const E5: f64 = -17_253.0 / 339_200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    pub rtol: f64,
    pub atol: f64,
    pub initial_step: f64,          // s
    pub min_step: f64,              // s
    pub max_step: f64,              // s
    pub max_steps: usize,           // accepted + rejected
    pub event_tolerance: f64,       // s, width of the final event bracket
    pub event_max_iterations: usize,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-10,
            atol: 1e-10,
            initial_step: 1e-3,
            min_step: 1e-12,
            max_step: 1.0,
            max_steps: 500_000,
            event_tolerance: 1e-9,
            event_max_iterations: 100,
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        let positive = [self.rtol, self.atol, self.initial_step, self.min_step, self.max_step, self.event_tolerance];
        if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(TrajectoryError::invalid(
                "integrator tolerances and step limits must be finite and positive",
            ));
        }
        if self.min_step > self.max_step {
            return Err(TrajectoryError::invalid("integrator minimum step exceeds maximum step"));
        }
        if self.max_steps == 0 || self.event_max_iterations == 0 {
            return Err(TrajectoryError::invalid("integrator step and event iteration caps must be non-zero"));
        }
        Ok(())
    }
}

/// Step size controller: `h_new = safety * h * error^(-exponent)`.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    pub max_factor: f64,
    pub min_factor: f64,
    pub exponent: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 0.2,
        }
    }
}

impl StepController {
    pub fn compute_factor(&self, error: f64) -> f64 {
        if error <= 0.0 {
            return self.max_factor;
        }
        if !error.is_finite() {
            return self.min_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Integration statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub fn_evals: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub events: usize,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct Integration {
    pub dense: DenseTrajectory,
    pub stats: Stats,
    pub stopped_by: Option<EventKind>,
}

// ---------------------------------------------------------------------------
// Single step
// ---------------------------------------------------------------------------

struct Step {
    y1: StateVector,
    error: f64,
    k: [StateVector; 7],
}

fn dp_step<M: TrajectoryModel>(model: &M, t: f64, y: &StateVector, h: f64, config: &IntegratorConfig) -> Step {
    let k1 = model.derivative(t, y);
    let k2 = model.derivative(t + C2 * h, &(y + k1 * (A21 * h)));
    let k3 = model.derivative(t + C3 * h, &(y + (k1 * A31 + k2 * A32) * h));
    let k4 = model.derivative(t + C4 * h, &(y + (k1 * A41 + k2 * A42 + k3 * A43) * h));
    let k5 = model.derivative(t + C5 * h, &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h));
    let k6 = model.derivative(t + h, &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h));
    let y1 = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h;
    let k7 = model.derivative(t + h, &y1);

    let err = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h;
    let mut sum = 0.0;
    for i in 0..err.len() {
        let scale = config.atol + config.rtol * y[i].abs().max(y1[i].abs());
        sum += (err[i] / scale).powi(2);
    }
    let error = (sum / err.len() as f64).sqrt();

    Step { y1, error, k: [k1, k2, k3, k4, k5, k6, k7] }
}

/// Bisects the dense interpolant for the zero of `kind`'s switching function.
///
/// The returned time is the post-crossing end of the final bracket, so the
/// event is on its new side when it fires.
fn locate<M: TrajectoryModel>(
    model: &M,
    kind: EventKind,
    segment: &DenseSegment,
    t_a: f64,
    t_b: f64,
    g_a: f64,
    config: &IntegratorConfig,
) -> f64 {
    let side_a = g_a >= 0.0;
    let (mut a, mut b) = (t_a, t_b);
    for _ in 0..config.event_max_iterations {
        if b - a <= config.event_tolerance {
            break;
        }
        let m = 0.5 * (a + b);
        let g = model.switching(kind, m, &segment.state_at(m));
        if (g >= 0.0) == side_a {
            a = m;
        } else {
            b = m;
        }
    }
    b
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Integrates `model` from `(t0, y0)` up to `t_final` or a stopping event.
///
/// After every accepted step all switching functions are evaluated; each
/// one that changed sign is located on the step's interpolant, the step is
/// cut at the earliest root and every event within the event tolerance of
/// it fires, in event-set order.
pub fn integrate<M: TrajectoryModel>(
    model: &mut M,
    t0: f64,
    y0: StateVector,
    t_final: f64,
    config: &IntegratorConfig,
) -> Result<Integration, TrajectoryError> {
    config.validate()?;
    if !(t_final > t0) {
        return Err(TrajectoryError::invalid(format!(
            "integration end time {t_final} must follow start time {t0}"
        )));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(TrajectoryError::IntegrationNonConvergence {
            t: t0,
            reason: "non-finite initial state".into(),
        });
    }

    let controller = StepController::default();
    let kinds: Vec<EventKind> = model.events().kinds().to_vec();
    let mut stats = Stats::default();
    let mut dense = DenseTrajectory::new(t0, y0);

    let mut t = t0;
    let mut y = y0;
    model.accept_step(t, &y);
    let mut g_prev: Vec<f64> = kinds.iter().map(|&k| model.switching(k, t, &y)).collect();
    let mut h = config.initial_step.clamp(config.min_step, config.max_step);

    while t_final - t > config.min_step {
        if stats.accepted_steps + stats.rejected_steps >= config.max_steps {
            return Err(TrajectoryError::IntegrationNonConvergence {
                t,
                reason: format!("step budget of {} exhausted", config.max_steps),
            });
        }

        let h_try = h.min(t_final - t);
        let step = dp_step(model, t, &y, h_try, config);
        stats.fn_evals += 7;

        if !(step.error <= 1.0) {
            stats.rejected_steps += 1;
            h = h_try * controller.compute_factor(step.error).min(1.0);
            if h < config.min_step {
                return Err(TrajectoryError::IntegrationNonConvergence {
                    t,
                    reason: format!("step size {h:.3e} s fell below the minimum {:.3e} s", config.min_step),
                });
            }
            continue;
        }
        if step.y1.iter().any(|v| !v.is_finite()) {
            return Err(TrajectoryError::IntegrationNonConvergence {
                t,
                reason: "state became non-finite".into(),
            });
        }

        stats.accepted_steps += 1;
        let t1 = t + h_try;
        let mut segment = DenseSegment::from_stages(t, h_try, &y, &step.y1, &step.k);
        h = (h_try * controller.compute_factor(step.error)).clamp(config.min_step, config.max_step);

        let g_new: Vec<f64> = kinds.iter().map(|&k| model.switching(k, t1, &step.y1)).collect();
        let roots: Vec<(usize, f64)> = (0..kinds.len())
            .filter(|&i| sign_changed(g_prev[i], g_new[i]))
            .map(|i| (i, locate(model, kinds[i], &segment, t, t1, g_prev[i], config)))
            .collect();

        if roots.is_empty() {
            dense.push(segment);
            t = t1;
            y = step.y1;
            model.accept_step(t, &y);
            g_prev = g_new;
            continue;
        }

        // Cut the step at the earliest crossing
        let t_event = roots.iter().map(|&(_, tr)| tr).fold(f64::INFINITY, f64::min);
        segment.truncate(t_event);
        y = segment.state_at(t_event);
        t = t_event;
        dense.push(segment);

        let mut g_at: Vec<f64> = kinds.iter().map(|&k| model.switching(k, t, &y)).collect();
        let firing: Vec<usize> = roots
            .iter()
            .filter(|&&(_, tr)| tr <= t_event + config.event_tolerance)
            .map(|&(i, _)| i)
            .collect();

        let mut stopped_by = None;
        for &i in &firing {
            let kind = kinds[i];
            let outcome = model.fire(kind, t, &y)?;
            stats.events += 1;
            debug!(event = kind.label(), t, ?outcome, "event fired");

            let ctx = model.context_mut();
            ctx.record_event(FiredEvent { time: t, kind, state: y });
            match outcome {
                EventOutcome::Continue => {}
                EventOutcome::RecordBreakpoint => ctx.record_breakpoint(t),
                EventOutcome::Stop => {
                    ctx.record_breakpoint(t);
                    stopped_by.get_or_insert(kind);
                }
            }
        }

        model.accept_step(t, &y);
        for &i in &firing {
            g_at[i] = model.switching(kinds[i], t, &y);
        }
        g_prev = g_at;

        if stopped_by.is_some() {
            return Ok(Integration { dense, stats, stopped_by });
        }
    }

    Ok(Integration { dense, stats, stopped_by: None })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
