use serde::Deserialize;
use tracing::{debug, error, info};

use crate::dynamics::aoa::AoaSearch;
use crate::dynamics::eom::{self, ForceBreakdown};
use crate::dynamics::state::{state, StateVector, FOOT, FOOT_PER_MINUTE, FUEL, G0, GAMMA, H, KNOT, V, X};
use crate::error::TrajectoryError;
use crate::physics::aerodynamics::{aero_force, dynamic_pressure, landing_ground_effect};
use crate::physics::atmosphere::{isa_offset, mach, stall_speed};
use crate::vehicle::aircraft::Aircraft;
use crate::vehicle::propulsion::{EngineRating, Propulsion};

use super::context::{LinearBlend, Phase, SimulationContext};
use super::event::{one_shot, Crossing, EventKind, EventOutcome, EventSet, GUARD};
use super::integrator::{integrate, Integration, IntegratorConfig};
use super::model::TrajectoryModel;
use super::resample::{resample, TrajectorySample};
use super::result::{CertificationPoint, LandingSummary, RunStatus, TrajectoryResult};
use super::shooting::{shoot, Verdict};

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Outer loop on the flare pitch rate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandingShooting {
    pub initial: f64,               // deg/s
    pub max_iterations: usize,
    pub altitude_tolerance: f64,    // m, on the touchdown altitude
    pub target_sink_fpm: f64,       // largest accepted rate of descent, ft/min
    pub fine_window_fpm: f64,       // ft/min around the target where the fine step applies
    pub fine_step: f64,             // deg/s
    pub coarse_step: f64,           // deg/s
    pub climb_step: f64,            // deg/s, after the flare turned into a climb
}

impl Default for LandingShooting {
    fn default() -> Self {
        Self {
            initial: 1.0,
            max_iterations: 25,
            altitude_tolerance: 1e-2,
            target_sink_fpm: 100.0,
            fine_window_fpm: 250.0,
            fine_step: 0.025,
            coarse_step: 0.5,
            climb_step: -0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandingSetup {
    pub delta_temperature: f64,         // K above ISA
    pub wind_speed: f64,                // m/s, headwind positive
    pub initial_altitude: f64,          // m
    pub descent_angle: f64,             // deg, negative
    pub approach_factor: f64,           // V_app / V_s
    pub flare_factor: f64,              // V_flare / V_s
    pub touchdown_factor: f64,          // V_TD / V_s
    pub descent_speed_increment: f64,   // kt above V_app
    pub certification_altitude: f64,    // m
    pub obstacle_altitude: f64,         // m
    pub flare_altitude: f64,            // m
    pub touchdown_altitude: f64,        // m, wheel height at touchdown
    pub dt_flare: f64,                  // s, thrust ramp to ground idle
    pub dt_free_roll: f64,              // s, before the brakes are applied
    pub friction: f64,                  // free-roll friction coefficient
    pub braking_friction: f64,
    pub alpha_ground: f64,              // deg
    pub k_cl_max: f64,                  // largest CL / CL_max allowed in the flare
    pub sample_interval: f64,           // s
    pub horizon: f64,                   // s
    pub shooting: LandingShooting,
    pub aoa: AoaSearch,
    pub integrator: IntegratorConfig,
}

impl Default for LandingSetup {
    fn default() -> Self {
        Self {
            delta_temperature: 10.0,
            wind_speed: 0.0,
            initial_altitude: 600.0,
            descent_angle: -3.0,
            approach_factor: 1.23,
            flare_factor: 1.2,
            touchdown_factor: 1.15,
            descent_speed_increment: 10.0,
            certification_altitude: 120.0,
            obstacle_altitude: 50.0 * FOOT,
            flare_altitude: 20.0 * FOOT,
            touchdown_altitude: 1.0,
            dt_flare: 5.0,
            dt_free_roll: 2.0,
            friction: 0.03,
            braking_friction: 0.4,
            alpha_ground: 0.0,
            k_cl_max: 0.9,
            sample_interval: 0.5,
            horizon: 10_000.0,
            shooting: LandingShooting::default(),
            aoa: AoaSearch::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

impl LandingSetup {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        let positive = [
            ("approach factor", self.approach_factor),
            ("flare factor", self.flare_factor),
            ("touchdown factor", self.touchdown_factor),
            ("certification altitude", self.certification_altitude),
            ("touchdown altitude", self.touchdown_altitude),
            ("CL_max factor", self.k_cl_max),
            ("sample interval", self.sample_interval),
            ("horizon", self.horizon),
            ("altitude tolerance", self.shooting.altitude_tolerance),
            ("target rate of descent", self.shooting.target_sink_fpm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrajectoryError::invalid(format!("landing {name} must be positive, got {value}")));
            }
        }
        if !(self.descent_angle < 0.0 && self.descent_angle > -90.0) {
            return Err(TrajectoryError::invalid(format!(
                "descent angle must be negative, got {} deg",
                self.descent_angle
            )));
        }
        if !(self.initial_altitude > self.obstacle_altitude
            && self.obstacle_altitude > self.flare_altitude
            && self.flare_altitude > self.touchdown_altitude)
        {
            return Err(TrajectoryError::invalid(
                "landing altitudes must decrease from start to obstacle, flare and touchdown",
            ));
        }
        if self.dt_flare < 0.0 || self.dt_free_roll < 0.0 || self.friction < 0.0 || self.braking_friction < 0.0 {
            return Err(TrajectoryError::invalid("landing ramp times and friction coefficients must be non-negative"));
        }
        if self.shooting.max_iterations == 0 {
            return Err(TrajectoryError::invalid("landing shooting needs at least one iteration"));
        }
        self.aoa.validate()?;
        self.integrator.validate()
    }

    fn touchdown_on_target(&self, altitude: f64, rate_of_climb: f64) -> bool {
        (altitude - self.touchdown_altitude).abs() < self.shooting.altitude_tolerance
            && rate_of_climb.abs() < self.shooting.target_sink_fpm * FOOT_PER_MINUTE
    }
}

/// Reference speeds of the approach, m/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceSpeeds {
    pub stall: f64,
    pub approach: f64,
    pub descent: f64,
    pub flare: f64,
    pub touchdown: f64,
}

/// Trimmed condition on the glide path at the initial altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachTrim {
    pub alpha: f64,   // deg
    pub thrust: f64,  // N
}

// ---------------------------------------------------------------------------
// Shared force helpers
// ---------------------------------------------------------------------------

/// Landing drag coefficient with the lift-dependent part scaled by ground effect.
fn drag_coefficient(aircraft: &Aircraft, cl: f64, altitude: f64) -> f64 {
    let polar = &aircraft.landing.polar;
    let cd0 = polar.cd0();
    let hb = (altitude.max(0.0) + aircraft.wing_height) / aircraft.span;
    cd0 + (polar.cd(cl) - cd0) * landing_ground_effect(hb)
}

/// Fuel flow interpolated between flight idle and cruise by thrust.
///
/// Each rating is given as `(thrust, fuel flow)`.
pub fn blended_fuel_flow(thrust: f64, idle: (f64, f64), cruise: (f64, f64)) -> f64 {
    let (t_idle, ff_idle) = idle;
    let (t_cruise, ff_cruise) = cruise;
    let span = t_cruise - t_idle;
    let ff = if !span.is_finite() || span.abs() < f64::EPSILON {
        ff_idle
    } else {
        ff_idle + (thrust - t_idle) / span * (ff_cruise - ff_idle)
    };
    if ff.is_finite() { ff } else { 0.0 }
}

// ---------------------------------------------------------------------------
// Landing equations of motion
// ---------------------------------------------------------------------------

/// One landing attempt: configuration by reference plus its own context.
pub struct LandingModel<'a> {
    aircraft: &'a Aircraft,
    engine: &'a dyn Propulsion,
    setup: &'a LandingSetup,
    speeds: ReferenceSpeeds,
    descent_thrust: f64,                    // N
    events: EventSet,
    ctx: SimulationContext,
    certification_point: Option<CertificationPoint>,
    obstacle_distance: Option<f64>,         // m
    touchdown: Option<(f64, f64)>,          // (altitude m, rate of climb m/s)
    touchdown_distance: Option<f64>,        // m
    flare_ending_altitude: Option<f64>,     // m
    positive_rate_of_climb: bool,
}

impl<'a> LandingModel<'a> {
    pub fn new(
        aircraft: &'a Aircraft,
        engine: &'a dyn Propulsion,
        setup: &'a LandingSetup,
        speeds: ReferenceSpeeds,
        trim: ApproachTrim,
        alpha_dot_flare: f64,
    ) -> Self {
        Self {
            aircraft,
            engine,
            setup,
            speeds,
            descent_thrust: trim.thrust,
            events: EventSet::landing(),
            ctx: SimulationContext::new(alpha_dot_flare, 0.0, trim.alpha),
            certification_point: None,
            obstacle_distance: None,
            touchdown: None,
            touchdown_distance: None,
            flare_ending_altitude: None,
            positive_rate_of_climb: false,
        }
    }

    pub fn phase(&self, t: f64) -> Phase {
        let m = &self.ctx.milestones;
        match m.touchdown.time() {
            Some(td) if t >= td + self.setup.dt_free_roll => Phase::Braking,
            Some(td) if t >= td => Phase::FreeRoll,
            _ if m.flare.passed(t) => Phase::Flare,
            _ if m.obstacle.passed(t) => Phase::Approach,
            _ => Phase::Descent,
        }
    }

    fn friction_coefficient(&self, phase: Phase) -> f64 {
        match phase {
            Phase::FreeRoll => self.setup.friction,
            Phase::Braking => self.setup.braking_friction,
            _ => 0.0,
        }
    }

    fn thrust(&self, t: f64, mach: f64, altitude: f64) -> f64 {
        if self.ctx.milestones.touchdown.passed(t) {
            return self.engine.thrust(EngineRating::GroundIdle, mach, altitude, self.setup.delta_temperature, 1.0);
        }
        self.ctx.thrust_blend.map_or(self.descent_thrust, |b| b.value(t))
    }

    fn fuel_flow(&self, thrust: f64, mach: f64, altitude: f64, on_ground: bool) -> f64 {
        let e = self.engine;
        let dt = self.setup.delta_temperature;
        if on_ground {
            return thrust * e.sfc(EngineRating::GroundIdle, mach, altitude, dt, 1.0);
        }
        let rating = |r: EngineRating| {
            let t = e.thrust(r, mach, altitude, dt, 1.0);
            (t, t * e.sfc(r, mach, altitude, dt, 1.0))
        };
        blended_fuel_flow(thrust, rating(EngineRating::FlightIdle), rating(EngineRating::Cruise))
    }

    /// Forces at `(t, x)` for the angle of attack `alpha` (deg).
    fn forces(&self, t: f64, x: &StateVector, alpha: f64) -> ForceBreakdown {
        let ac = self.aircraft;
        let cfg = &ac.landing;
        let phase = self.phase(t);
        let on_ground = phase.on_ground();
        let altitude = x[H].max(0.0);
        let dt = self.setup.delta_temperature;

        let airspeed = x[V] + self.setup.wind_speed * x[GAMMA].cos();
        let q = dynamic_pressure(isa_offset(altitude, dt).density, airspeed);

        let cl = cfg.cl0 + cfg.cl_alpha * alpha;
        let cd = drag_coefficient(ac, cl, altitude);
        let lift = aero_force(q, ac.wing_area, cl);
        let drag = aero_force(q, ac.wing_area, cd);

        let m = mach(airspeed, altitude, dt);
        let thrust = self.thrust(t, m, altitude);
        let fuel_flow = self.fuel_flow(thrust, m, altitude, on_ground);
        let weight = (ac.max_landing_mass - x[FUEL]) * G0;
        let friction = self.friction_coefficient(phase) * (weight - lift).max(0.0);

        ForceBreakdown { alpha, cl, cd, lift, drag, thrust, friction, weight, fuel_flow, on_ground }
    }

    fn current_forces(&self, t: f64, x: &StateVector) -> ForceBreakdown {
        self.forces(t, x, self.ctx.control.alpha_at(t))
    }

    fn snapshot(&self, t: f64, x: &StateVector) -> CertificationPoint {
        let f = self.current_forces(t, x);
        let tas = x[V] + self.setup.wind_speed * x[GAMMA].cos();
        let sigma = isa_offset(x[H].max(0.0), self.setup.delta_temperature).sigma();
        let gamma = x[GAMMA].to_degrees();
        CertificationPoint {
            distance: x[X],
            altitude: x[H],
            true_airspeed: tas,
            equivalent_airspeed: tas * sigma.sqrt(),
            alpha: f.alpha,
            gamma,
            theta: f.alpha + gamma,
            thrust: f.thrust,
        }
    }
}

impl TrajectoryModel for LandingModel<'_> {
    fn events(&self) -> &EventSet {
        &self.events
    }

    fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.ctx
    }

    fn derivative(&self, t: f64, x: &StateVector) -> StateVector {
        eom::derivative(&self.current_forces(t, x), x)
    }

    fn switching(&self, event: EventKind, t: f64, x: &StateVector) -> f64 {
        let m = &self.ctx.milestones;
        let s = self.setup;
        let falling = |armed: bool, fired: bool, value: f64| one_shot(Crossing::Falling, armed, fired, value);
        let airborne = !m.touchdown.passed(t);

        match event {
            EventKind::CertificationPoint => {
                falling(airborne, m.certification_point.is_set(), x[H] - s.certification_altitude)
            }
            EventKind::Obstacle => falling(airborne, m.obstacle.is_set(), x[H] - s.obstacle_altitude),
            EventKind::FlareAltitude => falling(airborne, m.flare.is_set(), x[H] - s.flare_altitude),
            EventKind::TouchDown => falling(airborne, m.touchdown.is_set(), x[H] - s.touchdown_altitude),
            EventKind::ZeroGamma => one_shot(
                Crossing::Rising,
                m.flare.passed(t) && airborne,
                m.zero_gamma.is_set(),
                x[GAMMA],
            ),
            EventKind::FullStop => falling(!airborne, m.full_stop.is_set(), x[V]),
            _ => GUARD,
        }
    }

    fn fire(&mut self, event: EventKind, t: f64, x: &StateVector) -> Result<EventOutcome, TrajectoryError> {
        let outcome = match event {
            EventKind::CertificationPoint => {
                self.ctx.milestones.certification_point.set(t);
                self.certification_point = Some(self.snapshot(t, x));
                EventOutcome::Continue
            }
            EventKind::Obstacle => {
                self.ctx.milestones.obstacle.set(t);
                self.obstacle_distance = Some(x[X]);
                EventOutcome::RecordBreakpoint
            }
            EventKind::FlareAltitude => {
                let dt = self.setup.delta_temperature;
                let start = self.current_forces(t, x).thrust;
                let idle = self.engine.thrust(
                    EngineRating::GroundIdle,
                    mach(self.speeds.touchdown, 0.0, dt),
                    0.0,
                    dt,
                    1.0,
                );
                self.ctx.milestones.flare.set(t);
                self.ctx.thrust_blend = Some(LinearBlend::new(t, self.setup.dt_flare, start, idle));
                EventOutcome::RecordBreakpoint
            }
            EventKind::TouchDown => {
                let rate_of_climb = x[V] * x[GAMMA].sin();
                self.ctx.milestones.touchdown.set(t);
                self.touchdown = Some((x[H], rate_of_climb));
                self.touchdown_distance = Some(x[X]);
                debug!(t, altitude = x[H], rate_of_climb, "touchdown");
                if self.setup.touchdown_on_target(x[H], rate_of_climb) {
                    EventOutcome::RecordBreakpoint
                } else {
                    EventOutcome::Stop
                }
            }
            EventKind::ZeroGamma => {
                self.ctx.milestones.zero_gamma.set(t);
                self.flare_ending_altitude = Some(x[H]);
                self.positive_rate_of_climb = true;
                EventOutcome::Stop
            }
            EventKind::FullStop => {
                self.ctx.milestones.full_stop.set(t);
                EventOutcome::Stop
            }
            _ => EventOutcome::Continue,
        };
        Ok(outcome)
    }

    fn accept_step(&mut self, t: f64, x: &StateVector) {
        let alpha_before = self.ctx.control.alpha_at(t);
        let m = self.ctx.milestones;
        let s = self.setup;

        let (alpha, alpha_dot) = if m.touchdown.passed(t) {
            (s.alpha_ground, 0.0)
        } else if m.flare.passed(t) {
            (alpha_before, self.ctx.parameter)
        } else {
            let solution = s.aoa.solve(alpha_before, |a| {
                let f = self.forces(t, x, a);
                eom::gamma_rate(&f, x[V], x[GAMMA]).to_degrees()
            });
            if !solution.converged {
                debug!(t, residual = solution.residual, "glide-path angle of attack not converged");
            }
            (solution.alpha, 0.0)
        };

        self.ctx.update_control(t, alpha_before, alpha, alpha_dot);

        let cfg = &self.aircraft.landing;
        if !m.touchdown.passed(t) && cfg.cl0 + cfg.cl_alpha * alpha > s.k_cl_max * cfg.cl_max {
            self.ctx.max_cl_exceeded = true;
        }
    }

    fn sample(&self, t: f64, x: &StateVector) -> TrajectorySample {
        let alpha = self.ctx.alpha_at(t);
        let f = self.forces(t, x, alpha);
        let xdot = eom::derivative(&f, x);
        let gamma = x[GAMMA];
        TrajectorySample {
            time: t,
            distance: x[X],
            altitude: x[H],
            speed: x[V],
            alpha,
            alpha_dot: self.ctx.alpha_rate_at(t),
            gamma: gamma.to_degrees(),
            gamma_dot: xdot[GAMMA].to_degrees(),
            theta: alpha + gamma.to_degrees(),
            lift: f.lift,
            drag: f.drag,
            thrust: f.thrust,
            thrust_horizontal: f.thrust_horizontal(),
            thrust_vertical: f.thrust_vertical(),
            friction: f.friction,
            total_force: f.total_force(gamma),
            load_factor: f.load_factor(gamma),
            cl: f.cl,
            cd: f.cd,
            rate_of_climb: xdot[H],
            acceleration: xdot[V],
            fuel_used: x[FUEL],
            weight: f.weight,
        }
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

/// Approach, flare and ground roll with the flare pitch rate found by shooting.
pub struct LandingCalculator<'a> {
    aircraft: &'a Aircraft,
    engine: &'a dyn Propulsion,
    setup: LandingSetup,
}

impl<'a> LandingCalculator<'a> {
    pub fn new(aircraft: &'a Aircraft, engine: &'a dyn Propulsion, setup: LandingSetup) -> Result<Self, TrajectoryError> {
        setup.validate()?;
        Ok(Self { aircraft, engine, setup })
    }

    pub fn setup(&self) -> &LandingSetup {
        &self.setup
    }

    /// Speeds referenced to the sea-level stall speed at MLM.
    pub fn reference_speeds(&self) -> ReferenceSpeeds {
        let s = &self.setup;
        let density = isa_offset(0.0, s.delta_temperature).density;
        let vs = stall_speed(
            self.aircraft.landing_weight(),
            density,
            self.aircraft.wing_area,
            self.aircraft.landing.cl_max,
        );
        let approach = s.approach_factor * vs;
        ReferenceSpeeds {
            stall: vs,
            approach,
            descent: approach + s.descent_speed_increment * KNOT,
            flare: s.flare_factor * vs,
            touchdown: s.touchdown_factor * vs,
        }
    }

    /// Angle of attack and thrust holding the glide path at the approach speed.
    pub fn approach_trim(&self, speeds: &ReferenceSpeeds) -> Result<ApproachTrim, TrajectoryError> {
        let ac = self.aircraft;
        let cfg = &ac.landing;
        let s = &self.setup;
        let gamma = s.descent_angle.to_radians();
        let weight = ac.landing_weight();

        let q = dynamic_pressure(isa_offset(s.initial_altitude, s.delta_temperature).density, speeds.approach);
        let alpha = (weight * gamma.cos() / (q * ac.wing_area) - cfg.cl0) / cfg.cl_alpha;
        let cl = cfg.cl0 + cfg.cl_alpha * alpha;
        let drag = aero_force(q, ac.wing_area, drag_coefficient(ac, cl, s.initial_altitude));

        let thrust = gamma * weight + drag;
        if !(thrust.is_finite() && thrust > 0.0) {
            return Err(TrajectoryError::DegenerateThrustQuery { context: "approach thrust".into(), thrust });
        }
        Ok(ApproachTrim { alpha, thrust })
    }

    /// Integrates one attempt with the given flare pitch rate.
    pub fn attempt(
        &self,
        alpha_dot_flare: f64,
        speeds: ReferenceSpeeds,
        trim: ApproachTrim,
    ) -> Result<(LandingModel<'_>, Integration), TrajectoryError> {
        let s = &self.setup;
        let mut model = LandingModel::new(self.aircraft, self.engine, s, speeds, trim, alpha_dot_flare);
        let y0 = state(0.0, speeds.descent, s.descent_angle.to_radians(), s.initial_altitude, 0.0);
        let run = integrate(&mut model, 0.0, y0, s.horizon, &s.integrator)?;
        Ok((model, run))
    }

    /// Runs the shooting loop and resamples the accepted trajectory.
    ///
    /// Fatal conditions give a stopped, zero-length result.
    pub fn run(&self) -> TrajectoryResult<LandingSummary> {
        match self.try_run() {
            Ok(result) => result,
            Err(e) => {
                error!(aircraft = %self.aircraft.name, error = %e, "landing calculation stopped");
                TrajectoryResult::stopped(e)
            }
        }
    }

    fn judge(&self, model: &LandingModel<'_>, alpha_dot_flare: f64) -> Verdict {
        let sh = &self.setup.shooting;
        if model.ctx.max_cl_exceeded {
            let cfg = &self.aircraft.landing;
            return Verdict::GiveUp(TrajectoryError::LiftCoefficientLimitExceeded {
                limit: self.setup.k_cl_max * cfg.cl_max,
                parameter: alpha_dot_flare,
            });
        }
        if model.positive_rate_of_climb {
            info!(alpha_dot_flare, "flare ended in a climb");
            return Verdict::Retry(alpha_dot_flare + sh.climb_step);
        }
        match model.touchdown {
            Some((altitude, roc)) if self.setup.touchdown_on_target(altitude, roc) => Verdict::Accept,
            Some((_, roc)) => {
                let sink_fpm = roc / FOOT_PER_MINUTE;
                info!(alpha_dot_flare, sink_fpm, "touchdown rate of descent off target");
                if (sink_fpm + sh.target_sink_fpm).abs() < sh.fine_window_fpm {
                    Verdict::Retry(alpha_dot_flare + sh.fine_step)
                } else {
                    Verdict::Retry(alpha_dot_flare + sh.coarse_step)
                }
            }
            None => Verdict::Retry(alpha_dot_flare + sh.coarse_step),
        }
    }

    fn try_run(&self) -> Result<TrajectoryResult<LandingSummary>, TrajectoryError> {
        let s = &self.setup;
        let speeds = self.reference_speeds();
        let trim = self.approach_trim(&speeds)?;
        info!(
            aircraft = %self.aircraft.name,
            stall_speed = speeds.stall,
            approach_speed = speeds.approach,
            descent_thrust = trim.thrust,
            "landing shooting"
        );

        let outcome = shoot(
            s.shooting.initial,
            s.shooting.max_iterations,
            |alpha_dot| self.attempt(alpha_dot, speeds, trim),
            |(model, _), alpha_dot| self.judge(model, alpha_dot),
        )?;

        let (model, run) = &outcome.attempt;
        let samples = resample(model, &run.dense, s.sample_interval);
        let yf = run.dense.final_state();
        let m = model.ctx.milestones;
        let summary = LandingSummary {
            stall_speed: speeds.stall,
            approach_speed: speeds.approach,
            descent_speed: speeds.descent,
            flare_speed: speeds.flare,
            touchdown_speed: speeds.touchdown,
            alpha_dot_flare: outcome.parameter,
            touchdown_altitude: model.touchdown.map(|(h, _)| h),
            touchdown_rate_of_descent: model.touchdown.map(|(_, roc)| roc),
            flare_ending_altitude: model.flare_ending_altitude,
            positive_rate_of_climb: model.positive_rate_of_climb,
            max_cl_exceeded: model.ctx.max_cl_exceeded,
            certification_point: model.certification_point,
            ground_roll: model
                .touchdown_distance
                .filter(|_| m.full_stop.is_set())
                .map(|x_td| yf[X] - x_td),
            landing_distance: yf[X] - model.obstacle_distance.unwrap_or(0.0),
            final_time: run.dense.final_time(),
            iterations: outcome.iterations,
            milestones: m,
        };
        info!(
            iterations = outcome.iterations,
            alpha_dot_flare = outcome.parameter,
            steps = run.stats.accepted_steps,
            samples = samples.len(),
            "landing trajectory computed"
        );

        Ok(TrajectoryResult {
            status: if outcome.converged { RunStatus::Converged } else { RunStatus::Unconverged },
            samples,
            breakpoints: model.ctx.breakpoints().to_vec(),
            events: model.ctx.events().to_vec(),
            summary,
            warnings: outcome.warnings,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::aircraft::presets::twin_jet;
    use crate::vehicle::propulsion::presets::twin_turbofan;
    use approx::assert_relative_eq;

    fn short_setup() -> LandingSetup {
        LandingSetup {
            initial_altitude: 200.0,
            shooting: LandingShooting { max_iterations: 4, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn reference_speeds_follow_stall_speed() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = LandingCalculator::new(&ac, &engine, short_setup()).unwrap();
        let v = calc.reference_speeds();
        assert_relative_eq!(v.approach, 1.23 * v.stall, max_relative = 1e-12);
        assert_relative_eq!(v.flare, 1.2 * v.stall, max_relative = 1e-12);
        assert_relative_eq!(v.touchdown, 1.15 * v.stall, max_relative = 1e-12);
        assert_relative_eq!(v.descent - v.approach, 10.0 * KNOT, max_relative = 1e-12);
        let trim = calc.approach_trim(&v).unwrap();
        assert!(trim.thrust > 0.0 && trim.alpha.is_finite());
    }

    #[test]
    fn approach_events_fire_in_order() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = LandingCalculator::new(&ac, &engine, short_setup()).unwrap();
        let speeds = calc.reference_speeds();
        let trim = calc.approach_trim(&speeds).unwrap();
        let (model, run) = calc.attempt(1.0, speeds, trim).unwrap();

        let m = &model.context().milestones;
        let cert = m.certification_point.time().expect("certification point");
        let obstacle = m.obstacle.time().expect("obstacle");
        let flare = m.flare.time().expect("flare");
        assert!(cert < obstacle && obstacle < flare);
        assert!(run.stopped_by.is_some());
        if let Some(td) = m.touchdown.time() {
            assert!(obstacle < td);
        } else {
            assert!(m.zero_gamma.is_set());
        }

        let point = model.certification_point.expect("snapshot");
        assert_relative_eq!(point.altitude, 120.0, epsilon = 1e-6);
        assert!(point.equivalent_airspeed < point.true_airspeed);
        assert_relative_eq!(point.theta, point.alpha + point.gamma, epsilon = 1e-12);
        // certification point is not a breakpoint
        assert!(!model.context().breakpoints().contains(&cert));
    }

    #[test]
    fn glide_path_is_held_before_the_flare() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = LandingCalculator::new(&ac, &engine, short_setup()).unwrap();
        let speeds = calc.reference_speeds();
        let trim = calc.approach_trim(&speeds).unwrap();
        let (model, run) = calc.attempt(1.0, speeds, trim).unwrap();
        let flare = model.context().milestones.flare.or_sentinel();
        for s in resample(&model, &run.dense, 0.5).iter().filter(|s| s.time < flare) {
            assert!((s.gamma + 3.0).abs() < 0.5, "gamma {} deg at t = {}", s.gamma, s.time);
        }
    }

    #[test]
    fn result_is_consistent() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = LandingCalculator::new(&ac, &engine, short_setup()).unwrap();
        let result = calc.run();
        assert!(!result.is_stopped(), "status {:?}", result.status);
        assert!(result.summary.iterations <= 4);

        let bps = &result.breakpoints;
        assert!(bps.windows(2).all(|w| w[1] > w[0]));
        assert!(bps.iter().all(|&t| (0.0..=result.summary.final_time).contains(&t)));

        let touchdown = result.summary.milestones.touchdown.or_sentinel();
        for s in result.samples.iter().filter(|s| s.time < touchdown) {
            let roc = s.speed * s.gamma.to_radians().sin();
            assert!((roc - s.rate_of_climb).abs() < 1e-9, "rate of climb mismatch at t = {}", s.time);
        }
        if result.is_converged() {
            let sink = result.summary.touchdown_rate_of_descent.expect("touchdown");
            assert!(sink.abs() < 100.0 * FOOT_PER_MINUTE);
            assert!(result.summary.milestones.full_stop.is_set());
            assert!(result.summary.ground_roll.unwrap_or(0.0) > 0.0);
            assert!(result.summary.milestones.obstacle.or_sentinel() < touchdown);
        } else {
            assert!(!result.warnings.is_empty());
        }
    }

    #[test]
    fn steep_descent_needs_negative_thrust() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = LandingSetup { descent_angle: -12.0, ..short_setup() };
        let calc = LandingCalculator::new(&ac, &engine, setup).unwrap();
        let result = calc.run();
        assert!(matches!(result.status, RunStatus::Stopped(TrajectoryError::DegenerateThrustQuery { .. })));
        assert!(result.samples.is_empty());
        assert_eq!(result.summary, LandingSummary::default());
    }

    #[test]
    fn fuel_flow_blend() {
        assert_relative_eq!(blended_fuel_flow(50.0, (0.0, 0.1), (100.0, 1.1)), 0.6);
        assert_relative_eq!(blended_fuel_flow(50.0, (10.0, 0.1), (10.0, 1.1)), 0.1);
        assert_eq!(blended_fuel_flow(f64::NAN, (0.0, 0.1), (100.0, 1.1)), 0.0);
    }

    #[test]
    fn touchdown_targets() {
        let s = LandingSetup::default();
        assert!(s.touchdown_on_target(1.005, -0.3));
        assert!(!s.touchdown_on_target(1.005, -1.0));
        assert!(!s.touchdown_on_target(1.05, -0.1));
    }

    #[test]
    fn invalid_setup_fails_fast() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = LandingSetup { flare_altitude: 30.0, ..Default::default() };
        assert!(matches!(
            LandingCalculator::new(&ac, &engine, setup),
            Err(TrajectoryError::InvalidConfiguration(_))
        ));
        let setup = LandingSetup { descent_angle: 3.0, ..Default::default() };
        assert!(LandingCalculator::new(&ac, &engine, setup).is_err());
    }
}
