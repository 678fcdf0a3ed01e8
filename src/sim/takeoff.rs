use std::f64::consts::PI;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::dynamics::aoa::AoaSearch;
use crate::dynamics::eom::{self, ForceBreakdown};
use crate::dynamics::state::{state, StateVector, FOOT, FUEL, G0, GAMMA, H, KNOT, V, X};
use crate::error::TrajectoryError;
use crate::physics::aerodynamics::{aero_force, dynamic_pressure, takeoff_ground_effect};
use crate::physics::atmosphere::{isa_offset, mach, stall_speed};
use crate::physics::table::LinearTable;
use crate::vehicle::aircraft::Aircraft;
use crate::vehicle::propulsion::{EngineRating, Propulsion};

use super::context::{LinearBlend, Phase, SimulationContext};
use super::event::{one_shot, Crossing, EventKind, EventOutcome, EventSet, GUARD};
use super::integrator::{integrate, Integration, IntegratorConfig};
use super::model::TrajectoryModel;
use super::resample::{resample, TrajectorySample};
use super::result::{RunStatus, TakeOffSummary, TrajectoryResult};
use super::shooting::{shoot, ConvergenceBand, Verdict};

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Thrust cutback after the climb-out.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CutbackSetup {
    pub altitude: f64,          // m above the runway
    pub duration: f64,          // s, throttle ramp
    pub throttle: Option<f64>,  // fixed setting; computed from the climb requirements when absent
}

impl Default for CutbackSetup {
    fn default() -> Self {
        Self { altitude: 300.0, duration: 4.0, throttle: None }
    }
}

/// Outer loop on the pitch reduction rate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TakeOffShooting {
    pub initial: f64,           // deg/s
    pub step: f64,              // deg/s
    pub max_iterations: usize,
    pub base_ratio: f64,        // climb speed / stall speed
    pub offset_knots: f64,      // added to the base ratio as kt / V_s
    pub half_width: f64,
    pub band: Option<ConvergenceBand>,
}

impl Default for TakeOffShooting {
    fn default() -> Self {
        Self {
            initial: 0.0,
            step: 0.2,
            max_iterations: 100,
            base_ratio: 1.13,
            offset_knots: 10.0,
            half_width: 0.01,
            band: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TakeOffSetup {
    pub runway_altitude: f64,       // m
    pub delta_temperature: f64,     // K above ISA
    pub wind_speed: f64,            // m/s, headwind positive
    pub throttle: f64,              // take-off throttle setting
    pub friction: LinearTable,      // rolling friction coefficient against ground speed (m/s)
    pub alpha_ground: f64,          // deg
    pub alpha_dot_initial: f64,     // deg/s, rotation rate at zero angle of attack
    pub k_alpha_dot: f64,           // 1/deg, rotation rate decay with angle of attack
    pub k_rotation: f64,            // V_rot / V_s
    pub k_cl_max: f64,              // bar-hold CL / CL_max
    pub dt_hold: f64,               // s
    pub dt_gear_retraction: f64,    // s
    pub obstacle_altitude: f64,     // m
    pub end_distance: f64,          // m
    pub stop_at_gear_up: bool,
    pub cutback: Option<CutbackSetup>,
    pub sample_interval: f64,       // s
    pub horizon: f64,               // s
    pub shooting: TakeOffShooting,
    pub aoa: AoaSearch,
    pub integrator: IntegratorConfig,
}

impl Default for TakeOffSetup {
    fn default() -> Self {
        Self {
            runway_altitude: 0.0,
            delta_temperature: 10.0,
            wind_speed: 0.0,
            throttle: 1.0,
            friction: LinearTable::constant(0.03),
            alpha_ground: 0.0,
            alpha_dot_initial: 3.0,
            k_alpha_dot: 0.04,
            k_rotation: 1.05,
            k_cl_max: 0.9,
            dt_hold: 0.5,
            dt_gear_retraction: 12.0,
            obstacle_altitude: 35.0 * FOOT,
            end_distance: 8_000.0,
            stop_at_gear_up: false,
            cutback: None,
            sample_interval: 1.0,
            horizon: 1_000.0,
            shooting: TakeOffShooting::default(),
            aoa: AoaSearch::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

impl TakeOffSetup {
    pub fn validate(&self) -> Result<(), TrajectoryError> {
        let positive = [
            ("throttle", self.throttle),
            ("rotation speed factor", self.k_rotation),
            ("CL_max factor", self.k_cl_max),
            ("gear retraction time", self.dt_gear_retraction),
            ("obstacle altitude", self.obstacle_altitude),
            ("end distance", self.end_distance),
            ("sample interval", self.sample_interval),
            ("horizon", self.horizon),
            ("shooting step", self.shooting.step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TrajectoryError::invalid(format!("take-off {name} must be positive, got {value}")));
            }
        }
        if self.dt_hold < 0.0 || self.alpha_dot_initial < 0.0 || self.k_alpha_dot < 0.0 {
            return Err(TrajectoryError::invalid("take-off hold time and rotation rates must be non-negative"));
        }
        if self.friction.ys().iter().any(|&mu| mu < 0.0) {
            return Err(TrajectoryError::invalid("friction coefficients must be non-negative"));
        }
        if self.shooting.max_iterations == 0 {
            return Err(TrajectoryError::invalid("take-off shooting needs at least one iteration"));
        }
        if let Some(band) = self.shooting.band {
            ConvergenceBand::new(band.lower, band.upper)?;
        }
        if let Some(cutback) = &self.cutback {
            if !(cutback.altitude > self.obstacle_altitude) || cutback.duration < 0.0 {
                return Err(TrajectoryError::invalid(
                    "cutback altitude must lie above the obstacle and its ramp time be non-negative",
                ));
            }
            if let Some(phi) = cutback.throttle {
                if !(phi > 0.0 && phi <= 1.0) {
                    return Err(TrajectoryError::invalid(format!("cutback throttle {phi} outside (0, 1]")));
                }
            }
        }
        self.aoa.validate()?;
        self.integrator.validate()
    }
}

// ---------------------------------------------------------------------------
// Take-off equations of motion
// ---------------------------------------------------------------------------

/// One take-off attempt: configuration by reference plus its own context.
pub struct TakeOffModel<'a> {
    aircraft: &'a Aircraft,
    engine: &'a dyn Propulsion,
    setup: &'a TakeOffSetup,
    events: EventSet,
    oswald: f64,
    rotation_speed: f64,        // m/s
    ctx: SimulationContext,
    lift_off_speed: Option<f64>,
    v2: Option<f64>,
    climb_speed: Option<f64>,
    gear_up_speed: Option<f64>,
    cutback_throttle: Option<f64>,
}

impl<'a> TakeOffModel<'a> {
    pub fn new(
        aircraft: &'a Aircraft,
        engine: &'a dyn Propulsion,
        setup: &'a TakeOffSetup,
        alpha_reduction: f64,
        stall_speed: f64,
    ) -> Result<Self, TrajectoryError> {
        let oswald = aircraft.takeoff.polar.oswald_factor(aircraft.aspect_ratio())?;
        Ok(Self {
            aircraft,
            engine,
            setup,
            events: EventSet::takeoff(setup.cutback.is_some()),
            oswald,
            rotation_speed: setup.k_rotation * stall_speed,
            ctx: SimulationContext::new(alpha_reduction, 0.0, setup.alpha_ground),
            lift_off_speed: None,
            v2: None,
            climb_speed: None,
            gear_up_speed: None,
            cutback_throttle: None,
        })
    }

    pub fn rotation_speed(&self) -> f64 {
        self.rotation_speed
    }

    pub fn phase(&self, t: f64) -> Phase {
        let m = &self.ctx.milestones;
        if m.cutback.passed(t) {
            Phase::Cutback
        } else if m.climb.passed(t) {
            Phase::Climb
        } else if m.bar_hold.passed(t) && !m.end_of_hold.passed(t) {
            Phase::BarHold
        } else if m.end_of_rotation.passed(t) {
            Phase::Airborne
        } else if m.rotation.passed(t) {
            Phase::Rotation
        } else {
            Phase::GroundRoll
        }
    }

    fn throttle(&self, t: f64) -> f64 {
        self.ctx.throttle_blend.map_or(self.setup.throttle, |b| b.value(t))
    }

    /// Fraction of the gear drag increment already removed.
    fn gear_retracted(&self, t: f64) -> f64 {
        self.ctx.gear_blend.map_or(0.0, |b| b.value(t))
    }

    /// Forces at `(t, x)` for the angle of attack `alpha` (deg).
    fn forces(&self, t: f64, x: &StateVector, alpha: f64) -> ForceBreakdown {
        let ac = self.aircraft;
        let cfg = &ac.takeoff;
        let on_ground = self.phase(t).on_ground();
        let gamma = x[GAMMA];
        let altitude = self.setup.runway_altitude + x[H];
        let dt = self.setup.delta_temperature;

        let airspeed = x[V] + self.setup.wind_speed * gamma.cos();
        let atmo = isa_offset(altitude, dt);
        let q = dynamic_pressure(atmo.density, airspeed);

        let cl = cfg.cl0 + cfg.cl_alpha * (alpha + ac.wing_incidence);
        let induced = cl * cl / (PI * ac.aspect_ratio() * self.oswald);
        let k_ground = takeoff_ground_effect(x[H], ac.span);
        let cd = cfg.polar.cd(cl) - ac.delta_cd0_gear * self.gear_retracted(t) - (1.0 - k_ground) * induced;

        let lift = aero_force(q, ac.wing_area, cl);
        let drag = aero_force(q, ac.wing_area, cd);

        let m = mach(airspeed, altitude, dt);
        let throttle = self.throttle(t);
        let thrust = self.engine.thrust(EngineRating::TakeOff, m, altitude, dt, throttle);
        let fuel_flow = thrust * self.engine.sfc(EngineRating::TakeOff, m, altitude, dt, throttle);

        let weight = (ac.max_takeoff_mass - x[FUEL]) * G0;
        let friction = if on_ground {
            self.setup.friction.eval_clamped(x[V]) * (weight - lift).max(0.0)
        } else {
            0.0
        };

        ForceBreakdown { alpha, cl, cd, lift, drag, thrust, friction, weight, fuel_flow, on_ground }
    }

    fn current_forces(&self, t: f64, x: &StateVector) -> ForceBreakdown {
        self.forces(t, x, self.ctx.control.alpha_at(t))
    }

    /// Throttle after cutback: the override, or the larger of the 4 % climb
    /// gradient and the one-engine-out drag requirement, relative to the
    /// take-off setting and clamped to `[0, 1]`.
    fn compute_cutback_throttle(&self, t: f64, x: &StateVector) -> Result<f64, TrajectoryError> {
        if let Some(phi) = self.setup.cutback.and_then(|c| c.throttle) {
            return Ok(phi);
        }
        let ac = self.aircraft;
        let f = self.current_forces(t, x);
        let altitude = self.setup.runway_altitude + x[H];
        let dt = self.setup.delta_temperature;
        let airspeed = x[V] + self.setup.wind_speed * x[GAMMA].cos();

        let m = mach(airspeed, altitude, dt);
        let full = self.engine.thrust(EngineRating::TakeOff, m, altitude, dt, self.setup.throttle);
        if !(full.is_finite() && full > 0.0) {
            return Err(TrajectoryError::DegenerateThrustQuery { context: "cutback throttle".into(), thrust: full });
        }

        let v_ref = self.climb_speed.unwrap_or(x[V]) + self.setup.wind_speed * x[GAMMA].cos();
        let q_ref = dynamic_pressure(isa_offset(altitude, dt).density, v_ref);
        let drag_oei = aero_force(q_ref, ac.wing_area, f.cd + ac.delta_cd0_oei);
        let engines = self.engine.engine_count() as f64;

        let phi = ((0.04 * f.weight + f.drag) / full).max(engines * drag_oei / full);
        let clamped = phi.clamp(0.0, 1.0);
        if clamped != phi {
            warn!(t, required = phi, throttle = clamped, "cutback throttle clamped");
        }
        Ok(clamped)
    }

    /// Ratio speed the shooting loop steers: climb speed, or the speed at
    /// gear-up when the run stops there.
    fn shooting_speed(&self) -> Option<f64> {
        if self.setup.stop_at_gear_up {
            self.climb_speed.or(self.gear_up_speed)
        } else {
            self.climb_speed
        }
    }
}

impl TrajectoryModel for TakeOffModel<'_> {
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
        let rising = |armed: bool, fired: bool, value: f64| one_shot(Crossing::Rising, armed, fired, value);

        match event {
            EventKind::RotationSpeed => rising(true, m.rotation.is_set(), x[V] - self.rotation_speed),
            EventKind::EndOfRotation => {
                let n = self.current_forces(t, x).load_factor(x[GAMMA]);
                rising(m.rotation.passed(t), m.end_of_rotation.is_set(), n - 1.0)
            }
            EventKind::BarHold => {
                let armed = m.end_of_rotation.passed(t) && !m.obstacle.passed(t);
                let cl = self.current_forces(t, x).cl;
                rising(armed, m.bar_hold.is_set(), cl - s.k_cl_max * self.aircraft.takeoff.cl_max)
            }
            EventKind::EndOfHold => {
                let end = m.bar_hold.time().map_or(0.0, |th| th + s.dt_hold);
                rising(m.bar_hold.is_set(), m.end_of_hold.is_set(), t - end)
            }
            EventKind::Obstacle => {
                rising(m.end_of_rotation.passed(t), m.obstacle.is_set(), x[H] - s.obstacle_altitude)
            }
            EventKind::LandingGearRetractionStart => rising(
                m.end_of_rotation.passed(t),
                m.gear_retraction_start.is_set(),
                x[H] - s.obstacle_altitude,
            ),
            EventKind::LandingGearRetractionEnd => {
                let end = m.gear_retraction_start.time().map_or(0.0, |ts| ts + s.dt_gear_retraction);
                rising(m.gear_retraction_start.is_set(), m.gear_retraction_end.is_set(), t - end)
            }
            EventKind::Climb => {
                let n = self.current_forces(t, x).load_factor(x[GAMMA]);
                rising(m.end_of_hold.passed(t), m.climb.is_set(), 1.0 - n)
            }
            EventKind::ZeroAcceleration => {
                let accel = eom::acceleration(&self.current_forces(t, x), x[GAMMA]);
                rising(m.rotation.passed(t), m.zero_acceleration.is_set(), -accel)
            }
            EventKind::Cutback => match s.cutback {
                Some(c) => rising(true, m.cutback.is_set(), x[H] - c.altitude),
                None => -GUARD,
            },
            EventKind::EndDistance => rising(true, false, x[X] - s.end_distance),
            _ => -GUARD,
        }
    }

    fn fire(&mut self, event: EventKind, t: f64, x: &StateVector) -> Result<EventOutcome, TrajectoryError> {
        let outcome = match event {
            EventKind::RotationSpeed => {
                self.ctx.milestones.rotation.set(t);
                EventOutcome::RecordBreakpoint
            }
            EventKind::EndOfRotation => {
                self.ctx.milestones.end_of_rotation.set(t);
                self.lift_off_speed = Some(x[V]);
                EventOutcome::RecordBreakpoint
            }
            EventKind::BarHold => {
                self.ctx.milestones.bar_hold.set(t);
                EventOutcome::RecordBreakpoint
            }
            EventKind::EndOfHold => {
                self.ctx.milestones.end_of_hold.set(t);
                EventOutcome::RecordBreakpoint
            }
            EventKind::Obstacle => {
                self.ctx.milestones.obstacle.set(t);
                self.v2 = Some(x[V]);
                EventOutcome::RecordBreakpoint
            }
            EventKind::LandingGearRetractionStart => {
                self.ctx.milestones.gear_retraction_start.set(t);
                self.ctx.gear_blend = Some(LinearBlend::new(t, self.setup.dt_gear_retraction, 0.0, 1.0));
                EventOutcome::RecordBreakpoint
            }
            EventKind::LandingGearRetractionEnd => {
                self.ctx.milestones.gear_retraction_end.set(t);
                self.gear_up_speed = Some(x[V]);
                if self.setup.stop_at_gear_up {
                    EventOutcome::Stop
                } else {
                    EventOutcome::RecordBreakpoint
                }
            }
            EventKind::Climb => {
                self.ctx.milestones.climb.set(t);
                EventOutcome::RecordBreakpoint
            }
            EventKind::ZeroAcceleration => {
                self.ctx.milestones.zero_acceleration.set(t);
                self.climb_speed = Some(x[V]);
                EventOutcome::RecordBreakpoint
            }
            EventKind::Cutback => {
                let phi = self.compute_cutback_throttle(t, x)?;
                let duration = self.setup.cutback.map_or(0.0, |c| c.duration);
                self.ctx.milestones.cutback.set(t);
                self.ctx.throttle_blend = Some(LinearBlend::new(t, duration, self.throttle(t), phi));
                self.cutback_throttle = Some(phi);
                debug!(t, throttle = phi, "cutback throttle");
                EventOutcome::RecordBreakpoint
            }
            EventKind::EndDistance => EventOutcome::Stop,
            _ => EventOutcome::Continue,
        };
        Ok(outcome)
    }

    fn accept_step(&mut self, t: f64, x: &StateVector) {
        let alpha_before = self.ctx.control.alpha_at(t);
        let m = self.ctx.milestones;
        let s = self.setup;

        let (alpha, alpha_dot) = if !m.rotation.passed(t) {
            (s.alpha_ground, 0.0)
        } else if m.zero_acceleration.passed(t) {
            let solution = s.aoa.solve(alpha_before, |a| eom::acceleration(&self.forces(t, x, a), x[GAMMA]));
            if !solution.converged {
                debug!(t, residual = solution.residual, "steady-climb angle of attack not converged");
            }
            (solution.alpha, 0.0)
        } else if !m.bar_hold.passed(t) {
            (alpha_before, s.alpha_dot_initial * (1.0 - s.k_alpha_dot * alpha_before))
        } else if !m.end_of_hold.passed(t) {
            (alpha_before, 0.0)
        } else if !m.climb.passed(t) {
            (alpha_before, self.ctx.parameter)
        } else {
            (alpha_before, 0.0)
        };

        self.ctx.update_control(t, alpha_before, alpha, alpha_dot);
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

/// Take-off trajectory with the pitch reduction rate found by shooting.
pub struct TakeOffCalculator<'a> {
    aircraft: &'a Aircraft,
    engine: &'a dyn Propulsion,
    setup: TakeOffSetup,
}

impl<'a> TakeOffCalculator<'a> {
    pub fn new(aircraft: &'a Aircraft, engine: &'a dyn Propulsion, setup: TakeOffSetup) -> Result<Self, TrajectoryError> {
        setup.validate()?;
        Ok(Self { aircraft, engine, setup })
    }

    pub fn setup(&self) -> &TakeOffSetup {
        &self.setup
    }

    /// Stall speed at MTOM on the runway, m/s.
    pub fn stall_speed(&self) -> f64 {
        let density = isa_offset(self.setup.runway_altitude, self.setup.delta_temperature).density;
        stall_speed(
            self.aircraft.takeoff_weight(),
            density,
            self.aircraft.wing_area,
            self.aircraft.takeoff.cl_max,
        )
    }

    /// Acceptance band on climb speed over stall speed.
    pub fn band(&self, stall_speed: f64) -> ConvergenceBand {
        let sh = &self.setup.shooting;
        sh.band.unwrap_or_else(|| {
            ConvergenceBand::centered(sh.base_ratio + sh.offset_knots * KNOT / stall_speed, sh.half_width)
        })
    }

    /// Integrates one attempt with the given pitch reduction rate.
    pub fn attempt(&self, alpha_reduction: f64, stall_speed: f64) -> Result<(TakeOffModel<'_>, Integration), TrajectoryError> {
        let mut model = TakeOffModel::new(self.aircraft, self.engine, &self.setup, alpha_reduction, stall_speed)?;
        let y0 = state(0.0, 0.0, 0.0, 0.0, 0.0);
        let run = integrate(&mut model, 0.0, y0, self.setup.horizon, &self.setup.integrator)?;
        Ok((model, run))
    }

    /// Runs the shooting loop and resamples the accepted trajectory.
    ///
    /// Fatal conditions give a stopped, zero-length result.
    pub fn run(&self) -> TrajectoryResult<TakeOffSummary> {
        match self.try_run() {
            Ok(result) => result,
            Err(e) => {
                error!(aircraft = %self.aircraft.name, error = %e, "take-off calculation stopped");
                TrajectoryResult::stopped(e)
            }
        }
    }

    /// Same aircraft and setup with the cutback replaced.
    fn with_cutback(&self, cutback: Option<CutbackSetup>) -> TakeOffCalculator<'a> {
        TakeOffCalculator {
            aircraft: self.aircraft,
            engine: self.engine,
            setup: TakeOffSetup { cutback, ..self.setup.clone() },
        }
    }

    /// Noise sweep over the cutback throttle.
    ///
    /// Runs the take-off without cutback, with the computed cutback throttle
    /// `phi`, then with `n` fixed settings spread from `phi + 0.1` to 0.9. The
    /// cutback altitude and ramp come from the setup, or the defaults.
    pub fn run_cutback_sweep(&self, n: usize) -> CutbackSweep {
        let cutback = CutbackSetup { throttle: None, ..self.setup.cutback.unwrap_or_default() };
        let full_thrust = self.with_cutback(None).run();
        let computed = self.with_cutback(Some(cutback)).run();

        let settings = match computed.summary.cutback_throttle {
            Some(phi) => sweep_throttles(phi, n),
            None => {
                warn!(aircraft = %self.aircraft.name, "cutback not reached, no throttle sweep");
                Vec::new()
            }
        };
        let overrides = settings
            .into_iter()
            .map(|phi| {
                debug!(throttle = phi, "cutback sweep case");
                (phi, self.with_cutback(Some(CutbackSetup { throttle: Some(phi), ..cutback })).run())
            })
            .collect();

        CutbackSweep { full_thrust, computed, overrides }
    }

    fn try_run(&self) -> Result<TrajectoryResult<TakeOffSummary>, TrajectoryError> {
        let s = &self.setup;
        let static_thrust = self.engine.thrust(
            EngineRating::TakeOff,
            0.0,
            s.runway_altitude,
            s.delta_temperature,
            s.throttle,
        );
        if !(static_thrust.is_finite() && static_thrust > 0.0) {
            return Err(TrajectoryError::DegenerateThrustQuery {
                context: "static take-off thrust".into(),
                thrust: static_thrust,
            });
        }

        let vs = self.stall_speed();
        let band = self.band(vs);
        let step = s.shooting.step;
        info!(
            aircraft = %self.aircraft.name,
            stall_speed = vs,
            lower = band.lower,
            upper = band.upper,
            "take-off shooting"
        );

        let outcome = shoot(
            s.shooting.initial,
            s.shooting.max_iterations,
            |alpha_red| self.attempt(alpha_red, vs),
            |(model, _), alpha_red| {
                let ratio = model.shooting_speed().map(|v| v / vs);
                let next = match ratio {
                    Some(r) if band.contains(r) => return Verdict::Accept,
                    Some(r) if r < band.lower => alpha_red - step,
                    _ => alpha_red + step,
                };
                info!(alpha_red, ratio = ratio.unwrap_or(f64::NAN), "climb speed ratio outside band");
                if next > 0.0 {
                    Verdict::GiveUp(TrajectoryError::ShootingParameterOutOfRange { parameter: next, limit: 0.0 })
                } else {
                    Verdict::Retry(next)
                }
            },
        )?;

        let (model, run) = &outcome.attempt;
        let samples = resample(model, &run.dense, s.sample_interval);
        let yf = run.dense.final_state();
        let summary = TakeOffSummary {
            stall_speed: vs,
            rotation_speed: model.rotation_speed,
            lift_off_speed: model.lift_off_speed.unwrap_or(0.0),
            v2: model.v2.unwrap_or(0.0),
            climb_speed: model.climb_speed,
            climb_ratio: model.climb_speed.map(|v| v / vs),
            alpha_reduction: outcome.parameter,
            cutback_throttle: model.cutback_throttle,
            final_distance: yf[X],
            final_altitude: yf[H],
            final_time: run.dense.final_time(),
            fuel_used: yf[FUEL],
            iterations: outcome.iterations,
            milestones: model.ctx.milestones,
        };
        info!(
            iterations = outcome.iterations,
            alpha_red = outcome.parameter,
            steps = run.stats.accepted_steps,
            samples = samples.len(),
            "take-off trajectory computed"
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
// Cutback sweep
// ---------------------------------------------------------------------------

/// Take-off runs of a cutback throttle sweep.
#[derive(Debug, Clone)]
pub struct CutbackSweep {
    pub full_thrust: TrajectoryResult<TakeOffSummary>,             // no cutback
    pub computed: TrajectoryResult<TakeOffSummary>,                // cutback at the required throttle
    pub overrides: Vec<(f64, TrajectoryResult<TakeOffSummary>)>,   // ascending fixed settings
}

/// Upper end of the fixed cutback settings.
pub const SWEEP_MAX_THROTTLE: f64 = 0.9;

/// `n` evenly spaced settings from `phi + 0.1` to `SWEEP_MAX_THROTTLE`.
///
/// Empty when the lower end already lies above the upper one; a single
/// setting sits at the lower end.
pub fn sweep_throttles(phi: f64, n: usize) -> Vec<f64> {
    let lo = phi + 0.1;
    if n == 0 || !(lo > 0.0 && lo <= SWEEP_MAX_THROTTLE) {
        return Vec::new();
    }
    if n == 1 {
        return vec![lo];
    }
    let step = (SWEEP_MAX_THROTTLE - lo) / (n - 1) as f64;
    (0..n).map(|i| if i + 1 == n { SWEEP_MAX_THROTTLE } else { lo + step * i as f64 }).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::isa_offset;
    use crate::vehicle::aircraft::presets::twin_jet;
    use crate::vehicle::propulsion::presets::twin_turbofan;
    use crate::vehicle::propulsion::RatedTurbofan;
    use approx::assert_relative_eq;

    fn short_setup() -> TakeOffSetup {
        TakeOffSetup {
            end_distance: 3_000.0,
            shooting: TakeOffShooting { max_iterations: 3, ..Default::default() },
            ..Default::default()
        }
    }

    /// Aircraft mass giving exactly `vs` at the runway with the default setup.
    fn aircraft_with_stall_speed(vs: f64) -> Aircraft {
        let mut ac = twin_jet().unwrap();
        let rho = isa_offset(0.0, TakeOffSetup::default().delta_temperature).density;
        ac.max_takeoff_mass = 0.5 * rho * ac.wing_area * ac.takeoff.cl_max * vs * vs / G0;
        ac
    }

    #[test]
    fn rotation_fires_at_rotation_speed() {
        let ac = aircraft_with_stall_speed(60.0);
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let vs = calc.stall_speed();
        assert_relative_eq!(vs, 60.0, max_relative = 1e-9);

        let (model, _) = calc.attempt(0.0, vs).unwrap();
        assert_relative_eq!(model.rotation_speed(), 63.0, max_relative = 1e-9);
        let rotation = model
            .context()
            .events()
            .iter()
            .find(|e| e.kind == EventKind::RotationSpeed)
            .expect("rotation event");
        assert_relative_eq!(rotation.state[V], 63.0, epsilon = 1e-6);
        let m = &model.context().milestones;
        assert!(m.rotation.or_sentinel() < m.end_of_rotation.or_sentinel());
        assert!(m.rotation.or_sentinel() < m.obstacle.or_sentinel());
    }

    #[test]
    fn milestones_follow_flight_order() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let (model, run) = calc.attempt(0.0, calc.stall_speed()).unwrap();
        let m = &model.context().milestones;
        let rot = m.rotation.time().expect("rotation");
        let lo = m.end_of_rotation.time().expect("lift-off");
        let obs = m.obstacle.time().expect("obstacle");
        assert!(rot < lo && lo < obs, "rotation {rot}, lift-off {lo}, obstacle {obs}");
        assert_eq!(m.gear_retraction_start.time(), Some(obs));
        assert_eq!(run.stopped_by, Some(EventKind::EndDistance));
        assert_relative_eq!(run.dense.final_state()[X], 3_000.0, epsilon = 1e-3);
    }

    #[test]
    fn result_is_consistent() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let band = calc.band(calc.stall_speed());
        let result = calc.run();
        assert!(!result.is_stopped(), "status {:?}", result.status);
        if result.is_converged() {
            let ratio = result.summary.climb_ratio.expect("climb ratio");
            assert!(band.contains(ratio), "ratio {ratio} outside {band:?}");
            assert!(result.warnings.is_empty());
        } else {
            match result.warnings.as_slice() {
                [TrajectoryError::ShootingLoopMaxIterationsExceeded { iterations }] => {
                    assert_eq!(*iterations, 3);
                    assert_eq!(result.summary.iterations, 3);
                }
                [TrajectoryError::ShootingParameterOutOfRange { parameter, limit }] => {
                    assert!(*parameter > *limit);
                    assert!(result.summary.iterations <= 3);
                }
                other => panic!("unexpected warnings {other:?}"),
            }
        }

        let t_final = result.summary.final_time;
        let bps = &result.breakpoints;
        assert!(bps.windows(2).all(|w| w[1] > w[0]));
        assert!(bps.iter().all(|&t| (0.0..=t_final).contains(&t)));

        for s in &result.samples {
            assert!(s.speed.is_finite() && s.altitude.is_finite() && s.alpha.is_finite());
            let roc = s.speed * s.gamma.to_radians().sin();
            assert!((roc - s.rate_of_climb).abs() < 1e-9, "rate of climb mismatch at t = {}", s.time);
        }
        for bp in bps {
            assert!(result.samples.iter().any(|s| s.time == *bp), "breakpoint {bp} not sampled");
        }
    }

    #[test]
    fn unreduced_pitch_climbs_below_the_band() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let vs = calc.stall_speed();
        let (model, _) = calc.attempt(0.0, vs).unwrap();
        let ratio = model.shooting_speed().expect("climb speed") / vs;
        assert!(ratio < calc.band(vs).lower, "ratio {ratio}");
    }

    #[test]
    fn preset_take_off_converges_in_band() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = TakeOffSetup {
            end_distance: 3_000.0,
            shooting: TakeOffShooting { max_iterations: 20, ..Default::default() },
            ..Default::default()
        };
        let calc = TakeOffCalculator::new(&ac, &engine, setup).unwrap();
        let band = calc.band(calc.stall_speed());
        let result = calc.run();
        assert!(result.is_converged(), "status {:?}, warnings {:?}", result.status, result.warnings);
        assert!(band.contains(result.summary.climb_ratio.expect("climb ratio")));
        assert!(result.summary.alpha_reduction < 0.0);
        assert!(result.summary.iterations > 1);
    }

    #[test]
    fn sample_at_breakpoint_matches_dense_output() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let (model, run) = calc.attempt(0.0, calc.stall_speed()).unwrap();
        let samples = resample(&model, &run.dense, 1.0);
        for &bp in model.context().breakpoints() {
            let sample = samples.iter().find(|s| s.time == bp).expect("breakpoint sample");
            let y = run.dense.state_at(bp);
            assert_eq!(sample.distance, y[X]);
            assert_eq!(sample.speed, y[V]);
            assert_eq!(sample.altitude, y[H]);
        }
    }

    #[test]
    fn identical_inputs_give_identical_output() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let a = calc.run();
        let b = calc.run();
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.breakpoints, b.breakpoints);
    }

    #[test]
    fn zero_thrust_gives_degenerate_result() {
        let ac = twin_jet().unwrap();
        let engine = RatedTurbofan { static_thrust: 0.0, ..twin_turbofan() };
        let calc = TakeOffCalculator::new(&ac, &engine, short_setup()).unwrap();
        let result = calc.run();
        assert!(matches!(result.status, RunStatus::Stopped(TrajectoryError::DegenerateThrustQuery { .. })));
        assert!(result.samples.is_empty());
        assert_eq!(result.summary, TakeOffSummary::default());
        assert!(!result.summary.final_distance.is_nan());
    }

    #[test]
    fn cutback_reduces_throttle() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = TakeOffSetup {
            end_distance: 6_000.0,
            cutback: Some(CutbackSetup { altitude: 150.0, ..Default::default() }),
            ..short_setup()
        };
        let calc = TakeOffCalculator::new(&ac, &engine, setup).unwrap();
        let (model, run) = calc.attempt(0.0, calc.stall_speed()).unwrap();

        let tc = model.context().milestones.cutback.time().expect("cutback reached");
        let phi = model.cutback_throttle.expect("cutback throttle");
        assert!(phi > 0.0 && phi < 1.0, "phi {phi}");

        let blend = model.context().throttle_blend.expect("throttle ramp");
        assert_eq!(blend.start, tc);
        assert_eq!(blend.from, 1.0);
        assert_eq!(blend.to, phi);
        assert_relative_eq!(blend.value(tc + 4.0), phi);

        let after = tc + 5.0;
        assert!(run.dense.final_time() > after);
        let before = model.sample(tc, &run.dense.state_at(tc)).thrust;
        let ramped = model.sample(after, &run.dense.state_at(after)).thrust;
        assert!(ramped < before, "thrust {ramped} after cutback, {before} before");
    }

    #[test]
    fn cutback_throttle_is_relative_to_take_off_setting() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let full = TakeOffSetup { cutback: Some(CutbackSetup::default()), ..Default::default() };
        let reduced = TakeOffSetup { throttle: 0.8, ..full.clone() };
        let weak = TakeOffSetup { throttle: 0.2, ..full.clone() };
        let x = state(2_000.0, 80.0, 0.1, 300.0, 500.0);
        let phi = |setup: &TakeOffSetup| {
            TakeOffModel::new(&ac, &engine, setup, 0.0, 60.0)
                .unwrap()
                .compute_cutback_throttle(10.0, &x)
                .unwrap()
        };

        let at_full = phi(&full);
        assert!(at_full > 0.0 && at_full < 0.8, "phi {at_full}");
        assert_relative_eq!(phi(&reduced), at_full / 0.8, max_relative = 1e-12);
        // requirement above the available thrust is clamped
        assert_eq!(phi(&weak), 1.0);
    }

    /// Deck that flames out above a given altitude.
    struct FlameOutAbove {
        inner: RatedTurbofan,
        altitude: f64,
    }

    impl Propulsion for FlameOutAbove {
        fn thrust(&self, rating: EngineRating, mach: f64, altitude: f64, dt: f64, throttle: f64) -> f64 {
            if altitude > self.altitude {
                0.0
            } else {
                self.inner.thrust(rating, mach, altitude, dt, throttle)
            }
        }

        fn sfc(&self, rating: EngineRating, mach: f64, altitude: f64, dt: f64, throttle: f64) -> f64 {
            self.inner.sfc(rating, mach, altitude, dt, throttle)
        }

        fn engine_count(&self) -> usize {
            self.inner.engine_count
        }
    }

    #[test]
    fn zero_thrust_at_cutback_stops_the_run() {
        let ac = twin_jet().unwrap();
        let engine = FlameOutAbove { inner: twin_turbofan(), altitude: 50.0 };
        let setup = TakeOffSetup {
            throttle: 0.99,
            cutback: Some(CutbackSetup { altitude: 60.0, ..Default::default() }),
            ..short_setup()
        };
        let calc = TakeOffCalculator::new(&ac, &engine, setup).unwrap();
        let result = calc.run();
        match &result.status {
            RunStatus::Stopped(TrajectoryError::DegenerateThrustQuery { context, thrust }) => {
                assert_eq!(context, "cutback throttle");
                assert_eq!(*thrust, 0.0);
            }
            other => panic!("unexpected status {other:?}"),
        }
        assert!(result.samples.is_empty());
        assert_eq!(result.summary, TakeOffSummary::default());
        assert!(!result.summary.final_distance.is_nan());
        assert!(result.summary.cutback_throttle.is_none());
    }

    #[test]
    fn sweep_settings_span_to_ninety_percent() {
        let s = sweep_throttles(0.6, 3);
        assert_eq!(s.len(), 3);
        assert_relative_eq!(s[0], 0.7, epsilon = 1e-12);
        assert_relative_eq!(s[1], 0.8, epsilon = 1e-12);
        assert_eq!(s[2], SWEEP_MAX_THROTTLE);
        assert_eq!(sweep_throttles(0.6, 1), vec![0.7]);
        assert!(sweep_throttles(0.6, 0).is_empty());
        assert!(sweep_throttles(0.85, 3).is_empty());
    }

    #[test]
    fn cutback_sweep_runs_every_setting() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = TakeOffSetup {
            end_distance: 3_500.0,
            cutback: Some(CutbackSetup { altitude: 150.0, ..Default::default() }),
            shooting: TakeOffShooting { max_iterations: 1, ..Default::default() },
            ..Default::default()
        };
        let calc = TakeOffCalculator::new(&ac, &engine, setup).unwrap();
        let sweep = calc.run_cutback_sweep(3);

        assert!(!sweep.full_thrust.is_stopped());
        assert!(sweep.full_thrust.summary.cutback_throttle.is_none());
        assert!(!sweep.full_thrust.summary.milestones.cutback.is_set());

        let phi = sweep.computed.summary.cutback_throttle.expect("computed cutback");
        assert!(sweep.computed.summary.milestones.cutback.is_set());
        assert_eq!(sweep.overrides.len(), 3);
        let settings: Vec<f64> = sweep.overrides.iter().map(|(th, _)| *th).collect();
        assert!(settings.windows(2).all(|w| w[1] > w[0]));
        assert!(settings.iter().all(|&th| th > phi && th <= SWEEP_MAX_THROTTLE));
        for (th, result) in &sweep.overrides {
            assert!(!result.is_stopped(), "setting {th}: {:?}", result.status);
            assert_eq!(result.summary.cutback_throttle, Some(*th));
        }
        // less thrust after cutback leaves the aircraft lower at the end
        let altitudes: Vec<f64> = sweep.overrides.iter().map(|(_, r)| r.summary.final_altitude).collect();
        assert!(sweep.computed.summary.final_altitude < altitudes[0]);
        assert!(altitudes.windows(2).all(|w| w[1] > w[0]));
        assert!(altitudes[2] < sweep.full_thrust.summary.final_altitude);
    }

    #[test]
    fn stop_at_gear_up_ends_the_run() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = TakeOffSetup { stop_at_gear_up: true, end_distance: 20_000.0, ..short_setup() };
        let calc = TakeOffCalculator::new(&ac, &engine, setup).unwrap();
        let (model, run) = calc.attempt(0.0, calc.stall_speed()).unwrap();
        assert_eq!(run.stopped_by, Some(EventKind::LandingGearRetractionEnd));
        assert!(model.shooting_speed().is_some());
    }

    #[test]
    fn invalid_setup_fails_fast() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let setup = TakeOffSetup { k_rotation: -1.0, ..Default::default() };
        assert!(matches!(
            TakeOffCalculator::new(&ac, &engine, setup),
            Err(TrajectoryError::InvalidConfiguration(_))
        ));
        let setup = TakeOffSetup {
            cutback: Some(CutbackSetup { altitude: 5.0, ..Default::default() }),
            ..Default::default()
        };
        assert!(TakeOffCalculator::new(&ac, &engine, setup).is_err());
    }

    #[test]
    fn default_band_is_centred_on_ten_knots() {
        let ac = twin_jet().unwrap();
        let engine = twin_turbofan();
        let calc = TakeOffCalculator::new(&ac, &engine, TakeOffSetup::default()).unwrap();
        let band = calc.band(70.0);
        assert_relative_eq!(0.5 * (band.lower + band.upper), 1.13 + 10.0 * KNOT / 70.0, epsilon = 1e-12);
        assert_relative_eq!(band.upper - band.lower, 0.02, epsilon = 1e-12);
    }
}
