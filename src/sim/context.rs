use super::event::FiredEvent;

// ---------------------------------------------------------------------------
// Set-once phase timestamps
// ---------------------------------------------------------------------------

/// Reporting value of a milestone that was never reached, s.
pub const NOT_REACHED: f64 = 1.0e4;

/// Time at which a phase transition happened; set at most once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Milestone(Option<f64>);

impl Milestone {
    pub fn time(&self) -> Option<f64> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Time, or the `NOT_REACHED` sentinel.
    pub fn or_sentinel(&self) -> f64 {
        self.0.unwrap_or(NOT_REACHED)
    }

    /// True once `t` is at or after the milestone.
    pub fn passed(&self, t: f64) -> bool {
        matches!(self.0, Some(m) if t >= m)
    }

    /// Records the milestone. Returns false and keeps the first time if it was already set.
    pub fn set(&mut self, t: f64) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(t);
        true
    }
}

/// All phase timestamps a take-off or landing run can record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Milestones {
    pub rotation: Milestone,
    pub end_of_rotation: Milestone,
    pub bar_hold: Milestone,
    pub end_of_hold: Milestone,
    pub obstacle: Milestone,
    pub gear_retraction_start: Milestone,
    pub gear_retraction_end: Milestone,
    pub climb: Milestone,
    pub zero_acceleration: Milestone,
    pub cutback: Milestone,
    pub certification_point: Milestone,
    pub flare: Milestone,
    pub touchdown: Milestone,
    pub zero_gamma: Milestone,
    pub full_stop: Milestone,
}

impl Milestones {
    /// Labelled view, in flight order.
    pub fn entries(&self) -> [(&'static str, Milestone); 15] {
        [
            ("rotation", self.rotation),
            ("end of rotation", self.end_of_rotation),
            ("bar hold", self.bar_hold),
            ("end of hold", self.end_of_hold),
            ("obstacle", self.obstacle),
            ("gear retraction start", self.gear_retraction_start),
            ("gear retraction end", self.gear_retraction_end),
            ("climb", self.climb),
            ("zero acceleration", self.zero_acceleration),
            ("cutback", self.cutback),
            ("certification point", self.certification_point),
            ("flare", self.flare),
            ("touchdown", self.touchdown),
            ("zero gamma", self.zero_gamma),
            ("full stop", self.full_stop),
        ]
    }
}

// ---------------------------------------------------------------------------
// Flight phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GroundRoll,
    Rotation,
    Airborne,
    BarHold,
    Climb,
    Cutback,
    Descent,
    Approach,
    Flare,
    FreeRoll,
    Braking,
}

impl Phase {
    pub fn on_ground(self) -> bool {
        matches!(self, Phase::GroundRoll | Phase::Rotation | Phase::FreeRoll | Phase::Braking)
    }
}

// ---------------------------------------------------------------------------
// Linear blend between two values over a time window
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBlend {
    pub start: f64,     // s
    pub duration: f64,  // s
    pub from: f64,
    pub to: f64,
}

impl LinearBlend {
    pub fn new(start: f64, duration: f64, from: f64, to: f64) -> Self {
        Self { start, duration: duration.max(0.0), from, to }
    }

    /// `from` before the window, `to` after it, linear in between.
    pub fn value(&self, t: f64) -> f64 {
        if t <= self.start {
            return self.from;
        }
        if self.duration <= 0.0 || t >= self.start + self.duration {
            return self.to;
        }
        self.from + (self.to - self.from) * (t - self.start) / self.duration
    }
}

// ---------------------------------------------------------------------------
// Angle-of-attack control memory
// ---------------------------------------------------------------------------

/// Angle of attack and its commanded rate at the last accepted step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlMemory {
    pub time: f64,       // s
    pub alpha: f64,      // deg
    pub alpha_dot: f64,  // deg/s
}

impl ControlMemory {
    pub fn alpha_at(&self, t: f64) -> f64 {
        self.alpha + self.alpha_dot * (t - self.time)
    }
}

// ---------------------------------------------------------------------------
// Per-run simulation context
// ---------------------------------------------------------------------------

/// Mutable state of one integration run.
///
/// Built fresh for every shooting attempt, so nothing carries over between
/// attempts.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub parameter: f64,                 // shooting parameter, deg/s
    pub milestones: Milestones,
    pub control: ControlMemory,
    pub gear_blend: Option<LinearBlend>,       // gear drag removed, 0 to 1
    pub throttle_blend: Option<LinearBlend>,   // throttle setting after cutback
    pub thrust_blend: Option<LinearBlend>,     // N, flare thrust
    pub max_cl_exceeded: bool,
    breakpoints: Vec<f64>,
    events: Vec<FiredEvent>,
    alpha_history: Vec<(f64, f64)>,     // (s, deg) at accepted steps
}

impl SimulationContext {
    pub fn new(parameter: f64, t0: f64, alpha0: f64) -> Self {
        Self {
            parameter,
            milestones: Milestones::default(),
            control: ControlMemory { time: t0, alpha: alpha0, alpha_dot: 0.0 },
            gear_blend: None,
            throttle_blend: None,
            thrust_blend: None,
            max_cl_exceeded: false,
            breakpoints: Vec::new(),
            events: Vec::new(),
            alpha_history: vec![(t0, alpha0)],
        }
    }

    /// Appends a transition time; coincident or earlier times are ignored.
    pub fn record_breakpoint(&mut self, t: f64) {
        if self.breakpoints.last().map_or(true, |&last| t > last) {
            self.breakpoints.push(t);
        }
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn record_event(&mut self, event: FiredEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[FiredEvent] {
        &self.events
    }

    /// Moves the control memory to `t`.
    ///
    /// `alpha_before` is the angle the previous step ended with; `alpha` and
    /// `alpha_dot` drive the next step. A jump between the two is kept in the
    /// history as two entries at the same time.
    pub fn update_control(&mut self, t: f64, alpha_before: f64, alpha: f64, alpha_dot: f64) {
        self.push_alpha(t, alpha_before);
        if alpha != alpha_before {
            self.push_alpha(t, alpha);
        }
        self.control = ControlMemory { time: t, alpha, alpha_dot };
    }

    fn push_alpha(&mut self, t: f64, alpha: f64) {
        let n = self.alpha_history.len();
        match self.alpha_history.last_mut() {
            Some(last) if last.0 == t && n == 1 => last.1 = alpha,
            Some(last) if last.0 > t => {}
            _ => self.alpha_history.push((t, alpha)),
        }
    }

    pub fn alpha_history(&self) -> &[(f64, f64)] {
        &self.alpha_history
    }

    /// Index of the history segment `[i - 1, i]` that covers `t`.
    fn segment(&self, t: f64) -> Option<usize> {
        let n = self.alpha_history.len();
        if n < 2 {
            return None;
        }
        Some(self.alpha_history.partition_point(|&(ti, _)| ti <= t).clamp(1, n - 1))
    }

    /// Angle of attack at `t`, interpolated between accepted steps.
    ///
    /// At a time with a recorded jump the value after the jump is returned.
    pub fn alpha_at(&self, t: f64) -> f64 {
        let Some(i) = self.segment(t) else {
            return self.control.alpha_at(t);
        };
        let (t0, a0) = self.alpha_history[i - 1];
        let (t1, a1) = self.alpha_history[i];
        if t >= t1 {
            return a1;
        }
        if t1 > t0 && t > t0 {
            a0 + (a1 - a0) * (t - t0) / (t1 - t0)
        } else {
            a0
        }
    }

    /// Slope of the angle-of-attack history at `t`, deg/s.
    pub fn alpha_rate_at(&self, t: f64) -> f64 {
        let Some(i) = self.segment(t) else {
            return self.control.alpha_dot;
        };
        let (t0, a0) = self.alpha_history[i - 1];
        let (t1, a1) = self.alpha_history[i];
        if t1 > t0 { (a1 - a0) / (t1 - t0) } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn milestone_is_set_once() {
        let mut m = Milestone::default();
        assert!(!m.is_set());
        assert_eq!(m.or_sentinel(), NOT_REACHED);
        assert!(!m.passed(1.0e9));
        assert!(m.set(12.5));
        assert!(!m.set(20.0));
        assert_eq!(m.time(), Some(12.5));
        assert!(m.passed(12.5));
        assert!(!m.passed(12.4));
    }

    #[test]
    fn breakpoints_stay_strictly_increasing() {
        let mut ctx = SimulationContext::new(0.0, 0.0, 0.0);
        ctx.record_breakpoint(1.0);
        ctx.record_breakpoint(1.0);
        ctx.record_breakpoint(0.5);
        ctx.record_breakpoint(2.0);
        assert_eq!(ctx.breakpoints(), &[1.0, 2.0]);
    }

    #[test]
    fn blend_ramps_and_clamps() {
        let b = LinearBlend::new(10.0, 4.0, 1.0, 0.8);
        assert_relative_eq!(b.value(5.0), 1.0);
        assert_relative_eq!(b.value(12.0), 0.9);
        assert_relative_eq!(b.value(20.0), 0.8);
        let step = LinearBlend::new(10.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(step.value(10.0), 0.0);
        assert_relative_eq!(step.value(10.1), 1.0);
    }

    #[test]
    fn alpha_history_interpolates_and_keeps_jumps() {
        let mut ctx = SimulationContext::new(0.0, 0.0, 0.0);
        ctx.update_control(1.0, 0.0, 0.0, 2.0);
        ctx.update_control(2.0, 2.0, 2.0, 0.0);
        // jump at t = 3
        ctx.update_control(3.0, 2.0, 5.0, 0.0);
        ctx.update_control(4.0, 5.0, 5.0, 0.0);

        assert_relative_eq!(ctx.alpha_at(1.5), 1.0);
        assert_relative_eq!(ctx.alpha_rate_at(1.5), 2.0);
        assert_relative_eq!(ctx.alpha_at(2.999), 2.0);
        assert_relative_eq!(ctx.alpha_at(3.0), 5.0);
        assert_relative_eq!(ctx.alpha_at(3.5), 5.0);
        assert_relative_eq!(ctx.alpha_at(10.0), 5.0);
        assert_relative_eq!(ctx.control.alpha_at(4.5), 5.0);
    }

    #[test]
    fn control_at_start_time_replaces_initial_angle() {
        let mut ctx = SimulationContext::new(0.0, 0.0, 1.0);
        ctx.update_control(0.0, 1.0, 2.0, 0.5);
        assert_eq!(ctx.alpha_history(), &[(0.0, 2.0)]);
        ctx.update_control(2.0, 3.0, 3.0, 0.0);
        assert_eq!(ctx.alpha_history(), &[(0.0, 2.0), (2.0, 3.0)]);
        assert_relative_eq!(ctx.alpha_at(1.0), 2.5);
        // late entries are dropped
        ctx.update_control(1.5, 9.0, 9.0, 0.0);
        assert_eq!(ctx.alpha_history().len(), 2);
    }

    #[test]
    fn ground_phases() {
        assert!(Phase::GroundRoll.on_ground());
        assert!(Phase::Braking.on_ground());
        assert!(!Phase::Flare.on_ground());
    }
}
