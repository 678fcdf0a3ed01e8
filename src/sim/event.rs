use crate::dynamics::state::StateVector;

// ---------------------------------------------------------------------------
// Phase-transition events
// ---------------------------------------------------------------------------

/// Kinds of phase-transition events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RotationSpeed,
    EndOfRotation,
    BarHold,
    EndOfHold,
    Obstacle,
    LandingGearRetractionStart,
    LandingGearRetractionEnd,
    Climb,
    ZeroAcceleration,
    Cutback,
    EndDistance,
    CertificationPoint,
    FlareAltitude,
    TouchDown,
    ZeroGamma,
    FullStop,
}

impl EventKind {
    pub fn label(self) -> &'static str {
        match self {
            EventKind::RotationSpeed => "rotation speed",
            EventKind::EndOfRotation => "end of rotation",
            EventKind::BarHold => "bar hold",
            EventKind::EndOfHold => "end of hold",
            EventKind::Obstacle => "obstacle",
            EventKind::LandingGearRetractionStart => "gear retraction start",
            EventKind::LandingGearRetractionEnd => "gear retraction end",
            EventKind::Climb => "climb",
            EventKind::ZeroAcceleration => "zero acceleration",
            EventKind::Cutback => "cutback",
            EventKind::EndDistance => "end distance",
            EventKind::CertificationPoint => "certification point",
            EventKind::FlareAltitude => "flare altitude",
            EventKind::TouchDown => "touchdown",
            EventKind::ZeroGamma => "zero flight-path angle",
            EventKind::FullStop => "full stop",
        }
    }
}

/// What the integrator does after an event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Keep integrating; the time is not a phase transition.
    Continue,
    /// Keep integrating and record the time as a breakpoint.
    RecordBreakpoint,
    /// Record the time as a breakpoint and end the run.
    Stop,
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEvent {
    pub time: f64,
    pub kind: EventKind,
    pub state: StateVector,
}

// ---------------------------------------------------------------------------
// Ordered event sets
// ---------------------------------------------------------------------------

/// Ordered list of the events a calculator watches. Events found at the same
/// time fire in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSet {
    kinds: Vec<EventKind>,
}

impl EventSet {
    pub fn new(kinds: Vec<EventKind>) -> Self {
        Self { kinds }
    }

    /// Take-off events, with the cutback altitude when a cutback is flown.
    pub fn takeoff(cutback: bool) -> Self {
        let mut kinds = vec![
            EventKind::RotationSpeed,
            EventKind::EndOfRotation,
            EventKind::BarHold,
            EventKind::EndOfHold,
            EventKind::Obstacle,
            EventKind::LandingGearRetractionStart,
            EventKind::LandingGearRetractionEnd,
            EventKind::Climb,
            EventKind::ZeroAcceleration,
        ];
        if cutback {
            kinds.push(EventKind::Cutback);
        }
        kinds.push(EventKind::EndDistance);
        Self { kinds }
    }

    pub fn landing() -> Self {
        Self {
            kinds: vec![
                EventKind::CertificationPoint,
                EventKind::Obstacle,
                EventKind::FlareAltitude,
                EventKind::TouchDown,
                EventKind::ZeroGamma,
                EventKind::FullStop,
            ],
        }
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn contains(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }
}

// ---------------------------------------------------------------------------
// Guarded switching functions
// ---------------------------------------------------------------------------

/// Magnitude returned by a switching function outside its active window.
pub const GUARD: f64 = 10.0;

/// Direction in which a switching function crosses zero when its event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Rising,
    Falling,
}

impl Crossing {
    fn pre(self) -> f64 {
        match self {
            Crossing::Rising => -GUARD,
            Crossing::Falling => GUARD,
        }
    }
}

/// Switching value of a one-shot event.
///
/// Before the window is `armed` the value sits on the pre-crossing side;
/// once the event has `fired` it sits on the post-crossing side, so the
/// event can never fire twice.
pub fn one_shot(crossing: Crossing, armed: bool, fired: bool, value: f64) -> f64 {
    if fired {
        -crossing.pre()
    } else if !armed {
        crossing.pre()
    } else {
        value
    }
}

/// Whether two switching values lie on different sides of zero.
pub fn sign_changed(before: f64, after: f64) -> bool {
    (before >= 0.0) != (after >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_values_sit_on_the_right_side() {
        assert_eq!(one_shot(Crossing::Rising, false, false, 5.0), -GUARD);
        assert_eq!(one_shot(Crossing::Rising, true, false, 5.0), 5.0);
        assert_eq!(one_shot(Crossing::Rising, true, true, -5.0), GUARD);
        assert_eq!(one_shot(Crossing::Falling, false, false, -5.0), GUARD);
        assert_eq!(one_shot(Crossing::Falling, true, true, 5.0), -GUARD);
    }

    #[test]
    fn fired_event_never_crosses_again() {
        let before = one_shot(Crossing::Rising, true, true, 0.3);
        let after = one_shot(Crossing::Rising, true, true, -0.3);
        assert!(!sign_changed(before, after));
    }

    #[test]
    fn sign_change_detection() {
        assert!(sign_changed(-1.0, 1.0));
        assert!(sign_changed(1.0, -1.0));
        assert!(sign_changed(-1.0, 0.0));
        assert!(!sign_changed(0.0, 2.0));
    }

    #[test]
    fn takeoff_set_order() {
        let with = EventSet::takeoff(true);
        let without = EventSet::takeoff(false);
        assert!(with.contains(EventKind::Cutback));
        assert!(!without.contains(EventKind::Cutback));
        assert_eq!(with.kinds().first(), Some(&EventKind::RotationSpeed));
        assert_eq!(with.kinds().last(), Some(&EventKind::EndDistance));
        assert_eq!(EventSet::landing().kinds().len(), 6);
    }
}
