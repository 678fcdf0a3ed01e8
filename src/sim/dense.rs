use crate::dynamics::state::StateVector;

// ---------------------------------------------------------------------------
// Dormand–Prince continuous extension
// ---------------------------------------------------------------------------

const D1: f64 = -12_715_105_075.0 / 11_282_082_432.0;
const D3: f64 = 87_487_479_700.0 / 32_700_410_799.0;
const D4: f64 = -10_690_763_975.0 / 1_880_347_072.0;
const D5: f64 = 701_980_252_875.0 / 199_316_789_632.0;
const D6: f64 = -1_453_857_185.0 / 822_651_844.0;
const D7: f64 = 69_997_945.0 / 29_380_423.0;

/// Interpolant over one accepted step.
///
/// `y(t0 + θh) = r1 + θ r2 + θ(1-θ) r3 + θ²(1-θ) r4 + θ²(1-θ)² r5`,
/// exact at both ends in value and slope.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseSegment {
    t_start: f64,
    t_end: f64,
    h: f64,
    r: [StateVector; 5],
}

impl DenseSegment {
    /// Builds the interpolant from the seven stage derivatives of a step.
    pub fn from_stages(t: f64, h: f64, y0: &StateVector, y1: &StateVector, k: &[StateVector; 7]) -> Self {
        let r2 = y1 - y0;
        let r3 = k[0] * h - r2;
        let r4 = r2 - k[6] * h - r3;
        let r5 = (k[0] * D1 + k[2] * D3 + k[3] * D4 + k[4] * D5 + k[5] * D6 + k[6] * D7) * h;
        Self { t_start: t, t_end: t + h, h, r: [*y0, r2, r3, r4, r5] }
    }

    pub fn t_start(&self) -> f64 {
        self.t_start
    }

    pub fn t_end(&self) -> f64 {
        self.t_end
    }

    /// Shortens the segment to end at `t` (an event inside the step).
    pub fn truncate(&mut self, t: f64) {
        self.t_end = t.clamp(self.t_start, self.t_end);
    }

    fn theta(&self, t: f64) -> f64 {
        (t.clamp(self.t_start, self.t_end) - self.t_start) / self.h
    }

    pub fn state_at(&self, t: f64) -> StateVector {
        let s = self.theta(t);
        let [r1, r2, r3, r4, r5] = &self.r;
        r1 + (r2 + (r3 + (r4 + r5 * (1.0 - s)) * s) * (1.0 - s)) * s
    }

    pub fn derivative_at(&self, t: f64) -> StateVector {
        let s = self.theta(t);
        let [_, r2, r3, r4, r5] = &self.r;
        (r2 + r3 * (1.0 - 2.0 * s) + r4 * (s * (2.0 - 3.0 * s)) + r5 * (2.0 * s * (1.0 - s) * (1.0 - 2.0 * s)))
            / self.h
    }
}

// ---------------------------------------------------------------------------
// Whole-run interpolant
// ---------------------------------------------------------------------------

/// Dense trajectory of one integration run, queryable at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTrajectory {
    t0: f64,
    y0: StateVector,
    segments: Vec<DenseSegment>,
}

impl DenseTrajectory {
    pub fn new(t0: f64, y0: StateVector) -> Self {
        Self { t0, y0, segments: Vec::new() }
    }

    pub fn push(&mut self, segment: DenseSegment) {
        self.segments.push(segment);
    }

    pub fn initial_time(&self) -> f64 {
        self.t0
    }

    pub fn final_time(&self) -> f64 {
        self.segments.last().map_or(self.t0, |s| s.t_end)
    }

    pub fn final_state(&self) -> StateVector {
        self.state_at(self.final_time())
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn segment(&self, t: f64) -> Option<&DenseSegment> {
        if self.segments.is_empty() {
            return None;
        }
        let i = self.segments.partition_point(|s| s.t_end < t);
        self.segments.get(i.min(self.segments.len() - 1))
    }

    /// State at `t`, clamped to the integrated interval.
    pub fn state_at(&self, t: f64) -> StateVector {
        match self.segment(t) {
            Some(seg) => seg.state_at(t),
            None => self.y0,
        }
    }

    /// State derivative at `t` from the interpolant.
    pub fn derivative_at(&self, t: f64) -> StateVector {
        match self.segment(t) {
            Some(seg) => seg.derivative_at(t),
            None => StateVector::zeros(),
        }
    }
}
