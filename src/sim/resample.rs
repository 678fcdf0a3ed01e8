use super::dense::DenseTrajectory;
use super::model::TrajectoryModel;

/// One row of the output series.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrajectorySample {
    pub time: f64,              // s
    pub distance: f64,          // m
    pub altitude: f64,          // m
    pub speed: f64,             // m/s, true airspeed
    pub alpha: f64,             // deg
    pub alpha_dot: f64,         // deg/s
    pub gamma: f64,             // deg
    pub gamma_dot: f64,         // deg/s
    pub theta: f64,             // deg, alpha + gamma
    pub lift: f64,              // N
    pub drag: f64,              // N
    pub thrust: f64,            // N
    pub thrust_horizontal: f64, // N
    pub thrust_vertical: f64,   // N
    pub friction: f64,          // N
    pub total_force: f64,       // N, along the flight path
    pub load_factor: f64,
    pub cl: f64,
    pub cd: f64,
    pub rate_of_climb: f64,     // m/s
    pub acceleration: f64,      // m/s²
    pub fuel_used: f64,         // kg
    pub weight: f64,            // N
}

/// Output times from `t0` to `t_final` every `dt`.
///
/// A step that would jump over a breakpoint is shortened to land on it, so
/// every transition inside the run appears in the output exactly.
pub fn sample_times(t0: f64, t_final: f64, dt: f64, breakpoints: &[f64]) -> Vec<f64> {
    let mut times = Vec::new();
    if !(dt > 0.0) || !(t_final >= t0) {
        return times;
    }
    let mut t = t0;
    while t <= t_final {
        times.push(t);
        let next = t + dt;
        t = breakpoints.iter().copied().find(|&bp| bp > t && bp < next).unwrap_or(next);
    }
    times
}

/// Evaluates `model` on the dense trajectory at the output times.
pub fn resample<M: TrajectoryModel>(model: &M, dense: &DenseTrajectory, dt: f64) -> Vec<TrajectorySample> {
    sample_times(dense.initial_time(), dense.final_time(), dt, model.context().breakpoints())
        .into_iter()
        .map(|t| model.sample(t, &dense.state_at(t)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_grid_without_breakpoints() {
        let times = sample_times(0.0, 3.0, 1.0, &[]);
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn grid_snaps_to_breakpoints() {
        let times = sample_times(0.0, 4.0, 1.0, &[1.5, 2.2, 3.7]);
        let expected = [0.0, 1.0, 1.5, 2.2, 3.2, 3.7, 4.7];
        assert_eq!(times.len(), 6);
        for (t, e) in times.iter().zip(expected) {
            assert_relative_eq!(*t, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn final_breakpoint_is_the_last_sample() {
        let times = sample_times(0.0, 2.5, 1.0, &[2.5]);
        assert_eq!(times, vec![0.0, 1.0, 2.0, 2.5]);
    }

    #[test]
    fn breakpoint_on_grid_point_is_not_duplicated() {
        let times = sample_times(0.0, 2.0, 1.0, &[1.0]);
        assert_eq!(times, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn degenerate_inputs_give_no_samples() {
        assert!(sample_times(0.0, 1.0, 0.0, &[]).is_empty());
        assert!(sample_times(2.0, 1.0, 0.5, &[]).is_empty());
        assert_eq!(sample_times(1.0, 1.0, 0.5, &[]), vec![1.0]);
    }

    #[test]
    fn times_are_strictly_increasing() {
        let times = sample_times(0.0, 30.0, 0.5, &[0.25, 0.25, 7.3, 7.31, 29.99]);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert!(times.contains(&7.3) && times.contains(&7.31));
    }
}
