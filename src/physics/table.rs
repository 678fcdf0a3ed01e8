use serde::Deserialize;

use crate::error::TrajectoryError;

// ---------------------------------------------------------------------------
// One-dimensional piecewise-linear table
// ---------------------------------------------------------------------------

/// Piecewise-linear function through strictly increasing abscissae.
///
/// Deserializes from a list of `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<[f64; 2]>")]
pub struct LinearTable {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LinearTable {
    /// Builds a table, rejecting empty, unsorted or non-finite input.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, TrajectoryError> {
        if xs.is_empty() {
            return Err(TrajectoryError::invalid("table has no points"));
        }
        if xs.len() != ys.len() {
            return Err(TrajectoryError::invalid(format!(
                "table abscissae ({}) and ordinates ({}) differ in length",
                xs.len(),
                ys.len()
            )));
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            return Err(TrajectoryError::invalid("table contains non-finite values"));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(TrajectoryError::invalid("table abscissae must be strictly increasing"));
        }
        Ok(Self { xs, ys })
    }

    /// Table from `(x, y)` pairs.
    pub fn from_points(points: &[[f64; 2]]) -> Result<Self, TrajectoryError> {
        let xs = points.iter().map(|p| p[0]).collect();
        let ys = points.iter().map(|p| p[1]).collect();
        Self::new(xs, ys)
    }

    /// Single-valued table.
    pub fn constant(value: f64) -> Self {
        Self { xs: vec![0.0], ys: vec![value] }
    }

    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Linear interpolation, extrapolating the end segments.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }
        let i = self.xs.partition_point(|&xi| xi <= x).clamp(1, n - 1);
        let (x0, x1) = (self.xs[i - 1], self.xs[i]);
        let (y0, y1) = (self.ys[i - 1], self.ys[i]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    /// Linear interpolation, holding the end values outside the range.
    pub fn eval_clamped(&self, x: f64) -> f64 {
        let n = self.xs.len();
        self.eval(x.clamp(self.xs[0], self.xs[n - 1]))
    }

    /// Smallest ordinate.
    pub fn min_y(&self) -> f64 {
        self.ys.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

impl TryFrom<Vec<[f64; 2]>> for LinearTable {
    type Error = TrajectoryError;

    fn try_from(points: Vec<[f64; 2]>) -> Result<Self, Self::Error> {
        Self::from_points(&points)
    }
}
