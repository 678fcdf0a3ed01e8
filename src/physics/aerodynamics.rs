use std::f64::consts::PI;

use crate::error::TrajectoryError;
use crate::physics::table::LinearTable;

// ---------------------------------------------------------------------------
// Drag polar
// ---------------------------------------------------------------------------

/// Tabulated drag polar CD(CL) for one aircraft configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPolar {
    table: LinearTable,
}

impl DragPolar {
    /// Builds a polar from matching CL/CD columns (at least two points, CL increasing).
    pub fn new(cl: Vec<f64>, cd: Vec<f64>) -> Result<Self, TrajectoryError> {
        if cl.len() < 2 {
            return Err(TrajectoryError::invalid("drag polar needs at least two points"));
        }
        if cd.iter().any(|&c| c <= 0.0) {
            return Err(TrajectoryError::invalid("drag polar CD values must be positive"));
        }
        Ok(Self { table: LinearTable::new(cl, cd)? })
    }

    /// Parabolic polar `CD0 + k CL²` sampled on `[cl_min, cl_max]`.
    pub fn parabolic(cd0: f64, k: f64, cl_min: f64, cl_max: f64, points: usize) -> Result<Self, TrajectoryError> {
        if points < 2 || cl_max <= cl_min {
            return Err(TrajectoryError::invalid("parabolic polar needs a CL range and two points"));
        }
        let step = (cl_max - cl_min) / (points - 1) as f64;
        let cl: Vec<f64> = (0..points).map(|i| cl_min + step * i as f64).collect();
        let cd = cl.iter().map(|c| cd0 + k * c * c).collect();
        Self::new(cl, cd)
    }

    pub fn cd(&self, cl: f64) -> f64 {
        self.table.eval(cl)
    }

    /// Minimum tabulated CD.
    pub fn cd0(&self) -> f64 {
        self.table.min_y()
    }

    /// Least-squares slope of CD against CL².
    pub fn induced_drag_factor(&self) -> f64 {
        let cl2: Vec<f64> = self.table.xs().iter().map(|c| c * c).collect();
        let cd = self.table.ys();
        let n = cl2.len() as f64;
        let mean_x = cl2.iter().sum::<f64>() / n;
        let mean_y = cd.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in cl2.iter().zip(cd) {
            sxy += (x - mean_x) * (y - mean_y);
            sxx += (x - mean_x) * (x - mean_x);
        }
        if sxx > 0.0 { sxy / sxx } else { 0.0 }
    }

    /// Oswald factor implied by the polar for the given aspect ratio.
    pub fn oswald_factor(&self, aspect_ratio: f64) -> Result<f64, TrajectoryError> {
        let k = self.induced_drag_factor();
        if k <= 0.0 || aspect_ratio <= 0.0 {
            return Err(TrajectoryError::invalid(format!(
                "cannot estimate Oswald factor (induced drag factor {k:.4e}, aspect ratio {aspect_ratio})"
            )));
        }
        Ok(1.0 / (PI * aspect_ratio * k))
    }
}

// ---------------------------------------------------------------------------
// Ground effect
// ---------------------------------------------------------------------------

/// Induced-drag ground effect factor used during take-off.
///
/// `hb = h / (b π / 4)`; the factor tends to 1 out of ground effect and to 0
/// on the runway.
pub fn takeoff_ground_effect(altitude: f64, span: f64) -> f64 {
    let hb = altitude.max(0.0) / (span * PI / 4.0);
    let x = (16.0 * hb).powi(2);
    x / (1.0 + x)
}

/// Ground effect multiplier on the lift-dependent drag during landing.
///
/// Fifth-order fit in `hb = (h + wing height) / span`, equal to 1 above `hb = 1.1`.
pub fn landing_ground_effect(hb: f64) -> f64 {
    if hb >= 1.1 {
        return 1.0;
    }
    let p = ((((-4.482_765_77 * hb + 15.611_743_76) * hb - 21.201_710_50) * hb + 14.394_387_21) * hb
        - 5.209_134_65)
        * hb
        + 0.907_933_97;
    1.0 - p
}

// ---------------------------------------------------------------------------
// Forces
// ---------------------------------------------------------------------------

pub fn dynamic_pressure(density: f64, speed: f64) -> f64 {
    0.5 * density * speed * speed
}

/// Aerodynamic force `q S C`.
pub fn aero_force(q_dyn: f64, area: f64, coefficient: f64) -> f64 {
    q_dyn * area * coefficient
}
