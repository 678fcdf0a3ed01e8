use crate::dynamics::state::G0;
use crate::error::TrajectoryError;
use crate::physics::aerodynamics::DragPolar;

// ---------------------------------------------------------------------------
// Aerodynamic configuration (one flap/slat setting)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AeroConfiguration {
    pub cl0: f64,
    pub cl_alpha: f64,      // 1/deg
    pub cl_max: f64,
    pub polar: DragPolar,
}

impl AeroConfiguration {
    fn validate(&self, label: &str) -> Result<(), TrajectoryError> {
        if !(self.cl_alpha > 0.0) {
            return Err(TrajectoryError::invalid(format!("{label}: CL_alpha must be positive")));
        }
        if !(self.cl_max > self.cl0) {
            return Err(TrajectoryError::invalid(format!("{label}: CL_max must exceed CL0")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Aircraft definition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub name: String,
    pub max_takeoff_mass: f64,  // kg
    pub max_landing_mass: f64,  // kg
    pub wing_area: f64,         // m^2
    pub span: f64,              // m
    pub wing_incidence: f64,    // deg, wing root incidence on the fuselage
    pub wing_height: f64,       // m, wing to ground distance on the runway
    pub delta_cd0_gear: f64,    // drag increment of the extended landing gear
    pub delta_cd0_oei: f64,     // drag increment with one engine inoperative
    pub takeoff: AeroConfiguration,
    pub landing: AeroConfiguration,
}

impl Aircraft {
    pub fn aspect_ratio(&self) -> f64 {
        self.span * self.span / self.wing_area
    }

    pub fn takeoff_weight(&self) -> f64 {
        self.max_takeoff_mass * G0
    }

    pub fn landing_weight(&self) -> f64 {
        self.max_landing_mass * G0
    }
}

// ---------------------------------------------------------------------------
// Aircraft builder
// ---------------------------------------------------------------------------

pub struct AircraftBuilder {
    name: String,
    max_takeoff_mass: f64,
    max_landing_mass: f64,
    wing_area: f64,
    span: f64,
    wing_incidence: f64,
    wing_height: f64,
    delta_cd0_gear: f64,
    delta_cd0_oei: f64,
    takeoff: Option<AeroConfiguration>,
    landing: Option<AeroConfiguration>,
}

impl AircraftBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_takeoff_mass: 70_000.0,
            max_landing_mass: 62_000.0,
            wing_area: 120.0,
            span: 34.0,
            wing_incidence: 2.0,
            wing_height: 3.0,
            delta_cd0_gear: 0.015,
            delta_cd0_oei: 0.005,
            takeoff: None,
            landing: None,
        }
    }

    pub fn max_takeoff_mass(mut self, v: f64) -> Self { self.max_takeoff_mass = v; self }
    pub fn max_landing_mass(mut self, v: f64) -> Self { self.max_landing_mass = v; self }
    pub fn wing_area(mut self, v: f64) -> Self { self.wing_area = v; self }
    pub fn span(mut self, v: f64) -> Self { self.span = v; self }
    pub fn wing_incidence(mut self, v: f64) -> Self { self.wing_incidence = v; self }
    pub fn wing_height(mut self, v: f64) -> Self { self.wing_height = v; self }
    pub fn delta_cd0_gear(mut self, v: f64) -> Self { self.delta_cd0_gear = v; self }
    pub fn delta_cd0_oei(mut self, v: f64) -> Self { self.delta_cd0_oei = v; self }
    pub fn takeoff(mut self, v: AeroConfiguration) -> Self { self.takeoff = Some(v); self }
    pub fn landing(mut self, v: AeroConfiguration) -> Self { self.landing = Some(v); self }

    /// Validates and assembles the aircraft.
    pub fn build(self) -> Result<Aircraft, TrajectoryError> {
        if !(self.max_takeoff_mass > 0.0) || !(self.max_landing_mass > 0.0) {
            return Err(TrajectoryError::invalid(format!(
                "masses must be positive (MTOM {}, MLM {})",
                self.max_takeoff_mass, self.max_landing_mass
            )));
        }
        if !(self.wing_area > 0.0) || !(self.span > 0.0) {
            return Err(TrajectoryError::invalid("wing area and span must be positive"));
        }
        if self.wing_height < 0.0 || self.delta_cd0_gear < 0.0 || self.delta_cd0_oei < 0.0 {
            return Err(TrajectoryError::invalid("wing height and drag increments must be non-negative"));
        }
        let takeoff = self
            .takeoff
            .ok_or_else(|| TrajectoryError::invalid("missing take-off aerodynamic configuration"))?;
        let landing = self
            .landing
            .ok_or_else(|| TrajectoryError::invalid("missing landing aerodynamic configuration"))?;
        takeoff.validate("take-off configuration")?;
        landing.validate("landing configuration")?;

        Ok(Aircraft {
            name: self.name,
            max_takeoff_mass: self.max_takeoff_mass,
            max_landing_mass: self.max_landing_mass,
            wing_area: self.wing_area,
            span: self.span,
            wing_incidence: self.wing_incidence,
            wing_height: self.wing_height,
            delta_cd0_gear: self.delta_cd0_gear,
            delta_cd0_oei: self.delta_cd0_oei,
            takeoff,
            landing,
        })
    }
}

// ---------------------------------------------------------------------------
// Preset aircraft
// ---------------------------------------------------------------------------

pub mod presets {
    use std::f64::consts::PI;

    use super::*;

    /// Short/medium-range twin jet, ~73 t MTOM.
    pub fn twin_jet() -> Result<Aircraft, TrajectoryError> {
        let span: f64 = 34.1;
        let area = 122.6;
        let ar = span * span / area;
        AircraftBuilder::new("Twin-jet 150")
            .max_takeoff_mass(73_500.0)
            .max_landing_mass(64_500.0)
            .wing_area(area)
            .span(span)
            .wing_incidence(2.0)
            .wing_height(3.5)
            .delta_cd0_gear(0.015)
            .delta_cd0_oei(0.005)
            .takeoff(AeroConfiguration {
                cl0: 1.24,
                cl_alpha: 0.0868,
                cl_max: 2.36,
                polar: DragPolar::parabolic(0.04, 1.0 / (PI * ar * 0.78), -0.2, 3.0, 33)?,
            })
            .landing(AeroConfiguration {
                cl0: 1.0,
                cl_alpha: 0.095,
                cl_max: 2.7,
                polar: DragPolar::parabolic(0.09, 1.0 / (PI * ar * 0.75), -0.2, 3.4, 37)?,
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> AeroConfiguration {
        AeroConfiguration {
            cl0: 0.5,
            cl_alpha: 0.1,
            cl_max: 2.0,
            polar: DragPolar::parabolic(0.03, 0.04, 0.0, 2.5, 11).unwrap(),
        }
    }

    #[test]
    fn preset_is_valid() {
        let ac = presets::twin_jet().unwrap();
        assert_relative_eq!(ac.aspect_ratio(), 34.1 * 34.1 / 122.6);
        assert!(ac.takeoff_weight() > ac.landing_weight());
    }

    #[test]
    fn negative_mass_is_rejected() {
        let r = AircraftBuilder::new("bad")
            .max_takeoff_mass(-1.0)
            .takeoff(config())
            .landing(config())
            .build();
        assert!(matches!(r, Err(TrajectoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn missing_configuration_is_rejected() {
        let r = AircraftBuilder::new("bad").takeoff(config()).build();
        assert!(matches!(r, Err(TrajectoryError::InvalidConfiguration(_))));
    }

    #[test]
    fn inconsistent_lift_curve_is_rejected() {
        let mut c = config();
        c.cl_max = 0.2;
        let r = AircraftBuilder::new("bad").takeoff(c).landing(config()).build();
        assert!(r.is_err());
    }
}
