use std::f64::consts::PI;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::from_reader;
use thiserror::Error;

use crate::error::TrajectoryError;
use crate::physics::aerodynamics::DragPolar;
use crate::sim::landing::LandingSetup;
use crate::sim::takeoff::TakeOffSetup;
use crate::vehicle::aircraft::{AeroConfiguration, Aircraft, AircraftBuilder};
use crate::vehicle::propulsion::RatedTurbofan;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scenario: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Invalid(#[from] TrajectoryError),
}

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

/// Drag polar as a table of `[CL, CD]` pairs or a parabolic fit.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolarSection {
    Table {
        table: Vec<[f64; 2]>,
    },
    Parabolic {
        cd0: f64,
        oswald: f64,
        #[serde(default = "default_cl_range")]
        cl_range: [f64; 2],
        #[serde(default = "default_polar_points")]
        points: usize,
    },
}

fn default_cl_range() -> [f64; 2] {
    [-0.2, 3.0]
}

fn default_polar_points() -> usize {
    33
}

impl PolarSection {
    fn build(&self, aspect_ratio: f64) -> Result<DragPolar, TrajectoryError> {
        match self {
            PolarSection::Table { table } => {
                let (cl, cd) = table.iter().map(|p| (p[0], p[1])).unzip();
                DragPolar::new(cl, cd)
            }
            PolarSection::Parabolic { cd0, oswald, cl_range, points } => {
                if !(*oswald > 0.0) {
                    return Err(TrajectoryError::invalid("Oswald factor must be positive"));
                }
                let k = 1.0 / (PI * aspect_ratio * oswald);
                DragPolar::parabolic(*cd0, k, cl_range[0], cl_range[1], *points)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AeroSection {
    pub cl0: f64,
    pub cl_alpha: f64,      // 1/deg
    pub cl_max: f64,
    pub polar: PolarSection,
}

impl AeroSection {
    fn build(&self, aspect_ratio: f64) -> Result<AeroConfiguration, TrajectoryError> {
        Ok(AeroConfiguration {
            cl0: self.cl0,
            cl_alpha: self.cl_alpha,
            cl_max: self.cl_max,
            polar: self.polar.build(aspect_ratio)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AircraftSection {
    pub name: String,
    pub max_takeoff_mass: f64,  // kg
    pub max_landing_mass: f64,  // kg
    pub wing_area: f64,         // m^2
    pub span: f64,              // m
    #[serde(default)]
    pub wing_incidence: f64,    // deg
    pub wing_height: f64,       // m
    #[serde(default)]
    pub delta_cd0_gear: f64,
    #[serde(default)]
    pub delta_cd0_oei: f64,
    pub takeoff: AeroSection,
    pub landing: AeroSection,
}

impl AircraftSection {
    fn build(&self) -> Result<Aircraft, TrajectoryError> {
        if !(self.wing_area > 0.0) {
            return Err(TrajectoryError::invalid("wing area must be positive"));
        }
        let ar = self.span * self.span / self.wing_area;
        AircraftBuilder::new(self.name.clone())
            .max_takeoff_mass(self.max_takeoff_mass)
            .max_landing_mass(self.max_landing_mass)
            .wing_area(self.wing_area)
            .span(self.span)
            .wing_incidence(self.wing_incidence)
            .wing_height(self.wing_height)
            .delta_cd0_gear(self.delta_cd0_gear)
            .delta_cd0_oei(self.delta_cd0_oei)
            .takeoff(self.takeoff.build(ar)?)
            .landing(self.landing.build(ar)?)
            .build()
    }
}

/// Scenario as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    pub aircraft: AircraftSection,
    pub engine: RatedTurbofan,
    #[serde(default)]
    pub takeoff: Option<TakeOffSetup>,
    #[serde(default)]
    pub landing: Option<LandingSetup>,
}

/// Validated scenario, ready for the calculators.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub aircraft: Aircraft,
    pub engine: RatedTurbofan,
    pub takeoff: Option<TakeOffSetup>,
    pub landing: Option<LandingSetup>,
}

impl ScenarioFile {
    pub fn build(self) -> Result<Scenario, ConfigError> {
        let aircraft = self.aircraft.build()?;
        self.engine.validate()?;
        if let Some(t) = &self.takeoff {
            t.validate()?;
        }
        if let Some(l) = &self.landing {
            l.validate()?;
        }
        Ok(Scenario { aircraft, engine: self.engine, takeoff: self.takeoff, landing: self.landing })
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Reads and validates a YAML scenario.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario, ConfigError> {
    let file = File::open(path)?;
    let raw: ScenarioFile = from_reader(file)?;
    raw.build()
}

pub fn parse_scenario(text: &str) -> Result<Scenario, ConfigError> {
    let raw: ScenarioFile = serde_yaml::from_str(text)?;
    raw.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = r#"
aircraft:
  name: Test twin
  max_takeoff_mass: 73500
  max_landing_mass: 64500
  wing_area: 122.6
  span: 34.1
  wing_incidence: 2.0
  wing_height: 3.5
  delta_cd0_gear: 0.015
  takeoff:
    cl0: 0.6
    cl_alpha: 0.1
    cl_max: 2.2
    polar: { cd0: 0.04, oswald: 0.78 }
  landing:
    cl0: 1.0
    cl_alpha: 0.095
    cl_max: 2.7
    polar:
      table: [[-0.2, 0.091], [1.0, 0.115], [2.0, 0.19], [3.4, 0.37]]
engine:
  name: Test fan
  engine_count: 2
  static_thrust: 120000
  mach_lapse: 0.55
  sfc_takeoff: 0.36
  cruise_fraction: 0.75
  flight_idle_fraction: 0.07
  ground_idle_fraction: 0.05
takeoff:
  delta_temperature: 15
  friction: [[0.0, 0.03], [80.0, 0.02]]
  cutback: { altitude: 450 }
  integrator: { rtol: 1.0e-8 }
landing:
  initial_altitude: 400
  shooting: { max_iterations: 10 }
"#;

    #[test]
    fn sample_scenario_parses_with_defaults() {
        let s = parse_scenario(SAMPLE).unwrap();
        assert_eq!(s.aircraft.name, "Test twin");
        assert_eq!(s.engine.engine_count, 2);
        assert_relative_eq!(s.aircraft.landing.polar.cd(1.0), 0.115);

        let t = s.takeoff.unwrap();
        assert_eq!(t.delta_temperature, 15.0);
        assert_relative_eq!(t.friction.eval(40.0), 0.025);
        let cutback = t.cutback.unwrap();
        assert_eq!(cutback.altitude, 450.0);
        assert_eq!(cutback.duration, 4.0);
        assert_eq!(t.integrator.rtol, 1e-8);
        assert_eq!(t.integrator.atol, 1e-10);
        assert_eq!(t.k_rotation, 1.05);

        let l = s.landing.unwrap();
        assert_eq!(l.initial_altitude, 400.0);
        assert_eq!(l.shooting.max_iterations, 10);
        assert_eq!(l.shooting.fine_step, 0.025);
    }

    #[test]
    fn missing_sections_are_optional() {
        let text = SAMPLE.split("takeoff:\n  delta").next().unwrap();
        let s = parse_scenario(text).unwrap();
        assert!(s.takeoff.is_none() && s.landing.is_none());
    }

    #[test]
    fn invalid_values_are_reported() {
        let text = SAMPLE.replace("engine_count: 2", "engine_count: 0");
        assert!(matches!(parse_scenario(&text), Err(ConfigError::Invalid(_))));
        let text = SAMPLE.replace("initial_altitude: 400", "initial_altitude: -5");
        assert!(matches!(parse_scenario(&text), Err(ConfigError::Invalid(_))));
        assert!(matches!(parse_scenario("aircraft: 3"), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(load_scenario("/nonexistent/scenario.yaml"), Err(ConfigError::Io(_))));
    }
}
