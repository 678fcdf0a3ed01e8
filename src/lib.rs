pub mod config;
pub mod dynamics;
pub mod error;
pub mod physics;
pub mod sim;
pub mod vehicle;

pub use config::{load_scenario, ConfigError, Scenario};
pub use error::TrajectoryError;
pub use sim::{
    LandingCalculator, LandingSetup, LandingSummary, RunStatus, TakeOffCalculator, TakeOffSetup, TakeOffSummary,
    TrajectoryResult, TrajectorySample,
};
pub use vehicle::{Aircraft, Propulsion, RatedTurbofan};
