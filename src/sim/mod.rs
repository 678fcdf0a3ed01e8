pub mod context;
pub mod dense;
pub mod event;
pub mod integrator;
pub mod landing;
pub mod model;
pub mod resample;
pub mod result;
pub mod shooting;
pub mod takeoff;

pub use context::{Milestone, Milestones, Phase, SimulationContext};
pub use event::{EventKind, EventOutcome, EventSet, FiredEvent};
pub use integrator::{integrate, Integration, IntegratorConfig};
pub use landing::{LandingCalculator, LandingSetup};
pub use model::TrajectoryModel;
pub use resample::TrajectorySample;
pub use result::{LandingSummary, RunStatus, TakeOffSummary, TrajectoryResult};
pub use shooting::{shoot, ConvergenceBand, ShootingOutcome, Verdict};
pub use takeoff::{CutbackSetup, CutbackSweep, TakeOffCalculator, TakeOffSetup};
