pub mod buhlmann;
pub mod config;
pub mod error;
pub mod gas;
pub mod metrics;
pub mod plan;
pub mod profile;
pub mod time;
pub mod toxicity;
pub mod waypoint;

uniffi::include_scaffolding!("decoplan");

pub use config::{Configuration, ConfigurationBuilder, GasSwitchPolicy};
pub use error::PlanError;
pub use gas::{GasMixture, Tank};
pub use metrics::ProfileSummary;
pub use plan::{
    compute_plan, default_config_json, PlanOutput, PlannedStop, PlannedWaypoint, TankSpec,
    TargetSpec, TracePoint,
};
pub use profile::{AscentBranch, IntegrationPoint, Profile, Stop, StopKind};
pub use waypoint::{DepthTarget, Waypoint};
