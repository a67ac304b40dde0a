//! Flat records exchanged across the FFI boundary.
//!
//! Everything here is plain data so it can be described in the UDL file;
//! the planner itself works on the richer types of the other modules.

use crate::config::Configuration;
use crate::error::PlanError;
use crate::gas::{GasMixture, Tank};
use crate::metrics::ProfileSummary;
use crate::profile::{AscentBranch, IntegrationPoint, Profile, Stop, StopKind};
use crate::time::Duration;
use crate::waypoint::{DepthTarget, Waypoint};

/// A depth to reach, held for `duration_min` when given.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSpec {
    pub depth_m: f64,
    pub duration_min: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TankSpec {
    pub o2_percent: u8,
    pub he_percent: u8,
    pub size_l: f64,
    pub start_pressure_bar: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedWaypoint {
    pub depth_m: f64,
    pub duration_sec: i64,
    pub runtime_sec: i64,
    pub tank: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedStop {
    pub kind: StopKind,
    pub depth_m: f64,
    pub runtime_sec: i64,
    pub duration_sec: i64,
    pub tank: u32,
}

/// One simulation step.
#[derive(Clone, Debug, PartialEq)]
pub struct TracePoint {
    pub runtime_sec: i64,
    pub depth_m: f64,
    pub tank: u32,
    pub ceiling_m: f64,
    pub ceilings_m: Vec<f64>,
    pub n2_loads_bar: Vec<f64>,
    pub he_loads_bar: Vec<f64>,
    pub tank_pressure_bar: Vec<f64>,
    pub cns: f64,
    pub cns_cumulative: f64,
    pub otu: f64,
    pub otu_cumulative: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanOutput {
    pub branch: AscentBranch,
    pub waypoints: Vec<PlannedWaypoint>,
    pub stops: Vec<PlannedStop>,
    pub trace: Vec<TracePoint>,
    pub summary: ProfileSummary,
}

impl From<&TargetSpec> for DepthTarget {
    fn from(spec: &TargetSpec) -> Self {
        DepthTarget {
            depth: spec.depth_m,
            duration: spec.duration_min.map(Duration::from_minutes),
        }
    }
}

impl TryFrom<&TankSpec> for Tank {
    type Error = PlanError;

    fn try_from(spec: &TankSpec) -> Result<Self, Self::Error> {
        let gas = GasMixture::new(spec.o2_percent, spec.he_percent)?;
        Tank::new(gas, spec.size_l, spec.start_pressure_bar)
    }
}

impl From<&Waypoint> for PlannedWaypoint {
    fn from(wp: &Waypoint) -> Self {
        PlannedWaypoint {
            depth_m: wp.depth,
            duration_sec: wp.duration.seconds(),
            runtime_sec: wp.runtime.seconds(),
            tank: wp.tank as u32,
        }
    }
}

impl From<&Stop> for PlannedStop {
    fn from(stop: &Stop) -> Self {
        PlannedStop {
            kind: stop.kind,
            depth_m: stop.depth,
            runtime_sec: stop.runtime.seconds(),
            duration_sec: stop.duration.seconds(),
            tank: stop.tank as u32,
        }
    }
}

impl From<&IntegrationPoint> for TracePoint {
    fn from(point: &IntegrationPoint) -> Self {
        TracePoint {
            runtime_sec: point.runtime().seconds(),
            depth_m: point.depth(),
            tank: point.tank() as u32,
            ceiling_m: point.ceiling(),
            ceilings_m: point.ceilings().to_vec(),
            n2_loads_bar: point.loads().n2.to_vec(),
            he_loads_bar: point.loads().he.to_vec(),
            tank_pressure_bar: point.tank_pressure().to_vec(),
            cns: point.cns(),
            cns_cumulative: point.cns_cumulative(),
            otu: point.otu(),
            otu_cumulative: point.otu_cumulative(),
        }
    }
}

impl From<&Profile> for PlanOutput {
    fn from(profile: &Profile) -> Self {
        PlanOutput {
            branch: profile.branch(),
            waypoints: profile.waypoints().iter().map(Into::into).collect(),
            stops: profile.stops().iter().map(Into::into).collect(),
            trace: profile.integration_points().iter().map(Into::into).collect(),
            summary: ProfileSummary::compute(profile),
        }
    }
}

/// Plan a dive. A blank `config_json` uses the default configuration.
pub fn compute_plan(
    targets: Vec<TargetSpec>,
    tanks: Vec<TankSpec>,
    config_json: String,
) -> Result<PlanOutput, PlanError> {
    let config = if config_json.trim().is_empty() {
        Configuration::default()
    } else {
        Configuration::from_json(&config_json)?
    };
    let targets: Vec<DepthTarget> = targets.iter().map(Into::into).collect();
    let tanks = tanks
        .iter()
        .map(Tank::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let profile = Profile::new(&targets, tanks, config)?;
    Ok(PlanOutput::from(&profile))
}

/// Default configuration as an editable JSON document.
pub fn default_config_json() -> Result<String, PlanError> {
    Configuration::default().to_json()
}
