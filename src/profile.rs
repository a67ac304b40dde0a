//! Dive profile engine.
//!
//! A [`Profile`] turns depth targets into a fixed-step simulation trace:
//! the bottom phase follows the normalized waypoints, then one of the
//! ascent branches (direct, safety stop, staged decompression) takes the
//! diver back to the surface. Every step carries tissue loads, ceilings,
//! cylinder pressures and oxygen toxicity.

use std::fmt;

use tracing::{debug, warn};

use crate::buhlmann::{GradientFactors, TissueLoads, NUM_COMPARTMENTS};
use crate::config::{Configuration, GasSwitchPolicy};
use crate::error::PlanError;
use crate::gas::{ambient_pressure, best_tank, Tank};
use crate::time::Duration;
use crate::toxicity::{cns_segment, otu_segment};
use crate::waypoint::{self, round_depth, DepthTarget, Waypoint};

/// Longest runtime a plan may reach before it is considered runaway (72 h).
const MAX_RUNTIME_SEC: i64 = 72 * 3600;

/// Deco stops are padded to whole minutes.
const STOP_GRANULARITY_SEC: i64 = 60;

// ============================================================================
// Integration points
// ============================================================================

/// State of the diver at one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationPoint {
    waypoint: Waypoint,
    loads: TissueLoads,
    ceilings: [f64; NUM_COMPARTMENTS],
    tank_pressure: Vec<f64>,
    cns: f64,
    cns_cumulative: f64,
    otu: f64,
    otu_cumulative: f64,
}

impl IntegrationPoint {
    pub fn waypoint(&self) -> &Waypoint {
        &self.waypoint
    }

    pub fn depth(&self) -> f64 {
        self.waypoint.depth
    }

    pub fn runtime(&self) -> Duration {
        self.waypoint.runtime
    }

    /// Index of the tank breathed from this point on.
    pub fn tank(&self) -> usize {
        self.waypoint.tank
    }

    pub fn p_amb(&self) -> f64 {
        ambient_pressure(self.waypoint.depth)
    }

    pub fn loads(&self) -> &TissueLoads {
        &self.loads
    }

    pub fn ceilings(&self) -> &[f64; NUM_COMPARTMENTS] {
        &self.ceilings
    }

    /// Controlling ceiling (m): the deepest compartment ceiling.
    pub fn ceiling(&self) -> f64 {
        self.ceilings.iter().copied().fold(0.0, f64::max)
    }

    /// Remaining pressure (bar) of every tank.
    pub fn tank_pressure(&self) -> &[f64] {
        &self.tank_pressure
    }

    /// CNS fraction accrued over the segment ending here.
    pub fn cns(&self) -> f64 {
        self.cns
    }

    pub fn cns_cumulative(&self) -> f64 {
        self.cns_cumulative
    }

    /// OTU accrued over the segment ending here.
    pub fn otu(&self) -> f64 {
        self.otu
    }

    pub fn otu_cumulative(&self) -> f64 {
        self.otu_cumulative
    }
}

impl fmt::Display for IntegrationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pressures: Vec<String> = self
            .tank_pressure
            .iter()
            .map(|p| format!("{:.0}", p))
            .collect();
        write!(
            f,
            "{:.1} m at {} on tank {}, ceiling {:.1} m, [{}] bar, CNS {:.1} %, OTU {:.1}",
            self.depth(),
            self.runtime(),
            self.tank(),
            self.ceiling(),
            pressures.join(", "),
            self.cns_cumulative * 100.0,
            self.otu_cumulative
        )
    }
}

// ============================================================================
// Ascent structure
// ============================================================================

/// Terminal branch the planner chose after the bottom phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AscentBranch {
    /// Ascent computation disabled; the plan ends at the bottom.
    Skipped,
    Direct,
    SafetyStop,
    Decompression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    Safety,
    Deco,
    GasSwitch,
}

/// A stop held during the ascent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub kind: StopKind,
    pub depth: f64,
    /// Runtime at arrival.
    pub runtime: Duration,
    pub duration: Duration,
    /// Tank in use when leaving the stop.
    pub tank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Transit,
    SafetyStop,
    DecoStop,
    GasSwitchStop,
}

impl SegmentKind {
    fn stop_kind(self) -> Option<StopKind> {
        match self {
            SegmentKind::Transit => None,
            SegmentKind::SafetyStop => Some(StopKind::Safety),
            SegmentKind::DecoStop => Some(StopKind::Deco),
            SegmentKind::GasSwitchStop => Some(StopKind::GasSwitch),
        }
    }
}

/// Consecutive ascent steps of one kind.
#[derive(Debug)]
struct Segment {
    kind: SegmentKind,
    points: Vec<IntegrationPoint>,
}

impl Segment {
    fn non_empty(kind: SegmentKind, points: Vec<IntegrationPoint>) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { kind, points })
        }
    }
}

/// Last point reached by `segments`, or `from` when none were planned.
fn tail<'a>(segments: &'a [Segment], from: &'a IntegrationPoint) -> &'a IntegrationPoint {
    segments
        .last()
        .and_then(|s| s.points.last())
        .unwrap_or(from)
}

/// Realized waypoints with one open waypoint at the end.
///
/// The open waypoint marks where the current segment started. Its duration
/// is only known once the segment ends, at which point it is pushed and a
/// new open waypoint starts at the segment's last sample.
struct WaypointLog {
    closed: Vec<Waypoint>,
    open: Waypoint,
}

impl WaypointLog {
    fn new(mut waypoints: Vec<Waypoint>) -> Result<Self, PlanError> {
        let open = waypoints
            .pop()
            .ok_or_else(|| PlanError::InvalidInput("no waypoints given".to_string()))?;
        Ok(Self {
            closed: waypoints,
            open,
        })
    }

    /// Close the open waypoint at `last` and return it.
    fn close(&mut self, last: &IntegrationPoint) -> Waypoint {
        let span = last.runtime().seconds() - self.open.runtime.seconds();
        let closed = Waypoint {
            duration: Duration::from_seconds(span),
            ..self.open
        };
        self.closed.push(closed);
        self.open = Waypoint::new(last.depth(), Duration::zero(), last.runtime(), last.tank());
        closed
    }

    fn finish(mut self) -> Vec<Waypoint> {
        self.closed.push(self.open);
        self.closed
    }
}

// ============================================================================
// Planner
// ============================================================================

/// Step-by-step simulation for one plan.
struct Planner<'a> {
    config: &'a Configuration,
    tanks: &'a [Tank],
    gf: GradientFactors,
}

impl<'a> Planner<'a> {
    fn new(config: &'a Configuration, tanks: &'a [Tank], max_depth: f64) -> Self {
        Self {
            config,
            tanks,
            gf: GradientFactors::new(config.gf_low(), config.gf_high(), max_depth),
        }
    }

    fn dt_sec(&self) -> i64 {
        self.config.time_step().seconds()
    }

    /// Number of steps needed to cover `duration`.
    fn steps_for(&self, duration: Duration) -> i64 {
        let dt = self.dt_sec();
        (duration.seconds() + dt - 1) / dt
    }

    fn ceilings_at(&self, loads: &TissueLoads, depth: f64) -> [f64; NUM_COMPARTMENTS] {
        loads.ceilings(self.gf.at(ambient_pressure(depth)))
    }

    /// First point of the plan: surface-saturated tissues, full tanks.
    fn seed(&self, depth: f64) -> IntegrationPoint {
        let loads = TissueLoads::surface_equilibrium();
        IntegrationPoint {
            waypoint: Waypoint::new(depth, self.config.time_step(), Duration::zero(), 0),
            ceilings: self.ceilings_at(&loads, depth),
            loads,
            tank_pressure: self.tanks.iter().map(Tank::start_pressure_bar).collect(),
            cns: 0.0,
            cns_cumulative: 0.0,
            otu: 0.0,
            otu_cumulative: 0.0,
        }
    }

    /// Advance one time step from `prev` to `depth`, breathing from `tank`
    /// afterwards.
    ///
    /// Everything that happens during the step is charged to the tank in
    /// use at `prev`.
    fn step(
        &self,
        prev: &IntegrationPoint,
        depth: f64,
        tank: usize,
        sac: f64,
    ) -> Result<IntegrationPoint, PlanError> {
        let runtime_sec = prev.runtime().seconds() + self.dt_sec();
        if runtime_sec > MAX_RUNTIME_SEC {
            return Err(PlanError::Unterminated { runtime_sec });
        }

        let minutes = prev.waypoint.duration.minutes();
        let prev_tank = &self.tanks[prev.tank()];
        let loads = prev
            .loads
            .schreiner(prev_tank.gas(), prev.depth(), depth, minutes);

        let mut tank_pressure = prev.tank_pressure.clone();
        let p_amb_mean = (prev.p_amb() + ambient_pressure(depth)) / 2.0;
        let consumed = sac * p_amb_mean / prev_tank.size_l() * minutes;
        let before = tank_pressure[prev.tank()];
        tank_pressure[prev.tank()] = before - consumed;
        if before > 0.0 && before - consumed <= 0.0 {
            warn!(tank = prev.tank(), runtime_sec, "tank is empty");
        }

        let ppo2_start = prev_tank.gas().ppo2(prev.depth());
        let ppo2_end = self.tanks[tank].gas().ppo2(depth);
        let constant_depth = prev.depth() == depth;
        let cns = cns_segment(ppo2_start, ppo2_end, minutes, constant_depth);
        let otu = otu_segment(ppo2_start, ppo2_end, minutes, constant_depth);

        Ok(IntegrationPoint {
            waypoint: Waypoint::new(
                depth,
                self.config.time_step(),
                Duration::from_seconds(runtime_sec),
                tank,
            ),
            ceilings: self.ceilings_at(&loads, depth),
            loads,
            tank_pressure,
            cns,
            cns_cumulative: prev.cns_cumulative + cns,
            otu,
            otu_cumulative: prev.otu_cumulative + otu,
        })
    }

    /// Sample the normalized waypoints at every time step up to their end.
    fn bottom(&self, waypoints: &[Waypoint]) -> Result<Vec<IntegrationPoint>, PlanError> {
        let end = waypoints
            .last()
            .map(|wp| wp.end().seconds())
            .unwrap_or_default();
        let dt = self.dt_sec();

        let mut points = vec![self.seed(waypoint::interpolate_depth(waypoints, 0)?)];
        let mut t = dt;
        while t <= end {
            let depth = waypoint::interpolate_depth(waypoints, t)?;
            let next = match points.last() {
                Some(prev) => {
                    let sac = if depth > prev.depth() {
                        self.config.descent_sac()
                    } else {
                        self.config.bottom_sac()
                    };
                    self.step(prev, depth, 0, sac)?
                }
                None => self.seed(depth),
            };
            points.push(next);
            t += dt;
        }
        Ok(points)
    }

    /// Depth after one ascent step from `depth`, never past `target`.
    fn ascent_depth(&self, depth: f64, target: f64) -> f64 {
        round_depth(depth - self.config.ascent_step()).max(target)
    }

    /// Ascend from `from` to `target` without stopping or switching gas.
    fn transit(
        &self,
        from: &IntegrationPoint,
        target: f64,
    ) -> Result<Vec<IntegrationPoint>, PlanError> {
        let mut points: Vec<IntegrationPoint> = Vec::new();
        loop {
            let prev = points.last().unwrap_or(from);
            if prev.depth() <= target {
                break;
            }
            let depth = self.ascent_depth(prev.depth(), target);
            let next = self.step(prev, depth, prev.tank(), self.config.ascent_sac())?;
            points.push(next);
        }
        Ok(points)
    }

    /// Stay at the current depth for `steps` time steps.
    fn hold(
        &self,
        from: &IntegrationPoint,
        steps: i64,
    ) -> Result<Vec<IntegrationPoint>, PlanError> {
        let mut points: Vec<IntegrationPoint> = Vec::new();
        for _ in 0..steps {
            let prev = points.last().unwrap_or(from);
            let next = self.step(prev, prev.depth(), prev.tank(), self.config.ascent_sac())?;
            points.push(next);
        }
        Ok(points)
    }

    /// Stop depth for a ceiling: rounded up to the increment grid, with the
    /// last stop taking everything shallower.
    fn next_deco_stop(&self, ceiling: f64) -> f64 {
        let incr = self.config.stop_depth_increment();
        let last = self.config.last_stop_depth();
        let rounded = (ceiling / incr).ceil() * incr;
        if ceiling > 0.0 && (rounded <= last || rounded - last < incr) {
            if ceiling < last {
                last
            } else {
                rounded + incr
            }
        } else {
            rounded
        }
    }

    /// Deepest depth shallower than `depth` where a richer mixture than
    /// `tank` becomes breathable, or 0 when there is none.
    fn next_gas_stop(&self, depth: f64, tank: usize) -> Result<f64, PlanError> {
        if self.config.gas_switch() != GasSwitchPolicy::Depth {
            return Ok(0.0);
        }
        let current_o2 = self.tanks[tank].gas().o2();
        let mut out = 0.0;
        for candidate in self.tanks.iter().filter(|t| t.gas().o2() > current_o2) {
            let mod_depth = candidate.gas().mod_depth(self.config.switch_ppo2())?;
            let stop = (mod_depth * 10.0).floor() / 10.0;
            if stop < depth && stop > out {
                out = stop;
            }
        }
        Ok(out)
    }

    fn best_tank(&self, depth: f64) -> usize {
        best_tank(self.tanks, depth, self.config.switch_ppo2())
    }

    /// One step of a deco stop that has already lasted `elapsed_sec`
    /// including this step.
    fn deco_step(
        &self,
        prev: &IntegrationPoint,
        elapsed_sec: i64,
    ) -> Result<IntegrationPoint, PlanError> {
        let switching = matches!(
            self.config.gas_switch(),
            GasSwitchPolicy::Stop | GasSwitchPolicy::Depth
        );
        let tank = if switching && elapsed_sec >= self.config.gas_switch_duration().seconds() {
            self.best_tank(prev.depth())
        } else {
            prev.tank()
        };
        self.step(prev, prev.depth(), tank, self.config.ascent_sac())
    }

    /// Hold a deco stop until the next stop is shallower, then round the
    /// stop up to a whole minute.
    fn deco_stop(&self, from: &IntegrationPoint) -> Result<Vec<IntegrationPoint>, PlanError> {
        let dt = self.dt_sec();
        let depth = from.depth();
        let mut points: Vec<IntegrationPoint> = Vec::new();
        loop {
            let prev = points.last().unwrap_or(from);
            let next = self.deco_step(prev, (points.len() as i64 + 1) * dt)?;
            let cleared = self.next_deco_stop(next.ceiling()) < depth;
            points.push(next);
            if cleared {
                break;
            }
        }
        while (points.len() as i64 * dt) % STOP_GRANULARITY_SEC != 0 {
            let prev = points.last().unwrap_or(from);
            let next = self.deco_step(prev, (points.len() as i64 + 1) * dt)?;
            points.push(next);
        }
        Ok(points)
    }

    /// Hold for the gas switch duration and switch on the last step.
    fn gas_switch_stop(&self, from: &IntegrationPoint) -> Result<Vec<IntegrationPoint>, PlanError> {
        let steps = self.steps_for(self.config.gas_switch_duration()).max(1);
        let mut points: Vec<IntegrationPoint> = Vec::new();
        for i in 0..steps {
            let prev = points.last().unwrap_or(from);
            let tank = if i == steps - 1 {
                self.best_tank(prev.depth())
            } else {
                prev.tank()
            };
            let next = self.step(prev, prev.depth(), tank, self.config.ascent_sac())?;
            points.push(next);
        }
        Ok(points)
    }

    fn safety_stop_ascent(&self, from: &IntegrationPoint) -> Result<Vec<Segment>, PlanError> {
        let stop_depth = self.config.safety_stop_depth();
        if stop_depth <= 0.0 || from.depth() <= stop_depth {
            return Ok(Segment::non_empty(SegmentKind::Transit, self.transit(from, 0.0)?)
                .into_iter()
                .collect());
        }

        let mut segments = Vec::new();
        segments.extend(Segment::non_empty(
            SegmentKind::Transit,
            self.transit(from, stop_depth)?,
        ));
        let steps = self.steps_for(self.config.safety_stop_duration());
        let hold = self.hold(tail(&segments, from), steps)?;
        segments.extend(Segment::non_empty(SegmentKind::SafetyStop, hold));
        let surface = self.transit(tail(&segments, from), 0.0)?;
        segments.extend(Segment::non_empty(SegmentKind::Transit, surface));
        Ok(segments)
    }

    fn decompression(&self, from: &IntegrationPoint) -> Result<Vec<Segment>, PlanError> {
        let mut segments: Vec<Segment> = Vec::new();
        loop {
            let start = tail(&segments, from).clone();
            if start.depth() <= 0.0 {
                break;
            }
            let gas_stop = self.next_gas_stop(start.depth(), start.tank())?;
            let mut deco_stop = self.next_deco_stop(start.ceiling());

            let mut transit: Vec<IntegrationPoint> = Vec::new();
            loop {
                let prev = transit.last().unwrap_or(&start);
                let target = deco_stop.max(gas_stop);
                if prev.depth() <= target {
                    break;
                }
                let depth = self.ascent_depth(prev.depth(), target);
                let next = self.step(prev, depth, prev.tank(), self.config.ascent_sac())?;
                deco_stop = self.next_deco_stop(next.ceiling());
                transit.push(next);
            }
            segments.extend(Segment::non_empty(SegmentKind::Transit, transit));

            let arrived = tail(&segments, from);
            if arrived.depth() <= 0.0 {
                break;
            }
            let stop = if deco_stop > 0.0 && deco_stop >= gas_stop {
                debug!(
                    depth = arrived.depth(),
                    runtime_sec = arrived.runtime().seconds(),
                    "deco stop"
                );
                Segment::non_empty(SegmentKind::DecoStop, self.deco_stop(arrived)?)
            } else {
                debug!(
                    depth = arrived.depth(),
                    runtime_sec = arrived.runtime().seconds(),
                    "gas switch stop"
                );
                Segment::non_empty(SegmentKind::GasSwitchStop, self.gas_switch_stop(arrived)?)
            };
            segments.extend(stop);
        }
        Ok(segments)
    }

    /// Pick the ascent branch for a bottom phase ending at `last` and plan it.
    fn ascent(&self, last: &IntegrationPoint) -> Result<(AscentBranch, Vec<Segment>), PlanError> {
        if !self.config.compute_ascent() {
            return Ok((AscentBranch::Skipped, Vec::new()));
        }

        let direct = self.transit(last, 0.0)?;
        let obligation = last.ceiling() > 0.0 || direct.iter().any(|p| p.ceiling() > 0.0);
        if obligation {
            if self.config.deco_stops() {
                debug!(ceiling = last.ceiling(), "decompression required");
                return Ok((AscentBranch::Decompression, self.decompression(last)?));
            }
            warn!(
                ceiling = last.ceiling(),
                "decompression obligation ignored, deco stops are disabled"
            );
        }

        if self.config.safety_stop() {
            debug!("ascent with safety stop");
            Ok((AscentBranch::SafetyStop, self.safety_stop_ascent(last)?))
        } else {
            debug!("direct ascent");
            Ok((
                AscentBranch::Direct,
                Segment::non_empty(SegmentKind::Transit, direct)
                    .into_iter()
                    .collect(),
            ))
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

/// A fully planned dive.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    config: Configuration,
    tanks: Vec<Tank>,
    waypoints: Vec<Waypoint>,
    points: Vec<IntegrationPoint>,
    stops: Vec<Stop>,
    branch: AscentBranch,
    ascent_start: usize,
}

impl Profile {
    /// Plan a dive through `targets` with the given tanks.
    ///
    /// The first tank is breathed from the start of the dive.
    pub fn new(
        targets: &[DepthTarget],
        tanks: Vec<Tank>,
        config: Configuration,
    ) -> Result<Self, PlanError> {
        config.validate()?;
        if tanks.is_empty() {
            return Err(PlanError::InvalidInput(
                "at least one tank is required".to_string(),
            ));
        }

        let normalized = waypoint::normalize(targets, &config)?;
        let bottom_end = normalized
            .last()
            .map(|wp| wp.end().seconds())
            .unwrap_or_default();
        if bottom_end > MAX_RUNTIME_SEC {
            return Err(PlanError::InvalidInput(format!(
                "planned dive lasts {bottom_end}s, longer than {MAX_RUNTIME_SEC}s"
            )));
        }
        let planner = Planner::new(&config, &tanks, waypoint::max_depth(&normalized));
        let mut points = planner.bottom(&normalized)?;
        let ascent_start = points.len();

        let last = points
            .last()
            .ok_or(PlanError::Interpolation { runtime_sec: 0 })?;
        let (branch, segments) = planner.ascent(last)?;
        debug!(?branch, segments = segments.len(), "ascent planned");

        let mut log = WaypointLog::new(normalized)?;
        let mut stops = Vec::new();
        for segment in segments {
            let Some(end) = segment.points.last() else {
                continue;
            };
            let closed = log.close(end);
            if let Some(kind) = segment.kind.stop_kind() {
                stops.push(Stop {
                    kind,
                    depth: closed.depth,
                    runtime: closed.runtime,
                    duration: closed.duration,
                    tank: end.tank(),
                });
            }
            points.extend(segment.points);
        }

        Ok(Self {
            waypoints: log.finish(),
            config,
            tanks,
            points,
            stops,
            branch,
            ascent_start,
        })
    }

    /// Realized waypoints including transit legs and stops.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn integration_points(&self) -> &[IntegrationPoint] {
        &self.points
    }

    /// Points of the bottom phase, descent included.
    pub fn bottom_points(&self) -> &[IntegrationPoint] {
        &self.points[..self.ascent_start]
    }

    /// Points of the planned ascent; empty when ascent was skipped.
    pub fn ascent_points(&self) -> &[IntegrationPoint] {
        &self.points[self.ascent_start..]
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn branch(&self) -> AscentBranch {
        self.branch
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gas::GasMixture;

    fn air(size_l: f64) -> Tank {
        Tank::new(GasMixture::air(), size_l, 200.0).unwrap()
    }

    fn ean50() -> Tank {
        Tank::new(GasMixture::nitrox(50).unwrap(), 7.0, 200.0).unwrap()
    }

    fn plan(targets: &[DepthTarget], tanks: Vec<Tank>, config: Configuration) -> Profile {
        Profile::new(targets, tanks, config).unwrap()
    }

    fn summary(wps: &[Waypoint]) -> Vec<(f64, i64, i64)> {
        wps.iter()
            .map(|wp| (wp.depth, wp.duration.seconds(), wp.runtime.seconds()))
            .collect()
    }

    fn assert_trace_invariants(profile: &Profile) {
        let points = profile.integration_points();
        let dt = profile.config().time_step().seconds();
        assert_eq!(points[0].runtime().seconds(), 0);
        for pair in points.windows(2) {
            assert_eq!(
                pair[1].runtime().seconds() - pair[0].runtime().seconds(),
                dt,
                "runtime gap at {}",
                pair[0].runtime()
            );
            assert!(pair[1].cns_cumulative() >= pair[0].cns_cumulative());
            assert!(pair[1].otu_cumulative() >= pair[0].otu_cumulative());
        }
        for p in points {
            assert!(p.depth() >= 0.0);
            assert!(p.ceilings().iter().all(|c| *c >= 0.0));
        }
        for pair in profile.waypoints().windows(2) {
            assert_eq!(pair[0].end().seconds(), pair[1].runtime.seconds());
        }
    }

    #[test]
    fn test_shallow_dive_with_safety_stop() {
        let profile = plan(
            &[DepthTarget::new(10.0, 2.0)],
            vec![air(12.0)],
            Configuration::default(),
        );
        assert_eq!(profile.branch(), AscentBranch::SafetyStop);
        assert_eq!(
            summary(profile.waypoints()),
            vec![
                (0.0, 30, 0),
                (10.0, 120, 30),
                (10.0, 35, 150),
                (5.0, 180, 185),
                (5.0, 35, 365),
                (0.0, 0, 400),
            ]
        );
        assert_eq!(profile.stops().len(), 1);
        let stop = profile.stops()[0];
        assert_eq!(stop.kind, StopKind::Safety);
        assert_eq!(stop.depth, 5.0);
        assert_eq!(stop.duration.seconds(), 180);

        let points = profile.integration_points();
        assert_eq!(points.len(), 81);
        assert_eq!(profile.bottom_points().len(), 31);
        assert!(points.iter().all(|p| p.ceiling() == 0.0));
        // air never reaches 0.5 bar ppO2 at 10 m
        assert_eq!(points[points.len() - 1].cns_cumulative(), 0.0);
        assert_eq!(points[points.len() - 1].otu_cumulative(), 0.0);
        assert_eq!(points[points.len() - 1].depth(), 0.0);
        assert_trace_invariants(&profile);
    }

    #[test]
    fn test_direct_ascent() {
        let config = Configuration::builder().safety_stop(false).build().unwrap();
        let profile = plan(&[DepthTarget::new(10.0, 2.0)], vec![air(12.0)], config);
        assert_eq!(profile.branch(), AscentBranch::Direct);
        assert_eq!(
            summary(profile.waypoints()),
            vec![(0.0, 30, 0), (10.0, 120, 30), (10.0, 65, 150), (0.0, 0, 215)]
        );
        assert!(profile.stops().is_empty());
        assert_trace_invariants(&profile);
    }

    #[test]
    fn test_safety_stop_skipped_when_already_shallow() {
        let profile = plan(
            &[DepthTarget::new(4.0, 5.0)],
            vec![air(12.0)],
            Configuration::default(),
        );
        assert_eq!(profile.branch(), AscentBranch::SafetyStop);
        assert!(profile.stops().is_empty());
        let last = profile.integration_points().last().unwrap();
        assert_eq!(last.depth(), 0.0);
    }

    #[test]
    fn test_ascent_disabled() {
        let config = Configuration::builder().compute_ascent(false).build().unwrap();
        let targets = [DepthTarget::new(10.0, 2.0)];
        let profile = plan(&targets, vec![air(12.0)], config.clone());
        assert_eq!(profile.branch(), AscentBranch::Skipped);
        assert_eq!(
            profile.waypoints(),
            waypoint::normalize(&targets, &config).unwrap().as_slice()
        );
        assert!(profile.ascent_points().is_empty());
        let last = profile.integration_points().last().unwrap();
        assert_eq!(last.depth(), 10.0);
        assert_eq!(last.runtime().seconds(), 150);
    }

    #[test]
    fn test_surface_plan_has_no_ascent() {
        let profile = plan(
            &[DepthTarget::new(0.0, 1.0)],
            vec![air(12.0)],
            Configuration::default(),
        );
        assert_eq!(profile.integration_points().len(), 13);
        assert!(profile.ascent_points().is_empty());
        assert!(profile.stops().is_empty());
    }

    #[test]
    fn test_deco_dive_on_air() {
        let profile = plan(
            &[DepthTarget::new(45.0, 15.0)],
            vec![air(24.0)],
            Configuration::default(),
        );
        assert_eq!(profile.branch(), AscentBranch::Decompression);
        assert!(profile.bottom_points().last().unwrap().ceiling() > 0.0);

        let deco: Vec<&Stop> = profile
            .stops()
            .iter()
            .filter(|s| s.kind == StopKind::Deco)
            .collect();
        assert!(!deco.is_empty());
        for stop in &deco {
            assert!(stop.depth < 45.0);
            let steps = stop.depth / 3.0;
            assert!((steps - steps.round()).abs() < 1e-9, "stop at {}", stop.depth);
            assert_eq!(stop.duration.seconds() % 60, 0);
            assert!(stop.duration.seconds() > 0);
        }
        // stops get shallower
        for pair in deco.windows(2) {
            assert!(pair[1].depth < pair[0].depth);
        }
        assert_eq!(deco.last().unwrap().depth, 3.0);

        let last = profile.integration_points().last().unwrap();
        assert_eq!(last.depth(), 0.0);
        assert_eq!(last.ceiling(), 0.0);
        assert!(last.tank_pressure()[0] < 200.0);
        assert_trace_invariants(&profile);
    }

    #[test]
    fn test_lower_gradient_factors_stop_deeper() {
        let targets = [DepthTarget::new(45.0, 15.0)];
        let liberal = plan(&targets, vec![air(24.0)], Configuration::default());
        let conservative = plan(
            &targets,
            vec![air(24.0)],
            Configuration::builder()
                .gradient_factors(0.3, 0.7)
                .build()
                .unwrap(),
        );
        let first_stop = |p: &Profile| p.stops().first().map(|s| s.depth).unwrap_or(0.0);
        assert!(first_stop(&conservative) >= first_stop(&liberal));
        let runtime = |p: &Profile| p.integration_points().last().unwrap().runtime().seconds();
        assert!(runtime(&conservative) > runtime(&liberal));
    }

    #[test]
    fn test_obligation_ignored_without_deco_stops() {
        let config = Configuration::builder().deco_stops(false).build().unwrap();
        let profile = plan(&[DepthTarget::new(45.0, 15.0)], vec![air(24.0)], config);
        assert_eq!(profile.branch(), AscentBranch::SafetyStop);
        assert!(profile.stops().iter().all(|s| s.kind == StopKind::Safety));
    }

    #[test]
    fn test_gas_switch_at_mod() {
        let profile = plan(
            &[DepthTarget::new(45.0, 20.0)],
            vec![air(24.0), ean50()],
            Configuration::default(),
        );
        assert_eq!(profile.branch(), AscentBranch::Decompression);

        let first_on_ean50 = profile
            .integration_points()
            .iter()
            .find(|p| p.tank() == 1)
            .expect("switch to EAN50");
        assert!(first_on_ean50.depth() <= 18.0 + 1e-9);
        assert!(profile
            .integration_points()
            .iter()
            .filter(|p| p.tank() == 1)
            .all(|p| p.depth() <= 18.0 + 1e-9));

        let switch = profile
            .stops()
            .iter()
            .find(|s| s.kind == StopKind::GasSwitch)
            .expect("gas switch stop");
        assert_eq!(switch.tank, 1);
        assert!(switch.depth > 17.8 && switch.depth <= 18.0);
        assert_eq!(switch.duration.seconds(), 60);

        let last = profile.integration_points().last().unwrap();
        assert!(last.tank_pressure()[1] < 200.0);
        assert!(last.cns_cumulative() > 0.0);
        assert_trace_invariants(&profile);
    }

    #[test]
    fn test_manual_policy_never_switches() {
        let config = Configuration::builder()
            .gas_switch(GasSwitchPolicy::Manual)
            .build()
            .unwrap();
        let profile = plan(&[DepthTarget::new(45.0, 20.0)], vec![air(24.0), ean50()], config);
        assert!(profile.integration_points().iter().all(|p| p.tank() == 0));
        assert!(profile
            .stops()
            .iter()
            .all(|s| s.kind != StopKind::GasSwitch));
        let last = profile.integration_points().last().unwrap();
        assert_eq!(last.tank_pressure()[1], 200.0);
    }

    #[test]
    fn test_stop_policy_switches_on_deco_stops_only() {
        let config = Configuration::builder()
            .gas_switch(GasSwitchPolicy::Stop)
            .build()
            .unwrap();
        let profile = plan(&[DepthTarget::new(45.0, 20.0)], vec![air(24.0), ean50()], config);
        assert!(profile
            .stops()
            .iter()
            .all(|s| s.kind != StopKind::GasSwitch));
        assert!(profile
            .integration_points()
            .iter()
            .filter(|p| p.tank() == 1)
            .all(|p| p.depth() <= 18.0 + 1e-9));
    }

    #[test]
    fn test_recomputation_is_identical() {
        let targets = [DepthTarget::new(40.0, 20.0), DepthTarget::arrive(21.0)];
        let tanks = vec![air(24.0), ean50()];
        let config = Configuration::builder()
            .gradient_factors(0.4, 0.85)
            .build()
            .unwrap();
        let a = plan(&targets, tanks.clone(), config.clone());
        let b = plan(&targets, tanks, config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_deco_stop_rounding() {
        let config = Configuration::default();
        let tanks = [air(12.0)];
        let planner = Planner::new(&config, &tanks, 45.0);
        assert_eq!(planner.next_deco_stop(0.0), 0.0);
        assert_eq!(planner.next_deco_stop(1.2), 3.0);
        assert_eq!(planner.next_deco_stop(3.0), 6.0);
        assert_eq!(planner.next_deco_stop(4.5), 6.0);
        assert_eq!(planner.next_deco_stop(6.2), 9.0);
    }

    #[test]
    fn test_next_gas_stop_depth_policy_only() {
        let tanks = [air(24.0), ean50()];
        let config = Configuration::default();
        let planner = Planner::new(&config, &tanks, 45.0);
        // EAN50 at 1.4 bar, floored to the depth grid
        let stop = planner.next_gas_stop(45.0, 0).unwrap();
        assert!(stop > 17.8 && stop <= 18.0, "gas stop at {stop}");
        assert_eq!(planner.next_gas_stop(stop, 0).unwrap(), 0.0);
        assert_eq!(planner.next_gas_stop(45.0, 1).unwrap(), 0.0);

        let config = Configuration::builder()
            .gas_switch(GasSwitchPolicy::Stop)
            .build()
            .unwrap();
        let planner = Planner::new(&config, &tanks, 45.0);
        assert_eq!(planner.next_gas_stop(45.0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_bottom_sac_selection() {
        let config = Configuration::builder()
            .descent_sac(40.0)
            .bottom_sac(0.0)
            .compute_ascent(false)
            .build()
            .unwrap();
        let profile = plan(&[DepthTarget::new(20.0, 5.0)], vec![air(10.0)], config);
        let points = profile.integration_points();
        // descent reaches 20 m at 60 s; only the descent consumes gas
        let at_bottom = points[12].tank_pressure()[0];
        assert!(at_bottom < 200.0);
        assert_eq!(points.last().unwrap().tank_pressure()[0], at_bottom);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Profile::new(&[DepthTarget::new(10.0, 2.0)], vec![], Configuration::default()),
            Err(PlanError::InvalidInput(_))
        ));
        assert!(matches!(
            Profile::new(&[], vec![air(12.0)], Configuration::default()),
            Err(PlanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_overlong_bottom_is_invalid_input() {
        let result = Profile::new(
            &[DepthTarget::new(5.0, 73.0 * 60.0)],
            vec![air(12.0)],
            Configuration::default(),
        );
        assert!(matches!(result, Err(PlanError::InvalidInput(_))));
    }

    #[test]
    fn test_runaway_ascent_is_unterminated() {
        // bottom ends at 259185 s, the 5 m ascent needs seven more steps
        let result = Profile::new(
            &[DepthTarget::new(5.0, 72.0 * 60.0 - 0.5)],
            vec![air(12.0)],
            Configuration::default(),
        );
        assert!(matches!(result, Err(PlanError::Unterminated { .. })));
    }

    #[test]
    fn test_point_display() {
        let profile = Profile::new(
            &[DepthTarget::new(10.0, 2.0)],
            vec![air(12.0)],
            Configuration::default(),
        )
        .unwrap();
        assert_eq!(
            profile.integration_points()[0].to_string(),
            "0.0 m at 00:00 on tank 0, ceiling 0.0 m, [200] bar, CNS 0.0 %, OTU 0.0"
        );
    }

    #[test]
    fn test_profile_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Profile>();
    }
}
