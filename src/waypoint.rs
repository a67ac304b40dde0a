//! Dive plan waypoints and their normalization into a legged sequence.

use std::fmt;

use crate::config::Configuration;
use crate::error::PlanError;
use crate::time::Duration;

/// Round a depth to the 0.1 m grid used throughout the trace.
pub(crate) fn round_depth(depth_m: f64) -> f64 {
    (depth_m * 10.0).round() / 10.0
}

/// One point of a realized plan.
///
/// `runtime` is the elapsed time when the leg starts and `duration` how
/// long it lasts; the leg ends at the next waypoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub depth: f64,
    pub duration: Duration,
    pub runtime: Duration,
    pub tank: usize,
}

impl Waypoint {
    pub fn new(depth: f64, duration: Duration, runtime: Duration, tank: usize) -> Self {
        Self {
            depth,
            duration,
            runtime,
            tank,
        }
    }

    /// Runtime at which the leg started by this waypoint ends.
    pub fn end(&self) -> Duration {
        self.runtime + self.duration
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} m for {} at {} (tank {})",
            self.depth, self.duration, self.runtime, self.tank
        )
    }
}

/// A depth the diver asks for, optionally with a time to stay there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthTarget {
    pub depth: f64,
    pub duration: Option<Duration>,
}

impl DepthTarget {
    pub fn new(depth: f64, minutes: f64) -> Self {
        Self {
            depth,
            duration: Some(Duration::from_minutes(minutes)),
        }
    }

    /// Target reached but not held.
    pub fn arrive(depth: f64) -> Self {
        Self {
            depth,
            duration: None,
        }
    }

    fn hold(&self) -> Duration {
        self.duration.unwrap_or_default()
    }
}

/// Expand sparse depth targets into a continuous legged sequence.
///
/// Every depth change becomes an explicit transit leg at the configured
/// descent or ascent rate. The last target is the terminal point of the
/// plan and is not held.
pub fn normalize(
    targets: &[DepthTarget],
    config: &Configuration,
) -> Result<Vec<Waypoint>, PlanError> {
    let first = targets
        .first()
        .ok_or_else(|| PlanError::InvalidInput("no waypoints given".to_string()))?;
    for target in targets {
        if !(target.depth >= 0.0) || !target.depth.is_finite() {
            return Err(PlanError::InvalidInput(format!(
                "waypoint depth must be a non-negative number, got {}",
                target.depth
            )));
        }
        if target.hold().seconds() < 0 {
            return Err(PlanError::InvalidInput(format!(
                "waypoint duration must not be negative, got {}",
                target.hold().minutes()
            )));
        }
    }

    let mut out = Vec::with_capacity(targets.len() * 2 + 1);
    if first.depth != 0.0 && config.compute_descent() {
        let time_to_depth = Duration::from_minutes(first.depth / config.descent_rate());
        out.push(Waypoint::new(0.0, time_to_depth, Duration::zero(), 0));
        out.push(Waypoint::new(first.depth, first.hold(), time_to_depth, 0));
    } else {
        out.push(Waypoint::new(first.depth, first.hold(), Duration::zero(), 0));
    }

    if targets.len() == 1 {
        out.push(Waypoint::new(first.depth, Duration::zero(), out[out.len() - 1].end(), 0));
        return Ok(out);
    }

    let last = targets.len() - 1;
    for (idx, target) in targets.iter().enumerate().skip(1) {
        let prev = out[out.len() - 1];
        let rate = if target.depth > prev.depth {
            Some(config.descent_rate())
        } else if target.depth < prev.depth {
            Some(config.ascent_rate())
        } else {
            None
        };
        if let Some(rate) = rate {
            let transit = Duration::from_minutes((target.depth - prev.depth).abs() / rate);
            out.push(Waypoint::new(prev.depth, transit, prev.end(), prev.tank));
        }

        let prev = out[out.len() - 1];
        let hold = if idx == last {
            Duration::zero()
        } else {
            target.hold()
        };
        out.push(Waypoint::new(target.depth, hold, prev.end(), 0));
    }

    Ok(out)
}

/// Depth at `runtime_sec` by linear interpolation between waypoints,
/// rounded to 0.1 m.
pub fn interpolate_depth(waypoints: &[Waypoint], runtime_sec: i64) -> Result<f64, PlanError> {
    if let Some(wp) = waypoints
        .iter()
        .find(|wp| wp.runtime.seconds() == runtime_sec)
    {
        return Ok(round_depth(wp.depth));
    }

    let (wp0, wp1) = waypoints
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .find(|(a, b)| a.runtime.seconds() < runtime_sec && runtime_sec < b.runtime.seconds())
        .ok_or(PlanError::Interpolation { runtime_sec })?;

    let t0 = wp0.runtime.seconds();
    let t1 = wp1.runtime.seconds();
    let slope = (wp1.depth - wp0.depth) / (t1 - t0) as f64;
    Ok(round_depth(wp0.depth + slope * (runtime_sec - t0) as f64))
}

/// Deepest depth anywhere in `waypoints`.
pub fn max_depth(waypoints: &[Waypoint]) -> f64 {
    waypoints.iter().map(|wp| wp.depth).fold(0.0, f64::max)
}
