//! Summary statistics for a planned dive.
//!
//! Pure functions over a finished [`Profile`]; nothing here changes the plan.

use crate::profile::{IntegrationPoint, Profile, StopKind};

/// Computed statistics for a planned dive.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    /// Total runtime in seconds, surface to surface
    pub runtime_sec: i64,
    /// Maximum depth reached
    pub max_depth_m: f64,
    /// Time-weighted average depth
    pub avg_depth_m: f64,
    /// Time until the ascent starts
    pub bottom_time_sec: i64,
    /// Time from leaving the bottom to the end of the plan
    pub time_to_surface_sec: i64,
    /// Time with a ceiling below the surface
    pub deco_time_sec: i64,
    /// Time spent holding deco stops
    pub deco_stop_time_sec: i64,
    /// Deepest ceiling encountered (m)
    pub max_ceiling_m: f64,
    /// Number of tank changes
    pub gas_switch_count: u32,
    /// Accumulated CNS clock in percent
    pub cns_percent: f64,
    /// Accumulated oxygen tolerance units
    pub otu: f64,
    /// Pressure drop per tank (bar)
    pub gas_used_bar: Vec<f64>,
    /// Remaining pressure per tank (bar)
    pub final_pressure_bar: Vec<f64>,
}

impl ProfileSummary {
    pub fn compute(profile: &Profile) -> Self {
        let points = profile.integration_points();
        let start_pressure: Vec<f64> = profile
            .tanks()
            .iter()
            .map(|t| t.start_pressure_bar())
            .collect();

        let Some(last) = points.last() else {
            return Self::empty(start_pressure);
        };

        let mut max_depth_m: f64 = 0.0;
        let mut weighted_depth_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut deco_time_sec = 0;
        let mut max_ceiling_m: f64 = 0.0;
        let mut gas_switch_count = 0;

        for (i, point) in points.iter().enumerate() {
            max_depth_m = max_depth_m.max(point.depth());

            // weight each point by the interval it starts
            let dt = interval_after(points, i);
            weighted_depth_sum += point.depth() * dt as f64;
            weight_sum += dt as f64;

            let ceiling = point.ceiling();
            if ceiling > 0.0 {
                deco_time_sec += dt;
            }
            max_ceiling_m = max_ceiling_m.max(ceiling);

            if i > 0 && points[i - 1].tank() != point.tank() {
                gas_switch_count += 1;
            }
        }

        let avg_depth_m = if weight_sum > 0.0 {
            weighted_depth_sum / weight_sum
        } else {
            0.0
        };

        let runtime_sec = last.runtime().seconds();
        let bottom_time_sec = profile
            .bottom_points()
            .last()
            .map(|p| p.runtime().seconds())
            .unwrap_or_default();

        let deco_stop_time_sec = profile
            .stops()
            .iter()
            .filter(|s| s.kind == StopKind::Deco)
            .map(|s| s.duration.seconds())
            .sum();

        let final_pressure_bar = last.tank_pressure().to_vec();
        let gas_used_bar = start_pressure
            .iter()
            .zip(&final_pressure_bar)
            .map(|(start, end)| start - end)
            .collect();

        ProfileSummary {
            runtime_sec,
            max_depth_m,
            avg_depth_m,
            bottom_time_sec,
            time_to_surface_sec: runtime_sec - bottom_time_sec,
            deco_time_sec,
            deco_stop_time_sec,
            max_ceiling_m,
            gas_switch_count,
            cns_percent: last.cns_cumulative() * 100.0,
            otu: last.otu_cumulative(),
            gas_used_bar,
            final_pressure_bar,
        }
    }

    fn empty(start_pressure: Vec<f64>) -> Self {
        ProfileSummary {
            runtime_sec: 0,
            max_depth_m: 0.0,
            avg_depth_m: 0.0,
            bottom_time_sec: 0,
            time_to_surface_sec: 0,
            deco_time_sec: 0,
            deco_stop_time_sec: 0,
            max_ceiling_m: 0.0,
            gas_switch_count: 0,
            cns_percent: 0.0,
            otu: 0.0,
            gas_used_bar: vec![0.0; start_pressure.len()],
            final_pressure_bar: start_pressure,
        }
    }
}

/// Seconds until the next point, or since the previous one for the last.
fn interval_after(points: &[IntegrationPoint], i: usize) -> i64 {
    if i + 1 < points.len() {
        points[i + 1].runtime().seconds() - points[i].runtime().seconds()
    } else if i > 0 {
        points[i].runtime().seconds() - points[i - 1].runtime().seconds()
    } else {
        0
    }
}
