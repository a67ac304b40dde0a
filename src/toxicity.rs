//! Oxygen toxicity accounting: CNS clock fraction and pulmonary OTU.
//!
//! Both are evaluated per segment from the ppO2 at its start and end. A
//! constant-depth segment uses the closed form for constant exposure, a
//! changing-depth segment integrates the linear ppO2 ramp.

/// Below this ppO2 (bar) neither CNS nor OTU accumulate.
const PPO2_THRESHOLD: f64 = 0.5;

/// NOAA single-exposure limits as linear segments `t_lim = m × ppO2 + b`,
/// keyed by the ppO2 range `[low, high]` the line applies to.
const NOAA_CNS_LINES: [(f64, f64, f64, f64); 7] = [
    (0.5, 0.6, -1800.0, 1800.0),
    (0.6, 0.7, -1500.0, 1620.0),
    (0.7, 0.8, -1200.0, 1410.0),
    (0.8, 0.9, -900.0, 1170.0),
    (0.9, 1.1, -600.0, 900.0),
    (1.1, 1.5, -300.0, 570.0),
    (1.5, 1.6, -750.0, 1245.0),
];

/// Highest ppO2 covered by the NOAA table.
const NOAA_MAX_PPO2: f64 = 1.6;

/// Slope and intercept of the NOAA line covering `ppo2`.
fn noaa_line(ppo2: f64) -> (f64, f64) {
    NOAA_CNS_LINES
        .iter()
        .find(|(low, high, _, _)| ppo2 >= *low && ppo2 <= *high)
        .map(|(_, _, m, b)| (*m, *b))
        .unwrap_or_else(|| {
            let (_, _, m, b) = NOAA_CNS_LINES[NOAA_CNS_LINES.len() - 1];
            (m, b)
        })
}

/// CNS clock fraction (1.0 = 100 %) accrued over one segment.
pub fn cns_segment(ppo2_start: f64, ppo2_end: f64, minutes: f64, constant_depth: bool) -> f64 {
    if ppo2_start < PPO2_THRESHOLD || ppo2_end < PPO2_THRESHOLD || minutes <= 0.0 {
        return 0.0;
    }

    if ppo2_start > NOAA_MAX_PPO2 {
        // past the table the 1.6 bar limit is applied as a constant exposure
        let (m, b) = noaa_line(NOAA_MAX_PPO2);
        return minutes / (m * NOAA_MAX_PPO2 + b);
    }

    let (m, b) = noaa_line(ppo2_start);
    let t_lim = m * ppo2_start + b;
    let k = (ppo2_end - ppo2_start) / minutes;
    if constant_depth || (m * k).abs() < 1e-12 {
        return minutes / t_lim;
    }

    ((t_lim + m * k * minutes).abs().ln() - t_lim.abs().ln()) / (m * k)
}

/// Oxygen tolerance units accrued over one segment.
pub fn otu_segment(ppo2_start: f64, ppo2_end: f64, minutes: f64, constant_depth: bool) -> f64 {
    if minutes <= 0.0 {
        return 0.0;
    }

    let max_ppo2 = ppo2_start.max(ppo2_end);
    let min_ppo2 = ppo2_start.min(ppo2_end);

    if constant_depth || (max_ppo2 - min_ppo2).abs() < 1e-12 {
        if ppo2_start < PPO2_THRESHOLD {
            return 0.0;
        }
        return minutes * (PPO2_THRESHOLD / (ppo2_start - PPO2_THRESHOLD)).powf(-5.0 / 6.0);
    }

    if max_ppo2 < PPO2_THRESHOLD {
        return 0.0;
    }

    let low_ppo2 = min_ppo2.max(PPO2_THRESHOLD);
    let exposure = minutes * (max_ppo2 - low_ppo2) / (max_ppo2 - min_ppo2);

    let start = ppo2_start.max(PPO2_THRESHOLD);
    let end = ppo2_end.max(PPO2_THRESHOLD);
    let units = ((end - PPO2_THRESHOLD) / PPO2_THRESHOLD).powf(11.0 / 6.0)
        - ((start - PPO2_THRESHOLD) / PPO2_THRESHOLD).powf(11.0 / 6.0);

    3.0 * exposure / 11.0 * units / (end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_exposure_below_threshold() {
        assert_eq!(cns_segment(0.21, 0.42, 1.0, false), 0.0);
        assert_eq!(cns_segment(0.45, 0.45, 10.0, true), 0.0);
        assert_eq!(otu_segment(0.21, 0.42, 1.0, false), 0.0);
        assert_eq!(otu_segment(0.45, 0.45, 10.0, true), 0.0);
    }

    #[test]
    fn test_cns_constant_depth() {
        // 1.4 bar: limit is 150 min on the 1.1-1.5 line
        let cns = cns_segment(1.4, 1.4, 15.0, true);
        assert!((cns - 15.0 / 150.0).abs() < 1e-12);

        // 1.0 bar: 300 min
        let cns = cns_segment(1.0, 1.0, 30.0, true);
        assert!((cns - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_cns_ramp_between_endpoints() {
        // ascending from 1.2 to 1.0 bar over two minutes sits between the
        // constant exposures at either end
        let ramp = cns_segment(1.2, 1.0, 2.0, false);
        let at_start = cns_segment(1.2, 1.2, 2.0, true);
        assert!(ramp > 0.0);
        assert!(ramp < at_start);
    }

    #[test]
    fn test_cns_beyond_table_is_finite() {
        let cns = cns_segment(1.8, 1.8, 1.0, true);
        assert!(cns.is_finite());
        assert!((cns - 1.0 / 45.0).abs() < 1e-12);
    }

    #[test]
    fn test_otu_constant_depth() {
        // 1.0 bar for 10 minutes is 10 OTU by definition
        let otu = otu_segment(1.0, 1.0, 10.0, true);
        assert!((otu - 10.0).abs() < 1e-9);
        assert_eq!(otu_segment(0.5, 0.5, 10.0, true), 0.0);
    }

    #[test]
    fn test_otu_ramp_is_symmetric() {
        let down = otu_segment(0.6, 1.2, 3.0, false);
        let up = otu_segment(1.2, 0.6, 3.0, false);
        assert!(down > 0.0);
        assert!((down - up).abs() < 1e-9);
    }

    #[test]
    fn test_otu_ramp_crossing_threshold() {
        let crossing = otu_segment(0.4, 0.9, 2.0, false);
        let above = otu_segment(0.5, 0.9, 2.0, false);
        assert!(crossing > 0.0);
        assert!(crossing < above);
    }
}
