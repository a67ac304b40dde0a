//! Bühlmann ZHL-16C tissue model with gradient factors.
//!
//! Tissue loading follows the Schreiner equation for a linear change of
//! ambient pressure over a segment. Ceilings use load-weighted N2/He
//! coefficients and a gradient factor interpolated on ambient pressure
//! between the deepest point of the plan (GF low) and the surface (GF high).

use crate::gas::GasMixture;

// ============================================================================
// Physical Constants
// ============================================================================

/// Water vapour pressure in the lungs (bar).
pub const P_WATER_VAPOR: f64 = 0.0567;

/// Fraction of N2 in air used to saturate tissues at the surface.
const AIR_FN2: f64 = 0.79;

// ============================================================================
// ZHL-16C Compartment Constants (Bühlmann / Baker)
// ============================================================================

/// Number of tissue compartments.
pub const NUM_COMPARTMENTS: usize = 16;

/// N2 half-times in minutes for compartments 1–16 (ZHL-16C).
const N2_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    5.0, 8.0, 12.5, 18.5, 27.0, 38.3, 54.3, 77.0, 109.0, 146.0, 187.0, 239.0, 305.0, 390.0, 498.0,
    635.0,
];

/// He half-times in minutes for compartments 1–16 (ZHL-16C).
const HE_HALF_TIMES: [f64; NUM_COMPARTMENTS] = [
    1.88, 3.02, 4.72, 6.99, 10.21, 14.48, 20.53, 29.11, 41.20, 55.19, 70.69, 90.34, 115.29, 147.42,
    188.24, 240.03,
];

/// N2 'a' coefficients (bar) for ZHL-16C.
const A_N2: [f64; NUM_COMPARTMENTS] = [
    1.1696, 1.0000, 0.8618, 0.7562, 0.6200, 0.5043, 0.4410, 0.4000, 0.3750, 0.3500, 0.3295, 0.3065,
    0.2835, 0.2610, 0.2480, 0.2327,
];

/// N2 'b' coefficients (dimensionless) for ZHL-16C.
const B_N2: [f64; NUM_COMPARTMENTS] = [
    0.5578, 0.6514, 0.7222, 0.7825, 0.8126, 0.8434, 0.8693, 0.8910, 0.9092, 0.9222, 0.9319, 0.9403,
    0.9477, 0.9544, 0.9602, 0.9653,
];

/// He 'a' coefficients (bar) for ZHL-16C.
const A_HE: [f64; NUM_COMPARTMENTS] = [
    1.6189, 1.3830, 1.1919, 1.0458, 0.9220, 0.8205, 0.7305, 0.6502, 0.5950, 0.5545, 0.5333, 0.5189,
    0.5181, 0.5176, 0.5172, 0.5119,
];

/// He 'b' coefficients (dimensionless) for ZHL-16C.
const B_HE: [f64; NUM_COMPARTMENTS] = [
    0.4770, 0.5747, 0.6527, 0.7223, 0.7582, 0.7957, 0.8279, 0.8553, 0.8757, 0.8903, 0.8997, 0.9073,
    0.9122, 0.9171, 0.9217, 0.9267,
];

// ============================================================================
// Tissue State
// ============================================================================

/// Inert gas loading of the 16 tissue compartments (bar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TissueLoads {
    pub n2: [f64; NUM_COMPARTMENTS],
    pub he: [f64; NUM_COMPARTMENTS],
}

impl TissueLoads {
    /// Tissues saturated with air at the surface, free of helium.
    pub fn surface_equilibrium() -> Self {
        Self {
            n2: [AIR_FN2 * (1.0 - P_WATER_VAPOR); NUM_COMPARTMENTS],
            he: [0.0; NUM_COMPARTMENTS],
        }
    }

    /// Loads after breathing `gas` for `minutes` while moving linearly
    /// from `start_depth` to `end_depth`.
    ///
    /// The inspired pressure is taken at the end of the segment and the
    /// rate term carries the depth change over the segment.
    pub fn schreiner(
        &self,
        gas: &GasMixture,
        start_depth: f64,
        end_depth: f64,
        minutes: f64,
    ) -> TissueLoads {
        let p_amb = end_depth / 10.0 + 1.0;
        let depth_rate = (end_depth - start_depth) / minutes;
        TissueLoads {
            n2: integrate(&self.n2, &N2_HALF_TIMES, gas.fn2(), p_amb, depth_rate, minutes),
            he: integrate(&self.he, &HE_HALF_TIMES, gas.fhe(), p_amb, depth_rate, minutes),
        }
    }

    /// Ceiling depth (m) per compartment, each floored at the surface.
    pub fn ceilings(&self, gf: f64) -> [f64; NUM_COMPARTMENTS] {
        let mut out = [0.0; NUM_COMPARTMENTS];
        for (i, ceiling) in out.iter_mut().enumerate() {
            *ceiling = self.compartment_ceiling(i, gf).max(0.0);
        }
        out
    }

    /// Unfloored ceiling depth (m) for one compartment.
    fn compartment_ceiling(&self, i: usize, gf: f64) -> f64 {
        let p_n2 = self.n2[i];
        let p_he = self.he[i];
        let p_total = p_n2 + p_he;

        let (a, b) = if p_total > 1e-10 {
            (
                (A_N2[i] * p_n2 + A_HE[i] * p_he) / p_total,
                (B_N2[i] * p_n2 + B_HE[i] * p_he) / p_total,
            )
        } else {
            (A_N2[i], B_N2[i])
        };

        let ceiling_bar = (p_total - a * gf) / (gf / b - gf + 1.0);
        (ceiling_bar - 1.0) * 10.0
    }
}

impl Default for TissueLoads {
    fn default() -> Self {
        Self::surface_equilibrium()
    }
}

fn integrate(
    p0: &[f64; NUM_COMPARTMENTS],
    half_times: &[f64; NUM_COMPARTMENTS],
    f_ig: f64,
    p_amb: f64,
    depth_rate: f64,
    minutes: f64,
) -> [f64; NUM_COMPARTMENTS] {
    let p_inspired = f_ig * (p_amb - P_WATER_VAPOR);
    let r = depth_rate / 10.0 * f_ig;
    let mut out = [0.0; NUM_COMPARTMENTS];
    for i in 0..NUM_COMPARTMENTS {
        let k = std::f64::consts::LN_2 / half_times[i];
        out[i] = p_inspired + r * (minutes - 1.0 / k)
            - (p_inspired - p0[i] - r / k) * (-k * minutes).exp();
    }
    out
}

// ============================================================================
// Gradient Factors
// ============================================================================

/// Gradient factor line anchored at the deepest ambient pressure of a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientFactors {
    low: f64,
    high: f64,
    p_max_amb: f64,
}

impl GradientFactors {
    pub fn new(low: f64, high: f64, max_depth_m: f64) -> Self {
        Self {
            low,
            high,
            p_max_amb: max_depth_m / 10.0 + 1.0,
        }
    }

    /// Gradient factor in effect at ambient pressure `p_amb` (bar).
    pub fn at(&self, p_amb: f64) -> f64 {
        if self.p_max_amb <= 1.0 {
            return self.high;
        }
        self.high - (self.high - self.low) * (p_amb - 1.0) / (self.p_max_amb - 1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(loads: TissueLoads, gas: &GasMixture, depth: f64, minutes: f64) -> TissueLoads {
        loads.schreiner(gas, depth, depth, minutes)
    }

    #[test]
    fn test_surface_equilibrium_has_no_ceiling() {
        let tissues = TissueLoads::surface_equilibrium();
        let ceilings = tissues.ceilings(1.0);
        assert!(ceilings.iter().all(|c| *c == 0.0));
        let ceilings = tissues.ceilings(0.3);
        assert!(
            ceilings.iter().all(|c| *c == 0.0),
            "Saturated surface tissues should not need a stop, got {ceilings:?}"
        );
    }

    #[test]
    fn test_surface_air_stays_saturated() {
        let air = GasMixture::air();
        let start = TissueLoads::surface_equilibrium();
        let after = hold(start, &air, 0.0, 60.0);
        for i in 0..NUM_COMPARTMENTS {
            assert!(
                (after.n2[i] - start.n2[i]).abs() < 1e-9,
                "compartment {i} drifted at the surface"
            );
            assert_eq!(after.he[i], 0.0);
        }
    }

    #[test]
    fn test_constant_depth_matches_haldane() {
        let air = GasMixture::air();
        let start = TissueLoads::surface_equilibrium();
        let after = hold(start, &air, 30.0, 5.0);
        let p_inspired = 0.79 * (4.0 - P_WATER_VAPOR);
        // one half-time for the first compartment
        let expected = start.n2[0] + (p_inspired - start.n2[0]) * 0.5;
        assert!((after.n2[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_loading_increases_at_depth() {
        let air = GasMixture::air();
        let start = TissueLoads::surface_equilibrium();
        let after = hold(start, &air, 30.0, 20.0);
        for i in 0..NUM_COMPARTMENTS {
            assert!(after.n2[i] > start.n2[i]);
        }
        // faster compartments load more
        assert!(after.n2[0] > after.n2[15]);
    }

    #[test]
    fn test_trimix_loads_helium() {
        let trimix = GasMixture::new(21, 35).unwrap();
        let start = TissueLoads::surface_equilibrium();
        let after = hold(start, &trimix, 60.0, 20.0);
        assert!(after.he.iter().all(|p| *p > 0.0));
        // helium is faster than nitrogen
        assert!(after.he[0] > after.n2[0] - start.n2[0]);
    }

    #[test]
    fn test_deep_exposure_creates_ceiling() {
        let air = GasMixture::air();
        let after = hold(TissueLoads::surface_equilibrium(), &air, 45.0, 20.0);
        let max = after.ceilings(1.0).iter().cloned().fold(0.0, f64::max);
        assert!(max > 0.0, "45m/20min should require a stop, got {max}");
        // lower gradient factors are more conservative
        let conservative = after.ceilings(0.3).iter().cloned().fold(0.0, f64::max);
        assert!(conservative > max);
    }

    #[test]
    fn test_gradient_factor_interpolation() {
        let gf = GradientFactors::new(0.3, 0.75, 40.0);
        assert!((gf.at(1.0) - 0.75).abs() < 1e-12);
        assert!((gf.at(5.0) - 0.3).abs() < 1e-12);
        assert!((gf.at(3.0) - 0.525).abs() < 1e-12);
    }

    #[test]
    fn test_gradient_factor_surface_plan() {
        let gf = GradientFactors::new(0.3, 0.75, 0.0);
        assert_eq!(gf.at(1.0), 0.75);
    }

    #[test]
    fn test_numerical_stability_long_exposure() {
        let air = GasMixture::air();
        let mut loads = TissueLoads::surface_equilibrium();
        for _ in 0..1000 {
            loads = hold(loads, &air, 10.0, 1.0);
        }
        let saturated = 0.79 * (2.0 - P_WATER_VAPOR);
        assert!(loads.n2.iter().all(|p| p.is_finite()));
        assert!((loads.n2[0] - saturated).abs() < 1e-6);
    }
}
