//! Breathing gases and the cylinders that carry them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Highest ppO2 (bar) accepted for operating-depth queries.
pub const MAX_REASONABLE_PPO2: f64 = 3.0;

/// Slack for ppO2 comparisons at a depth that sits exactly on a MOD.
const PPO2_TOLERANCE: f64 = 1e-9;

/// Ambient pressure (bar) at a depth in metres of sea water.
pub fn ambient_pressure(depth_m: f64) -> f64 {
    depth_m / 10.0 + 1.0
}

/// Oxygen/helium/nitrogen mixture in integer percent.
///
/// Serialized as `{"o2": .., "he": ..}`; nitrogen is always derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MixtureFractions", into = "MixtureFractions")]
pub struct GasMixture {
    o2: u8,
    he: u8,
    n2: u8,
}

impl GasMixture {
    pub fn new(o2: u8, he: u8) -> Result<Self, PlanError> {
        if u16::from(o2) + u16::from(he) > 100 {
            return Err(PlanError::InvalidGasMixture { o2, he });
        }
        Ok(Self {
            o2,
            he,
            n2: 100 - o2 - he,
        })
    }

    pub fn air() -> Self {
        Self { o2: 21, he: 0, n2: 79 }
    }

    pub fn nitrox(o2: u8) -> Result<Self, PlanError> {
        Self::new(o2, 0)
    }

    pub fn o2(&self) -> u8 {
        self.o2
    }

    pub fn he(&self) -> u8 {
        self.he
    }

    pub fn n2(&self) -> u8 {
        self.n2
    }

    pub fn fo2(&self) -> f64 {
        f64::from(self.o2) / 100.0
    }

    pub fn fhe(&self) -> f64 {
        f64::from(self.he) / 100.0
    }

    pub fn fn2(&self) -> f64 {
        f64::from(self.n2) / 100.0
    }

    pub fn ppo2(&self, depth_m: f64) -> f64 {
        ambient_pressure(depth_m) * self.fo2()
    }

    pub fn ppn2(&self, depth_m: f64) -> f64 {
        ambient_pressure(depth_m) * self.fn2()
    }

    pub fn pphe(&self, depth_m: f64) -> f64 {
        ambient_pressure(depth_m) * self.fhe()
    }

    /// Maximum operating depth (m) for the given ppO2 limit.
    ///
    /// A mixture without oxygen has no depth limit and yields infinity.
    pub fn mod_depth(&self, ppo2: f64) -> Result<f64, PlanError> {
        if !(ppo2 > 0.0 && ppo2 <= MAX_REASONABLE_PPO2) {
            return Err(PlanError::Ppo2OutOfRange { ppo2 });
        }
        if self.o2 == 0 {
            return Ok(f64::INFINITY);
        }
        Ok(10.0 * (ppo2 / self.fo2() - 1.0))
    }

    /// Whether the mixture stays within `ppo2` at `depth_m`.
    pub fn breathable_at(&self, depth_m: f64, ppo2: f64) -> bool {
        self.ppo2(depth_m) <= ppo2 + PPO2_TOLERANCE
    }
}

#[derive(Serialize, Deserialize)]
struct MixtureFractions {
    o2: u8,
    #[serde(default)]
    he: u8,
}

impl TryFrom<MixtureFractions> for GasMixture {
    type Error = PlanError;

    fn try_from(raw: MixtureFractions) -> Result<Self, Self::Error> {
        Self::new(raw.o2, raw.he)
    }
}

impl From<GasMixture> for MixtureFractions {
    fn from(gas: GasMixture) -> Self {
        Self {
            o2: gas.o2,
            he: gas.he,
        }
    }
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::air()
    }
}

impl fmt::Display for GasMixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.o2, self.he) {
            (21, 0) => write!(f, "Air"),
            (o2, 0) => write!(f, "EAN{o2}"),
            (o2, he) => write!(f, "Trimix {o2}/{he}"),
        }
    }
}

/// A cylinder: mixture, water volume and filling pressure.
///
/// Tanks are supply metadata only. Remaining pressure is tracked per
/// integration point by the profile, never on the tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TankFields", into = "TankFields")]
pub struct Tank {
    gas: GasMixture,
    size_l: f64,
    start_pressure_bar: f64,
}

impl Tank {
    pub fn new(gas: GasMixture, size_l: f64, start_pressure_bar: f64) -> Result<Self, PlanError> {
        if !(size_l > 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "tank size must be positive, got {size_l} l"
            )));
        }
        if !(start_pressure_bar >= 0.0) {
            return Err(PlanError::InvalidInput(format!(
                "tank start pressure must not be negative, got {start_pressure_bar} bar"
            )));
        }
        Ok(Self {
            gas,
            size_l,
            start_pressure_bar,
        })
    }

    pub fn gas(&self) -> &GasMixture {
        &self.gas
    }

    pub fn size_l(&self) -> f64 {
        self.size_l
    }

    pub fn start_pressure_bar(&self) -> f64 {
        self.start_pressure_bar
    }
}

#[derive(Serialize, Deserialize)]
struct TankFields {
    gas: GasMixture,
    size_l: f64,
    start_pressure_bar: f64,
}

impl TryFrom<TankFields> for Tank {
    type Error = PlanError;

    fn try_from(raw: TankFields) -> Result<Self, Self::Error> {
        Self::new(raw.gas, raw.size_l, raw.start_pressure_bar)
    }
}

impl From<Tank> for TankFields {
    fn from(tank: Tank) -> Self {
        Self {
            gas: tank.gas,
            size_l: tank.size_l,
            start_pressure_bar: tank.start_pressure_bar,
        }
    }
}

/// Index of the richest mixture that is breathable at `depth_m`.
///
/// Ties keep the lower index; tank 0 is used when nothing qualifies.
pub fn best_tank(tanks: &[Tank], depth_m: f64, max_ppo2: f64) -> usize {
    let mut best: Option<(usize, u8)> = None;
    for (idx, tank) in tanks.iter().enumerate() {
        if !tank.gas.breathable_at(depth_m, max_ppo2) {
            continue;
        }
        match best {
            Some((_, o2)) if o2 >= tank.gas.o2 => {}
            _ => best = Some((idx, tank.gas.o2)),
        }
    }
    best.map(|(idx, _)| idx).unwrap_or(0)
}
