//! Planner configuration.
//!
//! A [`Configuration`] is immutable once built. Use [`Configuration::default`]
//! or [`ConfigurationBuilder`]; every instance owns its own durations.
//! The JSON form is lossless: `to_json` followed by `from_json` restores
//! identical option values.

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::gas::MAX_REASONABLE_PPO2;
use crate::time::Duration;

/// Smallest depth change per ascent step; depths live on a 0.1 m grid.
const MIN_ASCENT_STEP_M: f64 = 0.1;

/// When the planner may switch to a richer gas during the ascent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GasSwitchPolicy {
    /// Stop at the MOD of the next richer gas and switch there.
    Depth,
    /// Switch only while holding a decompression stop.
    Stop,
    /// Never switch automatically.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    last_stop_depth: f64,
    stop_depth_increment: f64,
    safety_stop_depth: f64,
    safety_stop_duration: Duration,

    ascent_rate: f64,
    descent_rate: f64,

    descent_sac: f64,
    bottom_sac: f64,
    ascent_sac: f64,

    gf_low: f64,
    gf_high: f64,

    compute_ascent: bool,
    compute_descent: bool,
    deco_stops: bool,
    safety_stop: bool,

    gas_switch: GasSwitchPolicy,
    gas_switch_duration: Duration,
    switch_ppo2: f64,

    time_step: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            last_stop_depth: 3.0,
            stop_depth_increment: 3.0,
            safety_stop_depth: 5.0,
            safety_stop_duration: Duration::from_minutes(3.0),
            ascent_rate: 10.0,
            descent_rate: 20.0,
            descent_sac: 20.0,
            bottom_sac: 20.0,
            ascent_sac: 17.0,
            gf_low: 1.0,
            gf_high: 1.0,
            compute_ascent: true,
            compute_descent: true,
            deco_stops: true,
            safety_stop: true,
            gas_switch: GasSwitchPolicy::Depth,
            gas_switch_duration: Duration::from_seconds(60),
            switch_ppo2: 1.4,
            time_step: Duration::from_seconds(5),
        }
    }
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// Check every invariant the planner relies on.
    pub fn validate(&self) -> Result<(), PlanError> {
        if !(self.gf_low > 0.0 && self.gf_low <= self.gf_high && self.gf_high <= 1.0) {
            return Err(PlanError::InvalidConfiguration(format!(
                "gradient factors must satisfy 0 < low <= high <= 1, got {}/{}",
                self.gf_low, self.gf_high
            )));
        }
        if self.time_step.seconds() <= 0 {
            return Err(PlanError::InvalidConfiguration(
                "time step must be at least one second".to_string(),
            ));
        }
        if !(self.ascent_rate > 0.0) || !(self.descent_rate > 0.0) {
            return Err(PlanError::InvalidConfiguration(format!(
                "ascent and descent rates must be positive, got {}/{}",
                self.ascent_rate, self.descent_rate
            )));
        }
        if self.ascent_step() < MIN_ASCENT_STEP_M {
            return Err(PlanError::InvalidConfiguration(format!(
                "ascent of {:.3} m per time step is below {MIN_ASCENT_STEP_M} m",
                self.ascent_step()
            )));
        }
        if !(self.stop_depth_increment > 0.0) {
            return Err(PlanError::InvalidConfiguration(
                "stop depth increment must be positive".to_string(),
            ));
        }
        if !(self.last_stop_depth >= 0.0) || !(self.safety_stop_depth >= 0.0) {
            return Err(PlanError::InvalidConfiguration(
                "stop depths must not be negative".to_string(),
            ));
        }
        if self.safety_stop_duration.seconds() < 0 || self.gas_switch_duration.seconds() < 0 {
            return Err(PlanError::InvalidConfiguration(
                "stop durations must not be negative".to_string(),
            ));
        }
        if [self.descent_sac, self.bottom_sac, self.ascent_sac]
            .iter()
            .any(|sac| !(*sac >= 0.0))
        {
            return Err(PlanError::InvalidConfiguration(
                "gas consumption rates must not be negative".to_string(),
            ));
        }
        if !(self.switch_ppo2 > 0.0 && self.switch_ppo2 <= MAX_REASONABLE_PPO2) {
            return Err(PlanError::Ppo2OutOfRange {
                ppo2: self.switch_ppo2,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode a JSON document; missing options take their defaults.
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let config: Configuration = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Depth covered by one ascent time step (m).
    pub fn ascent_step(&self) -> f64 {
        self.ascent_rate * self.time_step.minutes()
    }

    pub fn last_stop_depth(&self) -> f64 {
        self.last_stop_depth
    }

    pub fn stop_depth_increment(&self) -> f64 {
        self.stop_depth_increment
    }

    pub fn safety_stop_depth(&self) -> f64 {
        self.safety_stop_depth
    }

    pub fn safety_stop_duration(&self) -> Duration {
        self.safety_stop_duration
    }

    pub fn ascent_rate(&self) -> f64 {
        self.ascent_rate
    }

    pub fn descent_rate(&self) -> f64 {
        self.descent_rate
    }

    pub fn descent_sac(&self) -> f64 {
        self.descent_sac
    }

    pub fn bottom_sac(&self) -> f64 {
        self.bottom_sac
    }

    pub fn ascent_sac(&self) -> f64 {
        self.ascent_sac
    }

    pub fn gf_low(&self) -> f64 {
        self.gf_low
    }

    pub fn gf_high(&self) -> f64 {
        self.gf_high
    }

    pub fn compute_ascent(&self) -> bool {
        self.compute_ascent
    }

    pub fn compute_descent(&self) -> bool {
        self.compute_descent
    }

    pub fn deco_stops(&self) -> bool {
        self.deco_stops
    }

    pub fn safety_stop(&self) -> bool {
        self.safety_stop
    }

    pub fn gas_switch(&self) -> GasSwitchPolicy {
        self.gas_switch
    }

    pub fn gas_switch_duration(&self) -> Duration {
        self.gas_switch_duration
    }

    pub fn switch_ppo2(&self) -> f64 {
        self.switch_ppo2
    }

    pub fn time_step(&self) -> Duration {
        self.time_step
    }
}

/// Fluent construction of a validated [`Configuration`].
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_stop_depth(mut self, depth_m: f64) -> Self {
        self.config.last_stop_depth = depth_m;
        self
    }

    pub fn stop_depth_increment(mut self, depth_m: f64) -> Self {
        self.config.stop_depth_increment = depth_m;
        self
    }

    pub fn safety_stop_depth(mut self, depth_m: f64) -> Self {
        self.config.safety_stop_depth = depth_m;
        self
    }

    pub fn safety_stop_duration(mut self, duration: Duration) -> Self {
        self.config.safety_stop_duration = duration;
        self
    }

    pub fn ascent_rate(mut self, m_per_min: f64) -> Self {
        self.config.ascent_rate = m_per_min;
        self
    }

    pub fn descent_rate(mut self, m_per_min: f64) -> Self {
        self.config.descent_rate = m_per_min;
        self
    }

    pub fn descent_sac(mut self, l_per_min: f64) -> Self {
        self.config.descent_sac = l_per_min;
        self
    }

    pub fn bottom_sac(mut self, l_per_min: f64) -> Self {
        self.config.bottom_sac = l_per_min;
        self
    }

    pub fn ascent_sac(mut self, l_per_min: f64) -> Self {
        self.config.ascent_sac = l_per_min;
        self
    }

    pub fn gradient_factors(mut self, low: f64, high: f64) -> Self {
        self.config.gf_low = low;
        self.config.gf_high = high;
        self
    }

    pub fn compute_ascent(mut self, enabled: bool) -> Self {
        self.config.compute_ascent = enabled;
        self
    }

    pub fn compute_descent(mut self, enabled: bool) -> Self {
        self.config.compute_descent = enabled;
        self
    }

    pub fn deco_stops(mut self, enabled: bool) -> Self {
        self.config.deco_stops = enabled;
        self
    }

    pub fn safety_stop(mut self, enabled: bool) -> Self {
        self.config.safety_stop = enabled;
        self
    }

    pub fn gas_switch(mut self, policy: GasSwitchPolicy) -> Self {
        self.config.gas_switch = policy;
        self
    }

    pub fn gas_switch_duration(mut self, duration: Duration) -> Self {
        self.config.gas_switch_duration = duration;
        self
    }

    pub fn switch_ppo2(mut self, ppo2: f64) -> Self {
        self.config.switch_ppo2 = ppo2;
        self
    }

    pub fn time_step(mut self, step: Duration) -> Self {
        self.config.time_step = step;
        self
    }

    pub fn build(self) -> Result<Configuration, PlanError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
