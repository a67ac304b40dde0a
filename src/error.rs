use thiserror::Error;

/// Error type for profile planning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("invalid time unit: '{0}'")]
    InvalidTimeUnit(String),

    #[error("cannot interpolate depth at runtime {runtime_sec}s")]
    Interpolation { runtime_sec: i64 },

    #[error("invalid gas mixture: O2 {o2}% + He {he}% exceeds 100%")]
    InvalidGasMixture { o2: u8, he: u8 },

    #[error("ppO2 {ppo2} bar out of range")]
    Ppo2OutOfRange { ppo2: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("profile did not surface within {runtime_sec}s")]
    Unterminated { runtime_sec: i64 },
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        PlanError::Serialization(err.to_string())
    }
}
