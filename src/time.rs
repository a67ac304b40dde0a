//! Elapsed-time values.
//!
//! A [`Duration`] carries both a whole-second and a fractional-minute view
//! of the same span. The seconds view is derived by rounding when the value
//! was given in minutes, so scheduling code compares seconds while the
//! physics works in minutes.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use nom::{
    character::complete::{alpha1, char, multispace0, u32 as decimal_u32},
    combinator::{all_consuming, opt},
    number::complete::double,
    sequence::separated_pair,
    IResult, Parser,
};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Unit a duration was expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minutes,
    Seconds,
}

impl TimeUnit {
    pub fn tag(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Seconds => "s",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "min" => Ok(TimeUnit::Minutes),
            "s" | "sec" => Ok(TimeUnit::Seconds),
            other => Err(PlanError::InvalidTimeUnit(other.to_string())),
        }
    }
}

/// Immutable span of time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Duration {
    unit: TimeUnit,
    seconds: i64,
    minutes: f64,
}

impl Duration {
    /// Build a duration from a magnitude and a unit tag (`"m"` or `"s"`).
    pub fn new(value: f64, unit: &str) -> Result<Self, PlanError> {
        let unit: TimeUnit = unit.parse()?;
        if !value.is_finite() {
            return Err(PlanError::InvalidInput(format!(
                "duration must be finite, got {value}"
            )));
        }
        Ok(match unit {
            TimeUnit::Minutes => Self::from_minutes(value),
            TimeUnit::Seconds => Self::from_seconds(value.round() as i64),
        })
    }

    pub fn from_minutes(minutes: f64) -> Self {
        Self {
            unit: TimeUnit::Minutes,
            seconds: (minutes * 60.0).round() as i64,
            minutes,
        }
    }

    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            unit: TimeUnit::Seconds,
            seconds,
            minutes: seconds as f64 / 60.0,
        }
    }

    pub fn zero() -> Self {
        Self::from_seconds(0)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn minutes(&self) -> f64 {
        self.minutes
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Parse `"5s"`, `"2.5m"`, `"3 min"` or a `"mm:ss"` clock value.
    pub fn parse(text: &str) -> Result<Self, PlanError> {
        let text = text.trim();
        if let Ok((_, (min, sec))) = all_consuming(clock).parse(text) {
            return Ok(Self::from_seconds(i64::from(min) * 60 + i64::from(sec)));
        }
        match all_consuming(tagged).parse(text) {
            Ok((_, (value, unit))) => Self::new(value, unit.unwrap_or("")),
            Err(_) => Err(PlanError::InvalidInput(format!(
                "malformed duration '{text}'"
            ))),
        }
    }

    /// Text form that parses back to an identical value.
    pub fn to_tagged_string(&self) -> String {
        match self.unit {
            TimeUnit::Seconds => format!("{}{}", self.seconds, self.unit.tag()),
            TimeUnit::Minutes => format!("{}{}", self.minutes, self.unit.tag()),
        }
    }
}

fn clock(input: &str) -> IResult<&str, (u32, u32)> {
    separated_pair(decimal_u32, char(':'), decimal_u32).parse(input)
}

fn tagged(input: &str) -> IResult<&str, (f64, Option<&str>)> {
    (double, multispace0, opt(alpha1))
        .map(|(value, _, unit)| (value, unit))
        .parse(input)
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        if self.unit == TimeUnit::Seconds && rhs.unit == TimeUnit::Seconds {
            Duration::from_seconds(self.seconds + rhs.seconds)
        } else {
            Duration::from_minutes(self.minutes + rhs.minutes)
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mins = self.minutes.floor() as i64;
        let secs = self.seconds - mins * 60;
        write!(f, "{:02}:{:02}", mins, secs)
    }
}

impl FromStr for Duration {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Duration::parse(s)
    }
}

impl TryFrom<String> for Duration {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Duration::parse(&value)
    }
}

impl From<Duration> for String {
    fn from(value: Duration) -> Self {
        value.to_tagged_string()
    }
}
