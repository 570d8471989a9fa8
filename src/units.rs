//! Unit vocabularies for operating quantities and times.
//!
//! Electrical units are canonicalised to their base unit (`mA` becomes `A`
//! scaled by 1/1000). Time units are converted to seconds.

use serde::Serialize;

use crate::error::{CyclerError, Result};

/// Canonical unit of a compiled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    /// C-rate, relative to nominal capacity
    #[serde(rename = "C")]
    CRate,
    /// Current in amperes
    #[serde(rename = "A")]
    Current,
    /// Power in watts
    #[serde(rename = "W")]
    Power,
    /// Voltage in volts
    #[serde(rename = "V")]
    Voltage,
    /// Recorded drive-cycle profile
    Drive,
}

impl Unit {
    /// Look up an electrical unit token, returning the canonical unit and the
    /// divisor that converts a value in `token` to that unit.
    pub fn from_token(token: &str) -> Option<(Self, f64)> {
        match token {
            "C" => Some((Self::CRate, 1.0)),
            "A" => Some((Self::Current, 1.0)),
            "mA" => Some((Self::Current, 1000.0)),
            "W" => Some((Self::Power, 1.0)),
            "mW" => Some((Self::Power, 1000.0)),
            "V" => Some((Self::Voltage, 1.0)),
            "mV" => Some((Self::Voltage, 1000.0)),
            _ => None,
        }
    }

    /// Whether a threshold in this unit can terminate a step.
    pub fn is_event_unit(&self) -> bool {
        matches!(self, Self::CRate | Self::Current | Self::Voltage)
    }

    /// Short symbol used in compiled output.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::CRate => "C",
            Self::Current => "A",
            Self::Power => "W",
            Self::Voltage => "V",
            Self::Drive => "Drive",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Time unit accepted in durations and sampling periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    /// Parse a time unit token (case-insensitive, singular or plural).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "second" | "seconds" | "s" | "sec" | "secs" => Some(Self::Second),
            "minute" | "minutes" | "m" | "min" | "mins" => Some(Self::Minute),
            "hour" | "hours" | "h" | "hr" | "hrs" => Some(Self::Hour),
            _ => None,
        }
    }

    /// Number of seconds in one of this unit.
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Second => 1.0,
            Self::Minute => 60.0,
            Self::Hour => 3600.0,
        }
    }
}

/// Convert `value` expressed in the time unit `token` to seconds.
pub fn to_seconds(value: f64, token: &str) -> Result<f64> {
    TimeUnit::from_token(token)
        .map(|unit| value * unit.seconds())
        .ok_or_else(|| CyclerError::UnknownTimeUnit {
            unit: token.to_string(),
        })
}
