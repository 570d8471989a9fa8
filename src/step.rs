//! Compiled operating steps.
//!
//! A [`Step`] is the canonical unit handed to the simulation engine:
//! `(magnitude, unit, duration, period)`. How a step ends is held in a
//! single [`Termination`] value, so a step can never claim an open duration
//! without also carrying the event that closes it.

use serde::Serialize;

use crate::drive_cycle::DriveCycleTable;
use crate::units::Unit;

/// A threshold that ends a step when reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Event {
    /// Threshold value, in the canonical unit
    pub value: f64,
    /// Unit of the threshold (`C`, `A` or `V`)
    pub unit: Unit,
}

impl Event {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

/// How a step ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// Runs for a fixed number of seconds
    Duration { seconds: f64 },
    /// Runs until the event fires
    Event { event: Event },
    /// Runs for a fixed number of seconds, or stops earlier on the event
    DurationOrEvent { seconds: f64, event: Event },
}

impl Termination {
    /// Fixed duration in seconds, or `None` for an open-ended step.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Duration { seconds } | Self::DurationOrEvent { seconds, .. } => Some(*seconds),
            Self::Event { .. } => None,
        }
    }

    /// The terminating event, if any.
    pub fn event(&self) -> Option<Event> {
        match self {
            Self::Duration { .. } => None,
            Self::Event { event } | Self::DurationOrEvent { event, .. } => Some(*event),
        }
    }
}

/// Operating magnitude of a step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Magnitude {
    /// Constant signed value
    Value(f64),
    /// Replayed drive-cycle profile
    Profile(DriveCycleTable),
}

impl Magnitude {
    /// The constant value, if this is not a profile.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Profile(_) => None,
        }
    }

    /// The drive-cycle profile, if any.
    pub fn profile(&self) -> Option<&DriveCycleTable> {
        match self {
            Self::Value(_) => None,
            Self::Profile(table) => Some(table),
        }
    }
}

/// One compiled operating step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    magnitude: Magnitude,
    unit: Unit,
    termination: Termination,
    period: f64,
}

impl Step {
    /// A constant-magnitude step.
    pub(crate) fn constant(value: f64, unit: Unit, termination: Termination, period: f64) -> Self {
        debug_assert!(unit != Unit::Drive);
        Self {
            magnitude: Magnitude::Value(value),
            unit,
            termination,
            period,
        }
    }

    /// A drive-cycle step replaying `profile`.
    ///
    /// Runs for `seconds` when given, otherwise for the profile's whole span.
    pub(crate) fn drive(profile: DriveCycleTable, seconds: Option<f64>, period: f64) -> Self {
        let seconds = seconds.unwrap_or_else(|| profile.span());
        Self {
            magnitude: Magnitude::Profile(profile),
            unit: Unit::Drive,
            termination: Termination::Duration { seconds },
            period,
        }
    }

    pub fn magnitude(&self) -> &Magnitude {
        &self.magnitude
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Fixed duration in seconds, or `None` when the step is open-ended.
    pub fn duration(&self) -> Option<f64> {
        self.termination.duration()
    }

    /// Checkpoint period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    /// The event that can end this step, if any.
    pub fn event(&self) -> Option<Event> {
        self.termination.event()
    }

    /// Whether the step runs until an event with no fixed duration.
    pub fn is_open(&self) -> bool {
        self.duration().is_none()
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.magnitude {
            Magnitude::Value(v) => write!(f, "({}, {}", v, self.unit)?,
            Magnitude::Profile(table) => write!(f, "(<{} samples>, {}", table.len(), self.unit)?,
        }
        match self.duration() {
            Some(seconds) => write!(f, ", {}", seconds)?,
            None => f.write_str(", open")?,
        }
        write!(f, ", {})", self.period)
    }
}
