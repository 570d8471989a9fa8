//! Recorded drive-cycle profiles and their periodic extension.
//!
//! A drive cycle is a two-column (time, value) table that a `Run` step
//! replays as its operating profile. Tables are immutable and cheap to
//! clone: both columns live behind an [`Arc`], so one table loaded by the
//! caller can back any number of steps and experiments.
//!
//! # Extension
//!
//! When a step must run longer than the recording, the table is repeated
//! whole. Each copy is shifted so that its first sample lands one minimum
//! sampling period after the previous copy's last sample:
//!
//! ```text
//! t:  0  1  2  4 | 5  6  7  9 | 10 11 12 14
//! v:  a  b  c  d | a  b  c  d |  a  b  c  d
//! ```
//!
//! The splice never produces a duplicate time and never opens a gap smaller
//! than the source's own minimum gap.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::error::{CyclerError, Result};

/// Upper bound on the number of samples an extended table may hold.
pub const MAX_EXTENDED_SAMPLES: usize = 50_000_000;

/// Drive cycles available to `Run` steps, keyed by name.
pub type DriveCycles = HashMap<String, DriveCycleTable>;

/// An immutable (time, value) profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveCycleTable {
    time: Arc<[f64]>,
    value: Arc<[f64]>,
    #[serde(skip)]
    min_period: f64,
}

impl DriveCycleTable {
    /// Create a table from its time and value columns.
    ///
    /// The columns must have equal length, at least two rows, finite
    /// entries, and a strictly increasing time column.
    pub fn new(time: Vec<f64>, value: Vec<f64>) -> Result<Self> {
        if time.len() != value.len() {
            return Err(CyclerError::invalid_drive_cycle(format!(
                "time column has {} rows but value column has {}",
                time.len(),
                value.len()
            )));
        }
        if time.len() < 2 {
            return Err(CyclerError::invalid_drive_cycle(
                "at least two samples are required",
            ));
        }
        if let Some(bad) = time.iter().chain(value.iter()).find(|x| !x.is_finite()) {
            return Err(CyclerError::invalid_drive_cycle(format!(
                "non-finite entry {}",
                bad
            )));
        }

        let mut min_period = f64::INFINITY;
        for (i, pair) in time.windows(2).enumerate() {
            let gap = pair[1] - pair[0];
            if gap <= 0.0 {
                return Err(CyclerError::invalid_drive_cycle(format!(
                    "time must be strictly increasing (row {}: {} after {})",
                    i + 1,
                    pair[1],
                    pair[0]
                )));
            }
            min_period = min_period.min(gap);
        }

        Ok(Self {
            time: time.into(),
            value: value.into(),
            min_period,
        })
    }

    /// Create a table from `[time, value]` rows.
    pub fn from_rows(rows: &[[f64; 2]]) -> Result<Self> {
        let (time, value) = rows.iter().map(|row| (row[0], row[1])).unzip();
        Self::new(time, value)
    }

    /// The time column.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// The value column.
    pub fn values(&self) -> &[f64] {
        &self.value
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Always false: a table holds at least two samples.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time of the first sample.
    pub fn first_time(&self) -> f64 {
        self.time[0]
    }

    /// Time of the last sample.
    pub fn last_time(&self) -> f64 {
        self.time[self.time.len() - 1]
    }

    /// Recorded duration (`last - first`).
    pub fn span(&self) -> f64 {
        self.last_time() - self.first_time()
    }

    /// Smallest gap between consecutive samples.
    pub fn min_period(&self) -> f64 {
        self.min_period
    }

    /// Iterate over `(time, value)` rows.
    pub fn rows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.value.iter().copied())
    }

    /// Whether two handles share the same underlying columns.
    pub fn shares_data_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.time, &other.time) && Arc::ptr_eq(&self.value, &other.value)
    }

    /// Repeat the profile until it reaches `end_time`.
    ///
    /// Returns `self` unchanged (sharing its data) when the recording already
    /// reaches `end_time`. Whole copies are appended otherwise, so the last
    /// time of the result may overshoot `end_time`. Fails when the result
    /// would exceed [`MAX_EXTENDED_SAMPLES`].
    pub fn extend(&self, end_time: f64) -> Result<Self> {
        if !end_time.is_finite() {
            return Err(CyclerError::invalid_drive_cycle(format!(
                "cannot extend to non-finite end time {}",
                end_time
            )));
        }
        if self.last_time() >= end_time {
            return Ok(self.clone());
        }

        let copies = ((end_time - self.last_time()) / (self.span() + self.min_period)).ceil();
        let samples = (copies + 1.0) * self.len() as f64;
        if !samples.is_finite() || samples > MAX_EXTENDED_SAMPLES as f64 {
            return Err(CyclerError::invalid_drive_cycle(format!(
                "extending to {} s needs about {} samples, more than the limit of {}",
                end_time, samples, MAX_EXTENDED_SAMPLES
            )));
        }
        let samples = samples as usize;
        let mut time = Vec::with_capacity(samples);
        let mut value = Vec::with_capacity(samples);
        time.extend_from_slice(&self.time);
        value.extend_from_slice(&self.value);

        let mut last = self.last_time();
        while last < end_time {
            if time.len() + self.len() > MAX_EXTENDED_SAMPLES {
                return Err(CyclerError::invalid_drive_cycle(format!(
                    "extending to {} s exceeds the limit of {} samples",
                    end_time, MAX_EXTENDED_SAMPLES
                )));
            }
            let offset = last + self.min_period - self.first_time();
            let splice = time.len() - 1;
            time.extend(self.time.iter().map(|t| t + offset));
            value.extend_from_slice(&self.value);
            // At large magnitudes the shift can round gaps away entirely
            if time[splice..].windows(2).any(|w| w[1] <= w[0]) {
                return Err(CyclerError::invalid_drive_cycle(format!(
                    "cannot splice copies after t = {} without repeating a time",
                    last
                )));
            }
            last = time[time.len() - 1];
            trace!(offset, last, "spliced drive cycle copy");
        }

        Ok(Self {
            time: time.into(),
            value: value.into(),
            min_period: self.min_period,
        })
    }
}
