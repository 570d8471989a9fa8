//! # Cycler Core
//!
//! A compiler for human-readable battery cycling protocols.
//!
//! This library provides:
//! - A parser for instructions such as `"Discharge at 1C for 0.5 hours"`
//! - Unit and time normalisation with a fixed sign convention
//! - Termination events for open-ended steps (`"Hold at 4.1 V until 50mA"`)
//! - Periodic extension of recorded drive-cycle profiles
//! - Grouping of steps into cycles for reporting
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`instruction`] - Lexer and parser for single instructions
//! - [`cycle`] - Raw instruction lists and cycle flattening
//! - [`drive_cycle`] - Drive-cycle tables and their extension
//! - [`step`] - Compiled steps and termination events
//! - [`experiment`] - The compiled experiment and its configuration
//! - [`protocol`] - Protocol files and drive-cycle CSV data
//!
//! ## Usage
//!
//! ### Library
//!
//! ```
//! use cycler_core::{Experiment, Unit};
//!
//! let experiment = Experiment::new([
//!     "Discharge at 1C for 0.5 hours",
//!     "Hold at 4.1 V until 50mA",
//! ])
//! .unwrap();
//!
//! let hold = &experiment.steps()[1];
//! assert_eq!(hold.unit(), Unit::Voltage);
//! assert_eq!(hold.duration(), None);
//! assert_eq!(experiment.events()[1].map(|e| e.value), Some(0.05));
//! ```
//!
//! ### Native CLI
//!
//! ```bash
//! cycler protocol.txt --period "20 seconds" --json > steps.json
//! ```
//!
//! ## Compiled Step Layout
//!
//! Each step is `(magnitude, unit, duration, period)`:
//!
//! 1. `magnitude` is signed: discharge positive, charge negative, rest zero
//! 2. `unit` is one of `C`, `A`, `W`, `V` or `Drive`
//! 3. `duration` is in seconds, or open for steps that run until an event
//! 4. `period` is the checkpoint interval in seconds
//!
//! The simulation engine consumes steps and events positionally; executing
//! them is outside this crate.

pub mod cycle;
pub mod drive_cycle;
pub mod error;
pub mod experiment;
pub mod instruction;
pub mod protocol;
pub mod step;
pub mod units;

// Re-export main types for convenience
pub use cycle::RawInstruction;
pub use drive_cycle::{DriveCycleTable, DriveCycles};
pub use error::{CyclerError, ErrorKind, Result};
pub use experiment::{Experiment, ExperimentConfig, Parameters};
pub use step::{Event, Magnitude, Step, Termination};
pub use units::Unit;

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmExperiment;

/// Default checkpoint period in seconds
pub const DEFAULT_PERIOD: f64 = 60.0;
