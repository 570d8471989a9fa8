//! Error types for the cycling protocol compiler.
//!
//! This module provides a unified error type [`CyclerError`] that covers
//! all error conditions that can occur while reading raw instructions,
//! parsing instruction strings, and preparing drive cycles.
//!
//! Every variant falls into one of the broad categories returned by
//! [`CyclerError::kind`], so callers can tell a badly typed input apart
//! from a badly worded one without matching on message text.

use thiserror::Error;

/// Result type alias using [`CyclerError`].
pub type Result<T> = std::result::Result<T, CyclerError>;

/// Broad classification of a [`CyclerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An input had the wrong shape (not a string, not a mapping, ...)
    Type,
    /// An input had the right shape but invalid content
    Value,
    /// Reading an input from disk failed
    Io,
}

/// Unified error type for all protocol compilation operations.
#[derive(Error, Debug)]
pub enum CyclerError {
    // ============ Input Shape Errors ============
    /// A top-level entry is neither a string nor a tuple of strings
    #[error("Operating conditions should be strings or tuples of strings, not {found}")]
    InvalidInstructionType { found: String },

    /// The experimental parameters are not a key/value mapping
    #[error("experimental parameters should be a dictionary, not {found}")]
    InvalidParameters { found: String },

    // ============ Instruction Errors ============
    /// Neither a fixed duration nor a termination condition was given
    #[error(
        "Operating conditions must contain keyword 'for' or 'until'. \
         For example: 'Discharge at 1C for 1 hour', got '{instruction}'"
    )]
    MissingTermination { instruction: String },

    /// The leading verb is not part of the instruction vocabulary
    #[error(
        "Instruction must be 'Discharge', 'Charge', 'Rest', 'Hold' or 'Run', \
         got '{instruction}'"
    )]
    UnknownInstruction { instruction: String },

    /// Unrecognized electrical unit
    #[error("units must be 'C', 'A', 'mA', 'V', 'mV', 'W' or 'mW', not '{unit}'")]
    UnknownUnit { unit: String },

    /// Unrecognized unit in a termination condition
    #[error("termination units must be 'C', 'A', 'mA', 'V' or 'mV', not '{unit}'")]
    UnknownEventUnit { unit: String },

    /// Unrecognized time unit
    #[error("time units must be 'seconds', 'minutes' or 'hours', not '{unit}'")]
    UnknownTimeUnit { unit: String },

    /// Any other malformed instruction
    #[error("Invalid instruction '{instruction}': {message}")]
    InvalidInstruction { instruction: String, message: String },

    // ============ Drive Cycle Errors ============
    /// A `Run` step references a drive cycle that was not supplied
    #[error("drive cycle '{name}' not found (available: {available})")]
    UnknownDriveCycle { name: String, available: String },

    /// The drive cycle data cannot be used as a profile
    #[error("Invalid drive cycle: {message}")]
    InvalidDriveCycle { message: String },

    /// Malformed drive cycle CSV data
    #[error("Invalid drive cycle CSV: {0}")]
    Csv(#[from] csv::Error),

    // ============ Protocol File Errors ============
    /// Malformed protocol file line
    #[error("Protocol error at line {line}: {message}")]
    ProtocolError { line: usize, message: String },

    /// Malformed JSON input
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    // ============ I/O Errors ============
    /// Error reading a protocol or drive cycle file
    #[error("Failed to read '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ WASM Errors ============
    /// WASM-specific error
    #[cfg(feature = "wasm")]
    #[error("WASM error: {message}")]
    WasmError { message: String },
}

impl CyclerError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInstructionType { .. } | Self::InvalidParameters { .. } => ErrorKind::Type,
            Self::FileReadError { .. } => ErrorKind::Io,
            _ => ErrorKind::Value,
        }
    }

    /// Create an invalid instruction error
    pub fn invalid_instruction(instruction: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInstruction {
            instruction: instruction.into(),
            message: message.into(),
        }
    }

    /// Create an unknown instruction error
    pub fn unknown_instruction(instruction: impl Into<String>) -> Self {
        Self::UnknownInstruction {
            instruction: instruction.into(),
        }
    }

    /// Create an invalid drive cycle error
    pub fn invalid_drive_cycle(message: impl Into<String>) -> Self {
        Self::InvalidDriveCycle {
            message: message.into(),
        }
    }

    /// Create a protocol file error
    pub fn protocol(line: usize, message: impl Into<String>) -> Self {
        Self::ProtocolError {
            line,
            message: message.into(),
        }
    }
}
