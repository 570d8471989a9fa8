//! Protocol files and drive-cycle data.
//!
//! A protocol file lists one instruction per line. Lines are trimmed,
//! everything after `#` is a comment, and blank lines are skipped. A line
//! holding several comma-separated instructions is one grouped cycle.
//!
//! # Directives
//!
//! | Directive | Description | Syntax |
//! |-----------|-------------|--------|
//! | .period | Global checkpoint period | `.period <n> <time unit>` |
//! | .param | Experimental parameter (JSON or plain text) | `.param <key> <value>` |
//! | .drive_cycle | Load a drive cycle from CSV | `.drive_cycle <name> <path>` |
//!
//! # Example
//!
//! ```text
//! # Capacity check followed by a drive cycle
//! .period 20 seconds
//! .param cell "LG M50"
//! .drive_cycle US06 us06.csv
//!
//! Discharge at C/20 for 0.5 hours, Rest for 1 hour
//! Charge at 1C until 4.2V, Hold at 4.2V until C/50
//! Run US06 for 30 minutes
//! ```
//!
//! Drive-cycle CSV files hold two numeric columns, time and value, with no
//! header. Lines starting with `#` are comments.

use std::path::PathBuf;

use csv::{ReaderBuilder, Trim};
use serde_json::Value;

use crate::cycle::RawInstruction;
use crate::drive_cycle::{DriveCycleTable, DriveCycles};
use crate::error::{CyclerError, Result};
use crate::experiment::{Experiment, ExperimentConfig, Parameters};
use crate::instruction::parse_time_span;

/// A parsed protocol file, before drive cycles are loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protocol {
    /// Instructions in file order
    pub instructions: Vec<RawInstruction>,
    /// Global period from `.period`
    pub period: Option<String>,
    /// Parameters from `.param`
    pub parameters: Parameters,
    /// Drive cycle files from `.drive_cycle`, as written
    pub drive_cycle_paths: Vec<(String, PathBuf)>,
}

impl Protocol {
    /// Build the experiment configuration, given the loaded drive cycles.
    pub fn config(&self, drive_cycles: DriveCycles) -> ExperimentConfig {
        let config = ExperimentConfig::new()
            .with_parameters(self.parameters.clone())
            .with_drive_cycles(drive_cycles);
        match &self.period {
            Some(period) => config.with_period(period.clone()),
            None => config,
        }
    }

    /// Compile the protocol into an experiment.
    pub fn compile(&self, drive_cycles: DriveCycles) -> Result<Experiment> {
        Experiment::with_config(self.instructions.clone(), self.config(drive_cycles))
    }
}

/// Parse protocol text.
pub fn parse_protocol(input: &str) -> Result<Protocol> {
    let mut protocol = Protocol::default();

    for (index, raw_line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        }
        .trim();
        if line.is_empty() {
            continue;
        }

        if let Some(directive) = line.strip_prefix('.') {
            parse_directive(&mut protocol, directive, line_no)?;
            continue;
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CyclerError::protocol(line_no, "empty instruction in cycle"));
        }
        let entry = if parts.len() == 1 {
            RawInstruction::from(parts[0])
        } else {
            RawInstruction::from(parts)
        };
        protocol.instructions.push(entry);
    }

    Ok(protocol)
}

fn parse_directive(protocol: &mut Protocol, directive: &str, line: usize) -> Result<()> {
    let (name, rest) = match directive.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (directive, ""),
    };

    match name.to_lowercase().as_str() {
        "period" => {
            parse_time_span(rest)
                .map_err(|e| CyclerError::protocol(line, format!("invalid period: {}", e)))?;
            protocol.period = Some(rest.to_string());
        }
        "param" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| CyclerError::protocol(line, "expected '.param <key> <value>'"))?;
            let value = value.trim();
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
            protocol.parameters.insert(key.to_string(), value);
        }
        "drive_cycle" => {
            let (cycle, path) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| CyclerError::protocol(line, "expected '.drive_cycle <name> <path>'"))?;
            protocol
                .drive_cycle_paths
                .push((cycle.to_string(), PathBuf::from(path.trim())));
        }
        _ => {
            return Err(CyclerError::protocol(
                line,
                format!("unknown directive: .{}", name),
            ));
        }
    }

    Ok(())
}

/// Parse drive-cycle CSV text into a table.
pub fn parse_drive_cycle_csv(input: &str) -> Result<DriveCycleTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut time = Vec::new();
    let mut value = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != 2 {
            let line = record.position().map_or(0, |p| p.line());
            return Err(CyclerError::invalid_drive_cycle(format!(
                "line {}: expected 2 columns, got {}",
                line,
                record.len()
            )));
        }
        let (t, v): (f64, f64) = record.deserialize(None)?;
        time.push(t);
        value.push(v);
    }

    DriveCycleTable::new(time, value)
}

/// Read a drive-cycle CSV file.
#[cfg(feature = "cli")]
pub fn load_drive_cycle(path: &std::path::Path) -> Result<DriveCycleTable> {
    let content = std::fs::read_to_string(path).map_err(|e| CyclerError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_drive_cycle_csv(&content)
}

/// Read a protocol file and every drive cycle it references.
///
/// Relative drive-cycle paths are resolved against the protocol file's
/// directory.
#[cfg(feature = "cli")]
pub fn load_protocol_file(path: &std::path::Path) -> Result<(Protocol, DriveCycles)> {
    let content = std::fs::read_to_string(path).map_err(|e| CyclerError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let protocol = parse_protocol(&content)?;

    let base = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let mut drive_cycles = DriveCycles::new();
    for (name, cycle_path) in &protocol.drive_cycle_paths {
        let table = load_drive_cycle(&base.join(cycle_path))?;
        tracing::debug!(name = %name, samples = table.len(), "loaded drive cycle");
        drive_cycles.insert(name.clone(), table);
    }

    Ok((protocol, drive_cycles))
}
