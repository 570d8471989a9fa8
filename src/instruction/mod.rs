//! Parser for human-readable cycling instructions.
//!
//! Each instruction is one line of a constrained English-like language and
//! compiles to exactly one [`Step`].
//!
//! # Grammar Overview
//!
//! ```text
//! instr    = verb_at | rest | run
//! verb_at  = ("Discharge" | "Charge" | "Hold") "at" quantity term [override]
//! rest     = "Rest" "for" duration [override]
//! run      = "Run" name ["for" duration] [override]
//! term     = "for" duration ["or" "until" quantity] | "until" quantity
//! quantity = number unit | "C" "/" number
//! duration = number time_unit
//! override = "(" number time_unit "period" ")"
//!
//! unit      = "C" | "A" | "mA" | "W" | "mW" | "V" | "mV"
//! time_unit = "second[s]" | "minute[s]" | "hour[s]" | "s" | "sec" | "m" | "min" | "h" | "hr"
//! ```
//!
//! Verbs and keywords are case-insensitive. A number may be glued to its
//! unit (`1C`, `50mA`).
//!
//! # Sign Convention
//!
//! | Verb | Magnitude |
//! |------|-----------|
//! | Discharge | always positive |
//! | Charge | always negative |
//! | Hold | as written |
//! | Rest | 0 A |
//! | Run | the drive cycle's recorded values |
//!
//! # Example
//!
//! ```text
//! Discharge at 1C for 0.5 hours
//! Charge at 200 mA for 45 minutes (1 minute period)
//! Hold at 4.1 V until 50mA
//! Discharge at C/3 for 2 hours or until 2.5 V
//! Run US06 for 30 minutes
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use tracing::debug;

use crate::drive_cycle::DriveCycles;
use crate::error::{CyclerError, Result};
use crate::step::{Step, Termination};
use crate::units::Unit;

/// Parse an instruction string into its syntax tree.
pub fn parse(input: &str) -> Result<ParsedInstruction> {
    let mut parser = Parser::new(input)?;
    parser.parse()
}

/// Parse a time span such as `"20 seconds"` into seconds.
pub fn parse_time_span(input: &str) -> Result<f64> {
    let mut parser = Parser::new(input)?;
    parser.parse_time_span()
}

/// Compile an instruction string into a [`Step`].
///
/// `default_period` applies unless the instruction overrides it. `Run` steps
/// look their profile up in `drive_cycles` and default to the profile's own
/// minimum sampling period. `Run <name> for D` lasts exactly `D`, extending
/// the profile by whole copies when it is shorter.
pub fn compile(input: &str, default_period: f64, drive_cycles: &DriveCycles) -> Result<Step> {
    let parsed = parse(input)?;
    let period = parsed.period.unwrap_or(default_period);

    let step = match parsed.operation {
        Operation::Constant {
            quantity,
            termination,
            ..
        } => Step::constant(quantity.value, quantity.unit, termination, period),
        Operation::Rest { seconds } => Step::constant(
            0.0,
            Unit::Current,
            Termination::Duration { seconds },
            period,
        ),
        Operation::Drive { name, seconds } => {
            let table = drive_cycles.get(&name).ok_or_else(|| {
                let mut available: Vec<&str> = drive_cycles.keys().map(String::as_str).collect();
                available.sort_unstable();
                CyclerError::UnknownDriveCycle {
                    name: name.clone(),
                    available: if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    },
                }
            })?;
            let profile = match seconds {
                Some(seconds) => table.extend(table.first_time() + seconds)?,
                None => table.clone(),
            };
            let period = parsed.period.unwrap_or_else(|| profile.min_period());
            Step::drive(profile, seconds, period)
        }
    };

    debug!(instruction = input, step = %step, "compiled instruction");
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive_cycle::DriveCycleTable;
    use crate::step::Event;
    use approx::assert_relative_eq;

    fn drive_cycles() -> DriveCycles {
        let table = DriveCycleTable::from_rows(&[[0.0, 1.0], [1.0, -1.0], [3.0, 0.5], [4.0, 0.0]])
            .unwrap();
        DriveCycles::from([("US06".to_string(), table)])
    }

    #[test]
    fn test_compile_constant() {
        let step = compile("Discharge at 1C for 0.5 hours", 60.0, &DriveCycles::new()).unwrap();
        assert_eq!(step.magnitude().value(), Some(1.0));
        assert_eq!(step.unit(), Unit::CRate);
        assert_eq!(step.duration(), Some(1800.0));
        assert_eq!(step.period(), 60.0);
        assert_eq!(step.event(), None);
    }

    #[test]
    fn test_compile_hold_until() {
        let step = compile("Hold at 4.1 V until 50mA", 60.0, &DriveCycles::new()).unwrap();
        assert_eq!(step.magnitude().value(), Some(4.1));
        assert_eq!(step.unit(), Unit::Voltage);
        assert!(step.is_open());
        assert_eq!(step.event(), Some(Event::new(0.05, Unit::Current)));
    }

    #[test]
    fn test_compile_rest() {
        let step = compile("Rest for 10 minutes (5 minute period)", 20.0, &DriveCycles::new()).unwrap();
        assert_eq!(step.magnitude().value(), Some(0.0));
        assert_eq!(step.unit(), Unit::Current);
        assert_eq!(step.duration(), Some(600.0));
        assert_eq!(step.period(), 300.0);
    }

    #[test]
    fn test_compile_drive_cycle() {
        let cycles = drive_cycles();
        let step = compile("Run US06", 20.0, &cycles).unwrap();
        assert_eq!(step.unit(), Unit::Drive);
        assert_eq!(step.duration(), Some(4.0));
        assert_eq!(step.period(), 1.0);
        let profile = step.magnitude().profile().unwrap();
        assert!(profile.shares_data_with(&cycles["US06"]));
    }

    #[test]
    fn test_compile_extended_drive_cycle() {
        let cycles = drive_cycles();
        let step = compile("Run US06 for 10 seconds", 20.0, &cycles).unwrap();
        let profile = step.magnitude().profile().unwrap();
        assert_eq!(profile.len(), 12);
        assert_eq!(profile.last_time(), 14.0);
        assert_eq!(step.duration(), Some(10.0));
        assert_relative_eq!(step.period(), 1.0);
    }

    #[test]
    fn test_compile_drive_cycle_shorter_than_recording() {
        let cycles = drive_cycles();
        let step = compile("Run US06 for 2 seconds (10 second period)", 20.0, &cycles).unwrap();
        assert_eq!(step.duration(), Some(2.0));
        assert_eq!(step.period(), 10.0);
        let profile = step.magnitude().profile().unwrap();
        assert!(profile.shares_data_with(&cycles["US06"]));
    }

    #[test]
    fn test_compile_unknown_drive_cycle() {
        let err = compile("Run FUDS", 60.0, &drive_cycles()).unwrap_err();
        assert!(matches!(err, CyclerError::UnknownDriveCycle { ref name, .. } if name == "FUDS"));
        assert!(err.to_string().contains("US06"));
    }
}
