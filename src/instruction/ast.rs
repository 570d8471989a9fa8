//! Syntax tree for a single parsed instruction.

use crate::step::Termination;
use crate::units::Unit;

/// Leading verb of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Discharge,
    Charge,
    Hold,
    Rest,
    Run,
}

impl Verb {
    /// Parse a verb, ignoring case.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "discharge" => Some(Self::Discharge),
            "charge" => Some(Self::Charge),
            "hold" => Some(Self::Hold),
            "rest" => Some(Self::Rest),
            "run" => Some(Self::Run),
            _ => None,
        }
    }

    /// Apply the verb's sign policy to a magnitude as written.
    ///
    /// Discharge is positive and charge negative whatever sign was typed;
    /// every other verb keeps the literal value.
    pub fn signed(&self, value: f64) -> f64 {
        match self {
            Self::Discharge => value.abs(),
            // `0.0 - x` rather than `-x` keeps a zero charge at +0.0
            Self::Charge => 0.0 - value.abs(),
            Self::Hold | Self::Rest | Self::Run => value,
        }
    }
}

/// A value with its canonical unit, milli-prefixes already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

/// What an instruction asks the cell to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Discharge, charge or hold at a constant quantity
    Constant {
        verb: Verb,
        quantity: Quantity,
        termination: Termination,
    },
    /// Zero current for a fixed time
    Rest { seconds: f64 },
    /// Replay a named drive cycle, optionally for at least `seconds`
    Drive { name: String, seconds: Option<f64> },
}

/// A fully parsed instruction, before drive cycles are resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    pub operation: Operation,
    /// Checkpoint period override in seconds
    pub period: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_from_word() {
        assert_eq!(Verb::from_word("DISCHARGE"), Some(Verb::Discharge));
        assert_eq!(Verb::from_word("rest"), Some(Verb::Rest));
        assert_eq!(Verb::from_word("Dance"), None);
    }

    #[test]
    fn test_sign_policy() {
        assert_eq!(Verb::Discharge.signed(-2.0), 2.0);
        assert_eq!(Verb::Charge.signed(2.0), -2.0);
        assert_eq!(Verb::Charge.signed(-2.0), -2.0);
        assert!(Verb::Charge.signed(0.0).is_sign_positive());
        assert_eq!(Verb::Hold.signed(-3.0), -3.0);
    }
}
