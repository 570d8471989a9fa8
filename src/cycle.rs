//! Raw instruction lists and cycle grouping.
//!
//! A protocol is written as a list whose entries are either single
//! instruction strings or tuples of strings. A tuple groups its steps into
//! one cycle for reporting; it has no effect on the compiled steps.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::{CyclerError, Result};

/// One entry of a raw protocol: a lone instruction or a grouped cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawInstruction {
    Single(String),
    Cycle(Vec<String>),
}

impl RawInstruction {
    /// Number of steps this entry contributes.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Cycle(steps) => steps.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The instruction strings of this entry, in order.
    pub fn instructions(&self) -> impl Iterator<Item = &str> {
        let steps: &[String] = match self {
            Self::Single(step) => std::slice::from_ref(step),
            Self::Cycle(steps) => steps,
        };
        steps.iter().map(String::as_str)
    }

    /// Classify an untyped JSON entry.
    ///
    /// Strings become single instructions and arrays of strings become
    /// cycles. Anything else is rejected before any parsing happens.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(Self::Single(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(CyclerError::InvalidInstructionType {
                        found: json_type_name(other).to_string(),
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Cycle),
            other => Err(CyclerError::InvalidInstructionType {
                found: json_type_name(other).to_string(),
            }),
        }
    }
}

impl From<&str> for RawInstruction {
    fn from(step: &str) -> Self {
        Self::Single(step.to_string())
    }
}

impl From<String> for RawInstruction {
    fn from(step: String) -> Self {
        Self::Single(step)
    }
}

impl From<Vec<String>> for RawInstruction {
    fn from(steps: Vec<String>) -> Self {
        Self::Cycle(steps)
    }
}

impl From<Vec<&str>> for RawInstruction {
    fn from(steps: Vec<&str>) -> Self {
        Self::Cycle(steps.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RawInstruction {
    fn from(steps: [&str; N]) -> Self {
        Self::Cycle(steps.iter().map(|s| s.to_string()).collect())
    }
}

/// Classify every entry of an untyped JSON array.
pub fn instructions_from_json(value: &Value) -> Result<Vec<RawInstruction>> {
    match value {
        Value::Array(entries) => entries.iter().map(RawInstruction::from_json).collect(),
        other => Err(CyclerError::InvalidInstructionType {
            found: json_type_name(other).to_string(),
        }),
    }
}

/// Flatten grouped cycles into the linear instruction sequence.
///
/// Returns the instructions in order together with one length per entry.
/// The lengths always sum to the number of instructions.
pub fn flatten_cycles(entries: &[RawInstruction]) -> (Vec<&str>, Vec<usize>) {
    let mut steps = Vec::with_capacity(entries.iter().map(RawInstruction::len).sum());
    let mut lengths = Vec::with_capacity(entries.len());
    for entry in entries {
        steps.extend(entry.instructions());
        lengths.push(entry.len());
    }
    (steps, lengths)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Displays a raw instruction list the way it was written, e.g.
/// `['Rest for 1 hour', ('Charge at 1C for 1 hour', 'Hold at 4.2V until C/50')]`.
pub struct InstructionList<'a>(pub &'a [RawInstruction]);

impl fmt::Display for InstructionList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", entry)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for RawInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(step) => write_quoted(f, step),
            Self::Cycle(steps) => {
                f.write_str("(")?;
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, step)?;
                }
                // A one-element tuple keeps its trailing comma
                if steps.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Quote a string with single quotes, or double quotes when it contains a
/// single quote and no double quote.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{}", quote)?;
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "{}", quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_flatten_cycles() {
        let entries = vec![
            RawInstruction::from([
                "Discharge at C/20 for 0.5 hours",
                "Charge at C/5 for 45 minutes",
            ]),
            RawInstruction::from("Discharge at C/20 for 0.5 hours"),
        ];
        let (steps, lengths) = flatten_cycles(&entries);
        assert_eq!(lengths, vec![2, 1]);
        assert_eq!(
            steps,
            vec![
                "Discharge at C/20 for 0.5 hours",
                "Charge at C/5 for 45 minutes",
                "Discharge at C/20 for 0.5 hours",
            ]
        );
    }

    #[test]
    fn test_from_json() {
        let value = json!(["Rest for 1 hour", ["Charge at 1C for 1 hour", "Rest for 1 hour"]]);
        let entries = instructions_from_json(&value).unwrap();
        assert_eq!(entries[0], RawInstruction::from("Rest for 1 hour"));
        assert_eq!(entries[1].len(), 2);
    }

    #[test]
    fn test_from_json_rejects_other_types() {
        for value in [json!([1, 2, 3]), json!([[1, 2, 3]]), json!([null]), json!("Rest for 1 hour")] {
            let err = instructions_from_json(&value).unwrap_err();
            assert!(err
                .to_string()
                .contains("Operating conditions should be strings or tuples of strings"));
        }
    }

    #[test]
    fn test_display_matches_list_literal() {
        let entries = vec![
            RawInstruction::from("Discharge at 1 C for 20 seconds"),
            RawInstruction::from(vec!["Charge at 0.5 W for 10 minutes"]),
            RawInstruction::from(["a", "b"]),
        ];
        assert_eq!(
            InstructionList(&entries).to_string(),
            "['Discharge at 1 C for 20 seconds', ('Charge at 0.5 W for 10 minutes',), ('a', 'b')]"
        );
        assert_eq!(InstructionList(&[]).to_string(), "[]");
    }

    #[test]
    fn test_display_quoting() {
        assert_eq!(RawInstruction::from("it's").to_string(), "\"it's\"");
        assert_eq!(RawInstruction::from("a\\b").to_string(), "'a\\\\b'");
        assert_eq!(RawInstruction::from("'\"").to_string(), "'\\'\"'");
    }

    proptest! {
        #[test]
        fn prop_cycle_lengths_sum_to_step_count(
            shape in prop::collection::vec(prop::option::of(0usize..5), 0..12)
        ) {
            let entries: Vec<RawInstruction> = shape
                .iter()
                .map(|entry| match entry {
                    None => RawInstruction::from("Rest for 1 minute"),
                    Some(n) => RawInstruction::Cycle(vec!["Rest for 1 minute".to_string(); *n]),
                })
                .collect();
            let (steps, lengths) = flatten_cycles(&entries);
            prop_assert_eq!(lengths.len(), entries.len());
            prop_assert_eq!(lengths.iter().sum::<usize>(), steps.len());
        }
    }
}
