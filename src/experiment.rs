//! Experiment: a compiled cycling protocol.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::cycle::{flatten_cycles, instructions_from_json, json_type_name, InstructionList, RawInstruction};
use crate::drive_cycle::{DriveCycleTable, DriveCycles};
use crate::error::{CyclerError, Result};
use crate::instruction;
use crate::step::{Event, Step};
use crate::DEFAULT_PERIOD;

/// Opaque experimental parameters, passed through untouched.
pub type Parameters = Map<String, Value>;

/// Check that an untyped value is a key/value mapping and take it as parameters.
pub fn parameters_from_json(value: Value) -> Result<Parameters> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CyclerError::InvalidParameters {
            found: json_type_name(&other).to_string(),
        }),
    }
}

/// Configuration for building an experiment.
#[derive(Debug, Clone, Default)]
pub struct ExperimentConfig {
    /// Global checkpoint period, e.g. `"20 seconds"`. Defaults to one minute.
    pub period: Option<String>,
    /// Drive cycles that `Run` steps may reference.
    pub drive_cycles: DriveCycles,
    /// Experimental parameters.
    pub parameters: Parameters,
}

impl ExperimentConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global checkpoint period.
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = Some(period.into());
        self
    }

    /// Make a drive cycle available under `name`.
    pub fn with_drive_cycle(mut self, name: impl Into<String>, table: DriveCycleTable) -> Self {
        self.drive_cycles.insert(name.into(), table);
        self
    }

    /// Replace the available drive cycles.
    pub fn with_drive_cycles(mut self, drive_cycles: DriveCycles) -> Self {
        self.drive_cycles = drive_cycles;
        self
    }

    /// Replace the experimental parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set a single experimental parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A cycling protocol compiled into operating steps.
///
/// All instructions are parsed when the experiment is built; a single bad
/// instruction fails the whole construction. The compiled lists are
/// positionally aligned: `events()[i]` belongs to `steps()[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    instructions: Vec<RawInstruction>,
    steps: Vec<Step>,
    events: Vec<Option<Event>>,
    cycle_lengths: Vec<usize>,
    parameters: Parameters,
    period: f64,
}

impl Experiment {
    /// Compile `instructions` with the default configuration.
    pub fn new<I, R>(instructions: I) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<RawInstruction>,
    {
        Self::with_config(instructions, ExperimentConfig::default())
    }

    /// Compile `instructions` with a custom configuration.
    pub fn with_config<I, R>(instructions: I, config: ExperimentConfig) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<RawInstruction>,
    {
        let instructions: Vec<RawInstruction> = instructions.into_iter().map(Into::into).collect();
        let period = match &config.period {
            Some(period) => instruction::parse_time_span(period)?,
            None => DEFAULT_PERIOD,
        };

        let (flat, cycle_lengths) = flatten_cycles(&instructions);
        let steps = flat
            .iter()
            .map(|text| instruction::compile(text, period, &config.drive_cycles))
            .collect::<Result<Vec<_>>>()?;
        let events = steps.iter().map(Step::event).collect();

        debug!(
            steps = steps.len(),
            cycles = cycle_lengths.len(),
            period,
            "built experiment"
        );

        Ok(Self {
            instructions,
            steps,
            events,
            cycle_lengths,
            parameters: config.parameters,
            period,
        })
    }

    /// Compile an untyped JSON instruction list.
    ///
    /// Entries that are neither strings nor arrays of strings are rejected
    /// before any instruction is parsed.
    pub fn from_json(instructions: &Value, config: ExperimentConfig) -> Result<Self> {
        let instructions = instructions_from_json(instructions)?;
        Self::with_config(instructions, config)
    }

    /// Compiled steps, in execution order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Terminating event of each step, aligned with [`steps`](Self::steps).
    pub fn events(&self) -> &[Option<Event>] {
        &self.events
    }

    /// Number of steps contributed by each raw entry.
    pub fn cycle_lengths(&self) -> &[usize] {
        &self.cycle_lengths
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Global checkpoint period in seconds.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// The raw instructions this experiment was built from.
    pub fn instructions(&self) -> &[RawInstruction] {
        &self.instructions
    }

    /// Iterate over the compiled steps of each cycle.
    pub fn cycles(&self) -> impl Iterator<Item = &[Step]> {
        let mut start = 0;
        self.cycle_lengths.iter().map(move |&len| {
            let cycle = &self.steps[start..start + len];
            start += len;
            cycle
        })
    }

    /// Constructor-like rendering for logs, e.g. `Experiment(['Rest for 1 hour'])`.
    pub fn repr(&self) -> String {
        format!("Experiment({})", self)
    }
}

/// Renders the raw instruction list as written.
impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", InstructionList(&self.instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::step::Magnitude;
    use crate::units::Unit;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn tuple(step: &Step) -> (f64, Unit, Option<f64>, f64) {
        (
            step.magnitude().value().unwrap(),
            step.unit(),
            step.duration(),
            step.period(),
        )
    }

    fn drive_cycle() -> DriveCycleTable {
        let time: Vec<f64> = (0..=600).map(f64::from).collect();
        let value: Vec<f64> = time.iter().map(|t| (t / 60.0).sin()).collect();
        DriveCycleTable::new(time, value).unwrap()
    }

    #[test]
    fn test_read_strings() {
        let us06 = drive_cycle();
        let config = ExperimentConfig::new()
            .with_parameter("test", "test")
            .with_drive_cycle("US06", us06.clone())
            .with_period("20 seconds");
        let experiment = Experiment::with_config(
            [
                "Discharge at 1C for 0.5 hours",
                "Discharge at C/20 for 0.5 hours",
                "Charge at 0.5 C for 45 minutes",
                "Discharge at 1 A for 0.5 hours",
                "Charge at 200 mA for 45 minutes (1 minute period)",
                "Discharge at 1W for 0.5 hours",
                "Charge at 200 mW for 45 minutes",
                "Rest for 10 minutes (5 minute period)",
                "Hold at 1V for 20 seconds",
                "Charge at 1 C until 4.1V",
                "Hold at 4.1 V until 50mA",
                "Hold at 3V until C/50",
                "Discharge at C/3 for 2 hours or until 2.5 V",
                "Run US06",
                "Run US06 for 5 minutes",
                "Run US06 for 0.5 hours",
            ],
            config,
        )
        .unwrap();

        let expected = [
            (1.0, Unit::CRate, Some(1800.0), 20.0),
            (0.05, Unit::CRate, Some(1800.0), 20.0),
            (-0.5, Unit::CRate, Some(2700.0), 20.0),
            (1.0, Unit::Current, Some(1800.0), 20.0),
            (-0.2, Unit::Current, Some(2700.0), 60.0),
            (1.0, Unit::Power, Some(1800.0), 20.0),
            (-0.2, Unit::Power, Some(2700.0), 20.0),
            (0.0, Unit::Current, Some(600.0), 300.0),
            (1.0, Unit::Voltage, Some(20.0), 20.0),
            (-1.0, Unit::CRate, None, 20.0),
            (4.1, Unit::Voltage, None, 20.0),
            (3.0, Unit::Voltage, None, 20.0),
            (1.0 / 3.0, Unit::CRate, Some(7200.0), 20.0),
        ];
        for (step, want) in experiment.steps().iter().zip(expected.iter()) {
            let got = tuple(step);
            assert_relative_eq!(got.0, want.0);
            assert_eq!((got.1, got.2, got.3), (want.1, want.2, want.3));
        }

        // Drive cycles: native, shorter than native, and extended
        let drive = &experiment.steps()[13..];
        let extended = us06.extend(1800.0).unwrap();
        assert_eq!(drive[0].magnitude(), &Magnitude::Profile(us06.clone()));
        assert_eq!(drive[0].duration(), Some(600.0));
        assert_eq!(drive[1].magnitude(), &Magnitude::Profile(us06.clone()));
        assert_eq!(drive[1].duration(), Some(300.0));
        assert_eq!(drive[2].magnitude(), &Magnitude::Profile(extended.clone()));
        assert_eq!(drive[2].duration(), Some(1800.0));
        assert!(extended.last_time() >= 1800.0);
        for step in drive {
            assert_eq!(step.unit(), Unit::Drive);
            assert_eq!(step.period(), 1.0);
        }

        let events: Vec<Option<(f64, Unit)>> = experiment
            .events()
            .iter()
            .map(|e| e.map(|e| (e.value, e.unit)))
            .collect();
        let mut expected_events = vec![None; 16];
        expected_events[9] = Some((4.1, Unit::Voltage));
        expected_events[10] = Some((0.05, Unit::Current));
        expected_events[11] = Some((0.02, Unit::CRate));
        expected_events[12] = Some((2.5, Unit::Voltage));
        assert_eq!(events, expected_events);

        assert_eq!(experiment.parameters(), json!({"test": "test"}).as_object().unwrap());
        assert_eq!(experiment.period(), 20.0);
    }

    #[test]
    fn test_default_period() {
        let experiment = Experiment::new(["Discharge at 1C for 0.5 hours"]).unwrap();
        assert_eq!(tuple(&experiment.steps()[0]), (1.0, Unit::CRate, Some(1800.0), 60.0));
        assert_eq!(experiment.events(), &[None]);
        assert_eq!(experiment.period(), DEFAULT_PERIOD);
    }

    #[test]
    fn test_read_strings_repeat() {
        let mut instructions = vec!["Discharge at 10 mA for 0.5 hours"];
        for _ in 0..2 {
            instructions.extend(["Charge at 0.5 C for 45 minutes", "Hold at 1 V for 20 seconds"]);
        }
        let experiment = Experiment::new(instructions).unwrap();
        let tuples: Vec<_> = experiment.steps().iter().map(tuple).collect();
        assert_eq!(
            tuples,
            vec![
                (0.01, Unit::Current, Some(1800.0), 60.0),
                (-0.5, Unit::CRate, Some(2700.0), 60.0),
                (1.0, Unit::Voltage, Some(20.0), 60.0),
                (-0.5, Unit::CRate, Some(2700.0), 60.0),
                (1.0, Unit::Voltage, Some(20.0), 60.0),
            ]
        );
    }

    #[test]
    fn test_cycle_unpacking() {
        let experiment = Experiment::new([
            RawInstruction::from(["Discharge at C/20 for 0.5 hours", "Charge at C/5 for 45 minutes"]),
            RawInstruction::from("Discharge at C/20 for 0.5 hours"),
            RawInstruction::from("Charge at C/5 for 45 minutes"),
        ])
        .unwrap();
        let tuples: Vec<_> = experiment.steps().iter().map(tuple).collect();
        assert_eq!(
            tuples,
            vec![
                (0.05, Unit::CRate, Some(1800.0), 60.0),
                (-0.2, Unit::CRate, Some(2700.0), 60.0),
                (0.05, Unit::CRate, Some(1800.0), 60.0),
                (-0.2, Unit::CRate, Some(2700.0), 60.0),
            ]
        );
        assert_eq!(experiment.cycle_lengths(), &[2, 1, 1]);

        let cycles: Vec<usize> = experiment.cycles().map(<[Step]>::len).collect();
        assert_eq!(cycles, vec![2, 1, 1]);
    }

    #[test]
    fn test_str_repr() {
        let experiment = Experiment::new([
            "Discharge at 1 C for 20 seconds",
            "Charge at 0.5 W for 10 minutes",
        ])
        .unwrap();
        assert_eq!(
            experiment.to_string(),
            "['Discharge at 1 C for 20 seconds', 'Charge at 0.5 W for 10 minutes']"
        );
        assert_eq!(
            experiment.repr(),
            "Experiment(['Discharge at 1 C for 20 seconds', 'Charge at 0.5 W for 10 minutes'])"
        );
    }

    #[test]
    fn test_bad_strings() {
        let cases = [
            ("Discharge at 1 A at 2 hours", "Operating conditions must contain"),
            ("Run at 1 A for 2 hours", "Instruction must be"),
            ("Run at at 1 A for 2 hours", "Instruction must be"),
            ("Discharge at 1 B for 2 hours", "units must be"),
            ("Discharge at 1 A for 2 years", "time units must be"),
        ];
        for (input, message) in cases {
            let err = Experiment::new([input]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Value);
            assert!(err.to_string().contains(message), "{}: {}", input, err);
        }
    }

    #[test]
    fn test_bad_types() {
        for value in [json!([1, 2, 3]), json!([[1, 2, 3]])] {
            let err = Experiment::from_json(&value, ExperimentConfig::new()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Type);
            assert!(err
                .to_string()
                .contains("Operating conditions should be strings or tuples of strings"));
        }

        let err = parameters_from_json(json!("not a dictionary")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err
            .to_string()
            .contains("experimental parameters should be a dictionary"));
    }

    #[test]
    fn test_from_json() {
        let value = json!([["Discharge at 1C for 1 hour", "Rest for 1 hour"], "Hold at 4.2 V until C/20"]);
        let parameters = parameters_from_json(json!({"cell": "LG M50"})).unwrap();
        let experiment =
            Experiment::from_json(&value, ExperimentConfig::new().with_parameters(parameters)).unwrap();
        assert_eq!(experiment.cycle_lengths(), &[2, 1]);
        assert_eq!(experiment.parameters()["cell"], json!("LG M50"));
        assert_eq!(
            experiment.to_string(),
            "[('Discharge at 1C for 1 hour', 'Rest for 1 hour'), 'Hold at 4.2 V until C/20']"
        );
    }

    #[test]
    fn test_one_bad_instruction_fails_everything() {
        let err = Experiment::new([
            RawInstruction::from("Discharge at 1C for 1 hour"),
            RawInstruction::from(["Rest for 1 hour", "Run US06"]),
        ])
        .unwrap_err();
        assert!(matches!(err, CyclerError::UnknownDriveCycle { .. }));
    }

    #[test]
    fn test_oversized_inputs_are_errors() {
        let table = DriveCycleTable::from_rows(&[[0.0, 1.0], [1.0, 2.0]]).unwrap();
        let config = ExperimentConfig::new().with_drive_cycle("X", table);
        let err = Experiment::with_config(["Run X for 1e15 hours"], config).unwrap_err();
        assert!(matches!(err, CyclerError::InvalidDriveCycle { .. }));

        let err = Experiment::new(["Discharge at 1 A for 1e308 hours"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_bad_global_period() {
        let config = ExperimentConfig::new().with_period("20 fortnights");
        let err = Experiment::with_config(["Rest for 1 hour"], config).unwrap_err();
        assert!(err.to_string().contains("time units must be"));
    }

    #[test]
    fn test_serialize() {
        let experiment = Experiment::new(["Hold at 4.1 V until 50mA"]).unwrap();
        let value = serde_json::to_value(&experiment).unwrap();
        assert_eq!(value["period"], json!(60.0));
        assert_eq!(value["steps"][0]["unit"], json!("V"));
        assert_eq!(value["steps"][0]["termination"]["kind"], json!("event"));
        assert_eq!(value["events"][0]["unit"], json!("A"));
        assert_eq!(value["instructions"][0], json!("Hold at 4.1 V until 50mA"));
    }
}
