//! WASM bindings for Cycler Core.
//!
//! This module provides JavaScript-friendly bindings for compiling protocols
//! in the browser, e.g. for a live protocol editor.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmExperiment } from 'cycler_core';
//!
//! await init();
//!
//! const protocol = `
//!   .period 20 seconds
//!   Discharge at 1C until 2.5 V, Rest for 1 hour
//!   Charge at C/3 until 4.2 V, Hold at 4.2 V until C/50
//! `;
//!
//! const experiment = new WasmExperiment(protocol);
//! console.log(experiment.step_count, experiment.durations());
//! ```
//!
//! File-backed `.drive_cycle` directives have no meaning in the browser and
//! are rejected.

use wasm_bindgen::prelude::*;

use crate::error::CyclerError;
use crate::experiment::Experiment;
use crate::protocol;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(error: CyclerError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// WASM-compatible compiled experiment.
///
/// Numeric columns are returned as flat arrays aligned by step index. Open
/// durations and drive-cycle magnitudes are reported as `NaN`.
#[wasm_bindgen]
pub struct WasmExperiment {
    experiment: Experiment,
}

#[wasm_bindgen]
impl WasmExperiment {
    /// Compile protocol text.
    ///
    /// # Arguments
    /// * `protocol_text` - The protocol, one instruction or cycle per line
    /// * `period` - Optional global period overriding `.period`
    #[wasm_bindgen(constructor)]
    pub fn new(protocol_text: &str, period: Option<String>) -> Result<WasmExperiment, JsValue> {
        let protocol = protocol::parse_protocol(protocol_text).map_err(to_js)?;

        if let Some((name, _)) = protocol.drive_cycle_paths.first() {
            return Err(to_js(CyclerError::WasmError {
                message: format!("drive cycle '{}' cannot be loaded from a file here", name),
            }));
        }

        let mut config = protocol.config(Default::default());
        if let Some(period) = period {
            config = config.with_period(period);
        }
        let experiment = Experiment::with_config(protocol.instructions, config).map_err(to_js)?;

        Ok(WasmExperiment { experiment })
    }

    /// Number of compiled steps.
    #[wasm_bindgen(getter)]
    pub fn step_count(&self) -> usize {
        self.experiment.steps().len()
    }

    /// Global period in seconds.
    #[wasm_bindgen(getter)]
    pub fn period(&self) -> f64 {
        self.experiment.period()
    }

    #[wasm_bindgen]
    pub fn magnitudes(&self) -> Vec<f64> {
        self.experiment
            .steps()
            .iter()
            .map(|s| s.magnitude().value().unwrap_or(f64::NAN))
            .collect()
    }

    /// Unit symbol of each step.
    #[wasm_bindgen]
    pub fn units(&self) -> Vec<String> {
        self.experiment
            .steps()
            .iter()
            .map(|s| s.unit().symbol().to_string())
            .collect()
    }

    #[wasm_bindgen]
    pub fn durations(&self) -> Vec<f64> {
        self.experiment
            .steps()
            .iter()
            .map(|s| s.duration().unwrap_or(f64::NAN))
            .collect()
    }

    #[wasm_bindgen]
    pub fn periods(&self) -> Vec<f64> {
        self.experiment.steps().iter().map(|s| s.period()).collect()
    }

    /// Steps per cycle.
    #[wasm_bindgen]
    pub fn cycle_lengths(&self) -> Vec<u32> {
        self.experiment
            .cycle_lengths()
            .iter()
            .map(|&n| n as u32)
            .collect()
    }

    /// The whole experiment as JSON.
    #[wasm_bindgen]
    pub fn to_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.experiment).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// The instruction list as written.
    #[wasm_bindgen(js_name = toString)]
    pub fn to_display_string(&self) -> String {
        self.experiment.to_string()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Get the default checkpoint period in seconds.
#[wasm_bindgen]
pub fn default_period() -> f64 {
    crate::DEFAULT_PERIOD
}
