//! WebAssembly bindings for the match engine.
//!
//! This module exposes the engine to JavaScript through wasm-bindgen so a
//! single browser tab can run conductor and board without a server.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::HostAction;
#[cfg(feature = "wasm")]
use crate::game::MatchEngine;
#[cfg(feature = "wasm")]
use crate::questions::{Deck, QuestionBank};
#[cfg(feature = "wasm")]
use crate::round::RawRound;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed match wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmMatch {
    engine: MatchEngine<Deck<RawRound>>,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmMatch {
    /// Create a match from a JSON question bank, or the built-in bank when empty
    #[wasm_bindgen(constructor)]
    pub fn new(bank_json: &str) -> Result<WasmMatch, JsValue> {
        let bank = if bank_json.trim().is_empty() {
            QuestionBank::builtin()
        } else {
            QuestionBank::from_json_str(bank_json)
                .map_err(|e| JsValue::from_str(&format!("Invalid question bank: {}", e)))?
        };

        Ok(WasmMatch {
            engine: MatchEngine::new(bank.into_deck()),
        })
    }

    /// Get the current board snapshot as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(self.engine.state()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the actions the host can currently take as a JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        serde_json::to_string(&self.engine.valid_actions()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply a host action from JSON, returns events JSON or the rejection
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let value: serde_json::Value = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;
        let action = HostAction::from_value(value)
            .map_err(|e| JsValue::from_str(&format!("Invalid action: {}", e)))?;

        match self.engine.apply(action) {
            Ok(events) => Ok(serde_json::to_string(&events).unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action rejected: {}", e))),
        }
    }

    /// Check if the match is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.engine.state().is_finished()
    }

    /// Get the current phase as a string
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        serde_json::to_string(&self.engine.state().phase)
            .unwrap_or_else(|_| "\"UNKNOWN\"".to_string())
    }
}
