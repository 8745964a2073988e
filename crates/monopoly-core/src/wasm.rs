//! WebAssembly bindings for local play.
//!
//! The browser holds the only copy of the state, so every action is applied
//! directly; seat checks are up to the page.

use crate::actions::GameAction;
use crate::game::GameState;
use crate::player::PlayerSeat;
use crate::rng::StdGameRng;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[wasm_bindgen]
pub struct WasmGame {
    state: GameState,
    rng: StdGameRng,
}

#[wasm_bindgen]
impl WasmGame {
    /// Seat a roster (JSON array of `{name, color?, isAi?}`) and start the game
    #[wasm_bindgen(constructor)]
    pub fn new(roster_json: &str) -> Result<WasmGame, JsValue> {
        let seats: Vec<PlayerSeat> = serde_json::from_str(roster_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid roster: {}", e)))?;

        let mut rng = StdGameRng::from_entropy();
        let state = GameState::new_game(seats, &mut rng)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmGame { state, rng })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Snapshot version, for discarding stale renders
    pub fn version(&self) -> f64 {
        self.state.version as f64
    }

    /// Actions the current seat may take, as a JSON array
    #[wasm_bindgen(js_name = legalActions)]
    pub fn legal_actions(&self) -> String {
        serde_json::to_string(&self.state.legal_actions()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON and return the new state JSON.
    ///
    /// Refused actions are not errors here: the reason is already in the
    /// state (log, toast or `uiError`). Only malformed JSON throws.
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        let _ = self.state.apply(&action, &mut self.rng);
        Ok(self.get_state())
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Id of the winner, if the game is finished
    pub fn winner(&self) -> Option<u8> {
        self.state.winner().map(|p| p.id)
    }
}
