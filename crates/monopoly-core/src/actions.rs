//! Actions players submit and the notifications transitions produce.
//!
//! The wire form is `{"type": "BUILD_HOUSE", "payload": {"tileId": 3}}`.

use crate::board::TileIndex;
use crate::player::PlayerSeat;
use serde::{Deserialize, Serialize};

/// Identifier of a toast, unique within a game
pub type ToastId = u64;

/// Every action the engine accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameAction {
    // ==================== Setup ====================
    /// Replace the roster (setup/lobby only)
    SetPlayers { players: Vec<PlayerSeat> },
    /// Start play with the current roster (host only)
    StartGame,

    // ==================== Turn Flow ====================
    /// Roll both dice and resolve the move
    RollDice,
    /// Buy the tile just landed on
    BuyTile,
    /// Decline to buy the tile just landed on
    PassBuy,
    /// Hand the turn to the next active seat
    EndTurn,
    /// Pay the rent computed on landing
    PayRent,
    /// Apply the card that was drawn
    ConfirmCard,

    // ==================== Jail ====================
    PayJailFine,
    UseJailCard,

    // ==================== Property Management ====================
    #[serde(rename_all = "camelCase")]
    BuildHouse { tile_id: TileIndex },
    #[serde(rename_all = "camelCase")]
    SellHouse { tile_id: TileIndex },
    #[serde(rename_all = "camelCase")]
    MortgageTile { tile_id: TileIndex },
    #[serde(rename_all = "camelCase")]
    UnmortgageTile { tile_id: TileIndex },

    // ==================== Debt ====================
    PayDebt,
    DeclareBankruptcy,

    // ==================== Notifications ====================
    #[serde(rename_all = "camelCase")]
    ClearToast { toast_id: ToastId },
}

impl GameAction {
    /// Wire tag, for logging
    pub fn tag(&self) -> &'static str {
        match self {
            GameAction::SetPlayers { .. } => "SET_PLAYERS",
            GameAction::StartGame => "START_GAME",
            GameAction::RollDice => "ROLL_DICE",
            GameAction::BuyTile => "BUY_TILE",
            GameAction::PassBuy => "PASS_BUY",
            GameAction::EndTurn => "END_TURN",
            GameAction::PayRent => "PAY_RENT",
            GameAction::ConfirmCard => "CONFIRM_CARD",
            GameAction::PayJailFine => "PAY_JAIL_FINE",
            GameAction::UseJailCard => "USE_JAIL_CARD",
            GameAction::BuildHouse { .. } => "BUILD_HOUSE",
            GameAction::SellHouse { .. } => "SELL_HOUSE",
            GameAction::MortgageTile { .. } => "MORTGAGE_TILE",
            GameAction::UnmortgageTile { .. } => "UNMORTGAGE_TILE",
            GameAction::PayDebt => "PAY_DEBT",
            GameAction::DeclareBankruptcy => "DECLARE_BANKRUPTCY",
            GameAction::ClearToast { .. } => "CLEAR_TOAST",
        }
    }

    /// Actions only the room host may submit. Everything else except
    /// `ClearToast` must come from the active seat; the engine leaves both
    /// checks to the caller.
    pub fn is_host_only(&self) -> bool {
        matches!(self, GameAction::SetPlayers { .. } | GameAction::StartGame)
    }
}

/// Severity of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

/// A transient notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ToastKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unit_action_wire_format() {
        let json = serde_json::to_string(&GameAction::RollDice).unwrap();
        assert_eq!(json, r#"{"type":"ROLL_DICE"}"#);
    }

    #[test]
    fn test_tile_action_wire_format() {
        let action: GameAction =
            serde_json::from_str(r#"{"type":"BUILD_HOUSE","payload":{"tileId":3}}"#).unwrap();
        assert_eq!(action, GameAction::BuildHouse { tile_id: 3 });
        assert_eq!(action.tag(), "BUILD_HOUSE");
    }

    #[test]
    fn test_set_players_wire_format() {
        let action: GameAction = serde_json::from_str(
            r#"{"type":"SET_PLAYERS","payload":{"players":[{"name":"Ana"},{"name":"Bot","isAi":true}]}}"#,
        )
        .unwrap();
        assert_eq!(
            action,
            GameAction::SetPlayers {
                players: vec![PlayerSeat::human("Ana"), PlayerSeat::bot("Bot")]
            }
        );
        assert!(action.is_host_only());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result: Result<GameAction, _> = serde_json::from_str(r#"{"type":"TELEPORT"}"#);
        assert!(result.is_err());
    }
}
