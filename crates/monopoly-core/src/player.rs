//! Player state.
//!
//! This module contains:
//! - The fixed colour palette
//! - Kept cards (get out of jail) held by a player
//! - Player struct with cash, position, jail status and holdings

use crate::board::{PlayerId, TileIndex};
use crate::cards::{CardId, DeckKind};
use crate::rules::{MAX_PLAYERS, STARTING_MONEY, START_INDEX};
use serde::{Deserialize, Serialize};

/// Amount of money. Signed because a balance can dip below zero while a
/// collect-from-everyone card resolves.
pub type Money = i64;

/// Player colour for UI rendering, unique per seat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerColor {
    Yellow,
    Red,
    Orange,
    Blue,
    Green,
    Pink,
    Purple,
    Teal,
}

impl PlayerColor {
    /// Every colour, in seat order
    pub const ALL: [PlayerColor; MAX_PLAYERS] = [
        PlayerColor::Yellow,
        PlayerColor::Red,
        PlayerColor::Orange,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Pink,
        PlayerColor::Purple,
        PlayerColor::Teal,
    ];

    /// Default colour for a seat
    pub fn for_player(id: PlayerId) -> Self {
        Self::ALL[id as usize % MAX_PLAYERS]
    }
}

/// A kept card sitting in a player's hand until surrendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldCard {
    /// Catalog id
    pub id: CardId,
    /// Deck the card goes back to
    pub deck: DeckKind,
    /// Display text
    pub text: String,
}

/// A seat as submitted to `SET_PLAYERS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSeat {
    pub name: String,
    /// Defaults to the seat's palette colour
    #[serde(default)]
    pub color: Option<PlayerColor>,
    #[serde(default)]
    pub is_ai: bool,
}

impl PlayerSeat {
    /// A human seat with the default colour
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            is_ai: false,
        }
    }

    /// A bot seat with the default colour
    pub fn bot(name: impl Into<String>) -> Self {
        Self {
            is_ai: true,
            ..Self::human(name)
        }
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Seat index
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Cash on hand
    pub money: Money,
    /// Board position (0-39)
    pub position: TileIndex,
    pub is_jailed: bool,
    /// Failed doubles attempts while jailed (0-3)
    pub jail_turns: u8,
    /// Owned tile indices, in acquisition order
    pub properties: Vec<TileIndex>,
    pub is_ai: bool,
    /// Kept get-out-of-jail cards
    pub held_cards: Vec<HeldCard>,
    pub is_bankrupt: bool,
}

impl Player {
    /// Create a new player at START with the starting cash
    pub fn new(id: PlayerId, name: String, color: PlayerColor, is_ai: bool) -> Self {
        Self {
            id,
            name,
            color,
            money: STARTING_MONEY,
            position: START_INDEX,
            is_jailed: false,
            jail_turns: 0,
            properties: Vec::new(),
            is_ai,
            held_cards: Vec::new(),
            is_bankrupt: false,
        }
    }

    /// Can this player pay `amount` right now?
    pub fn can_afford(&self, amount: Money) -> bool {
        self.money >= amount
    }

    /// Number of kept get-out-of-jail cards
    pub fn jail_cards(&self) -> usize {
        self.held_cards.len()
    }

    /// Record a newly acquired tile
    pub fn add_property(&mut self, tile: TileIndex) {
        if !self.properties.contains(&tile) {
            self.properties.push(tile);
        }
    }

    /// Put the player in jail
    pub fn send_to_jail(&mut self, jail: TileIndex) {
        self.position = jail;
        self.is_jailed = true;
        self.jail_turns = 0;
    }

    /// Let the player out of jail
    pub fn release(&mut self) {
        self.is_jailed = false;
        self.jail_turns = 0;
    }

    /// Remove the player from the game, returning the cards they held
    pub fn go_bankrupt(&mut self) -> Vec<HeldCard> {
        self.is_bankrupt = true;
        self.money = 0;
        self.properties.clear();
        std::mem::take(&mut self.held_cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_unique() {
        let mut seen = std::collections::HashSet::new();
        for color in PlayerColor::ALL {
            assert!(seen.insert(color));
        }
        assert_eq!(seen.len(), MAX_PLAYERS);
        assert_eq!(PlayerColor::for_player(8), PlayerColor::Yellow);
    }

    #[test]
    fn test_new_player() {
        let player = Player::new(2, "Test".to_string(), PlayerColor::Orange, false);
        assert_eq!(player.money, STARTING_MONEY);
        assert_eq!(player.position, 0);
        assert!(!player.is_jailed);
        assert!(player.properties.is_empty());
    }

    #[test]
    fn test_add_property_no_duplicates() {
        let mut player = Player::new(0, "Test".to_string(), PlayerColor::Yellow, false);
        player.add_property(3);
        player.add_property(3);
        assert_eq!(player.properties, vec![3]);
    }

    #[test]
    fn test_jail_round_trip() {
        let mut player = Player::new(0, "Test".to_string(), PlayerColor::Yellow, false);
        player.position = 30;
        player.send_to_jail(10);
        assert!(player.is_jailed);
        assert_eq!(player.position, 10);

        player.jail_turns = 2;
        player.release();
        assert!(!player.is_jailed);
        assert_eq!(player.jail_turns, 0);
    }

    #[test]
    fn test_go_bankrupt_strips_everything() {
        let mut player = Player::new(1, "Test".to_string(), PlayerColor::Red, true);
        player.properties = vec![1, 3];
        player.held_cards.push(HeldCard {
            id: 5,
            deck: DeckKind::Chance,
            text: "Get out of jail".to_string(),
        });

        let returned = player.go_bankrupt();
        assert_eq!(returned.len(), 1);
        assert!(player.is_bankrupt);
        assert_eq!(player.money, 0);
        assert!(player.properties.is_empty());
        assert!(player.held_cards.is_empty());
    }

    #[test]
    fn test_seat_deserializes_with_defaults() {
        let seat: PlayerSeat = serde_json::from_str(r#"{"name":"Ana"}"#).unwrap();
        assert_eq!(seat, PlayerSeat::human("Ana"));
    }
}
