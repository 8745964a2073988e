//! Board representation: the forty tiles, colour groups and ownership.
//!
//! This module contains:
//! - Tile types and colour groups
//! - Immutable tile definitions shared between snapshots
//! - The standard 40-tile board
//! - Ownership and group queries used by the economy rules

use crate::player::Money;
use crate::rules::{BOARD_SIZE, HOTEL_LEVEL};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Player identifier, equal to the seat index (0-7)
pub type PlayerId = u8;

/// Tile identifier, equal to its position on the board (0-39)
pub type TileIndex = u8;

/// What kind of square a tile is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileType {
    Start,
    Property,
    Railroad,
    Utility,
    Tax,
    Chance,
    CommunityChest,
    Jail,
    FreeParking,
    GoToJail,
}

impl TileType {
    /// Whether a player can own this kind of tile
    pub fn is_ownable(&self) -> bool {
        matches!(
            self,
            TileType::Property | TileType::Railroad | TileType::Utility
        )
    }
}

/// Colour groups of the street properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

/// Immutable part of a tile. Shared behind an `Arc` so that copying a
/// snapshot only copies the mutable ownership fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileDef {
    /// Display name
    pub name: String,
    /// What kind of square this is
    #[serde(rename = "type")]
    pub tile_type: TileType,
    /// Purchase price, or the fixed amount for TAX tiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
    /// Base rent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent: Option<Money>,
    /// Streets: `[base, 1 house, .., 4 houses, hotel]`. Railroads: rent by count owned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rent_levels: Vec<Money>,
    /// Cost of one building
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_cost: Option<Money>,
    /// Colour group, streets only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_group: Option<ColorGroup>,
}

impl TileDef {
    fn plain(name: &str, tile_type: TileType) -> Self {
        Self {
            name: name.to_string(),
            tile_type,
            price: None,
            rent: None,
            rent_levels: Vec::new(),
            house_cost: None,
            color_group: None,
        }
    }

    fn street(name: &str, group: ColorGroup, price: Money, levels: [Money; 6], house_cost: Money) -> Self {
        Self {
            price: Some(price),
            rent: Some(levels[0]),
            rent_levels: levels.to_vec(),
            house_cost: Some(house_cost),
            color_group: Some(group),
            ..Self::plain(name, TileType::Property)
        }
    }

    fn railroad(name: &str) -> Self {
        Self {
            price: Some(200),
            rent: Some(25),
            rent_levels: vec![25, 50, 100, 200],
            ..Self::plain(name, TileType::Railroad)
        }
    }

    fn utility(name: &str) -> Self {
        Self {
            price: Some(150),
            ..Self::plain(name, TileType::Utility)
        }
    }

    fn tax(name: &str, amount: Money) -> Self {
        Self {
            price: Some(amount),
            ..Self::plain(name, TileType::Tax)
        }
    }
}

/// A square on the board with its current ownership state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Position on the board (0-39)
    pub index: TileIndex,
    /// Static definition
    #[serde(flatten)]
    pub def: Arc<TileDef>,
    /// Owning player, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<PlayerId>,
    /// 0-4 houses, 5 = hotel
    #[serde(default)]
    pub house_count: u8,
    /// Mortgaged tiles collect no rent
    #[serde(default)]
    pub is_mortgaged: bool,
}

impl Tile {
    /// Create an unowned tile
    pub fn new(index: TileIndex, def: TileDef) -> Self {
        Self {
            index,
            def: Arc::new(def),
            owner_id: None,
            house_count: 0,
            is_mortgaged: false,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Tile kind
    pub fn tile_type(&self) -> TileType {
        self.def.tile_type
    }

    /// Whether this tile can be bought
    pub fn is_ownable(&self) -> bool {
        self.def.tile_type.is_ownable()
    }

    /// Whether the tile carries a hotel
    pub fn has_hotel(&self) -> bool {
        self.house_count == HOTEL_LEVEL
    }

    /// Number of houses, not counting a hotel
    pub fn houses(&self) -> u8 {
        if self.has_hotel() {
            0
        } else {
            self.house_count
        }
    }

    /// Return the tile to the bank
    pub fn reset_to_bank(&mut self) {
        self.owner_id = None;
        self.house_count = 0;
        self.is_mortgaged = false;
    }
}

/// The forty tiles of the board, indexed by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    /// Build a board from definitions in position order
    pub fn from_defs(defs: Vec<TileDef>) -> Self {
        let tiles = defs
            .into_iter()
            .enumerate()
            .map(|(i, def)| Tile::new(i as TileIndex, def))
            .collect();
        Self { tiles }
    }

    /// The standard forty-tile board
    pub fn standard() -> Self {
        use ColorGroup::*;
        use TileType::*;

        let board = Self::from_defs(vec![
            TileDef::plain("GO", Start),
            TileDef::street("Mediterranean Avenue", Brown, 60, [2, 10, 30, 90, 160, 250], 50),
            TileDef::plain("Community Chest", CommunityChest),
            TileDef::street("Baltic Avenue", Brown, 60, [4, 20, 60, 180, 320, 450], 50),
            TileDef::tax("Income Tax", 200),
            TileDef::railroad("Reading Railroad"),
            TileDef::street("Oriental Avenue", LightBlue, 100, [6, 30, 90, 270, 400, 550], 50),
            TileDef::plain("Chance", Chance),
            TileDef::street("Vermont Avenue", LightBlue, 100, [6, 30, 90, 270, 400, 550], 50),
            TileDef::street("Connecticut Avenue", LightBlue, 120, [8, 40, 100, 300, 450, 600], 50),
            TileDef::plain("Jail", Jail),
            TileDef::street("St. Charles Place", Pink, 140, [10, 50, 150, 450, 625, 750], 100),
            TileDef::utility("Electric Company"),
            TileDef::street("States Avenue", Pink, 140, [10, 50, 150, 450, 625, 750], 100),
            TileDef::street("Virginia Avenue", Pink, 160, [12, 60, 180, 500, 700, 900], 100),
            TileDef::railroad("Pennsylvania Railroad"),
            TileDef::street("St. James Place", Orange, 180, [14, 70, 200, 550, 750, 950], 100),
            TileDef::plain("Community Chest", CommunityChest),
            TileDef::street("Tennessee Avenue", Orange, 180, [14, 70, 200, 550, 750, 950], 100),
            TileDef::street("New York Avenue", Orange, 200, [16, 80, 220, 600, 800, 1000], 100),
            TileDef::plain("Free Parking", FreeParking),
            TileDef::street("Kentucky Avenue", Red, 220, [18, 90, 250, 700, 875, 1050], 150),
            TileDef::plain("Chance", Chance),
            TileDef::street("Indiana Avenue", Red, 220, [18, 90, 250, 700, 875, 1050], 150),
            TileDef::street("Illinois Avenue", Red, 240, [20, 100, 300, 750, 925, 1100], 150),
            TileDef::railroad("B. & O. Railroad"),
            TileDef::street("Atlantic Avenue", Yellow, 260, [22, 110, 330, 800, 975, 1150], 150),
            TileDef::street("Ventnor Avenue", Yellow, 260, [22, 110, 330, 800, 975, 1150], 150),
            TileDef::utility("Water Works"),
            TileDef::street("Marvin Gardens", Yellow, 280, [24, 120, 360, 850, 1025, 1200], 150),
            TileDef::plain("Go To Jail", GoToJail),
            TileDef::street("Pacific Avenue", Green, 300, [26, 130, 390, 900, 1100, 1275], 200),
            TileDef::street("North Carolina Avenue", Green, 300, [26, 130, 390, 900, 1100, 1275], 200),
            TileDef::plain("Community Chest", CommunityChest),
            TileDef::street("Pennsylvania Avenue", Green, 320, [28, 150, 450, 1000, 1200, 1400], 200),
            TileDef::railroad("Short Line"),
            TileDef::plain("Chance", Chance),
            TileDef::street("Park Place", DarkBlue, 350, [35, 175, 500, 1100, 1300, 1500], 200),
            TileDef::tax("Luxury Tax", 100),
            TileDef::street("Boardwalk", DarkBlue, 400, [50, 200, 600, 1400, 1700, 2000], 200),
        ]);
        debug_assert_eq!(board.len(), BOARD_SIZE);
        board
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the board has no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Get a tile by position
    pub fn get(&self, index: TileIndex) -> Option<&Tile> {
        self.tiles.get(index as usize)
    }

    /// Get a mutable tile by position
    pub fn get_mut(&mut self, index: TileIndex) -> Option<&mut Tile> {
        self.tiles.get_mut(index as usize)
    }

    /// All tiles in board order
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// All tiles in board order, mutably
    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.iter_mut()
    }

    /// Tiles sharing a colour group
    pub fn group_tiles(&self, group: ColorGroup) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(move |t| t.def.color_group == Some(group))
    }

    /// Tiles owned by a player
    pub fn owned_by(&self, player: PlayerId) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(move |t| t.owner_id == Some(player))
    }

    /// How many tiles of a kind a player owns
    pub fn count_owned(&self, player: PlayerId, tile_type: TileType) -> usize {
        self.owned_by(player)
            .filter(|t| t.tile_type() == tile_type)
            .count()
    }

    /// Whether `player` owns every tile of `group`
    pub fn owns_group(&self, player: PlayerId, group: ColorGroup) -> bool {
        self.group_tiles(group).all(|t| t.owner_id == Some(player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board_has_40_tiles() {
        let board = Board::standard();
        assert_eq!(board.len(), BOARD_SIZE);
        for (i, tile) in board.tiles().enumerate() {
            assert_eq!(tile.index as usize, i);
        }
    }

    #[test]
    fn test_fixed_squares() {
        let board = Board::standard();
        assert_eq!(board.get(0).unwrap().tile_type(), TileType::Start);
        assert_eq!(board.get(10).unwrap().tile_type(), TileType::Jail);
        assert_eq!(board.get(20).unwrap().tile_type(), TileType::FreeParking);
        assert_eq!(board.get(30).unwrap().tile_type(), TileType::GoToJail);
        assert_eq!(board.get(4).unwrap().def.price, Some(200));
        assert_eq!(board.get(38).unwrap().def.price, Some(100));
    }

    #[test]
    fn test_group_sizes() {
        let board = Board::standard();
        assert_eq!(board.group_tiles(ColorGroup::Brown).count(), 2);
        assert_eq!(board.group_tiles(ColorGroup::LightBlue).count(), 3);
        assert_eq!(board.group_tiles(ColorGroup::DarkBlue).count(), 2);
        let railroads = board
            .tiles()
            .filter(|t| t.tile_type() == TileType::Railroad)
            .count();
        assert_eq!(railroads, 4);
    }

    #[test]
    fn test_streets_have_six_rent_levels() {
        let board = Board::standard();
        for tile in board.tiles().filter(|t| t.tile_type() == TileType::Property) {
            assert_eq!(tile.def.rent_levels.len(), 6, "{}", tile.name());
            assert!(tile.def.house_cost.is_some());
            assert!(tile.def.color_group.is_some());
        }
    }

    #[test]
    fn test_owns_group() {
        let mut board = Board::standard();
        board.get_mut(1).unwrap().owner_id = Some(0);
        assert!(!board.owns_group(0, ColorGroup::Brown));
        board.get_mut(3).unwrap().owner_id = Some(0);
        assert!(board.owns_group(0, ColorGroup::Brown));
        assert_eq!(board.count_owned(0, TileType::Property), 2);
    }

    #[test]
    fn test_clone_shares_definitions() {
        let board = Board::standard();
        let copy = board.clone();
        assert!(Arc::ptr_eq(&board.get(1).unwrap().def, &copy.get(1).unwrap().def));
    }

    #[test]
    fn test_tile_serializes_flat() {
        let board = Board::standard();
        let json = serde_json::to_value(board.get(39).unwrap()).unwrap();
        assert_eq!(json["name"], "Boardwalk");
        assert_eq!(json["type"], "PROPERTY");
        assert_eq!(json["price"], 400);
        assert_eq!(json["colorGroup"], "darkBlue");

        let back: Tile = serde_json::from_value(json).unwrap();
        assert_eq!(&back, board.get(39).unwrap());
    }
}
