//! Pure economic rules: rent, mortgages, building eligibility.
//!
//! Nothing here mutates state. Every check returns the amount involved or
//! the [`RuleViolation`] explaining why the move is not allowed.

use crate::board::{Board, Tile, TileType};
use crate::player::{Money, Player};
use crate::rules::HOTEL_LEVEL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A move the rules forbid. The message is shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuleViolation {
    #[error("Only street properties can be built on")]
    NotAProperty,

    #[error("You do not own this property")]
    NotOwner,

    #[error("The property is mortgaged")]
    Mortgaged,

    #[error("The property has no color group")]
    NoColorGroup,

    #[error("Already at the maximum (hotel)")]
    MaxBuildings,

    #[error("Not enough money")]
    InsufficientFunds,

    #[error("You need the complete color group")]
    IncompleteGroup,

    #[error("A property in the group is mortgaged")]
    GroupMortgaged,

    #[error("Build evenly: build on the other properties of the group first")]
    UnevenBuilding,

    #[error("Sell the buildings before mortgaging")]
    HasBuildings,

    #[error("The property has no buildings to sell")]
    NoBuildings,

    #[error("Sell evenly: sell from the other properties of the group first")]
    UnevenSelling,

    #[error("Not enough money to pay the debt")]
    CannotPayDebt,

    #[error("Not enough money to pay the jail fine")]
    CannotPayFine,
}

/// Rent owed on a tile together with how it was worked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentQuote {
    pub amount: Money,
    pub multiplier: Money,
    pub calculation: String,
}

/// Rent owed by a visitor, as described to the payer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentDetails {
    pub tile_index: u8,
    pub tile_name: String,
    pub owner_id: u8,
    pub owner_name: String,
    pub base_rent: Money,
    pub multiplier: Money,
    pub house_count: u8,
    pub is_hotel: bool,
    pub total_rent: Money,
    pub calculation: String,
}

/// Work out the rent on an owned tile. Unowned and mortgaged tiles quote zero.
pub fn rent_quote(tile: &Tile, board: &Board, dice_total: u8) -> RentQuote {
    let zero = RentQuote {
        amount: 0,
        multiplier: 0,
        calculation: String::new(),
    };
    let owner = match tile.owner_id {
        Some(owner) if !tile.is_mortgaged => owner,
        _ => return zero,
    };

    match tile.tile_type() {
        TileType::Utility => {
            let count = board.count_owned(owner, TileType::Utility);
            let multiplier = if count >= 2 { 10 } else { 4 };
            RentQuote {
                amount: Money::from(dice_total) * multiplier,
                multiplier,
                calculation: format!("Utility rent ({} x {})", dice_total, multiplier),
            }
        }

        TileType::Railroad => {
            let count = board.count_owned(owner, TileType::Railroad).max(1);
            let amount = match tile.def.rent_levels.get(count - 1) {
                Some(&level) => level,
                None => 25 * (1 << (count - 1)),
            };
            RentQuote {
                amount,
                multiplier: 1,
                calculation: format!("Railroad rent ({} owned)", count),
            }
        }

        TileType::Property => {
            let base = tile.def.rent.unwrap_or(0);

            if tile.house_count > 0 {
                if let Some(&level) = tile.def.rent_levels.get(tile.house_count as usize) {
                    let calculation = if tile.has_hotel() {
                        "Rent with hotel".to_string()
                    } else {
                        format!("Rent with {} house(s)", tile.house_count)
                    };
                    return RentQuote {
                        amount: level,
                        multiplier: 1,
                        calculation,
                    };
                }
            }

            let full_group = tile
                .def
                .color_group
                .is_some_and(|group| board.owns_group(owner, group));
            if full_group {
                RentQuote {
                    amount: base * 2,
                    multiplier: 2,
                    calculation: "Base rent doubled (full color group)".to_string(),
                }
            } else {
                RentQuote {
                    amount: base,
                    multiplier: 1,
                    calculation: "Base rent".to_string(),
                }
            }
        }

        _ => zero,
    }
}

/// Rent owed on a tile
pub fn rent(tile: &Tile, board: &Board, dice_total: u8) -> Money {
    rent_quote(tile, board, dice_total).amount
}

/// Describe the rent a visitor owes, or `None` if nothing is owed
pub fn rent_details(tile: &Tile, owner: &Player, board: &Board, dice_total: u8) -> Option<RentDetails> {
    let quote = rent_quote(tile, board, dice_total);
    if quote.amount <= 0 {
        return None;
    }

    Some(RentDetails {
        tile_index: tile.index,
        tile_name: tile.name().to_string(),
        owner_id: owner.id,
        owner_name: owner.name.clone(),
        base_rent: tile.def.rent.unwrap_or(0),
        multiplier: quote.multiplier,
        house_count: tile.house_count,
        is_hotel: tile.has_hotel(),
        total_rent: quote.amount,
        calculation: quote.calculation,
    })
}

/// Cash raised by mortgaging: half the price, rounded down
pub fn mortgage_value(tile: &Tile) -> Money {
    tile.def.price.map_or(0, |price| price / 2)
}

/// Cost to lift a mortgage: the mortgage value plus 10%, rounded down
pub fn unmortgage_cost(tile: &Tile) -> Money {
    mortgage_value(tile) * 11 / 10
}

/// Price the bank pays for one building: half the house cost
pub fn building_sale_value(tile: &Tile) -> Money {
    tile.def.house_cost.map_or(0, |cost| cost / 2)
}

/// Check that `player` may add a building to `tile`. Returns the cost.
pub fn check_build(tile: &Tile, player: &Player, board: &Board) -> Result<Money, RuleViolation> {
    if tile.tile_type() != TileType::Property {
        return Err(RuleViolation::NotAProperty);
    }
    if tile.owner_id != Some(player.id) {
        return Err(RuleViolation::NotOwner);
    }
    if tile.is_mortgaged {
        return Err(RuleViolation::Mortgaged);
    }
    let (group, cost) = match (tile.def.color_group, tile.def.house_cost) {
        (Some(group), Some(cost)) => (group, cost),
        _ => return Err(RuleViolation::NoColorGroup),
    };
    if tile.house_count >= HOTEL_LEVEL {
        return Err(RuleViolation::MaxBuildings);
    }
    if !player.can_afford(cost) {
        return Err(RuleViolation::InsufficientFunds);
    }
    if !board.owns_group(player.id, group) {
        return Err(RuleViolation::IncompleteGroup);
    }
    if board.group_tiles(group).any(|t| t.is_mortgaged) {
        return Err(RuleViolation::GroupMortgaged);
    }

    let min_in_group = board
        .group_tiles(group)
        .map(|t| t.house_count)
        .min()
        .unwrap_or(0);
    if tile.house_count > min_in_group {
        return Err(RuleViolation::UnevenBuilding);
    }

    Ok(cost)
}

/// Check that `player` may sell one building from `tile`. Returns the refund.
pub fn check_sell(tile: &Tile, player: &Player, board: &Board) -> Result<Money, RuleViolation> {
    if tile.owner_id != Some(player.id) {
        return Err(RuleViolation::NotOwner);
    }
    if tile.house_count == 0 {
        return Err(RuleViolation::NoBuildings);
    }
    if let Some(group) = tile.def.color_group {
        let max_in_group = board
            .group_tiles(group)
            .map(|t| t.house_count)
            .max()
            .unwrap_or(0);
        if tile.house_count < max_in_group {
            return Err(RuleViolation::UnevenSelling);
        }
    }

    Ok(building_sale_value(tile))
}

/// Check that `player` may mortgage `tile`. Returns the cash raised.
pub fn check_mortgage(tile: &Tile, player: &Player) -> Result<Money, RuleViolation> {
    if tile.owner_id != Some(player.id) {
        return Err(RuleViolation::NotOwner);
    }
    if tile.is_mortgaged {
        return Err(RuleViolation::Mortgaged);
    }
    if tile.house_count > 0 {
        return Err(RuleViolation::HasBuildings);
    }

    Ok(mortgage_value(tile))
}

/// Check that `player` may lift the mortgage on `tile`. Returns the cost.
pub fn check_unmortgage(tile: &Tile, player: &Player) -> Result<Money, RuleViolation> {
    if tile.owner_id != Some(player.id) {
        return Err(RuleViolation::NotOwner);
    }
    let cost = unmortgage_cost(tile);
    if !player.can_afford(cost) {
        return Err(RuleViolation::InsufficientFunds);
    }

    Ok(cost)
}

/// Buildings a player owns, as `(houses, hotels)`
pub fn building_counts(board: &Board, player: &Player) -> (u32, u32) {
    board
        .owned_by(player.id)
        .fold((0, 0), |(houses, hotels), tile| {
            (
                houses + u32::from(tile.houses()),
                hotels + u32::from(tile.has_hotel()),
            )
        })
}

/// Total repair bill for a player's buildings
pub fn repair_bill(board: &Board, player: &Player, house_cost: Money, hotel_cost: Money) -> Money {
    let (houses, hotels) = building_counts(board, player);
    Money::from(houses) * house_cost + Money::from(hotels) * hotel_cost
}

/// Cash plus the liquidation value of everything the player owns
pub fn net_worth(player: &Player, board: &Board) -> Money {
    let holdings: Money = board
        .owned_by(player.id)
        .map(|tile| {
            let land = if tile.is_mortgaged { 0 } else { mortgage_value(tile) };
            let buildings = Money::from(tile.house_count) * tile.def.house_cost.unwrap_or(0) / 2;
            land + buildings
        })
        .sum();
    player.money + holdings
}
