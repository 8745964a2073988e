//! Fixed rule constants.
//!
//! House-rule variants are not supported, so these are plain constants
//! rather than configuration.

use crate::board::TileIndex;
use crate::player::Money;

/// Number of tiles around the board
pub const BOARD_SIZE: usize = 40;

/// Index of the START tile
pub const START_INDEX: TileIndex = 0;

/// Index of the jail tile
pub const JAIL_INDEX: TileIndex = 10;

/// Salary for passing or landing on START
pub const GO_SALARY: Money = 200;

/// Fine for leaving jail
pub const JAIL_FINE: Money = 50;

/// Failed doubles attempts before the fine is forced
pub const MAX_JAIL_ATTEMPTS: u8 = 3;

/// Consecutive doubles that send a player to jail
pub const MAX_CONSECUTIVE_DOUBLES: u8 = 3;

/// Cash every player starts with
pub const STARTING_MONEY: Money = 1500;

/// Smallest table
pub const MIN_PLAYERS: usize = 2;

/// Largest table (one seat per palette colour)
pub const MAX_PLAYERS: usize = 8;

/// House count that represents a hotel
pub const HOTEL_LEVEL: u8 = 5;

/// Entries kept in the message log
pub const MAX_MESSAGES: usize = 50;

/// Toasts kept in the notification queue
pub const MAX_TOASTS: usize = 3;
