//! Monopoly core - authoritative turn engine for a property-trading board game
//!
//! This crate provides the game logic shared by local play and the relay
//! server:
//! - The standard 40-tile board with colour groups and rent tables
//! - Player state, jail and kept cards
//! - Chance and community chest decks
//! - Rent, mortgage and building rules
//! - The turn state machine, including debt and bankruptcy
//!
//! # Architecture
//!
//! The engine is a synchronous reducer over [`GameState`]. It performs no I/O;
//! dice and shuffles come from an injected [`GameRng`]. It can be compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side local play (feature `wasm`)
//!
//! # Modules
//!
//! - [`rules`]: Fixed rule constants
//! - [`board`]: Tiles, colour groups and the standard board
//! - [`player`]: Player state and the colour palette
//! - [`cards`]: Card catalogs and decks
//! - [`economy`]: Rent, mortgage and building eligibility
//! - [`actions`]: Action vocabulary and toasts
//! - [`rng`]: Injectable randomness
//! - [`game`]: Game state machine

pub mod actions;
pub mod board;
pub mod cards;
pub mod economy;
pub mod game;
pub mod player;
pub mod rng;
pub mod rules;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, Toast, ToastId, ToastKind};
pub use board::{Board, ColorGroup, PlayerId, Tile, TileDef, TileIndex, TileType};
pub use cards::{Card, CardEffect, CardError, CardId, Deck, DeckKind, Decks, DrawnCard};
pub use economy::{RentDetails, RuleViolation};
pub use game::{GameError, GameState, GameStatus, PendingDebt, TurnPhase};
pub use player::{HeldCard, Money, Player, PlayerColor, PlayerSeat};
pub use rng::{GameRng, ScriptedRng, StdGameRng};
