//! Core game state machine.
//!
//! This module contains the `GameState` struct, the turn reducer and the
//! debt/bankruptcy routine every payment goes through.
//!
//! Transitions are transactional: `apply` runs the action against a copy of
//! the state and commits only if it succeeds. Tile definitions sit behind
//! `Arc`, so that copy duplicates ownership data and shares the rest.

use crate::actions::{GameAction, Toast, ToastId, ToastKind};
use crate::board::{Board, PlayerId, Tile, TileIndex, TileType};
use crate::cards::{CardEffect, CardError, CardId, DeckKind, Decks, DrawnCard};
use crate::economy::{self, RentDetails, RuleViolation};
use crate::player::{HeldCard, Money, Player, PlayerColor, PlayerSeat};
use crate::rng::GameRng;
use crate::rules::{
    BOARD_SIZE, GO_SALARY, JAIL_FINE, JAIL_INDEX, MAX_CONSECUTIVE_DOUBLES, MAX_JAIL_ATTEMPTS,
    MAX_MESSAGES, MAX_PLAYERS, MAX_TOASTS, MIN_PLAYERS,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, error, info};

/// Where the current turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    /// Waiting for the dice (also the jail fine/card window)
    Rolling,
    /// Landed on an unowned tile
    BuyDecision,
    /// Landed on someone else's tile, rent quoted
    ResolvingRent,
    /// A card is waiting to be acknowledged
    CardDrawn,
    /// Nothing left to do but end the turn
    Ended,
    /// A debt is pending and blocks the turn
    BankruptcyResolution,
}

/// Overall game lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Setup,
    Lobby,
    Playing,
    GameOver,
}

/// An amount a player could not pay on the spot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDebt {
    pub debtor_id: PlayerId,
    /// `None` means the bank
    pub creditor_id: Option<PlayerId>,
    pub amount: Money,
    pub reason: String,
}

/// Why an action was not applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Not legal in the current phase, or the target is missing. The state is
    /// left exactly as it was.
    #[error("action not allowed: {0}")]
    Rejected(&'static str),

    /// Refused by the economic rules. The reason is logged and toasted.
    #[error(transparent)]
    Rule(#[from] RuleViolation),

    /// Invalid roster or start request. Reported through `ui_error`.
    #[error("{0}")]
    Setup(String),

    /// Broken invariant inside the engine. Reported through `ui_error`.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CardError> for GameError {
    fn from(err: CardError) -> Self {
        GameError::Internal(err.to_string())
    }
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Bumped on every transition that changes anything
    pub version: u64,
    /// Turn order
    pub players: Vec<Player>,
    pub board: Board,
    pub current_player_index: PlayerId,
    pub turn_phase: TurnPhase,
    pub game_status: GameStatus,
    /// Faces of the last roll
    pub dice: [u8; 2],
    pub last_dice_total: u8,
    pub consecutive_doubles: u8,
    /// The current player is owed another roll
    pub rolled_doubles: bool,
    #[serde(flatten)]
    pub decks: Decks,
    pub pending_debt: Option<PendingDebt>,
    pub rent_details: Option<RentDetails>,
    pub drawn_card: Option<DrawnCard>,
    /// Newest first
    pub messages: VecDeque<String>,
    pub toasts: Vec<Toast>,
    /// Last toast id handed out
    pub next_toast_id: ToastId,
    /// Sticky error for the boundary to show
    pub ui_error: Option<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// An empty table in `SETUP`, waiting for a roster
    pub fn new() -> Self {
        Self {
            version: 0,
            players: Vec::new(),
            board: Board::standard(),
            current_player_index: 0,
            turn_phase: TurnPhase::Rolling,
            game_status: GameStatus::Setup,
            dice: [1, 1],
            last_dice_total: 0,
            consecutive_doubles: 0,
            rolled_doubles: false,
            decks: Decks::default(),
            pending_debt: None,
            rent_details: None,
            drawn_card: None,
            messages: VecDeque::new(),
            toasts: Vec::new(),
            next_toast_id: 0,
            ui_error: None,
        }
    }

    /// An empty table in `LOBBY`, filled by `seat_player`
    pub fn lobby() -> Self {
        Self {
            game_status: GameStatus::Lobby,
            ..Self::new()
        }
    }

    /// Seat a roster and start playing
    pub fn new_game<R: GameRng + ?Sized>(
        seats: Vec<PlayerSeat>,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let mut state = Self::new();
        state.apply(&GameAction::SetPlayers { players: seats }, rng)?;
        state.apply(&GameAction::StartGame, rng)?;
        Ok(state)
    }

    // ==================== Queries ====================

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    fn get_player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(id as usize)
            .ok_or_else(|| GameError::Internal(format!("player {} does not exist", id)))
    }

    /// The player whose turn it is
    pub fn current_player(&self) -> Option<&Player> {
        self.get_player(self.current_player_index)
    }

    fn current(&self) -> Result<&Player, GameError> {
        self.current_player()
            .ok_or_else(|| GameError::Internal("no player in the current seat".to_string()))
    }

    /// Players still in the game
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.is_bankrupt)
    }

    pub fn is_finished(&self) -> bool {
        self.game_status == GameStatus::GameOver
    }

    /// The last player standing, once the game is over
    pub fn winner(&self) -> Option<&Player> {
        if !self.is_finished() {
            return None;
        }
        let mut active = self.active_players();
        match (active.next(), active.next()) {
            (Some(last), None) => Some(last),
            _ => None,
        }
    }

    /// Kept cards of a deck currently in players' hands
    pub fn held_card_ids(&self, deck: DeckKind) -> Vec<CardId> {
        self.players
            .iter()
            .flat_map(|p| p.held_cards.iter())
            .filter(|card| card.deck == deck)
            .map(|card| card.id)
            .collect()
    }

    /// Every action the engine would accept from the active seat right now.
    /// Tile actions are listed once per eligible tile.
    pub fn legal_actions(&self) -> Vec<GameAction> {
        let mut actions = Vec::new();

        match self.game_status {
            GameStatus::Setup | GameStatus::Lobby => {
                if self.players.len() >= MIN_PLAYERS {
                    actions.push(GameAction::StartGame);
                }
                return actions;
            }
            GameStatus::GameOver => return actions,
            GameStatus::Playing => {}
        }

        let Some(player) = self.current_player() else {
            return actions;
        };

        match self.turn_phase {
            TurnPhase::Rolling => {
                actions.push(GameAction::RollDice);
                if player.is_jailed && player.can_afford(JAIL_FINE) {
                    actions.push(GameAction::PayJailFine);
                }
                if player.is_jailed && player.jail_cards() > 0 {
                    actions.push(GameAction::UseJailCard);
                }
            }
            TurnPhase::BuyDecision => {
                let affordable = self
                    .board
                    .get(player.position)
                    .and_then(|tile| tile.def.price)
                    .is_some_and(|price| player.can_afford(price));
                if affordable {
                    actions.push(GameAction::BuyTile);
                }
                actions.push(GameAction::PassBuy);
            }
            TurnPhase::ResolvingRent => actions.push(GameAction::PayRent),
            TurnPhase::CardDrawn => actions.push(GameAction::ConfirmCard),
            TurnPhase::Ended => {
                if self.pending_debt.is_none() {
                    actions.push(GameAction::EndTurn);
                }
            }
            TurnPhase::BankruptcyResolution => {
                if let Some(debt) = &self.pending_debt {
                    if player.can_afford(debt.amount) {
                        actions.push(GameAction::PayDebt);
                    }
                    actions.push(GameAction::DeclareBankruptcy);
                }
            }
        }

        let can_develop = self.check_management(false).is_ok();
        let can_liquidate = self.check_management(true).is_ok();
        for tile in self.board.owned_by(player.id) {
            let tile_id = tile.index;
            if can_develop && economy::check_build(tile, player, &self.board).is_ok() {
                actions.push(GameAction::BuildHouse { tile_id });
            }
            if can_liquidate && economy::check_sell(tile, player, &self.board).is_ok() {
                actions.push(GameAction::SellHouse { tile_id });
            }
            if can_liquidate && economy::check_mortgage(tile, player).is_ok() {
                actions.push(GameAction::MortgageTile { tile_id });
            }
            if can_develop && tile.is_mortgaged && economy::check_unmortgage(tile, player).is_ok() {
                actions.push(GameAction::UnmortgageTile { tile_id });
            }
        }

        actions
    }

    // ==================== Lobby ====================

    /// Append a player during the lobby. Returns the new seat id.
    pub fn seat_player(&mut self, name: &str, is_ai: bool) -> Result<PlayerId, GameError> {
        if !matches!(self.game_status, GameStatus::Setup | GameStatus::Lobby) {
            return Err(GameError::Rejected("the game has already started"));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::Setup(format!(
                "The table is full ({} players)",
                MAX_PLAYERS
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::Setup("Player names cannot be empty".to_string()));
        }

        let id = self.players.len() as PlayerId;
        let color = PlayerColor::ALL
            .into_iter()
            .find(|c| !self.players.iter().any(|p| p.color == *c))
            .unwrap_or_else(|| PlayerColor::for_player(id));
        self.players
            .push(Player::new(id, name.to_string(), color, is_ai));
        self.version += 1;
        self.log(format!("{} took a seat.", name));
        Ok(id)
    }

    /// Remove a player during the lobby. Later seats shift down so ids stay
    /// equal to seat order.
    pub fn unseat_player(&mut self, id: PlayerId) -> Result<(), GameError> {
        if !matches!(self.game_status, GameStatus::Setup | GameStatus::Lobby) {
            return Err(GameError::Rejected("the game has already started"));
        }
        if id as usize >= self.players.len() {
            return Err(GameError::Rejected("no such player"));
        }

        let removed = self.players.remove(id as usize);
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.id = seat as PlayerId;
        }
        self.version += 1;
        self.log(format!("{} left the table.", removed.name));
        Ok(())
    }

    // ==================== Reducer ====================

    /// Pure form of [`apply`](Self::apply): the state after `action`.
    pub fn reduce<R: GameRng + ?Sized>(&self, action: &GameAction, rng: &mut R) -> GameState {
        let mut next = self.clone();
        // Failures are already folded into `next`
        let _ = next.apply(action, rng);
        next
    }

    /// Apply an action in place.
    ///
    /// - `Rejected`: nothing changes.
    /// - `Rule`: the reason is logged and toasted, nothing else changes.
    /// - `Setup` / `Internal`: the reason lands in `ui_error`.
    pub fn apply<R: GameRng + ?Sized>(
        &mut self,
        action: &GameAction,
        rng: &mut R,
    ) -> Result<(), GameError> {
        let mut next = self.clone();
        next.version += 1;
        next.ui_error = None;

        let err = match next.transition(action, rng) {
            Ok(()) => {
                *self = next;
                return Ok(());
            }
            Err(err) => err,
        };

        match &err {
            GameError::Rejected(reason) => {
                debug!(action = action.tag(), reason, "action rejected");
            }
            GameError::Rule(violation) => {
                debug!(action = action.tag(), %violation, "rule violation");
                self.version += 1;
                self.ui_error = None;
                let who = self
                    .current_player()
                    .map_or_else(|| "Player".to_string(), |p| p.name.clone());
                self.log(format!("{}: {}.", who, violation));
                self.toast(violation.to_string(), ToastKind::Error);
            }
            GameError::Setup(message) => {
                debug!(action = action.tag(), message = message.as_str(), "setup refused");
                self.version += 1;
                self.ui_error = Some(message.clone());
            }
            GameError::Internal(message) => {
                error!(action = action.tag(), message = message.as_str(), "engine fault");
                self.version += 1;
                self.ui_error = Some(format!("Something went wrong: {}", message));
            }
        }

        Err(err)
    }

    fn transition<R: GameRng + ?Sized>(
        &mut self,
        action: &GameAction,
        rng: &mut R,
    ) -> Result<(), GameError> {
        match action {
            // ==================== Setup ====================
            GameAction::SetPlayers { players } => self.set_players(players, rng),
            GameAction::StartGame => self.start_game(rng),

            // ==================== Notifications ====================
            GameAction::ClearToast { toast_id } => {
                let before = self.toasts.len();
                self.toasts.retain(|t| t.id != *toast_id);
                if self.toasts.len() == before {
                    return Err(GameError::Rejected("no such toast"));
                }
                Ok(())
            }

            // ==================== Turn Flow ====================
            GameAction::RollDice => {
                self.require_phase(TurnPhase::Rolling)?;
                self.roll_dice(rng)
            }

            GameAction::BuyTile => {
                self.require_phase(TurnPhase::BuyDecision)?;
                self.buy_tile()
            }

            GameAction::PassBuy => {
                self.require_phase(TurnPhase::BuyDecision)?;
                let (name, position) = {
                    let player = self.current()?;
                    (player.name.clone(), player.position)
                };
                let tile_name = self.tile_name(position)?;
                self.log(format!("{} passed on {}.", name, tile_name));
                self.resume_turn();
                Ok(())
            }

            GameAction::EndTurn => {
                if self.pending_debt.is_some() {
                    self.require_playing()?;
                    return Err(GameError::Rejected("a debt is pending"));
                }
                self.require_phase(TurnPhase::Ended)?;
                self.end_turn()
            }

            GameAction::PayRent => {
                self.require_phase(TurnPhase::ResolvingRent)?;
                let details = self
                    .rent_details
                    .take()
                    .ok_or(GameError::Rejected("no rent is due"))?;
                let payer = self.current()?.id;
                let reason = format!("rent on {}", details.tile_name);
                self.create_debt(payer, Some(details.owner_id), details.total_rent, &reason)
            }

            GameAction::ConfirmCard => {
                self.require_phase(TurnPhase::CardDrawn)?;
                let card = self
                    .drawn_card
                    .take()
                    .ok_or(GameError::Rejected("no card has been drawn"))?;
                self.apply_card(card, rng)
            }

            // ==================== Jail ====================
            GameAction::PayJailFine => {
                self.require_phase(TurnPhase::Rolling)?;
                let player = self.current()?;
                if !player.is_jailed {
                    return Err(GameError::Rejected("not in jail"));
                }
                if !player.can_afford(JAIL_FINE) {
                    return Err(RuleViolation::CannotPayFine.into());
                }
                let name = player.name.clone();
                let player = self.get_player_mut(self.current_player_index)?;
                player.money -= JAIL_FINE;
                player.release();
                self.log(format!("{} paid the ${} fine and left jail.", name, JAIL_FINE));
                self.toast(format!("{} is out of jail", name), ToastKind::Success);
                Ok(())
            }

            GameAction::UseJailCard => {
                self.require_phase(TurnPhase::Rolling)?;
                let player = self.current()?;
                if !player.is_jailed {
                    return Err(GameError::Rejected("not in jail"));
                }
                if player.held_cards.is_empty() {
                    return Err(GameError::Rejected("no get out of jail card"));
                }
                let name = player.name.clone();
                let player = self.get_player_mut(self.current_player_index)?;
                let card = player.held_cards.remove(0);
                player.release();
                self.decks.get_mut(card.deck).surrender(card.id);
                self.log(format!("{} used a get out of jail free card.", name));
                self.toast(format!("{} is out of jail", name), ToastKind::Success);
                Ok(())
            }

            // ==================== Property Management ====================
            GameAction::BuildHouse { tile_id } => {
                self.check_management(false)?;
                self.build_house(*tile_id)
            }
            GameAction::SellHouse { tile_id } => {
                self.check_management(true)?;
                self.sell_house(*tile_id)
            }
            GameAction::MortgageTile { tile_id } => {
                self.check_management(true)?;
                self.mortgage_tile(*tile_id)
            }
            GameAction::UnmortgageTile { tile_id } => {
                self.check_management(false)?;
                self.unmortgage_tile(*tile_id)
            }

            // ==================== Debt ====================
            GameAction::PayDebt => {
                self.require_playing()?;
                self.pay_debt()
            }
            GameAction::DeclareBankruptcy => {
                self.require_playing()?;
                self.declare_bankruptcy()
            }
        }
    }

    // ==================== Setup ====================

    fn set_players<R: GameRng + ?Sized>(
        &mut self,
        seats: &[PlayerSeat],
        rng: &mut R,
    ) -> Result<(), GameError> {
        if !matches!(self.game_status, GameStatus::Setup | GameStatus::Lobby) {
            return Err(GameError::Rejected("the game has already started"));
        }
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&seats.len()) {
            return Err(GameError::Setup(format!(
                "A game needs {} to {} players, got {}",
                MIN_PLAYERS,
                MAX_PLAYERS,
                seats.len()
            )));
        }

        let mut taken: Vec<PlayerColor> = seats.iter().filter_map(|s| s.color).collect();
        let explicit = taken.len();
        taken.sort_by_key(|c| *c as u8);
        taken.dedup();
        if taken.len() != explicit {
            return Err(GameError::Setup("Each player needs a different color".to_string()));
        }

        let mut players = Vec::with_capacity(seats.len());
        for (seat, entry) in seats.iter().enumerate() {
            let name = entry.name.trim();
            if name.is_empty() {
                return Err(GameError::Setup("Player names cannot be empty".to_string()));
            }
            let color = match entry.color {
                Some(color) => color,
                None => {
                    let color = PlayerColor::ALL
                        .into_iter()
                        .find(|c| !taken.contains(c))
                        .ok_or_else(|| GameError::Internal("palette exhausted".to_string()))?;
                    taken.push(color);
                    color
                }
            };
            players.push(Player::new(seat as PlayerId, name.to_string(), color, entry.is_ai));
        }

        for tile in self.board.tiles_mut() {
            tile.reset_to_bank();
        }
        self.players = players;
        self.current_player_index = 0;
        self.turn_phase = TurnPhase::Rolling;
        self.consecutive_doubles = 0;
        self.rolled_doubles = false;
        self.pending_debt = None;
        self.rent_details = None;
        self.drawn_card = None;
        self.decks = Decks::shuffled(rng);
        self.log(format!("{} players are ready.", self.players.len()));
        Ok(())
    }

    fn start_game<R: GameRng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        if !matches!(self.game_status, GameStatus::Setup | GameStatus::Lobby) {
            return Err(GameError::Rejected("the game has already started"));
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::Setup(format!(
                "At least {} players are needed to start",
                MIN_PLAYERS
            )));
        }

        for kind in [DeckKind::Chance, DeckKind::CommunityChest] {
            if self.decks.get(kind).is_empty() {
                let held = self.held_card_ids(kind);
                self.decks.get_mut(kind).refill(kind, &held, rng);
            }
        }

        self.game_status = GameStatus::Playing;
        self.turn_phase = TurnPhase::Rolling;
        self.current_player_index = 0;
        self.consecutive_doubles = 0;
        self.rolled_doubles = false;

        let first = self.current()?.name.clone();
        info!(players = self.players.len(), "game started");
        self.log(format!("The game begins. {} rolls first.", first));
        Ok(())
    }

    // ==================== Turn Flow ====================

    fn roll_dice<R: GameRng + ?Sized>(&mut self, rng: &mut R) -> Result<(), GameError> {
        let die1 = rng.roll_die();
        let die2 = rng.roll_die();
        if !(1..=6).contains(&die1) || !(1..=6).contains(&die2) {
            return Err(GameError::Internal(format!(
                "dice out of range: {} and {}",
                die1, die2
            )));
        }
        let total = die1 + die2;
        let doubles = die1 == die2;

        self.dice = [die1, die2];
        self.last_dice_total = total;

        let seat = self.current_player_index;
        let (name, jailed, attempts) = {
            let player = self.current()?;
            (player.name.clone(), player.is_jailed, player.jail_turns)
        };
        self.log(format!(
            "{} rolled {} and {} ({}){}",
            name,
            die1,
            die2,
            total,
            if doubles { ", doubles!" } else { "." }
        ));

        if jailed {
            if doubles {
                self.get_player_mut(seat)?.release();
                self.consecutive_doubles = 0;
                self.rolled_doubles = false;
                self.log(format!("{} rolled doubles and left jail.", name));
                self.toast(format!("{} is out of jail", name), ToastKind::Success);
                return self.move_player(total, rng);
            }

            let attempts = attempts + 1;
            if attempts < MAX_JAIL_ATTEMPTS {
                self.get_player_mut(seat)?.jail_turns = attempts;
                self.log(format!(
                    "{} stays in jail (attempt {} of {}).",
                    name, attempts, MAX_JAIL_ATTEMPTS
                ));
                self.turn_phase = TurnPhase::Ended;
                return Ok(());
            }

            let player = self.get_player_mut(seat)?;
            player.release();
            if !player.can_afford(JAIL_FINE) {
                self.rolled_doubles = false;
                return self.create_debt(seat, None, JAIL_FINE, "jail fine");
            }
            player.money -= JAIL_FINE;
            self.log(format!(
                "{} paid the ${} fine after {} attempts and left jail.",
                name, JAIL_FINE, MAX_JAIL_ATTEMPTS
            ));
            return self.move_player(total, rng);
        }

        if doubles {
            self.consecutive_doubles += 1;
            if self.consecutive_doubles >= MAX_CONSECUTIVE_DOUBLES {
                self.log(format!(
                    "{} rolled doubles {} times in a row.",
                    name, MAX_CONSECUTIVE_DOUBLES
                ));
                return self.jail_current_player();
            }
            self.rolled_doubles = true;
        } else {
            self.consecutive_doubles = 0;
            self.rolled_doubles = false;
        }

        self.move_player(total, rng)
    }

    /// Walk the current player forward, paying salary when START is reached
    /// or passed, then resolve the landing.
    fn move_player<R: GameRng + ?Sized>(&mut self, steps: u8, rng: &mut R) -> Result<(), GameError> {
        let seat = self.current_player_index;
        let player = self.get_player_mut(seat)?;
        let raw = player.position as usize + steps as usize;
        let passed_start = raw >= BOARD_SIZE;
        player.position = wrap_position(player.position, i32::from(steps));
        if passed_start {
            player.money += GO_SALARY;
        }
        let (name, position) = (player.name.clone(), player.position);

        if passed_start {
            self.log(format!("{} passed GO and collected ${}.", name, GO_SALARY));
        }
        let tile_name = self.tile_name(position)?;
        self.log(format!("{} landed on {}.", name, tile_name));
        self.resolve_landing(position, rng)
    }

    fn resolve_landing<R: GameRng + ?Sized>(
        &mut self,
        position: TileIndex,
        rng: &mut R,
    ) -> Result<(), GameError> {
        let tile = self
            .board
            .get(position)
            .cloned()
            .ok_or_else(|| GameError::Internal(format!("no tile at {}", position)))?;
        let visitor = self.current()?.id;

        match tile.tile_type() {
            TileType::Property | TileType::Railroad | TileType::Utility => match tile.owner_id {
                None => {
                    self.turn_phase = TurnPhase::BuyDecision;
                }
                Some(owner) if owner == visitor => self.resume_turn(),
                Some(_) if tile.is_mortgaged => {
                    self.log(format!("{} is mortgaged, no rent is due.", tile.name()));
                    self.resume_turn();
                }
                Some(owner) => {
                    let owner = self.get_player(owner).ok_or_else(|| {
                        GameError::Internal(format!("{} is owned by a missing player", tile.name()))
                    })?;
                    match economy::rent_details(&tile, owner, &self.board, self.last_dice_total) {
                        Some(details) => {
                            self.log(format!(
                                "Rent on {} is ${} ({}).",
                                details.tile_name, details.total_rent, details.calculation
                            ));
                            self.rent_details = Some(details);
                            self.turn_phase = TurnPhase::ResolvingRent;
                        }
                        None => self.resume_turn(),
                    }
                }
            },

            TileType::Tax => {
                let amount = tile.def.price.unwrap_or(0);
                self.create_debt(visitor, None, amount, tile.name())?;
            }

            TileType::GoToJail => self.jail_current_player()?,

            TileType::Chance | TileType::CommunityChest => {
                let kind = DeckKind::for_tile(tile.tile_type())
                    .ok_or_else(|| GameError::Internal("card tile without a deck".to_string()))?;
                self.draw_card(kind, rng)?;
            }

            TileType::Start | TileType::Jail | TileType::FreeParking => self.resume_turn(),
        }

        Ok(())
    }

    fn buy_tile(&mut self) -> Result<(), GameError> {
        let (seat, name, position, money) = {
            let player = self.current()?;
            (player.id, player.name.clone(), player.position, player.money)
        };
        let tile = self
            .board
            .get_mut(position)
            .ok_or(GameError::Rejected("no tile to buy"))?;
        if !tile.is_ownable() || tile.owner_id.is_some() {
            return Err(GameError::Rejected("the tile is not for sale"));
        }
        let price = tile
            .def
            .price
            .ok_or_else(|| GameError::Internal(format!("{} has no price", tile.name())))?;

        if money >= price {
            tile.owner_id = Some(seat);
            let tile_name = tile.name().to_string();
            let player = self.get_player_mut(seat)?;
            player.money -= price;
            player.add_property(position);
            self.log(format!("{} bought {} for ${}.", name, tile_name, price));
            self.toast(format!("{} bought {}", name, tile_name), ToastKind::Success);
        }

        self.resume_turn();
        Ok(())
    }

    fn end_turn(&mut self) -> Result<(), GameError> {
        self.consecutive_doubles = 0;
        self.rolled_doubles = false;
        self.drawn_card = None;
        self.rent_details = None;

        if self.active_players().count() <= 1 {
            self.game_status = GameStatus::GameOver;
            let winner = self.active_players().next().map(|p| p.name.clone());
            match winner {
                Some(name) => {
                    info!(winner = name.as_str(), "game over");
                    self.log(format!("{} wins the game!", name));
                    self.toast(format!("{} wins!", name), ToastKind::Success);
                }
                None => info!("game over without a winner"),
            }
            return Ok(());
        }

        let seats = self.players.len();
        let current = self.current_player_index as usize;
        let next = (1..=seats)
            .map(|step| (current + step) % seats)
            .find(|&seat| !self.players[seat].is_bankrupt)
            .ok_or_else(|| GameError::Internal("no active seat to pass to".to_string()))?;

        self.current_player_index = next as PlayerId;
        self.turn_phase = TurnPhase::Rolling;
        let name = self.current()?.name.clone();
        self.log(format!("It is {}'s turn.", name));
        Ok(())
    }

    fn jail_current_player(&mut self) -> Result<(), GameError> {
        let player = self.get_player_mut(self.current_player_index)?;
        player.send_to_jail(JAIL_INDEX);
        let name = player.name.clone();
        self.consecutive_doubles = 0;
        self.rolled_doubles = false;
        self.turn_phase = TurnPhase::Ended;
        self.log(format!("{} goes directly to jail.", name));
        self.toast(format!("{} went to jail", name), ToastKind::Info);
        Ok(())
    }

    // ==================== Cards ====================

    fn draw_card<R: GameRng + ?Sized>(&mut self, kind: DeckKind, rng: &mut R) -> Result<(), GameError> {
        let held = self.held_card_ids(kind);
        let card = self.decks.get_mut(kind).draw(kind, &held, rng)?;
        let name = self.current()?.name.clone();
        self.log(format!("{} drew a {} card.", name, kind.name()));
        self.drawn_card = Some(card);
        self.turn_phase = TurnPhase::CardDrawn;
        Ok(())
    }

    fn apply_card<R: GameRng + ?Sized>(&mut self, card: DrawnCard, rng: &mut R) -> Result<(), GameError> {
        let seat = self.current_player_index;
        let name = self.current()?.name.clone();
        self.log(format!("{}: \"{}\"", card.deck.name(), card.text));

        match card.effect {
            CardEffect::Money(amount) if amount > 0 => {
                self.get_player_mut(seat)?.money += amount;
                self.log(format!("{} collected ${}.", name, amount));
                self.resume_turn();
            }

            CardEffect::Money(amount) => {
                self.create_debt(seat, None, -amount, "card")?;
            }

            CardEffect::MoveTo(destination) => {
                if destination as usize >= BOARD_SIZE {
                    return Err(GameError::Internal(format!(
                        "card {} moves off the board",
                        card.card_id
                    )));
                }
                let player = self.get_player_mut(seat)?;
                let salary = destination < player.position && destination != JAIL_INDEX;
                player.position = destination;
                if salary {
                    player.money += GO_SALARY;
                    self.log(format!("{} passed GO and collected ${}.", name, GO_SALARY));
                }
                let tile_name = self.tile_name(destination)?;
                self.log(format!("{} advanced to {}.", name, tile_name));
                self.resolve_landing(destination, rng)?;
            }

            CardEffect::MoveBy(offset) => {
                let player = self.get_player_mut(seat)?;
                player.position = wrap_position(player.position, i32::from(offset));
                let position = player.position;
                let tile_name = self.tile_name(position)?;
                self.log(format!("{} moved to {}.", name, tile_name));
                self.resolve_landing(position, rng)?;
            }

            CardEffect::GoToJail => self.jail_current_player()?,

            CardEffect::GetOutOfJail => {
                self.get_player_mut(seat)?.held_cards.push(HeldCard {
                    id: card.card_id,
                    deck: card.deck,
                    text: card.text,
                });
                self.log(format!("{} keeps the card for later.", name));
                self.toast(format!("{} got a get out of jail card", name), ToastKind::Info);
                self.resume_turn();
            }

            CardEffect::CollectFromAll(amount) => {
                // Contributors pay even into a negative balance
                let mut collected: Money = 0;
                for other in self.players.iter_mut() {
                    if other.id != seat && !other.is_bankrupt {
                        other.money -= amount;
                        collected += amount;
                    }
                }
                self.get_player_mut(seat)?.money += collected;
                self.log(format!(
                    "{} collected ${} from every player (${} in total).",
                    name, amount, collected
                ));
                self.resume_turn();
            }

            CardEffect::PayToAll(_) => self.resume_turn(),

            CardEffect::Repairs {
                house_cost,
                hotel_cost,
            } => {
                let player = self.current()?;
                let (houses, hotels) = economy::building_counts(&self.board, player);
                let bill = economy::repair_bill(&self.board, player, house_cost, hotel_cost);
                if bill > 0 {
                    self.log(format!(
                        "{} owes ${} for {} house(s) and {} hotel(s).",
                        name, bill, houses, hotels
                    ));
                    self.create_debt(seat, None, bill, "repairs")?;
                } else {
                    self.log(format!("{} has no buildings to repair.", name));
                    self.resume_turn();
                }
            }
        }

        Ok(())
    }

    // ==================== Property Management ====================

    fn build_house(&mut self, tile_id: TileIndex) -> Result<(), GameError> {
        let seat = self.target_tile(tile_id)?;
        let player = self.current()?;
        let tile = self.tile(tile_id)?;
        let cost = economy::check_build(tile, player, &self.board)?;
        let name = player.name.clone();

        let tile = self.tile_mut(tile_id)?;
        tile.house_count += 1;
        let (tile_name, hotel, houses) = (tile.name().to_string(), tile.has_hotel(), tile.house_count);
        self.get_player_mut(seat)?.money -= cost;

        let message = if hotel {
            format!("{} built a hotel on {} for ${}.", name, tile_name, cost)
        } else {
            format!("{} built house {} on {} for ${}.", name, houses, tile_name, cost)
        };
        self.log(message.clone());
        self.toast(message, ToastKind::Success);
        Ok(())
    }

    fn sell_house(&mut self, tile_id: TileIndex) -> Result<(), GameError> {
        let seat = self.target_tile(tile_id)?;
        let player = self.current()?;
        let refund = economy::check_sell(self.tile(tile_id)?, player, &self.board)?;
        let name = player.name.clone();

        let tile = self.tile_mut(tile_id)?;
        tile.house_count -= 1;
        let tile_name = tile.name().to_string();
        self.get_player_mut(seat)?.money += refund;

        self.log(format!("{} sold a building on {} for ${}.", name, tile_name, refund));
        self.toast(format!("Sold a building on {}", tile_name), ToastKind::Info);
        Ok(())
    }

    fn mortgage_tile(&mut self, tile_id: TileIndex) -> Result<(), GameError> {
        let seat = self.target_tile(tile_id)?;
        if self.tile(tile_id)?.is_mortgaged {
            return Err(GameError::Rejected("already mortgaged"));
        }
        let player = self.current()?;
        let value = economy::check_mortgage(self.tile(tile_id)?, player)?;
        let name = player.name.clone();

        let tile = self.tile_mut(tile_id)?;
        tile.is_mortgaged = true;
        let tile_name = tile.name().to_string();
        self.get_player_mut(seat)?.money += value;

        self.log(format!("{} mortgaged {} for ${}.", name, tile_name, value));
        self.toast(format!("Mortgaged {}", tile_name), ToastKind::Info);
        Ok(())
    }

    fn unmortgage_tile(&mut self, tile_id: TileIndex) -> Result<(), GameError> {
        let seat = self.target_tile(tile_id)?;
        if !self.tile(tile_id)?.is_mortgaged {
            return Err(GameError::Rejected("not mortgaged"));
        }
        let player = self.current()?;
        let cost = economy::check_unmortgage(self.tile(tile_id)?, player)?;
        let name = player.name.clone();

        let tile = self.tile_mut(tile_id)?;
        tile.is_mortgaged = false;
        let tile_name = tile.name().to_string();
        self.get_player_mut(seat)?.money -= cost;

        self.log(format!("{} lifted the mortgage on {} for ${}.", name, tile_name, cost));
        self.toast(format!("Unmortgaged {}", tile_name), ToastKind::Success);
        Ok(())
    }

    // ==================== Debt ====================

    /// Charge `amount` to `debtor`, paying `creditor` (or the bank). Settles on
    /// the spot when affordable, otherwise blocks the turn on a pending debt.
    fn create_debt(
        &mut self,
        debtor: PlayerId,
        creditor: Option<PlayerId>,
        amount: Money,
        reason: &str,
    ) -> Result<(), GameError> {
        if self.pending_debt.is_some() {
            return Err(GameError::Internal("a debt is already pending".to_string()));
        }
        let (name, affordable) = {
            let player = self
                .get_player(debtor)
                .ok_or_else(|| GameError::Internal(format!("debtor {} does not exist", debtor)))?;
            (player.name.clone(), player.can_afford(amount))
        };

        if affordable {
            self.transfer(debtor, creditor, amount)?;
            let payee = self.payee_name(creditor);
            self.log(format!("{} paid ${} to {} ({}).", name, amount, payee, reason));
            self.resume_turn();
            return Ok(());
        }

        self.log(format!("{} owes ${} ({}) and cannot pay.", name, amount, reason));
        self.toast(
            format!("{} must raise ${} or declare bankruptcy", name, amount),
            ToastKind::Error,
        );
        self.pending_debt = Some(PendingDebt {
            debtor_id: debtor,
            creditor_id: creditor,
            amount,
            reason: reason.to_string(),
        });
        self.turn_phase = TurnPhase::BankruptcyResolution;
        Ok(())
    }

    fn pay_debt(&mut self) -> Result<(), GameError> {
        let debt = self
            .pending_debt
            .clone()
            .ok_or(GameError::Rejected("no debt is pending"))?;
        let (name, affordable) = {
            let player = self
                .get_player(debt.debtor_id)
                .ok_or_else(|| GameError::Internal("debtor does not exist".to_string()))?;
            (player.name.clone(), player.can_afford(debt.amount))
        };
        if !affordable {
            return Err(RuleViolation::CannotPayDebt.into());
        }

        self.transfer(debt.debtor_id, debt.creditor_id, debt.amount)?;
        self.pending_debt = None;
        let payee = self.payee_name(debt.creditor_id);
        self.log(format!(
            "{} paid ${} to {} ({}).",
            name, debt.amount, payee, debt.reason
        ));
        self.toast(format!("{} settled the debt", name), ToastKind::Success);
        self.resume_turn();
        Ok(())
    }

    fn declare_bankruptcy(&mut self) -> Result<(), GameError> {
        let debt = self
            .pending_debt
            .clone()
            .ok_or(GameError::Rejected("no debt is pending"))?;
        let debtor = debt.debtor_id;
        let (name, cash) = {
            let player = self
                .get_player(debtor)
                .ok_or_else(|| GameError::Internal("debtor does not exist".to_string()))?;
            (player.name.clone(), player.money)
        };
        let holdings: Vec<TileIndex> = self.board.owned_by(debtor).map(|t| t.index).collect();

        match debt.creditor_id {
            Some(creditor) => {
                for &index in &holdings {
                    let tile = self.tile_mut(index)?;
                    tile.owner_id = Some(creditor);
                    tile.house_count = 0;
                }
                let heir = self.get_player_mut(creditor)?;
                heir.money += cash.max(0);
                for &index in &holdings {
                    heir.add_property(index);
                }
                let heir_name = heir.name.clone();
                self.log(format!(
                    "{} is bankrupt. {} takes over {} propert{} and ${}.",
                    name,
                    heir_name,
                    holdings.len(),
                    if holdings.len() == 1 { "y" } else { "ies" },
                    cash.max(0)
                ));
            }
            None => {
                for &index in &holdings {
                    self.tile_mut(index)?.reset_to_bank();
                }
                self.log(format!(
                    "{} is bankrupt. All properties return to the bank.",
                    name
                ));
            }
        }

        let returned = self.get_player_mut(debtor)?.go_bankrupt();
        for card in returned {
            self.decks.get_mut(card.deck).surrender(card.id);
        }

        self.pending_debt = None;
        self.rent_details = None;
        self.drawn_card = None;
        self.consecutive_doubles = 0;
        self.rolled_doubles = false;
        self.turn_phase = TurnPhase::Ended;
        info!(player = name.as_str(), creditor = ?debt.creditor_id, "player bankrupt");
        self.toast(format!("{} went bankrupt", name), ToastKind::Error);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: PlayerId,
        to: Option<PlayerId>,
        amount: Money,
    ) -> Result<(), GameError> {
        self.get_player_mut(from)?.money -= amount;
        if let Some(to) = to {
            self.get_player_mut(to)?.money += amount;
        }
        Ok(())
    }

    // ==================== Helper Methods ====================

    fn require_playing(&self) -> Result<(), GameError> {
        if self.game_status != GameStatus::Playing {
            return Err(GameError::Rejected("the game is not in progress"));
        }
        Ok(())
    }

    fn require_phase(&self, phase: TurnPhase) -> Result<(), GameError> {
        self.require_playing()?;
        if self.turn_phase != phase {
            return Err(GameError::Rejected("not allowed in this phase"));
        }
        Ok(())
    }

    /// Building and mortgaging happen between the other steps of a turn.
    /// Raising funds (selling, mortgaging) is also allowed while the current
    /// player owes a debt.
    fn check_management(&self, raising_funds: bool) -> Result<(), GameError> {
        self.require_playing()?;
        match self.turn_phase {
            TurnPhase::Rolling | TurnPhase::BuyDecision | TurnPhase::Ended
                if self.pending_debt.is_none() =>
            {
                Ok(())
            }
            TurnPhase::BankruptcyResolution if raising_funds => match &self.pending_debt {
                Some(debt) if debt.debtor_id == self.current_player_index => Ok(()),
                _ => Err(GameError::Rejected("not the debtor")),
            },
            _ => Err(GameError::Rejected("not allowed in this phase")),
        }
    }

    /// The tile must exist and belong to the current player. Returns the seat.
    fn target_tile(&self, tile_id: TileIndex) -> Result<PlayerId, GameError> {
        let seat = self.current()?.id;
        let tile = self
            .board
            .get(tile_id)
            .ok_or(GameError::Rejected("no such tile"))?;
        if tile.owner_id != Some(seat) {
            return Err(GameError::Rejected("not your property"));
        }
        Ok(seat)
    }

    fn tile(&self, index: TileIndex) -> Result<&Tile, GameError> {
        self.board
            .get(index)
            .ok_or_else(|| GameError::Internal(format!("no tile at {}", index)))
    }

    fn tile_mut(&mut self, index: TileIndex) -> Result<&mut Tile, GameError> {
        self.board
            .get_mut(index)
            .ok_or_else(|| GameError::Internal(format!("no tile at {}", index)))
    }

    fn tile_name(&self, index: TileIndex) -> Result<String, GameError> {
        Ok(self.tile(index)?.name().to_string())
    }

    fn payee_name(&self, creditor: Option<PlayerId>) -> String {
        creditor
            .and_then(|id| self.get_player(id))
            .map_or_else(|| "the bank".to_string(), |p| p.name.clone())
    }

    /// Back to rolling if doubles are owed another roll, otherwise done
    fn resume_turn(&mut self) {
        self.turn_phase = if self.rolled_doubles {
            TurnPhase::Rolling
        } else {
            TurnPhase::Ended
        };
    }

    fn log(&mut self, message: String) {
        self.messages.push_front(message);
        self.messages.truncate(MAX_MESSAGES);
    }

    fn toast(&mut self, message: String, kind: ToastKind) {
        self.next_toast_id += 1;
        self.toasts.push(Toast {
            id: self.next_toast_id,
            message,
            kind,
        });
        if self.toasts.len() > MAX_TOASTS {
            let excess = self.toasts.len() - MAX_TOASTS;
            self.toasts.drain(..excess);
        }
    }
}

/// Board position after moving `offset` steps from `position`, either way
pub fn wrap_position(position: TileIndex, offset: i32) -> TileIndex {
    (i32::from(position) + offset).rem_euclid(BOARD_SIZE as i32) as TileIndex
}
