//! Game room management.
//!
//! A room owns one authoritative `GameState`. Members are seated in the engine
//! as they join, so `members[i]` always plays engine seat `i`. Seats past the
//! last member are bots added by the host, who also submits their actions.

use monopoly_core::{GameAction, GameError, GameState, GameStatus, PlayerId, PlayerSeat, StdGameRng};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus, ServerMessage};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("The roster must keep every member in their seat")]
    RosterMismatch,

    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

/// A connected member of a room.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
}

/// What an accepted action did to the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The snapshot moved on and should be broadcast
    pub changed: bool,
    /// Why the engine refused, if it did
    pub refusal: Option<String>,
}

/// A game room that can hold multiple players.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
    /// In seat order
    pub members: Vec<RoomMember>,
    pub game: GameState,
    rng: StdGameRng,
}

impl GameRoom {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        max_players: u8,
    ) -> Result<Self, RoomError> {
        let mut room = Self {
            id,
            name: format!("{}'s Game", host_name.trim()),
            max_players,
            host_id,
            status: RoomStatus::Waiting,
            members: Vec::new(),
            game: GameState::lobby(),
            rng: StdGameRng::from_entropy(),
        };
        room.add_player(host_id, host_name)?;
        Ok(room)
    }

    pub fn is_full(&self) -> bool {
        self.game.players.len() >= self.max_players as usize
    }

    /// Engine seat of a member
    pub fn seat_of(&self, player_id: Uuid) -> Option<PlayerId> {
        self.members
            .iter()
            .position(|m| m.id == player_id)
            .map(|seat| seat as PlayerId)
    }

    /// Seat a new member. Returns their seat.
    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<PlayerId, RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        // Bots sit after the members; drop them so the newcomer's seat lines up
        while self.game.players.len() > self.members.len() {
            let last = (self.game.players.len() - 1) as PlayerId;
            self.game.unseat_player(last).map_err(engine_error)?;
        }

        let seat = self.game.seat_player(&name, false).map_err(engine_error)?;
        self.members.push(RoomMember {
            id: player_id,
            name: name.trim().to_string(),
            connected: true,
        });
        Ok(seat)
    }

    /// Remove a member from the lobby. Returns true if the room is now empty.
    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::PlayerNotInRoom)?;
        if self.status == RoomStatus::Waiting {
            self.game.unseat_player(seat).map_err(engine_error)?;
            self.members.remove(seat as usize);
        } else {
            // The seat stays in the game; only the connection goes
            self.set_player_connected(player_id, false);
        }

        // If host left, assign new host
        if player_id == self.host_id {
            if let Some(next) = self.members.iter().find(|m| m.connected) {
                self.host_id = next.id;
            }
        }

        Ok(!self.members.iter().any(|m| m.connected))
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(member) = self.members.iter_mut().find(|m| m.id == player_id) {
            member.connected = connected;
        }
    }

    /// Gate an action by who sent it, then run it through the engine.
    pub fn apply_action(
        &mut self,
        player_id: Uuid,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::PlayerNotInRoom)?;

        if action.is_host_only() {
            if player_id != self.host_id {
                return Err(RoomError::NotHost);
            }
            if self.status != RoomStatus::Waiting {
                return Err(RoomError::GameAlreadyStarted);
            }
            if let GameAction::SetPlayers { players } = &action {
                self.check_roster(players)?;
            }
        } else if self.status == RoomStatus::Waiting {
            return Err(RoomError::GameNotStarted);
        }

        // Toasts are shared by the table, so any member may dismiss one
        if !action.is_host_only() && !matches!(action, GameAction::ClearToast { .. }) {
            let current = self.game.current_player_index;
            let bot_turn = self
                .game
                .current_player()
                .is_some_and(|p| p.is_ai && current as usize >= self.members.len());
            let allowed = seat == current || (bot_turn && player_id == self.host_id);
            if !allowed {
                return Err(RoomError::NotYourTurn);
            }
        }

        let before = self.game.version;
        let result = self.game.apply(&action, &mut self.rng);

        self.status = match self.game.game_status {
            GameStatus::Setup | GameStatus::Lobby => RoomStatus::Waiting,
            GameStatus::Playing => RoomStatus::InGame,
            GameStatus::GameOver => RoomStatus::Finished,
        };

        match result {
            Ok(()) => Ok(ActionOutcome {
                changed: true,
                refusal: None,
            }),
            Err(GameError::Rejected(reason)) => Err(RoomError::InvalidAction(reason.to_string())),
            Err(err) => Ok(ActionOutcome {
                changed: self.game.version != before,
                refusal: Some(err.to_string()),
            }),
        }
    }

    /// A host roster must seat every member first, by name and in order
    fn check_roster(&self, seats: &[PlayerSeat]) -> Result<(), RoomError> {
        if seats.len() < self.members.len() || seats.len() > self.max_players as usize {
            return Err(RoomError::RosterMismatch);
        }
        let keeps_members = self
            .members
            .iter()
            .zip(seats)
            .all(|(member, seat)| seat.name.trim() == member.name && !seat.is_ai);
        let rest_are_bots = seats[self.members.len()..].iter().all(|seat| seat.is_ai);
        if keeps_members && rest_are_bots {
            Ok(())
        } else {
            Err(RoomError::RosterMismatch)
        }
    }

    /// The current state, ready to broadcast
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::Snapshot {
            room_id: self.id,
            state_version: self.game.version,
            state: Box::new(self.game.clone()),
        }
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .members
                .iter()
                .enumerate()
                .map(|(seat, m)| PlayerInfo {
                    id: m.id,
                    name: m.name.clone(),
                    seat: seat as PlayerId,
                    connected: m.connected,
                })
                .collect(),
            max_players: self.max_players,
            host_id: self.host_id,
            status: self.status,
        }
    }
}

fn engine_error(err: GameError) -> RoomError {
    RoomError::InvalidAction(err.to_string())
}
