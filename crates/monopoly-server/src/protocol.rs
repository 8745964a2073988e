//! WebSocket protocol messages for multiplayer games.

use monopoly_core::{GameAction, GameState, PlayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room and take its first seat
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        player_name: String,
        #[serde(default)]
        max_players: Option<u8>,
    },

    /// Join an existing room
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Submit an engine action
    Action { action: GameAction },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned connection ID
    #[serde(rename_all = "camelCase")]
    Welcome { player_id: Uuid },

    /// Room created successfully
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: Uuid },

    /// Joined room successfully, at the given seat
    JoinedRoom { room: RoomInfo, seat: PlayerId },

    /// Left room successfully
    LeftRoom,

    /// Room membership or status changed
    RoomUpdated { room: RoomInfo },

    /// Full game state after a transition
    #[serde(rename_all = "camelCase")]
    Snapshot {
        room_id: Uuid,
        state_version: u64,
        state: Box<GameState>,
    },

    /// List of rooms still waiting for players
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub max_players: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// A connected member of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    /// Engine seat
    pub seat: PlayerId,
    pub connected: bool,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}
