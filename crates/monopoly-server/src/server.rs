//! WebSocket server and connection handling.

use crate::config::ServerConfig;
use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use monopoly_core::GameAction;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    pub config: ServerConfig,
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from connection ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    fn send_error(&self, player_id: Uuid, message: impl Into<String>) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    /// Broadcast a message to every connected member of a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let members: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room
                .members
                .iter()
                .filter(|m| m.connected)
                .map(|m| m.id)
                .collect(),
            None => return,
        };
        for player_id in members {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Monopoly server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    let player_id = Uuid::new_v4();
    info!(%player_id, %addr, "client connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = serde_json::to_string(&ServerMessage::Welcome { player_id })?;
    ws_sender.send(Message::Text(welcome)).await?;

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => error!("Failed to encode message: {}", e),
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!(%player_id, "invalid message: {}", e);
                    state.send_error(player_id, format!("Invalid message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!(%player_id, "client closing connection");
                break;
            }
            Ok(Message::Ping(_)) => state.send_to_player(player_id, ServerMessage::Pong),
            Err(e) => {
                error!(%player_id, "websocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!(%player_id, "connection closed");
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
        } => {
            if state.player_rooms.contains_key(&player_id) {
                state.send_error(player_id, "Leave your current room first");
                return;
            }
            let room_id = Uuid::new_v4();
            let size = state.config.room_size(max_players);
            let room = match GameRoom::new(room_id, player_id, player_name, size) {
                Ok(room) => room,
                Err(e) => {
                    state.send_error(player_id, e.to_string());
                    return;
                }
            };
            let room_info = room.to_info();
            let snapshot = room.snapshot();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            info!(%room_id, host = %player_id, max_players = size, "room created");

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(
                player_id,
                ServerMessage::JoinedRoom {
                    room: room_info,
                    seat: 0,
                },
            );
            state.send_to_player(player_id, snapshot);
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            if state.player_rooms.contains_key(&player_id) {
                state.send_error(player_id, "Leave your current room first");
                return;
            }
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(player_id, RoomError::RoomNotFound.to_string());
                return;
            };
            match room.add_player(player_id, player_name) {
                Ok(seat) => {
                    let room_info = room.to_info();
                    let snapshot = room.snapshot();
                    drop(room); // Release lock before broadcasting

                    state.player_rooms.insert(player_id, room_id);
                    info!(%room_id, %player_id, seat, "player joined");

                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                            seat,
                        },
                    );
                    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
                    state.broadcast_to_room(room_id, snapshot);
                }
                Err(e) => {
                    drop(room);
                    state.send_error(player_id, e.to_string());
                }
            }
        }

        ClientMessage::LeaveRoom => {
            if leave_room(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::Action { action } => handle_action(player_id, action, state),

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Run an engine action for a player and broadcast the new snapshot.
fn handle_action(player_id: Uuid, action: GameAction, state: &Arc<ServerState>) {
    let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
        state.send_error(player_id, "Not in a room");
        return;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        state.send_error(player_id, RoomError::RoomNotFound.to_string());
        return;
    };

    let tag = action.tag();
    match room.apply_action(player_id, action) {
        Ok(outcome) => {
            let snapshot = outcome.changed.then(|| room.snapshot());
            let room_info = room.to_info();
            let status = room.status;
            drop(room);

            debug!(%room_id, %player_id, action = tag, refusal = ?outcome.refusal, "action applied");
            if let Some(refusal) = outcome.refusal {
                state.send_error(player_id, refusal);
            }
            if let Some(snapshot) = snapshot {
                state.broadcast_to_room(room_id, snapshot);
            }
            if matches!(tag, "START_GAME" | "SET_PLAYERS") || status == RoomStatus::Finished {
                state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
            }
            if status == RoomStatus::Finished {
                info!(%room_id, "game finished");
            }
        }
        Err(e) => {
            drop(room);
            warn!(%room_id, %player_id, action = tag, "action refused: {}", e);
            state.send_error(player_id, e.to_string());
        }
    }
}

/// Take a player out of their room. Returns false if they were not in one.
fn leave_room(player_id: Uuid, state: &Arc<ServerState>) -> bool {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return false;
    };

    let update = match state.rooms.get_mut(&room_id) {
        Some(mut room) => match room.remove_player(player_id) {
            Ok(true) => None,
            Ok(false) => Some((room.to_info(), room.snapshot())),
            Err(e) => {
                warn!(%room_id, %player_id, "leave failed: {}", e);
                return true;
            }
        },
        None => return true,
    };

    match update {
        Some((room_info, snapshot)) => {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
            state.broadcast_to_room(room_id, snapshot);
        }
        None => {
            state.rooms.remove(&room_id);
            info!(%room_id, "room closed");
        }
    }
    true
}

/// Handle player disconnect.
///
/// In the lobby the seat is given up; during a game it stays and is marked
/// disconnected.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    leave_room(player_id, state);
}
