use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::room_manager::RoomManager;
use crate::websocket::connection::{ConnectionId, ConnectionManager};
use game_core::MoveOutcome;
use game_persistence::repositories::PlayerRepository;
use game_types::{
    ClientMessage, Mark, PlayerIdentity, Room, RoomError, ServerMessage, Winner,
};

const LEADERBOARD_SIZE: u64 = 10;

#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    player_repository: Arc<PlayerRepository>,
}

impl MessageHandler {
    pub fn new(
        connection_id: ConnectionId,
        connection_manager: Arc<ConnectionManager>,
        room_manager: Arc<RoomManager>,
        player_repository: Arc<PlayerRepository>,
    ) -> Self {
        Self {
            connection_id,
            connection_manager,
            room_manager,
            player_repository,
        }
    }

    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), String> {
        // Update connection activity
        self.connection_manager
            .update_activity(self.connection_id)
            .await;

        match message {
            ClientMessage::Register { display_name } => self.handle_register(display_name).await,
            ClientMessage::CreateRoom => self.handle_create_room().await,
            ClientMessage::JoinRandom => self.handle_join_random().await,
            ClientMessage::JoinRoom { code } => self.handle_join_room(code).await,
            ClientMessage::MakeMove { cell } => self.handle_make_move(cell).await,
            ClientMessage::Rematch => self.handle_rematch().await,
            ClientMessage::LeaveRoom => self.handle_leave_room().await,
            ClientMessage::ListRooms => self.handle_list_rooms().await,
            ClientMessage::GetLeaderboard => self.handle_get_leaderboard().await,
            ClientMessage::Heartbeat => Ok(()),
        }
    }

    /// A dropped socket does not destroy its room; the idle reaper
    /// collects abandoned rooms later, and a reconnecting player can
    /// rejoin by code in the meantime.
    pub async fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.room_manager.detach_connection(self.connection_id).await;
    }

    async fn handle_register(&self, display_name: String) -> Result<(), String> {
        let display_name = display_name.trim().to_string();
        if display_name.is_empty() {
            return self
                .send_message(ServerMessage::RegistrationFailed {
                    reason: "Display name cannot be empty".to_string(),
                })
                .await;
        }

        let identity = PlayerIdentity {
            id: Uuid::new_v4(),
            display_name,
            is_guest: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let player = match self.player_repository.register(&identity).await {
            Ok(player) => player,
            Err(e) => {
                error!(
                    "Failed to persist registration for {}: {}",
                    self.connection_id, e
                );
                return self
                    .send_message(ServerMessage::RegistrationFailed {
                        reason: "Registration failed, please retry".to_string(),
                    })
                    .await;
            }
        };

        self.connection_manager
            .register_identity(self.connection_id, player.clone())
            .await?;

        info!(
            "Connection {} registered as {}",
            self.connection_id, player.display_name
        );
        self.send_message(ServerMessage::Registered { player }).await
    }

    async fn handle_create_room(&self) -> Result<(), String> {
        let Some(identity) = self.require_identity().await? else {
            return Ok(());
        };

        match self
            .room_manager
            .create_room(self.connection_id, &identity)
            .await
        {
            Ok(room) => {
                self.send_message(ServerMessage::RoomJoined {
                    room,
                    your_mark: Mark::Rocket,
                })
                .await
            }
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_join_random(&self) -> Result<(), String> {
        let Some(identity) = self.require_identity().await? else {
            return Ok(());
        };

        match self
            .room_manager
            .join_random(self.connection_id, &identity)
            .await
        {
            Ok((room, your_mark)) => self.announce_join(room, your_mark).await,
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_join_room(&self, code: String) -> Result<(), String> {
        let Some(identity) = self.require_identity().await? else {
            return Ok(());
        };

        match self
            .room_manager
            .join_by_code(self.connection_id, &identity, &code)
            .await
        {
            Ok((room, your_mark)) => self.announce_join(room, your_mark).await,
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_make_move(&self, cell: usize) -> Result<(), String> {
        let Some(identity) = self.require_identity().await? else {
            return Ok(());
        };

        match self
            .room_manager
            .make_move(self.connection_id, identity.id, cell)
            .await
        {
            // An ignored move is not an error: nothing changed, so
            // nothing is published and the client hears nothing.
            Ok((_, MoveOutcome::Ignored)) => Ok(()),
            Ok((room, MoveOutcome::Placed)) => {
                self.publish_room(room).await;
                Ok(())
            }
            Ok((room, MoveOutcome::Finished(winner))) => {
                if let Winner::Mark(mark) = winner {
                    self.credit_win(&room, mark).await;
                }
                self.publish_room(room).await;
                Ok(())
            }
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_rematch(&self) -> Result<(), String> {
        match self.room_manager.rematch(self.connection_id).await {
            Ok(room) => {
                self.publish_room(room).await;
                Ok(())
            }
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_leave_room(&self) -> Result<(), String> {
        match self.room_manager.leave_room(self.connection_id).await {
            Ok((code, subscribers)) => {
                // The subscribers were already detached from the room,
                // so this goes to each connection directly.
                for id in subscribers {
                    if let Err(e) = self
                        .connection_manager
                        .send_to_connection(id, ServerMessage::RoomClosed { code: code.clone() })
                        .await
                    {
                        warn!("Failed to notify {} of room close: {}", id, e);
                    }
                }
                Ok(())
            }
            Err(e) => self.send_room_error(e).await,
        }
    }

    async fn handle_list_rooms(&self) -> Result<(), String> {
        let rooms = self.room_manager.list_rooms().await;
        self.send_message(ServerMessage::RoomList { rooms }).await
    }

    async fn handle_get_leaderboard(&self) -> Result<(), String> {
        match self.player_repository.get_leaderboard(LEADERBOARD_SIZE).await {
            Ok(entries) => self.send_message(ServerMessage::Leaderboard { entries }).await,
            Err(e) => {
                error!("Failed to fetch leaderboard: {}", e);
                self.send_error("Failed to fetch leaderboard").await
            }
        }
    }

    /// Tell the joiner which mark they play and push the updated
    /// document to everyone else in the room.
    async fn announce_join(&self, room: Room, your_mark: Mark) -> Result<(), String> {
        let code = room.code.clone();
        self.send_message(ServerMessage::RoomJoined {
            room: room.clone(),
            your_mark,
        })
        .await?;
        self.connection_manager
            .send_to_room_except(&code, self.connection_id, ServerMessage::RoomUpdate { room })
            .await;
        Ok(())
    }

    async fn publish_room(&self, room: Room) {
        let code = room.code.clone();
        self.connection_manager
            .send_to_room(&code, ServerMessage::RoomUpdate { room })
            .await;
    }

    /// Record the win before publishing the final document, so a
    /// leaderboard fetched right after the game ends already shows it.
    async fn credit_win(&self, room: &Room, winning_mark: Mark) {
        let Some(player) = room.player_with_mark(winning_mark) else {
            return;
        };
        if let Err(e) = self
            .player_repository
            .record_win(player.user_id, &player.display_name)
            .await
        {
            error!(
                "Failed to record win for {} in room {}: {}",
                player.display_name, room.code, e
            );
        }
    }

    /// Returns the connection's identity, or sends a registration
    /// error and yields `None` so the caller can bail without
    /// tearing the connection down.
    async fn require_identity(&self) -> Result<Option<PlayerIdentity>, String> {
        let connection = self
            .connection_manager
            .get_connection(self.connection_id)
            .await
            .ok_or("Connection not found")?;

        match connection.identity {
            Some(identity) => Ok(Some(identity)),
            None => {
                self.send_room_error(RoomError::RegistrationRequired).await?;
                Ok(None)
            }
        }
    }

    async fn send_room_error(&self, error: RoomError) -> Result<(), String> {
        self.send_error(&error.to_string()).await
    }

    async fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.connection_manager
            .send_to_connection(self.connection_id, message)
            .await
    }

    async fn send_error(&self, error_message: &str) -> Result<(), String> {
        self.send_message(ServerMessage::Error {
            message: error_message.to_string(),
        })
        .await
    }
}
