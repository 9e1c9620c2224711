use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::websocket::connection::{ConnectionId, ConnectionManager};
use game_core::{MoveOutcome, apply_move, create_room, generate_room_code, join_room, rematch};
use game_types::{Mark, PlayerIdentity, Room, RoomError, RoomStatus, RoomSummary, ServerMessage};

/// Only the oldest few open rooms are considered for random matching,
/// so a burst of creators does not turn the scan into a full sweep.
const OPEN_ROOM_SCAN_LIMIT: usize = 10;
const ROOM_LIST_LIMIT: usize = 20;

#[derive(Debug)]
struct HostedRoom {
    room: Room,
    last_activity: Instant,
}

impl HostedRoom {
    fn new(room: Room) -> Self {
        Self {
            room,
            last_activity: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// In-memory store of all live room documents. Every mutation happens
/// under the write lock, so concurrent moves on the same room are
/// applied one at a time and the losing one is ignored by the turn
/// check rather than clobbering the board.
pub struct RoomManager {
    rooms: RwLock<HashMap<String, HostedRoom>>,
    connection_to_room: RwLock<HashMap<ConnectionId, String>>,
    connection_manager: Arc<ConnectionManager>,
}

impl RoomManager {
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            connection_to_room: RwLock::new(HashMap::new()),
            connection_manager,
        }
    }

    pub async fn create_room(
        &self,
        connection_id: ConnectionId,
        creator: &PlayerIdentity,
    ) -> Result<Room, RoomError> {
        self.ensure_not_in_room(connection_id).await?;

        // Codes can collide; a collision simply replaces the older
        // document, matching how the hosted store behaved.
        let code = generate_room_code();
        let room = create_room(code.clone(), creator);

        {
            let mut rooms = self.rooms.write().await;
            rooms.insert(code.clone(), HostedRoom::new(room.clone()));
        }
        self.attach(connection_id, &code).await;

        info!("Room {} created by {}", code, creator.display_name);
        Ok(room)
    }

    /// Join the oldest open room, or open a fresh one when none is
    /// waiting. Returns the room and the mark the caller plays.
    pub async fn join_random(
        &self,
        connection_id: ConnectionId,
        joiner: &PlayerIdentity,
    ) -> Result<(Room, Mark), RoomError> {
        self.ensure_not_in_room(connection_id).await?;

        let joined = {
            let mut rooms = self.rooms.write().await;

            // RFC 3339 UTC timestamps sort lexicographically, so the
            // string comparison is chronological.
            let mut waiting: Vec<(String, String)> = rooms
                .iter()
                .filter(|(_, hosted)| hosted.room.status == RoomStatus::Waiting)
                .map(|(code, hosted)| (hosted.room.created_at.clone(), code.clone()))
                .collect();
            waiting.sort();
            let candidate = waiting
                .into_iter()
                .take(OPEN_ROOM_SCAN_LIMIT)
                .map(|(_, code)| code)
                .next();

            match candidate {
                Some(code) => {
                    let hosted = rooms.get_mut(&code).ok_or(RoomError::RoomNotFound {
                        code: code.clone(),
                    })?;
                    let mark = join_room(&mut hosted.room, joiner)?;
                    hosted.touch();
                    Some((hosted.room.clone(), mark))
                }
                None => None,
            }
        };

        if let Some((room, mark)) = joined {
            self.attach(connection_id, &room.code).await;
            info!("{} matched into room {}", joiner.display_name, room.code);
            return Ok((room, mark));
        }

        let room = self.create_room(connection_id, joiner).await?;
        Ok((room, Mark::Rocket))
    }

    pub async fn join_by_code(
        &self,
        connection_id: ConnectionId,
        joiner: &PlayerIdentity,
        code: &str,
    ) -> Result<(Room, Mark), RoomError> {
        self.ensure_not_in_room(connection_id).await?;

        let (room, mark) = {
            let mut rooms = self.rooms.write().await;
            let hosted = rooms.get_mut(code).ok_or(RoomError::RoomNotFound {
                code: code.to_string(),
            })?;
            let mark = join_room(&mut hosted.room, joiner)?;
            hosted.touch();
            (hosted.room.clone(), mark)
        };

        self.attach(connection_id, code).await;
        info!("{} joined room {} by code", joiner.display_name, code);
        Ok((room, mark))
    }

    /// Apply a move for the participant behind `connection_id`. An
    /// illegal move comes back as `MoveOutcome::Ignored` with the room
    /// untouched; callers must not publish the document for it.
    pub async fn make_move(
        &self,
        connection_id: ConnectionId,
        player_id: Uuid,
        cell: usize,
    ) -> Result<(Room, MoveOutcome), RoomError> {
        let code = self
            .room_for_connection(connection_id)
            .await
            .ok_or(RoomError::NotInRoom)?;

        let mut rooms = self.rooms.write().await;
        let hosted = rooms
            .get_mut(&code)
            .ok_or(RoomError::RoomNotFound { code })?;

        let mark = if hosted.room.player1.user_id == player_id {
            hosted.room.player1.mark
        } else if let Some(ref p2) = hosted.room.player2 {
            if p2.user_id == player_id {
                p2.mark
            } else {
                return Err(RoomError::NotInRoom);
            }
        } else {
            return Err(RoomError::NotInRoom);
        };

        let outcome = apply_move(&mut hosted.room, mark, cell);
        if outcome != MoveOutcome::Ignored {
            hosted.touch();
        }
        Ok((hosted.room.clone(), outcome))
    }

    pub async fn rematch(&self, connection_id: ConnectionId) -> Result<Room, RoomError> {
        let code = self
            .room_for_connection(connection_id)
            .await
            .ok_or(RoomError::NotInRoom)?;

        let mut rooms = self.rooms.write().await;
        let hosted = rooms
            .get_mut(&code)
            .ok_or(RoomError::RoomNotFound { code })?;
        rematch(&mut hosted.room)?;
        hosted.touch();
        Ok(hosted.room.clone())
    }

    /// Delete the room outright. Returns the code and every connection
    /// that was subscribed, so the caller can push `RoomClosed`.
    pub async fn leave_room(
        &self,
        connection_id: ConnectionId,
    ) -> Result<(String, Vec<ConnectionId>), RoomError> {
        let code = self
            .room_for_connection(connection_id)
            .await
            .ok_or(RoomError::NotInRoom)?;

        let subscribers = self.connection_manager.get_connections_in_room(&code).await;

        {
            let mut rooms = self.rooms.write().await;
            rooms.remove(&code);
        }
        {
            let mut connection_to_room = self.connection_to_room.write().await;
            connection_to_room.retain(|_, c| c != &code);
        }
        for id in &subscribers {
            self.connection_manager.set_connection_room(*id, None).await;
        }

        info!("Room {} closed", code);
        Ok((code, subscribers))
    }

    /// Drop the connection's room mapping without touching the room.
    /// A dangling room is later reaped by [`cleanup_idle_rooms`].
    ///
    /// [`cleanup_idle_rooms`]: RoomManager::cleanup_idle_rooms
    pub async fn detach_connection(&self, connection_id: ConnectionId) {
        let mut connection_to_room = self.connection_to_room.write().await;
        connection_to_room.remove(&connection_id);
    }

    pub async fn get_room(&self, code: &str) -> Option<Room> {
        let rooms = self.rooms.read().await;
        rooms.get(code).map(|hosted| hosted.room.clone())
    }

    pub async fn room_for_connection(&self, connection_id: ConnectionId) -> Option<String> {
        let connection_to_room = self.connection_to_room.read().await;
        connection_to_room.get(&connection_id).cloned()
    }

    /// Lobby listing: open and running rooms, most recently active
    /// first, capped at a page.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        let mut summaries: Vec<RoomSummary> = rooms
            .values()
            .filter(|hosted| hosted.room.status != RoomStatus::Finished)
            .map(|hosted| RoomSummary::from(&hosted.room))
            .collect();
        summaries.sort_by(|a, b| b.last_move_at.cmp(&a.last_move_at));
        summaries.truncate(ROOM_LIST_LIMIT);
        summaries
    }

    /// Reap rooms nobody has moved in for `timeout`, notifying any
    /// still-subscribed connections.
    pub async fn cleanup_idle_rooms(&self, timeout: Duration) {
        let expired: Vec<String> = {
            let rooms = self.rooms.read().await;
            rooms
                .iter()
                .filter(|(_, hosted)| hosted.is_expired(timeout))
                .map(|(code, _)| code.clone())
                .collect()
        };

        for code in expired {
            info!("Reaping idle room {}", code);
            let subscribers = self.connection_manager.get_connections_in_room(&code).await;

            {
                let mut rooms = self.rooms.write().await;
                rooms.remove(&code);
            }
            {
                let mut connection_to_room = self.connection_to_room.write().await;
                connection_to_room.retain(|_, c| c != &code);
            }
            for id in subscribers {
                self.connection_manager.set_connection_room(id, None).await;
                let _ = self
                    .connection_manager
                    .send_to_connection(id, ServerMessage::RoomClosed { code: code.clone() })
                    .await;
            }
        }
    }

    // Test helper
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    async fn ensure_not_in_room(&self, connection_id: ConnectionId) -> Result<(), RoomError> {
        if let Some(code) = self.room_for_connection(connection_id).await {
            return Err(RoomError::AlreadyInRoom { code });
        }
        Ok(())
    }

    async fn attach(&self, connection_id: ConnectionId, code: &str) {
        {
            let mut connection_to_room = self.connection_to_room.write().await;
            connection_to_room.insert(connection_id, code.to_string());
        }
        self.connection_manager
            .set_connection_room(connection_id, Some(code.to_string()))
            .await;
    }
}
