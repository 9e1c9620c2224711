use game_types::{PlayerIdentity, ServerMessage};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One live WebSocket session. `room_code` is the room whose document
/// pushes this connection receives; `identity` is set once the client
/// registers a display name.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub identity: Option<PlayerIdentity>,
    pub room_code: Option<String>,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            identity: None,
            room_code: None,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn set_identity(&mut self, identity: PlayerIdentity) {
        self.identity = Some(identity);
    }

    pub fn set_room(&mut self, room_code: Option<String>) {
        self.room_code = room_code;
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    pub async fn remove_connection(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        connections.remove(&id);
    }

    pub async fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        let connections = self.connections.read().await;
        connections.get(&id).cloned()
    }

    /// Registration is purely per-connection: the same display name may
    /// be registered from several tabs and each gets its own identity.
    pub async fn register_identity(
        &self,
        id: ConnectionId,
        identity: PlayerIdentity,
    ) -> Result<(), String> {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.set_identity(identity);
            Ok(())
        } else {
            Err("Connection not found".to_string())
        }
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    /// Push a document change to every connection subscribed to a room.
    pub async fn send_to_room(&self, room_code: &str, message: ServerMessage) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if let Some(ref code) = connection.room_code {
                if code == room_code {
                    let _ = connection.send_message(message.clone());
                }
            }
        }
    }

    pub async fn send_to_room_except(
        &self,
        room_code: &str,
        except_connection: ConnectionId,
        message: ServerMessage,
    ) {
        let connections = self.connections.read().await;
        for connection in connections.values() {
            if connection.id != except_connection {
                if let Some(ref code) = connection.room_code {
                    if code == room_code {
                        let _ = connection.send_message(message.clone());
                    }
                }
            }
        }
    }

    pub async fn set_connection_room(&self, id: ConnectionId, room_code: Option<String>) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.set_room(room_code);
        }
    }

    pub async fn get_connections_in_room(&self, room_code: &str) -> Vec<ConnectionId> {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|conn| conn.room_code.as_deref() == Some(room_code))
            .map(|conn| conn.id)
            .collect()
    }

    pub async fn cleanup_inactive_connections(&self, timeout: Duration) {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        for connection_id in inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            self.remove_connection(connection_id).await;
        }
    }

    // Test helper
    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn identity(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
            is_guest: true,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.remove_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_same_display_name_can_register_twice() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();

        let _receiver1 = manager.create_connection(conn_id1).await;
        let _receiver2 = manager.create_connection(conn_id2).await;

        manager
            .register_identity(conn_id1, identity("Alice"))
            .await
            .unwrap();
        manager
            .register_identity(conn_id2, identity("Alice"))
            .await
            .unwrap();

        let conn1 = manager.get_connection(conn_id1).await.unwrap();
        let conn2 = manager.get_connection(conn_id2).await.unwrap();
        let id1 = conn1.identity.unwrap();
        let id2 = conn2.identity.unwrap();

        // Same name, distinct identities
        assert_eq!(id1.display_name, id2.display_name);
        assert_ne!(id1.id, id2.id);
    }

    #[tokio::test]
    async fn test_register_on_missing_connection_fails() {
        let manager = ConnectionManager::new();
        let result = manager
            .register_identity(ConnectionId::new(), identity("Ghost"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;

        let short_timeout = Duration::from_millis(10);
        manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let result = manager
            .send_to_connection(
                conn_id,
                ServerMessage::Error {
                    message: "test".to_string(),
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Connection not found");
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(
                conn_id,
                ServerMessage::Error {
                    message: "test".to_string(),
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_room_subscription_and_push() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();
        let conn_id3 = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;
        let mut receiver3 = manager.create_connection(conn_id3).await;

        manager
            .set_connection_room(conn_id1, Some("ABC123".to_string()))
            .await;
        manager
            .set_connection_room(conn_id2, Some("ABC123".to_string()))
            .await;
        manager
            .set_connection_room(conn_id3, Some("ZZZ999".to_string()))
            .await;

        manager
            .send_to_room(
                "ABC123",
                ServerMessage::RoomClosed {
                    code: "ABC123".to_string(),
                },
            )
            .await;

        assert!(receiver1.try_recv().is_ok());
        assert!(receiver2.try_recv().is_ok());
        assert!(receiver3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_room_except_skips_sender() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;

        manager
            .set_connection_room(conn_id1, Some("ABC123".to_string()))
            .await;
        manager
            .set_connection_room(conn_id2, Some("ABC123".to_string()))
            .await;

        manager
            .send_to_room_except(
                "ABC123",
                conn_id1,
                ServerMessage::RoomClosed {
                    code: "ABC123".to_string(),
                },
            )
            .await;

        assert!(receiver1.try_recv().is_err());
        assert!(receiver2.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let manager = std::sync::Arc::new(ConnectionManager::new());
        let mut handles = Vec::new();

        for i in 0..50 {
            let manager_clone = manager.clone();
            let handle = tokio::spawn(async move {
                let conn_id = ConnectionId::new();
                let _receiver = manager_clone.create_connection(conn_id).await;

                tokio::time::sleep(Duration::from_millis(1)).await;

                manager_clone
                    .register_identity(conn_id, identity(&format!("player_{}", i)))
                    .await
                    .unwrap();
                manager_clone.remove_connection(conn_id).await;
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.connection_count().await, 0);
    }
}
