use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::game::Mark;

/// A registered identity. Minted once by the server and persisted by
/// the client in local storage so it survives reloads.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlayerIdentity {
    pub id: Uuid,
    pub display_name: String,
    pub is_guest: bool,
    pub created_at: String, // ISO 8601 string
}

/// A participant inside a room document. The score is per-room and
/// resets when the room is destroyed; cumulative wins live on the
/// leaderboard instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomPlayer {
    pub user_id: Uuid,
    pub display_name: String,
    pub mark: Mark,
    pub score: i32,
}

impl RoomPlayer {
    pub fn new(identity: &PlayerIdentity, mark: Mark) -> Self {
        Self {
            user_id: identity.id,
            display_name: identity.display_name.clone(),
            mark,
            score: 0,
        }
    }
}

/// One row of the rendered leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub display_name: String,
    pub total_wins: i32,
    pub last_win_at: Option<String>, // ISO 8601 string
    pub rank: u32,
}
