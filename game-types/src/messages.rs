use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::game::{Mark, Room, RoomSummary};
use crate::user::{LeaderboardEntry, PlayerIdentity};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ClientMessage {
    Register { display_name: String },
    CreateRoom,
    JoinRandom,
    /// Join a specific room, e.g. from a `?room=<code>` invite link.
    JoinRoom { code: String },
    MakeMove { cell: usize },
    Rematch,
    LeaveRoom,
    ListRooms,
    GetLeaderboard,
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ServerMessage {
    Registered { player: PlayerIdentity },
    RegistrationFailed { reason: String },
    RoomJoined { room: Room, your_mark: Mark },
    /// The full current room document, pushed on every change.
    RoomUpdate { room: Room },
    /// The room document was deleted; treat as session termination.
    RoomClosed { code: String },
    RoomList { rooms: Vec<RoomSummary> },
    Leaderboard { entries: Vec<LeaderboardEntry> },
    Error { message: String },
}
