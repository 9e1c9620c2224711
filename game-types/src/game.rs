use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::user::RoomPlayer;

/// One of the two symbols a participant plays. Player 1 always plays
/// `Rocket`; the joining player always plays `Ufo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Mark {
    Rocket,
    Ufo,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Mark::Rocket => Mark::Ufo,
            Mark::Ufo => Mark::Rocket,
        }
    }

    /// Display glyph used by the browser client.
    pub fn glyph(self) -> &'static str {
        match self {
            Mark::Rocket => "🚀",
            Mark::Ufo => "🛸",
        }
    }
}

/// Row-major 3x3 board, indexed 0-8:
/// ```text
/// 0 | 1 | 2
/// ---------
/// 3 | 4 | 5
/// ---------
/// 6 | 7 | 8
/// ```
pub type Board = [Option<Mark>; 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoomStatus {
    Waiting,
    Active,
    Finished,
}

/// Terminal result of a game. Absent from the room document while the
/// game is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Winner {
    Mark(Mark),
    Draw,
}

/// The shared room document. This is the single source of truth for a
/// game: every accepted mutation is pushed wholesale to all subscribed
/// clients, which re-render from it without merging.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Room {
    pub code: String,
    pub player1: RoomPlayer,
    pub player2: Option<RoomPlayer>,
    pub board: Board,
    pub current_turn: Mark,
    pub status: RoomStatus,
    pub winner: Option<Winner>,
    pub rematch_requested: bool,
    pub created_at: String,   // ISO 8601 string
    pub last_move_at: String, // ISO 8601 string
}

impl Room {
    pub fn player_with_mark(&self, mark: Mark) -> Option<&RoomPlayer> {
        if self.player1.mark == mark {
            return Some(&self.player1);
        }
        self.player2.as_ref().filter(|p| p.mark == mark)
    }

    pub fn player_with_mark_mut(&mut self, mark: Mark) -> Option<&mut RoomPlayer> {
        if self.player1.mark == mark {
            return Some(&mut self.player1);
        }
        self.player2.as_mut().filter(|p| p.mark == mark)
    }
}

/// Lobby listing entry: just enough of a room for the room browser.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RoomSummary {
    pub code: String,
    pub player1_name: String,
    pub player2_name: Option<String>,
    pub status: RoomStatus,
    pub last_move_at: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        RoomSummary {
            code: room.code.clone(),
            player1_name: room.player1.display_name.clone(),
            player2_name: room.player2.as_ref().map(|p| p.display_name.clone()),
            status: room.status,
            last_move_at: room.last_move_at.clone(),
        }
    }
}
