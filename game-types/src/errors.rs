use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RoomError {
    #[error("Room {code} not found")]
    RoomNotFound { code: String },
    #[error("Room {code} is already full")]
    RoomFull { code: String },
    #[error("Not in a room")]
    NotInRoom,
    #[error("Already in room {code}")]
    AlreadyInRoom { code: String },
    #[error("Game is not finished")]
    GameNotFinished,
    #[error("Registration required")]
    RegistrationRequired,
}
