use game_types::{Mark, PlayerIdentity, Room, RoomError, RoomPlayer, RoomStatus, Winner};
use tracing::debug;

use crate::outcome::{Outcome, outcome};

/// Result of applying a move to a room. Illegal moves are `Ignored`:
/// no state change, no error surfaced. Callers must not publish the
/// document for an ignored move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Ignored,
    Placed,
    Finished(Winner),
}

/// Create a fresh `Waiting` room with the creator as player 1. The
/// creator always plays `Rocket` and moves first.
pub fn create_room(code: String, creator: &PlayerIdentity) -> Room {
    let now = chrono::Utc::now().to_rfc3339();
    Room {
        code,
        player1: RoomPlayer::new(creator, Mark::Rocket),
        player2: None,
        board: [None; 9],
        current_turn: Mark::Rocket,
        status: RoomStatus::Waiting,
        winner: None,
        rematch_requested: false,
        created_at: now.clone(),
        last_move_at: now,
    }
}

/// Attach a second participant; flips the room to `Active`.
pub fn join_room(room: &mut Room, joiner: &PlayerIdentity) -> Result<Mark, RoomError> {
    if room.player2.is_some() {
        return Err(RoomError::RoomFull {
            code: room.code.clone(),
        });
    }
    room.player2 = Some(RoomPlayer::new(joiner, Mark::Ufo));
    room.status = RoomStatus::Active;
    Ok(Mark::Ufo)
}

/// Apply a move for `mark` at `cell`.
///
/// A legal move places the mark, flips the turn and stamps
/// `last_move_at`. A move that completes a triple or fills the board
/// sets status `Finished` and the winner, and on a win increments the
/// winning participant's score by exactly 1 in the same transition.
/// Everything else (occupied cell, wrong mover, room not active, cell
/// out of range) is ignored without touching the room.
pub fn apply_move(room: &mut Room, mark: Mark, cell: usize) -> MoveOutcome {
    if room.status != RoomStatus::Active
        || room.current_turn != mark
        || cell >= 9
        || room.board[cell].is_some()
    {
        debug!(code = %room.code, ?mark, cell, "ignoring illegal move");
        return MoveOutcome::Ignored;
    }

    room.board[cell] = Some(mark);
    room.last_move_at = chrono::Utc::now().to_rfc3339();

    match outcome(&room.board) {
        Outcome::Win(winning_mark) => {
            room.status = RoomStatus::Finished;
            room.winner = Some(Winner::Mark(winning_mark));
            if let Some(player) = room.player_with_mark_mut(winning_mark) {
                player.score += 1;
            }
            MoveOutcome::Finished(Winner::Mark(winning_mark))
        }
        Outcome::Draw => {
            room.status = RoomStatus::Finished;
            room.winner = Some(Winner::Draw);
            MoveOutcome::Finished(Winner::Draw)
        }
        Outcome::InProgress => {
            room.current_turn = mark.other();
            MoveOutcome::Placed
        }
    }
}

/// Reset a finished room for another game: board and winner cleared,
/// turn back to player 1, scores retained.
pub fn rematch(room: &mut Room) -> Result<(), RoomError> {
    if room.status != RoomStatus::Finished {
        return Err(RoomError::GameNotFinished);
    }
    room.board = [None; 9];
    room.status = RoomStatus::Active;
    room.winner = None;
    room.current_turn = room.player1.mark;
    room.rematch_requested = true;
    room.last_move_at = chrono::Utc::now().to_rfc3339();
    Ok(())
}
