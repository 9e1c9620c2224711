use game_core::{apply_move, create_room, join_room, MoveOutcome};
use game_types::{Board, Mark, PlayerIdentity, Room};
use uuid::Uuid;

/// Creates a guest identity with the given display name
pub fn create_test_identity(name: &str) -> PlayerIdentity {
    PlayerIdentity {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        is_guest: true,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Creates a waiting room owned by "Alice"
pub fn create_waiting_room() -> Room {
    create_room("TEST42".to_string(), &create_test_identity("Alice"))
}

/// Creates an active room with Alice (Rocket) and Bob (Ufo)
pub fn create_active_room() -> Room {
    let mut room = create_waiting_room();
    join_room(&mut room, &create_test_identity("Bob")).unwrap();
    room
}

/// Builds a board directly from (cell, mark) pairs
pub fn board_from(marks: &[(usize, Mark)]) -> Board {
    let mut board: Board = [None; 9];
    for &(cell, mark) in marks {
        board[cell] = Some(mark);
    }
    board
}

/// Plays a sequence of moves, asserting each one is accepted
pub fn play_moves(room: &mut Room, moves: &[(Mark, usize)]) {
    for &(mark, cell) in moves {
        let result = apply_move(room, mark, cell);
        assert_ne!(
            result,
            MoveOutcome::Ignored,
            "move {:?} at {} was ignored",
            mark,
            cell
        );
    }
}
