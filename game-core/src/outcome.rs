use game_types::{Board, Mark};

/// The eight winning triples, evaluated in this fixed order: rows,
/// columns, diagonals. Every client must agree on this order since
/// each evaluates completed boards independently.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Win(Mark),
    Draw,
}

/// Evaluate a board. Returns the first mark holding a completed
/// triple, a draw when the board is full with no triple, and
/// `InProgress` otherwise. Pure and deterministic.
pub fn outcome(board: &Board) -> Outcome {
    for line in LINES {
        if let Some(mark) = board[line[0]] {
            if board[line[1]] == Some(mark) && board[line[2]] == Some(mark) {
                return Outcome::Win(mark);
            }
        }
    }

    if board.iter().all(|cell| cell.is_some()) {
        Outcome::Draw
    } else {
        Outcome::InProgress
    }
}
