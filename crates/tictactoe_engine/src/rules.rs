//! Move application and win/draw detection.

use crate::types::{Board, Mark, Square};
use derive_more::{Display, Error};
use tracing::instrument;

/// The 8 winning lines, scanned in order: rows, columns, diagonals.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // Rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // Columns
    [0, 4, 8],
    [2, 4, 6], // Diagonals
];

/// A rejected move. Recovered by ignoring the input; never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum IllegalMove {
    /// The target square already holds a mark.
    #[display("square {_0} is already occupied")]
    Occupied(#[error(not(source))] usize),
    /// The position is outside 0-8.
    #[display("position {_0} is out of bounds")]
    OutOfBounds(#[error(not(source))] usize),
    /// The board already has a winner.
    #[display("the game is already over")]
    GameOver,
}

/// A completed winning line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Win {
    /// The mark that completed the line.
    pub mark: Mark,
    /// The three cell indices of the line.
    pub line: [usize; 3],
}

/// Places `mark` at `pos`, returning the resulting board.
///
/// # Errors
///
/// Rejects occupied squares, out-of-bounds positions, and boards that
/// already have a winner. The input board is never modified.
#[instrument]
pub fn apply_move(board: &Board, pos: usize, mark: Mark) -> Result<Board, IllegalMove> {
    if pos >= 9 {
        return Err(IllegalMove::OutOfBounds(pos));
    }
    if evaluate(board).is_some() {
        return Err(IllegalMove::GameOver);
    }
    if !board.is_empty(pos) {
        return Err(IllegalMove::Occupied(pos));
    }

    let mut next = board.clone();
    next.set(pos, Square::Occupied(mark));
    Ok(next)
}

/// Scans the winning lines and returns the first completed one.
///
/// Scan order is fixed (rows, columns, diagonals), so at most one line is
/// ever reported even if a board pathologically contains two.
#[instrument]
pub fn evaluate(board: &Board) -> Option<Win> {
    for line in LINES {
        let [a, b, c] = line;
        let sq = board.get(a)?;
        if sq != Square::Empty && board.get(b) == Some(sq) && board.get(c) == Some(sq) {
            return match sq {
                Square::Occupied(mark) => Some(Win { mark, line }),
                Square::Empty => None,
            };
        }
    }

    None
}

/// True iff the board is full with no winner.
pub fn is_draw(board: &Board) -> bool {
    board.is_full() && evaluate(board).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(marks: [Option<Mark>; 9]) -> Board {
        Board::from_marks(marks)
    }

    const X: Option<Mark> = Some(Mark::X);
    const O: Option<Mark> = Some(Mark::O);
    const E: Option<Mark> = None;

    #[test]
    fn test_no_winner_empty_board() {
        assert_eq!(evaluate(&Board::new()), None);
    }

    #[test]
    fn test_winner_every_line() {
        for line in LINES {
            let mut marks = [E; 9];
            for pos in line {
                marks[pos] = X;
            }
            let win = evaluate(&board(marks)).expect("line should win");
            assert_eq!(win.mark, Mark::X);
            assert_eq!(win.line, line);
        }
    }

    #[test]
    fn test_first_line_in_scan_order_reported() {
        // Top row (X) and left column (X) both complete; rows scan first.
        let marks = [X, X, X, X, E, E, X, E, E];
        let win = evaluate(&board(marks)).unwrap();
        assert_eq!(win.line, [0, 1, 2]);
    }

    #[test]
    fn test_no_winner_incomplete_line() {
        let marks = [X, X, E, E, E, E, E, E, E];
        assert_eq!(evaluate(&board(marks)), None);
    }

    #[test]
    fn test_apply_move_produces_new_board() {
        let empty = Board::new();
        let next = apply_move(&empty, 4, Mark::X).unwrap();
        assert!(empty.is_empty(4));
        assert_eq!(next.get(4), Some(Square::Occupied(Mark::X)));
    }

    #[test]
    fn test_apply_move_rejects_occupied() {
        let b = board([X, E, E, E, E, E, E, E, E]);
        assert_eq!(apply_move(&b, 0, Mark::O), Err(IllegalMove::Occupied(0)));
    }

    #[test]
    fn test_apply_move_rejects_out_of_bounds() {
        let b = Board::new();
        assert_eq!(apply_move(&b, 9, Mark::X), Err(IllegalMove::OutOfBounds(9)));
    }

    #[test]
    fn test_apply_move_rejects_finished_board() {
        let b = board([X, X, X, O, O, E, E, E, E]);
        assert_eq!(apply_move(&b, 5, Mark::O), Err(IllegalMove::GameOver));
    }

    #[test]
    fn test_draw_detection() {
        // X O X / X O O / O X X - full, no line.
        let marks = [X, O, X, X, O, O, O, X, X];
        let b = board(marks);
        assert_eq!(evaluate(&b), None);
        assert!(is_draw(&b));
    }

    #[test]
    fn test_full_board_with_winner_is_not_draw() {
        let marks = [X, X, X, O, O, X, O, X, O];
        assert!(!is_draw(&board(marks)));
    }

    #[test]
    fn test_partial_board_is_not_draw() {
        assert!(!is_draw(&Board::new()));
    }
}
