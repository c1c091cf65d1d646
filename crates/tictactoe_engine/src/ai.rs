//! Heuristic move selection.

use crate::rules::{apply_move, evaluate};
use crate::types::{Board, Mark};
use rand::Rng;
use tracing::instrument;

const CENTER: usize = 4;
const CORNERS: [usize; 4] = [0, 2, 6, 8];
const EDGES: [usize; 4] = [1, 3, 5, 7];

/// Picks a move for `ai` using a fixed priority order:
///
/// 1. complete a winning line,
/// 2. block the opponent's winning line,
/// 3. take the center,
/// 4. take a random empty corner,
/// 5. take a random empty edge.
///
/// Returns `None` when the board is full. Steps 1-3 are deterministic;
/// 4 and 5 choose uniformly among the empty candidates.
#[instrument]
pub fn select_ai_move(board: &Board, ai: Mark) -> Option<usize> {
    if let Some(pos) = winning_square(board, ai) {
        return Some(pos);
    }
    if let Some(pos) = winning_square(board, ai.opponent()) {
        return Some(pos);
    }
    if board.is_empty(CENTER) {
        return Some(CENTER);
    }

    let mut rng = rand::rng();
    for group in [CORNERS, EDGES] {
        let open: Vec<usize> = group.into_iter().filter(|&p| board.is_empty(p)).collect();
        if !open.is_empty() {
            return Some(open[rng.random_range(0..open.len())]);
        }
    }

    None
}

/// Finds an empty square that completes a line for `mark`, if any.
fn winning_square(board: &Board, mark: Mark) -> Option<usize> {
    (0..9)
        .filter(|&pos| board.is_empty(pos))
        .find(|&pos| match apply_move(board, pos, mark) {
            Ok(next) => evaluate(&next).is_some(),
            Err(_) => false,
        })
}
