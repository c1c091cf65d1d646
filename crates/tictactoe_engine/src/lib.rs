//! Pure tic-tac-toe game logic.
//!
//! This crate has no I/O and no async: boards are value snapshots, moves
//! produce new boards, and every query is a pure function. The session
//! layer in the application crate builds on these primitives.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod ai;
mod rules;
mod types;

pub use ai::select_ai_move;
pub use rules::{IllegalMove, Win, apply_move, evaluate, is_draw};
pub use types::{Board, Mark, Square};
