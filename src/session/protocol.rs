//! Wire protocol between two peers.
//!
//! Each message is a JSON object with a `type` discriminator, one object
//! per line on the channel. The set of messages is closed: dispatch is an
//! exhaustive match, so an unhandled kind is a compile error rather than a
//! silently ignored branch.

use serde::{Deserialize, Serialize};
use tictactoe_engine::Mark;

/// A protocol message exchanged over the peer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PeerMessage {
    /// A move was played; carries the full resulting board.
    Move {
        /// The nine squares after the move, row-major.
        squares: [Option<Mark>; 9],
    },
    /// The sender's display name.
    PlayerName {
        /// Chosen display name.
        name: String,
    },
    /// Asks the remote player to start a fresh game.
    NewGameRequest,
    /// The remote player agreed to the new game.
    NewGameAccepted,
    /// Offers to end the current game as a draw.
    DrawOffer,
    /// The remote player agreed to the draw.
    DrawAccepted,
    /// The sender gave up the current game.
    Resignation,
}
