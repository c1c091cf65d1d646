//! Peer-to-peer tic-tac-toe client library.
//!
//! Two layers sit on top of the [`tictactoe_engine`] crate:
//!
//! * [`net`]: TCP transport with newline-delimited JSON framing. A hosting
//!   player's bound address is the peer identity shared out-of-band.
//! * [`session`]: the [`Coordinator`], which owns move history, the AI
//!   reply timer, the peer link, and draw/new-game negotiation.
//!
//! Frontends drive the coordinator from a single event loop: they forward
//! [`NetEvent`]s, player commands, and the AI deadline to it, then render
//! whatever it exposes.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod net;
mod session;

pub use net::{Endpoint, LinkClosed, NetEvent, PeerId, PeerLink};
pub use session::{
    AI_MOVE_DELAY, Coordinator, EndReason, EndState, Mode, Notice, OfferState, PeerMessage,
};
pub use tictactoe_engine::{Board, IllegalMove, Mark, Square};
