//! Session coordination: the peer protocol and the state machine that
//! drives games across both play modes.

mod coordinator;
mod protocol;

pub use coordinator::{
    AI_MOVE_DELAY, Coordinator, EndReason, EndState, Mode, Notice, OfferState,
};
pub use protocol::PeerMessage;
