//! The session coordinator.
//!
//! One object owns the whole session: the move history, whose turn it is,
//! the peer link lifecycle, and draw/new-game negotiation. All mutation
//! happens on the caller's task; the transport feeds it [`NetEvent`]s and
//! the frontend feeds it commands, so every transition is atomic with
//! respect to both.

use crate::net::{self, Endpoint, NetEvent, PeerId, PeerLink};
use crate::session::protocol::PeerMessage;
use derive_more::Display;
use std::collections::VecDeque;
use tictactoe_engine::{Board, IllegalMove, Mark, apply_move, evaluate, is_draw, select_ai_move};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Delay before a scheduled AI reply is applied.
pub const AI_MOVE_DELAY: Duration = Duration::from_millis(500);

/// Play mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// X is the human, O is the built-in AI.
    Local,
    /// Both marks are played by people, one per peer.
    Multiplayer,
}

/// Why a finished game ended, phrased from the local player's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EndReason {
    /// A mark completed a line.
    #[display("{_0} wins")]
    Winner(Mark),
    /// The local player completed a line in multiplayer.
    #[display("you win")]
    LocalWin,
    /// Both players agreed to a draw, or the local board filled up.
    #[display("draw")]
    Draw,
    /// The remote player resigned.
    #[display("opponent resigned")]
    OpponentResigned,
    /// The local player resigned.
    #[display("you resigned")]
    LocalResignation,
}

/// Whether the current game is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndState {
    /// Moves are still being accepted.
    InProgress,
    /// The game ended; no further moves are accepted.
    Ended(EndReason),
}

/// State of a symmetric negotiation (draw offer or new-game request).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferState {
    /// No offer outstanding.
    #[default]
    None,
    /// We sent an offer and await the reply.
    Sent,
    /// The peer sent an offer awaiting our reply.
    Received,
}

/// Notification for the presentation layer, drained once per loop turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A peer link opened.
    PeerConnected,
    /// The peer link closed.
    PeerDisconnected,
    /// The peer offered a draw.
    DrawOffered,
    /// Our draw offer went out.
    DrawOfferSent,
    /// The peer accepted our draw offer.
    DrawAccepted,
    /// The peer asked for a new game.
    NewGameRequested,
    /// Our new-game request went out.
    NewGameRequestSent,
    /// The peer accepted our new-game request.
    NewGameAccepted,
    /// The game ended.
    GameOver(EndReason),
}

/// Owns one play session across games, modes, and peer connections.
pub struct Coordinator {
    local_name: String,
    remote_name: Option<String>,
    mode: Mode,
    history: Vec<Board>,
    current_move: usize,
    winning_line: Option<[usize; 3]>,
    end: EndState,
    draw_offer: OfferState,
    new_game_offer: OfferState,
    ai_deadline: Option<Instant>,
    endpoint: Option<Endpoint>,
    link: Option<PeerLink>,
    notices: VecDeque<Notice>,
    net_tx: mpsc::UnboundedSender<NetEvent>,
}

impl Coordinator {
    /// Creates a local-mode session and the event receiver its transport
    /// tasks will feed.
    pub fn new(local_name: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<NetEvent>) {
        let (net_tx, net_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            local_name: local_name.into(),
            remote_name: None,
            mode: Mode::Local,
            history: vec![Board::new()],
            current_move: 0,
            winning_line: None,
            end: EndState::InProgress,
            draw_offer: OfferState::None,
            new_game_offer: OfferState::None,
            ai_deadline: None,
            endpoint: None,
            link: None,
            notices: VecDeque::new(),
            net_tx,
        };
        (coordinator, net_rx)
    }

    // --- mode and connection lifecycle ---

    /// Switches to multiplayer: binds an endpoint, allocates the peer
    /// identity, and starts a fresh game. Idempotent once hosting.
    #[instrument(skip(self))]
    pub async fn enable_multiplayer(&mut self, bind_addr: &str) -> anyhow::Result<PeerId> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.local_id().clone());
        }
        let endpoint = Endpoint::bind(bind_addr, self.net_tx.clone()).await?;
        let peer_id = endpoint.local_id().clone();
        self.endpoint = Some(endpoint);
        self.mode = Mode::Multiplayer;
        self.start_new_game();
        info!(%peer_id, "multiplayer enabled");
        Ok(peer_id)
    }

    /// Returns to local mode, tearing down the endpoint and any open link.
    /// A no-op when already local.
    pub fn disable_multiplayer(&mut self) {
        if self.mode == Mode::Local && self.endpoint.is_none() {
            return;
        }
        info!("multiplayer disabled");
        self.link = None;
        self.endpoint = None;
        self.remote_name = None;
        self.mode = Mode::Local;
        self.start_new_game();
    }

    /// Dials the remote peer identified by `remote` and introduces the
    /// local player.
    ///
    /// # Errors
    ///
    /// Fails when multiplayer is not enabled, when a link is already open,
    /// or when the connection cannot be established.
    #[instrument(skip(self))]
    pub async fn connect(&mut self, remote: &str) -> anyhow::Result<()> {
        anyhow::ensure!(self.endpoint.is_some(), "multiplayer is not enabled");
        anyhow::ensure!(self.link.is_none(), "already connected to a peer");
        let link = net::connect(remote, self.net_tx.clone()).await?;
        self.attach_link(link);
        Ok(())
    }

    /// Applies one transport event.
    pub fn handle_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Incoming(stream) => self.accept_incoming(stream),
            NetEvent::Message(message) => self.on_peer_message(message),
            NetEvent::Disconnected => {
                if self.link.take().is_some() {
                    info!("peer disconnected");
                    self.notices.push_back(Notice::PeerDisconnected);
                }
            }
        }
    }

    fn accept_incoming(&mut self, stream: TcpStream) {
        if self.link.is_some() {
            // One opponent at a time; the session has no lobby.
            warn!("rejecting a second connection while one is open");
            drop(stream);
            return;
        }
        let link = PeerLink::spawn(stream, self.net_tx.clone());
        self.attach_link(link);
    }

    fn attach_link(&mut self, link: PeerLink) {
        self.link = Some(link);
        self.send(PeerMessage::PlayerName {
            name: self.local_name.clone(),
        });
        self.notices.push_back(Notice::PeerConnected);
    }

    // --- moves ---

    /// Plays the local player's move at `pos` for whichever mark is to
    /// move. In local mode this schedules the AI reply; in multiplayer the
    /// resulting board is transmitted to the peer.
    ///
    /// Playing from a rewound position discards the later moves first.
    ///
    /// # Errors
    ///
    /// Rejects moves on finished games, occupied squares, and positions
    /// outside the board. The session state is unchanged on error.
    #[instrument(skip(self))]
    pub fn submit_local_move(&mut self, pos: usize) -> Result<(), IllegalMove> {
        if matches!(self.end, EndState::Ended(_)) {
            return Err(IllegalMove::GameOver);
        }
        let mark = self.turn();
        let next = apply_move(self.current_board(), pos, mark)?;
        self.history.truncate(self.current_move + 1);
        self.history.push(next.clone());
        self.current_move += 1;
        debug!(pos, %mark, move_number = self.current_move, "move applied");

        self.settle_board_outcome(true);
        if self.mode == Mode::Multiplayer {
            // Fire and forget: a lost link surfaces as Disconnected.
            self.send(PeerMessage::Move {
                squares: next.to_marks(),
            });
        }
        self.schedule_ai();
        Ok(())
    }

    /// Applies the pending AI reply, if one is still due.
    ///
    /// Called by the frontend when the deadline from [`Self::ai_deadline`]
    /// elapses. Re-checks every condition first, since the board may have
    /// changed while the timer ran.
    pub fn apply_ai_move(&mut self) {
        self.ai_deadline = None;
        if self.mode != Mode::Local
            || matches!(self.end, EndState::Ended(_))
            || self.turn() != Mark::O
        {
            return;
        }
        let Some(pos) = select_ai_move(self.current_board(), Mark::O) else {
            return;
        };
        if let Err(error) = self.submit_local_move(pos) {
            warn!(%error, pos, "AI selected an unplayable square");
        }
    }

    /// Moves the history cursor to `move_index` without touching the
    /// stored boards. Out-of-range indices are ignored.
    pub fn jump_to(&mut self, move_index: usize) {
        if move_index >= self.history.len() {
            return;
        }
        self.current_move = move_index;
        self.schedule_ai();
    }

    fn settle_board_outcome(&mut self, local_move: bool) {
        if let Some(win) = evaluate(self.current_board()) {
            self.winning_line = Some(win.line);
            let reason = if self.mode == Mode::Multiplayer && local_move {
                EndReason::LocalWin
            } else {
                EndReason::Winner(win.mark)
            };
            self.end_game(reason);
        } else if self.mode == Mode::Local && is_draw(self.current_board()) {
            // In multiplayer a full board waits for a negotiated draw.
            self.end_game(EndReason::Draw);
        }
    }

    fn schedule_ai(&mut self) {
        let due = self.mode == Mode::Local
            && matches!(self.end, EndState::InProgress)
            && self.turn() == Mark::O;
        self.ai_deadline = due.then(|| Instant::now() + AI_MOVE_DELAY);
    }

    // --- peer messages ---

    fn on_peer_message(&mut self, message: PeerMessage) {
        debug!(?message, "peer message");
        match message {
            PeerMessage::Move { squares } => {
                if matches!(self.end, EndState::Ended(_)) {
                    // The move crossed our game end on the wire; the end
                    // state is terminal until a new game starts.
                    debug!("discarding move for an ended game");
                    return;
                }
                // The peer sends the full board; append it and snap the
                // cursor to the present even if we were reviewing history.
                self.history.push(Board::from_marks(squares));
                self.current_move = self.history.len() - 1;
                self.settle_board_outcome(false);
            }
            PeerMessage::PlayerName { name } => {
                info!(%name, "peer introduced itself");
                self.remote_name = Some(name);
            }
            PeerMessage::NewGameRequest => {
                self.new_game_offer = OfferState::Received;
                self.notices.push_back(Notice::NewGameRequested);
            }
            PeerMessage::NewGameAccepted => {
                self.notices.push_back(Notice::NewGameAccepted);
                self.start_new_game();
            }
            PeerMessage::DrawOffer => {
                self.draw_offer = OfferState::Received;
                self.notices.push_back(Notice::DrawOffered);
            }
            PeerMessage::DrawAccepted => {
                if matches!(self.end, EndState::Ended(_)) {
                    return;
                }
                self.notices.push_back(Notice::DrawAccepted);
                self.end_game(EndReason::Draw);
            }
            PeerMessage::Resignation => {
                if !matches!(self.end, EndState::Ended(_)) {
                    self.end_game(EndReason::OpponentResigned);
                }
            }
        }
    }

    // --- negotiation ---

    /// Offers the peer a draw. Ignored without an open link, after the
    /// game has ended, or while a draw offer is already outstanding.
    pub fn offer_draw(&mut self) {
        if self.link.is_none()
            || matches!(self.end, EndState::Ended(_))
            || self.draw_offer != OfferState::None
        {
            debug!("draw offer not applicable");
            return;
        }
        self.send(PeerMessage::DrawOffer);
        self.draw_offer = OfferState::Sent;
        self.notices.push_back(Notice::DrawOfferSent);
    }

    /// Accepts the peer's pending draw offer, ending the game as a draw
    /// on both sides. Ignored when no offer is pending.
    pub fn accept_draw(&mut self) {
        if self.draw_offer != OfferState::Received {
            return;
        }
        self.send(PeerMessage::DrawAccepted);
        self.end_game(EndReason::Draw);
    }

    /// Discards the peer's pending draw offer. Nothing is sent; the play
    /// simply continues.
    pub fn decline_draw(&mut self) {
        if self.draw_offer == OfferState::Received {
            self.draw_offer = OfferState::None;
        }
    }

    /// Concedes the current game. Ignored without an open link or after
    /// the game has ended.
    pub fn resign(&mut self) {
        if self.link.is_none() || matches!(self.end, EndState::Ended(_)) {
            return;
        }
        self.send(PeerMessage::Resignation);
        self.end_game(EndReason::LocalResignation);
    }

    /// Starts a new game. With an open link this asks the peer for
    /// agreement first; otherwise the board resets immediately.
    pub fn request_new_game(&mut self) {
        if self.link.is_none() {
            self.start_new_game();
            return;
        }
        if self.new_game_offer != OfferState::None {
            return;
        }
        self.send(PeerMessage::NewGameRequest);
        self.new_game_offer = OfferState::Sent;
        self.notices.push_back(Notice::NewGameRequestSent);
    }

    /// Accepts the peer's pending new-game request and resets the board.
    /// Ignored when no request is pending.
    pub fn accept_new_game(&mut self) {
        if self.new_game_offer != OfferState::Received {
            return;
        }
        self.send(PeerMessage::NewGameAccepted);
        self.start_new_game();
    }

    /// Discards the peer's pending new-game request.
    pub fn decline_new_game(&mut self) {
        if self.new_game_offer == OfferState::Received {
            self.new_game_offer = OfferState::None;
        }
    }

    fn start_new_game(&mut self) {
        info!("starting a new game");
        self.history = vec![Board::new()];
        self.current_move = 0;
        self.winning_line = None;
        self.end = EndState::InProgress;
        self.draw_offer = OfferState::None;
        self.new_game_offer = OfferState::None;
        self.ai_deadline = None;
    }

    fn end_game(&mut self, reason: EndReason) {
        info!(%reason, "game over");
        self.end = EndState::Ended(reason);
        self.draw_offer = OfferState::None;
        self.new_game_offer = OfferState::None;
        self.ai_deadline = None;
        self.notices.push_back(Notice::GameOver(reason));
    }

    fn send(&self, message: PeerMessage) {
        let Some(link) = &self.link else {
            debug!("no open link; message dropped");
            return;
        };
        if let Err(error) = link.send(message) {
            warn!(%error, "transmit failed");
        }
    }

    // --- accessors ---

    /// The local player's display name.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// The remote player's display name, once introduced.
    pub fn remote_name(&self) -> Option<&str> {
        self.remote_name.as_deref()
    }

    /// Current play mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The identity to share with an opponent, once hosting.
    pub fn peer_id(&self) -> Option<&PeerId> {
        self.endpoint.as_ref().map(Endpoint::local_id)
    }

    /// True while a peer link is open.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// The board at the history cursor.
    pub fn current_board(&self) -> &Board {
        &self.history[self.current_move]
    }

    /// Every board snapshot so far, oldest first.
    pub fn history(&self) -> &[Board] {
        &self.history
    }

    /// The history cursor (0 is the empty board).
    pub fn current_move(&self) -> usize {
        self.current_move
    }

    /// The mark to move at the cursor position.
    pub fn turn(&self) -> Mark {
        if self.current_move.is_multiple_of(2) {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// Whether the current game has ended, and why.
    pub fn end_state(&self) -> EndState {
        self.end
    }

    /// The completed line once a game is won.
    pub fn winning_line(&self) -> Option<[usize; 3]> {
        self.winning_line
    }

    /// True when the board at the cursor is full with no winner.
    pub fn is_draw(&self) -> bool {
        is_draw(self.current_board())
    }

    /// Draw negotiation state.
    pub fn draw_offer(&self) -> OfferState {
        self.draw_offer
    }

    /// New-game negotiation state.
    pub fn new_game_offer(&self) -> OfferState {
        self.new_game_offer
    }

    /// When the pending AI reply falls due, if one is scheduled.
    pub fn ai_deadline(&self) -> Option<Instant> {
        self.ai_deadline
    }

    /// Removes and returns the queued notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}
