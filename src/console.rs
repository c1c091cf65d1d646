//! Line-oriented console frontend.
//!
//! Presentation glue only: one `select!` loop forwards stdin commands,
//! transport events, and the AI deadline to the coordinator, then drains
//! its notices and redraws.

use anyhow::Result;
use tictactoe_p2p::{Coordinator, EndState, Mode, Notice, OfferState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::debug;

const HELP: &str = "\
Commands:
  move <0-8>   place your mark on the numbered square
  host         enable multiplayer and print the ID to share
  join <id>    connect to a hosting player
  leave        drop multiplayer and return to playing the AI
  new          start a new game (asks the peer when connected)
  draw         offer the peer a draw
  accept       accept a pending draw offer or new-game request
  decline      dismiss a pending draw offer or new-game request
  resign       concede the current game
  history      list the recorded board snapshots
  jump <n>     review the board as of move n
  help         show this text
  quit         exit";

/// Runs the console session until stdin closes or the player quits.
pub async fn run(name: Option<String>, bind: String) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let Some(name) = resolve_name(name, &mut lines).await? else {
        return Ok(());
    };
    let (mut session, mut net_rx) = Coordinator::new(name);
    println!("{HELP}");
    render(&session);

    loop {
        let deadline = session.ai_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut session, &bind, line.trim()).await? {
                    break;
                }
            }
            event = net_rx.recv() => {
                let Some(event) = event else { break };
                session.handle_net_event(event);
            }
            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => session.apply_ai_move(),
        }
        for notice in session.drain_notices() {
            announce(&notice);
        }
        render(&session);
    }
    Ok(())
}

async fn resolve_name(
    name: Option<String>,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<Option<String>> {
    if let Some(name) = name {
        return Ok(Some(name));
    }
    println!("Enter your name:");
    loop {
        match lines.next_line().await? {
            Some(line) if !line.trim().is_empty() => return Ok(Some(line.trim().to_string())),
            Some(_) => println!("Enter your name:"),
            None => return Ok(None),
        }
    }
}

/// Dispatches one command line. Returns `false` when the player quits.
async fn handle_command(session: &mut Coordinator, bind: &str, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("move"), Some(pos)) => match pos.parse::<usize>() {
            Ok(pos) => {
                if let Err(error) = session.submit_local_move(pos) {
                    debug!(%error, "move ignored");
                    println!("({error})");
                }
            }
            Err(_) => println!("usage: move <0-8>"),
        },
        (Some("host"), None) => match session.enable_multiplayer(bind).await {
            Ok(peer_id) => println!("Share this ID with your opponent: {peer_id}"),
            Err(error) => println!("Could not start hosting: {error:#}"),
        },
        (Some("join"), Some(remote)) => {
            if let Err(error) = session.connect(remote).await {
                println!("Could not connect: {error:#} (use 'host' first)");
            }
        }
        (Some("leave"), None) => session.disable_multiplayer(),
        (Some("new"), None) => session.request_new_game(),
        (Some("draw"), None) => session.offer_draw(),
        (Some("accept"), None) => {
            if session.draw_offer() == OfferState::Received {
                session.accept_draw();
            } else if session.new_game_offer() == OfferState::Received {
                session.accept_new_game();
            } else {
                println!("Nothing to accept.");
            }
        }
        (Some("decline"), None) => {
            session.decline_draw();
            session.decline_new_game();
        }
        (Some("resign"), None) => session.resign(),
        (Some("history"), None) => {
            for index in 0..session.history().len() {
                let marker = if index == session.current_move() { "*" } else { " " };
                if index == 0 {
                    println!("{marker} 0: game start");
                } else {
                    println!("{marker} {index}: move {index}");
                }
            }
        }
        (Some("jump"), Some(index)) => match index.parse::<usize>() {
            Ok(index) => session.jump_to(index),
            Err(_) => println!("usage: jump <move number>"),
        },
        (Some("help"), None) => println!("{HELP}"),
        (Some("quit"), None) | (Some("q"), None) => return Ok(false),
        (None, _) => {}
        _ => println!("Unknown command; try 'help'."),
    }
    Ok(true)
}

fn render(session: &Coordinator) {
    println!();
    println!("{}", session.current_board().display());

    let opponent = match session.mode() {
        Mode::Local => "the AI",
        Mode::Multiplayer => session.remote_name().unwrap_or("(awaiting opponent)"),
    };
    let mut status = format!("{} (X) vs {} (O)", session.local_name(), opponent);
    match session.end_state() {
        EndState::Ended(reason) => {
            status.push_str(&format!(" | game over: {reason}"));
        }
        EndState::InProgress => {
            status.push_str(&format!(" | {} to move", session.turn()));
            if session.is_draw() {
                status.push_str(" | board full: 'draw' to offer, 'new' to restart");
            }
        }
    }
    if session.current_move() + 1 < session.history().len() {
        status.push_str(&format!(
            " | viewing move {} of {}",
            session.current_move(),
            session.history().len() - 1
        ));
    }
    println!("{status}");
}

fn announce(notice: &Notice) {
    match notice {
        Notice::PeerConnected => println!("Peer connected."),
        Notice::PeerDisconnected => println!("Peer disconnected."),
        Notice::DrawOffered => println!("Draw offered; type 'accept' or 'decline'."),
        Notice::DrawOfferSent => println!("Draw offer sent."),
        Notice::DrawAccepted => println!("Opponent accepted the draw."),
        Notice::NewGameRequested => println!("New game requested; type 'accept' or 'decline'."),
        Notice::NewGameRequestSent => println!("New game request sent."),
        Notice::NewGameAccepted => println!("Opponent accepted the new game."),
        Notice::GameOver(reason) => println!("Game over: {reason}."),
    }
}
