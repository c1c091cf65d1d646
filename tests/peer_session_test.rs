//! Two real coordinators talking over localhost TCP.
//!
//! Each test drives both ends by hand: transport tasks push events into
//! each coordinator's channel, and the test pumps them one at a time so
//! every interleaving is explicit.

use std::time::Duration;
use tictactoe_p2p::{Coordinator, EndReason, EndState, Mark, NetEvent, Notice, OfferState};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

type Events = UnboundedReceiver<NetEvent>;

async fn pump(coordinator: &mut Coordinator, events: &mut Events) {
    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a net event")
        .expect("event channel closed");
    coordinator.handle_net_event(event);
}

/// Hosts `alice`, connects `bob`, and pumps until both names are known.
async fn connected_pair() -> (Coordinator, Events, Coordinator, Events) {
    let (mut host, mut host_events) = Coordinator::new("alice");
    let peer_id = host.enable_multiplayer("127.0.0.1:0").await.unwrap();

    let (mut guest, mut guest_events) = Coordinator::new("bob");
    guest.enable_multiplayer("127.0.0.1:0").await.unwrap();
    guest.connect(&peer_id).await.unwrap();

    pump(&mut host, &mut host_events).await; // inbound connection
    pump(&mut host, &mut host_events).await; // bob's name
    pump(&mut guest, &mut guest_events).await; // alice's name

    (host, host_events, guest, guest_events)
}

#[tokio::test]
async fn test_connecting_exchanges_names_both_ways() {
    let (mut host, _he, mut guest, _ge) = connected_pair().await;

    assert_eq!(host.remote_name(), Some("bob"));
    assert_eq!(guest.remote_name(), Some("alice"));
    assert!(host.drain_notices().contains(&Notice::PeerConnected));
    assert!(guest.drain_notices().contains(&Notice::PeerConnected));
}

#[tokio::test]
async fn test_winning_move_reported_from_both_perspectives() {
    let (mut host, mut host_events, mut guest, mut guest_events) = connected_pair().await;

    // Host plays X, guest plays O; X completes the top row.
    for (x_pos, o_pos) in [(0, 3), (1, 4)] {
        host.submit_local_move(x_pos).unwrap();
        pump(&mut guest, &mut guest_events).await;
        guest.submit_local_move(o_pos).unwrap();
        pump(&mut host, &mut host_events).await;
    }
    host.submit_local_move(2).unwrap();
    pump(&mut guest, &mut guest_events).await;

    assert_eq!(host.end_state(), EndState::Ended(EndReason::LocalWin));
    assert_eq!(
        guest.end_state(),
        EndState::Ended(EndReason::Winner(Mark::X))
    );
    assert_eq!(host.winning_line(), Some([0, 1, 2]));
    assert_eq!(guest.winning_line(), Some([0, 1, 2]));
}

#[tokio::test]
async fn test_full_board_then_negotiated_draw() {
    let (mut host, mut host_events, mut guest, mut guest_events) = connected_pair().await;

    // A full game with no winner. X: 0 2 3 7 8, O: 1 4 5 6.
    let moves = [0, 1, 2, 4, 3, 5, 7, 6, 8];
    for (index, pos) in moves.into_iter().enumerate() {
        if index % 2 == 0 {
            host.submit_local_move(pos).unwrap();
            pump(&mut guest, &mut guest_events).await;
        } else {
            guest.submit_local_move(pos).unwrap();
            pump(&mut host, &mut host_events).await;
        }
    }
    // The full board alone ends nothing.
    assert!(host.is_draw());
    assert_eq!(host.end_state(), EndState::InProgress);
    assert_eq!(guest.end_state(), EndState::InProgress);

    host.offer_draw();
    assert_eq!(host.draw_offer(), OfferState::Sent);
    pump(&mut guest, &mut guest_events).await;
    assert_eq!(guest.draw_offer(), OfferState::Received);

    guest.accept_draw();
    pump(&mut host, &mut host_events).await;
    assert_eq!(host.end_state(), EndState::Ended(EndReason::Draw));
    assert_eq!(guest.end_state(), EndState::Ended(EndReason::Draw));
}

#[tokio::test]
async fn test_resignation_reaches_the_peer() {
    let (mut host, mut host_events, mut guest, mut guest_events) = connected_pair().await;

    host.submit_local_move(0).unwrap();
    pump(&mut guest, &mut guest_events).await;

    guest.resign();
    assert_eq!(
        guest.end_state(),
        EndState::Ended(EndReason::LocalResignation)
    );
    pump(&mut host, &mut host_events).await;
    assert_eq!(
        host.end_state(),
        EndState::Ended(EndReason::OpponentResigned)
    );
}

#[tokio::test]
async fn test_new_game_negotiation_resets_both_boards() {
    let (mut host, mut host_events, mut guest, mut guest_events) = connected_pair().await;

    host.submit_local_move(0).unwrap();
    pump(&mut guest, &mut guest_events).await;
    assert_eq!(guest.history().len(), 2);

    host.request_new_game();
    assert_eq!(host.history().len(), 2);
    pump(&mut guest, &mut guest_events).await;
    assert_eq!(guest.new_game_offer(), OfferState::Received);
    assert!(guest.drain_notices().contains(&Notice::NewGameRequested));

    guest.accept_new_game();
    assert_eq!(guest.history().len(), 1);
    pump(&mut host, &mut host_events).await;
    assert_eq!(host.history().len(), 1);
    assert_eq!(host.end_state(), EndState::InProgress);
    assert!(host.drain_notices().contains(&Notice::NewGameAccepted));
}

#[tokio::test]
async fn test_second_connection_is_rejected() {
    let (mut host, mut host_events, _guest, _guest_events) = connected_pair().await;
    let peer_id = host.peer_id().unwrap().clone();

    let (mut third, mut third_events) = Coordinator::new("mallory");
    third.enable_multiplayer("127.0.0.1:0").await.unwrap();
    third.connect(&peer_id).await.unwrap();

    pump(&mut host, &mut host_events).await; // inbound, rejected
    assert_eq!(host.remote_name(), Some("bob"));

    // The dropped stream surfaces as a disconnect on the third player.
    pump(&mut third, &mut third_events).await;
    assert!(!third.is_connected());
}

#[tokio::test]
async fn test_malformed_lines_are_discarded() {
    let (mut host, mut host_events) = Coordinator::new("alice");
    let peer_id = host.enable_multiplayer("127.0.0.1:0").await.unwrap();

    let mut raw = TcpStream::connect(&peer_id).await.unwrap();
    pump(&mut host, &mut host_events).await; // inbound connection

    raw.write_all(b"not json at all\n{\"type\":\"teleport\"}\n{\"type\":\"playerName\",\"name\":\"carol\"}\n")
        .await
        .unwrap();

    // Only the well-formed message makes it through.
    pump(&mut host, &mut host_events).await;
    assert_eq!(host.remote_name(), Some("carol"));
}
