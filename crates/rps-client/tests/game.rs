// crates/rps-client/tests/game.rs
use std::net::SocketAddr;
use std::time::Duration;

use rps_client::{ClientConfig, ClientEvents, ConnectionState, GameClient};
use rps_core::{Message, ResponseCode};
use rps_server::{GameServer, ServerConfig};

fn started_server() -> (GameServer, SocketAddr) {
    let server = GameServer::bind(ServerConfig::for_tests());
    server.start();
    let addr = server.local_addr().expect("test server should be listening");
    (server, addr)
}

async fn join(addr: SocketAddr, name: &str) -> (GameClient, ClientEvents) {
    let (client, events) = GameClient::start(ClientConfig::new(addr.to_string(), name));
    assert!(client.wait_established().await, "{} was not admitted", name);
    (client, events)
}

/// Next event with `code`, skipping anything else.
async fn next_event(events: &mut ClientEvents, code: ResponseCode) -> Message {
    let wait = async {
        loop {
            match events.recv().await {
                Some(msg) if msg.code == code => return msg,
                Some(_) => continue,
                None => panic!("event stream closed while waiting for {}", code),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3), wait)
        .await
        .unwrap_or_else(|_| panic!("no {} event in time", code))
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn full_round_reports_each_side_and_resets() {
    let (server, addr) = started_server();
    let (alice, mut alice_events) = join(addr, "alice").await;
    let (bob, mut bob_events) = join(addr, "bob").await;

    alice.send_local_move("Stein");
    bob.send_local_move("Schere");

    next_event(&mut alice_events, ResponseCode::Ack).await;
    next_event(&mut bob_events, ResponseCode::Ack).await;

    let alice_result = next_event(&mut alice_events, ResponseCode::Solution).await;
    let bob_result = next_event(&mut bob_events, ResponseCode::Solution).await;
    assert_eq!(alice_result.text_or_empty(), "You Win!");
    assert_eq!(bob_result.text_or_empty(), "You Lose!");

    // Both entries start the next round only after both received SOL.
    eventually(|| {
        ["alice", "bob"].iter().all(|name| {
            server
                .round_entry(name)
                .is_some_and(|e| e.round == 1 && !e.has_move() && !e.solution_delivered())
        })
    })
    .await;

    // And the next round plays out the same way.
    alice.send_local_move("Papier");
    bob.send_local_move("Papier");
    let alice_result = next_event(&mut alice_events, ResponseCode::Solution).await;
    let bob_result = next_event(&mut bob_events, ResponseCode::Solution).await;
    assert_eq!(alice_result.text_or_empty(), "That's a draw!");
    assert_eq!(bob_result.text_or_empty(), "That's a draw!");

    alice.dispose();
    bob.dispose();
    server.dispose();
}

#[tokio::test]
async fn third_client_is_refused() {
    let (server, addr) = started_server();
    let (_alice, _a) = join(addr, "alice").await;
    let (_bob, _b) = join(addr, "bob").await;

    let (carol, _c) = GameClient::start(ClientConfig::new(addr.to_string(), "carol"));

    assert!(!carol.wait_established().await);
    assert_eq!(carol.state(), ConnectionState::Refused);
    assert_eq!(server.player_count(), 2);
    assert!(server.round_entry("carol").is_none());

    server.dispose();
}

#[tokio::test]
async fn unreachable_server_closes_the_client() {
    let port = {
        let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        unused.local_addr().unwrap().port()
    };

    let config = ClientConfig::new(format!("127.0.0.1:{}", port), "alice");
    let (client, _events) = GameClient::start(config);

    assert!(!client.wait_established().await);
    assert_eq!(client.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn leaving_mid_round_frees_the_seat() {
    let (server, addr) = started_server();
    let (alice, mut alice_events) = join(addr, "alice").await;
    let (bob, _bob_events) = join(addr, "bob").await;

    alice.send_local_move("Stein");
    next_event(&mut alice_events, ResponseCode::Ack).await;

    bob.leave();
    eventually(|| server.round_entry("bob").is_none()).await;
    eventually(|| bob.state() == ConnectionState::Closed).await;
    assert_eq!(server.player_count(), 1);

    // Alice keeps her move and plays it against whoever takes the seat.
    let (carol, mut carol_events) = join(addr, "carol").await;
    carol.send_local_move("Papier");

    let alice_result = next_event(&mut alice_events, ResponseCode::Solution).await;
    let carol_result = next_event(&mut carol_events, ResponseCode::Solution).await;
    assert_eq!(alice_result.text_or_empty(), "You Lose!");
    assert_eq!(carol_result.text_or_empty(), "You Win!");

    alice.dispose();
    carol.dispose();
    server.dispose();
}

#[tokio::test]
async fn moves_queue_until_the_previous_one_is_acknowledged() {
    let (server, addr) = started_server();
    let (alice, mut alice_events) = join(addr, "alice").await;

    alice.send_local_move("Stein");
    next_event(&mut alice_events, ResponseCode::Ack).await;

    // Without an opponent no solution arrives, but later moves still
    // replace the pending one on the server.
    alice.send_local_move("Papier");
    next_event(&mut alice_events, ResponseCode::Ack).await;
    eventually(|| {
        server
            .round_entry("alice")
            .is_some_and(|e| e.pending_move == "Papier")
    })
    .await;

    alice.dispose();
    eventually(|| server.player_count() == 0).await;
    server.dispose();
}
