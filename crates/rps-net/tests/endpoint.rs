// crates/rps-net/tests/endpoint.rs
use std::time::Duration;

use rps_core::{Message, ResponseCode};
use rps_net::{CancellationToken, Endpoint, FramedReader};
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn send_then_receive_over_a_stream() {
    let sender = Endpoint::new("alice");
    let receiver = Endpoint::new("Server");
    let (mut a, b) = tokio::io::duplex(4096);
    let mut b = FramedReader::new(b);
    let cancel = CancellationToken::new();

    let msg = Message::play("alice", "Stein");
    sender.send_message(&mut a, &msg).await.unwrap();

    let received = receiver.receive_message(&mut b, &cancel).await;
    assert_eq!(received, Some(msg));
}

#[tokio::test]
async fn coalesced_and_split_writes_are_reassembled() {
    let endpoint = Endpoint::new("alice");
    let (mut a, b) = tokio::io::duplex(4096);
    let mut b = FramedReader::new(b);
    let cancel = CancellationToken::new();

    // Two messages in one write, then one message in two writes.
    a.write_all(b"{\"Code\":\"ACK\"}<|EOM|>{\"Code\":\"SOL\",\"Text\":\"You Win!\"}<|EOM|>")
        .await
        .unwrap();
    assert_eq!(
        endpoint.receive_message(&mut b, &cancel).await,
        Some(Message::new(ResponseCode::Ack))
    );
    assert_eq!(
        endpoint.receive_message(&mut b, &cancel).await,
        Some(Message::new(ResponseCode::Solution).with_text("You Win!"))
    );

    a.write_all(b"{\"Code\":").await.unwrap();
    a.flush().await.unwrap();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        a.write_all(b"\"END\"}<|EOM|>").await.unwrap();
        a
    });
    assert_eq!(
        endpoint.receive_message(&mut b, &cancel).await,
        Some(Message::new(ResponseCode::End))
    );
    drop(writer.await.unwrap());
}

#[tokio::test]
async fn closed_peer_is_no_message() {
    let endpoint = Endpoint::new("alice");
    let (a, b) = tokio::io::duplex(64);
    let mut b = FramedReader::new(b);
    drop(a);

    let received = endpoint
        .receive_message(&mut b, &CancellationToken::new())
        .await;
    assert_eq!(received, None);
}

#[tokio::test]
async fn cancelled_receive_is_no_message() {
    let endpoint = Endpoint::new("alice");
    let (_a, b) = tokio::io::duplex(64);
    let mut b = FramedReader::new(b);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let received = tokio::time::timeout(
        Duration::from_secs(1),
        endpoint.receive_message(&mut b, &cancel),
    )
    .await
    .expect("receive should observe cancellation");
    assert_eq!(received, None);
}

#[tokio::test]
async fn garbage_is_no_message() {
    let endpoint = Endpoint::new("alice");
    let (mut a, b) = tokio::io::duplex(64);
    let mut b = FramedReader::new(b);
    a.write_all(b"hello<|EOM|>").await.unwrap();

    let received = endpoint
        .receive_message(&mut b, &CancellationToken::new())
        .await;
    assert_eq!(received, None);
}

#[tokio::test]
async fn viable_codes_keep_the_endpoint_alive() {
    let endpoint = Endpoint::new("alice");

    for code in [
        ResponseCode::Move,
        ResponseCode::Solution,
        ResponseCode::Ack,
        ResponseCode::Connect,
    ] {
        assert!(endpoint.process_response(&Message::new(code)));
    }
    assert!(!endpoint.is_disposed());
    assert!(!endpoint.closed().is_cancelled());
}

#[tokio::test]
async fn terminal_codes_dispose_the_endpoint() {
    for code in [ResponseCode::End, ResponseCode::Refused, ResponseCode::Unknown] {
        let endpoint = Endpoint::new("alice");
        assert!(!endpoint.process_response(&Message::new(code)));
        assert!(endpoint.is_disposed());
        assert!(endpoint.closed().is_cancelled());

        // Disposing again is harmless.
        endpoint.dispose();
    }
}

#[tokio::test]
async fn dispose_cancels_run_loop_and_child_supervisors() {
    let endpoint = Endpoint::new("alice");
    let loops = endpoint.child_supervisor("loops");
    let (run_tx, run_rx) = tokio::sync::oneshot::channel();
    let (loop_tx, loop_rx) = tokio::sync::oneshot::channel();

    endpoint.start(|token| async move {
        token.cancelled().await;
        let _ = run_tx.send(());
        Ok(())
    });
    loops.start("loop", |token| async move {
        token.cancelled().await;
        let _ = loop_tx.send(());
        Ok(())
    });

    endpoint.dispose();

    tokio::time::timeout(Duration::from_secs(1), run_rx).await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(1), loop_rx).await.unwrap().unwrap();
}
