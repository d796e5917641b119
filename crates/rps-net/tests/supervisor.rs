// crates/rps-net/tests/supervisor.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rps_net::{CancellationToken, TaskSupervisor};
use tokio::sync::oneshot;

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn finished_operations_leave_the_tracked_set() {
    let tasks = TaskSupervisor::new("test");
    tasks.start("quick", |_token| async { Ok(()) });

    wait_until(|| tasks.tracked_count() == 0).await;
    assert!(!tasks.is_cancelled());
}

#[tokio::test]
async fn cancel_all_stops_every_operation_and_clears_immediately() {
    let tasks = TaskSupervisor::new("test");
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();

    tasks.start("a", |token| async move {
        token.cancelled().await;
        let _ = tx_a.send(());
        Ok(())
    });
    tasks.start("b", |token| async move {
        token.cancelled().await;
        let _ = tx_b.send(());
        Ok(())
    });
    assert_eq!(tasks.tracked_count(), 2);

    tasks.cancel_all();
    assert_eq!(tasks.tracked_count(), 0);
    assert!(tasks.is_cancelled());

    tokio::time::timeout(Duration::from_secs(1), rx_a).await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(1), rx_b).await.unwrap().unwrap();

    // Second cancel is a no-op.
    tasks.cancel_all();
    assert!(tasks.is_cancelled());
}

#[tokio::test]
async fn start_after_cancel_uses_a_fresh_token() {
    let tasks = TaskSupervisor::new("test");
    tasks.start("first", |token| async move {
        token.cancelled().await;
        Ok(())
    });
    tasks.cancel_all();

    let (tx, rx) = oneshot::channel();
    tasks.start("second", |token: CancellationToken| async move {
        let _ = tx.send(token.is_cancelled());
        token.cancelled().await;
        Ok(())
    });

    let was_cancelled = tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .unwrap()
        .unwrap();
    assert!(!was_cancelled);
    assert!(!tasks.is_cancelled());
    assert_eq!(tasks.tracked_count(), 1);

    tasks.cancel_all();
}

#[tokio::test]
async fn a_failing_operation_does_not_touch_its_siblings() {
    let tasks = TaskSupervisor::new("test");
    let survivor_stopped = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&survivor_stopped);
    tasks.start("survivor", |token| async move {
        token.cancelled().await;
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });
    tasks.start("failing", |_token| async { anyhow::bail!("boom") });

    wait_until(|| tasks.tracked_count() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(tasks.tracked_count(), 1);
    assert!(!tasks.is_cancelled());
    assert!(!survivor_stopped.load(Ordering::SeqCst));

    tasks.cancel_all();
    wait_until(|| survivor_stopped.load(Ordering::SeqCst)).await;
}

#[tokio::test]
async fn dispose_is_idempotent_and_refuses_new_work() {
    let tasks = TaskSupervisor::new("test");
    tasks.start("pending", |token| async move {
        token.cancelled().await;
        Ok(())
    });

    tasks.dispose();
    tasks.dispose();
    assert!(tasks.is_disposed());
    assert_eq!(tasks.tracked_count(), 0);

    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    tasks.start("late", |_token| async move {
        flag.store(true, Ordering::SeqCst);
        Ok(())
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(tasks.tracked_count(), 0);
}

#[tokio::test]
async fn parent_cancellation_reaches_child_operations() {
    let parent = CancellationToken::new();
    let tasks = TaskSupervisor::with_parent("child", parent.clone());
    let (tx, rx) = oneshot::channel();

    tasks.start("waiter", |token| async move {
        token.cancelled().await;
        let _ = tx.send(());
        Ok(())
    });

    parent.cancel();
    tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
    assert!(tasks.is_cancelled());
}
