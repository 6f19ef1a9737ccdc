use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

fn unique_db_path() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("stm-client-replay-{}.sqlite", nanos))
        .display()
        .to_string()
}

fn cleanup_db_files(path: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let candidate = format!("{path}{suffix}");
        let _ = std::fs::remove_file(candidate);
    }
}

fn store_with_ops(path: &str, count: usize) -> Arc<Mutex<Connection>> {
    let conn = db::open_connection(path).expect("store should open");
    for i in 0..count {
        let body = format!(
            r#"{{"date":"2025-06-12","code":"ADI","start":"{:02}:00","end":"{:02}:00"}}"#,
            8 + i,
            9 + i
        );
        db::enqueue(&conn, "POST", "/entries", Some(&body)).expect("enqueue should succeed");
    }
    Arc::new(Mutex::new(conn))
}

async fn queued_ids(conn: &Arc<Mutex<Connection>>) -> Vec<i64> {
    let conn = conn.lock().await;
    db::pending_in_order(&conn)
        .expect("pending snapshot should be readable")
        .iter()
        .map(|op| op.id)
        .collect()
}

fn zero_backoff(
    transport: Arc<dyn ReplayTransport>,
    conn: Arc<Mutex<Connection>>,
) -> ReplayCoordinator {
    ReplayCoordinator::with_backoff(transport, conn, Duration::ZERO, Duration::ZERO)
}

#[derive(Debug, Clone, Copy)]
enum FailureKind {
    Transport,
    Rejected,
}

#[derive(Default)]
struct MockTransport {
    failures: std::sync::Mutex<HashMap<i64, FailureKind>>,
    delivered: std::sync::Mutex<Vec<i64>>,
    attempts: AtomicUsize,
}

impl MockTransport {
    fn fail(&self, id: i64, kind: FailureKind) {
        self.failures.lock().unwrap().insert(id, kind);
    }

    fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    fn delivered_ids(&self) -> Vec<i64> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplayTransport for MockTransport {
    async fn replay(&self, op: &QueuedOp) -> Result<(), ApiError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.failures.lock().unwrap().get(&op.id).copied() {
            return Err(match kind {
                FailureKind::Transport => ApiError::Transport("connection refused".to_string()),
                FailureKind::Rejected => ApiError::Rejected {
                    status: 409,
                    code: Some("OVERLAP_DETECTED".to_string()),
                    message: "entry overlaps an existing entry on the same day".to_string(),
                },
            });
        }
        self.delivered.lock().unwrap().push(op.id);
        Ok(())
    }
}

/// Holds the first replayed operation open until the test releases it.
#[derive(Default)]
struct BlockingTransport {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ReplayTransport for BlockingTransport {
    async fn replay(&self, _op: &QueuedOp) -> Result<(), ApiError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(())
    }
}

#[tokio::test]
async fn drains_the_queue_in_fifo_order() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 3);
    let transport = Arc::new(MockTransport::default());
    let coordinator = zero_backoff(transport.clone(), conn.clone());

    let summary = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(summary.outcome, ReplayOutcome::Drained);
    assert_eq!(summary.replayed, 3);
    assert_eq!(summary.remaining, 0);
    assert_eq!(transport.delivered_ids(), vec![1, 2, 3]);
    assert!(queued_ids(&conn).await.is_empty());

    cleanup_db_files(&path);
}

#[tokio::test]
async fn a_failure_halts_the_pass_and_preserves_queue_order() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 3);
    let transport = Arc::new(MockTransport::default());
    transport.fail(2, FailureKind::Transport);
    let coordinator = zero_backoff(transport.clone(), conn.clone());

    let summary = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(summary.outcome, ReplayOutcome::Halted);
    assert_eq!(summary.replayed, 1);
    assert_eq!(summary.remaining, 2);
    assert_eq!(transport.delivered_ids(), vec![1]);
    assert_eq!(
        queued_ids(&conn).await,
        vec![2, 3],
        "the failed op and everything after it must stay queued, in order"
    );

    cleanup_db_files(&path);
}

#[tokio::test]
async fn a_rejected_operation_also_halts_the_pass() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 2);
    let transport = Arc::new(MockTransport::default());
    transport.fail(1, FailureKind::Rejected);
    let coordinator = zero_backoff(transport.clone(), conn.clone());

    let summary = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(summary.outcome, ReplayOutcome::Halted);
    assert_eq!(summary.replayed, 0);
    assert_eq!(summary.remaining, 2);
    assert!(transport.delivered_ids().is_empty());
    assert_eq!(queued_ids(&conn).await, vec![1, 2]);

    cleanup_db_files(&path);
}

#[tokio::test]
async fn resumes_from_the_failed_operation_on_the_next_trigger() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 3);
    let transport = Arc::new(MockTransport::default());
    transport.fail(2, FailureKind::Transport);
    let coordinator = zero_backoff(transport.clone(), conn.clone());

    let first = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(first.outcome, ReplayOutcome::Halted);

    transport.clear_failures();
    let second = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(second.outcome, ReplayOutcome::Drained);
    assert_eq!(second.replayed, 2);
    assert_eq!(transport.delivered_ids(), vec![1, 2, 3]);
    assert!(queued_ids(&conn).await.is_empty());

    cleanup_db_files(&path);
}

#[tokio::test]
async fn concurrent_triggers_coalesce() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 1);
    let transport = Arc::new(BlockingTransport::default());
    let coordinator = Arc::new(zero_backoff(transport.clone(), conn.clone()));

    let background = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.trigger().await }
    });
    transport.entered.notified().await;

    let summary = coordinator
        .trigger()
        .await
        .expect("second trigger should succeed");
    assert_eq!(summary.outcome, ReplayOutcome::AlreadyDraining);
    assert_eq!(summary.replayed, 0);
    assert_eq!(summary.remaining, 1);

    transport.release.notify_one();
    let first = background
        .await
        .expect("drain task should not panic")
        .expect("drain should succeed");
    assert_eq!(first.outcome, ReplayOutcome::Drained);
    assert_eq!(first.replayed, 1);

    cleanup_db_files(&path);
}

#[tokio::test]
async fn failed_pass_opens_a_backoff_window() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 1);
    let transport = Arc::new(MockTransport::default());
    transport.fail(1, FailureKind::Transport);
    let coordinator = ReplayCoordinator::with_backoff(
        transport.clone(),
        conn,
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    );

    let first = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(first.outcome, ReplayOutcome::Halted);

    let second = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(second.outcome, ReplayOutcome::BackingOff);
    assert_eq!(second.remaining, 1);
    assert_eq!(
        transport.attempts.load(Ordering::SeqCst),
        1,
        "the queued op must not be retried inside the window"
    );

    cleanup_db_files(&path);
}

#[tokio::test]
async fn successful_pass_clears_the_backoff_state() {
    let path = unique_db_path();
    let conn = store_with_ops(&path, 1);
    let transport = Arc::new(MockTransport::default());
    transport.fail(1, FailureKind::Transport);
    let coordinator = zero_backoff(transport.clone(), conn.clone());

    let first = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(first.outcome, ReplayOutcome::Halted);

    transport.clear_failures();
    let second = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(second.outcome, ReplayOutcome::Drained);

    let third = coordinator.trigger().await.expect("trigger should succeed");
    assert_eq!(third.outcome, ReplayOutcome::Drained);
    assert_eq!(third.replayed, 0);

    cleanup_db_files(&path);
}

#[test]
fn backoff_delay_doubles_and_caps() {
    let conn = Connection::open_in_memory().expect("in-memory db should open");
    let coordinator = ReplayCoordinator::with_backoff(
        Arc::new(MockTransport::default()),
        Arc::new(Mutex::new(conn)),
        Duration::from_secs(2),
        Duration::from_secs(30),
    );

    assert_eq!(coordinator.backoff_delay(1), Duration::from_secs(2));
    assert_eq!(coordinator.backoff_delay(2), Duration::from_secs(4));
    assert_eq!(coordinator.backoff_delay(4), Duration::from_secs(16));
    assert_eq!(coordinator.backoff_delay(5), Duration::from_secs(30));
    assert_eq!(coordinator.backoff_delay(12), Duration::from_secs(30));
}
