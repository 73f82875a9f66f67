//! Lazily established, shared store connection.
//!
//! Concurrent first callers all await one shared connect future, so the
//! underlying store sees exactly one attempt at a time. A failed attempt is
//! reported to every waiter of that attempt and then forgotten; the next
//! call starts a fresh one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::error::{AppError, AppResult};

/// Opens connections to a backing store
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Cheap-to-clone handle shared by every request once open
    type Connection: Clone + Send + Sync + 'static;

    async fn connect(&self) -> AppResult<Self::Connection>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Object-safe view of a gate, used by the HTTP middleware and health check
#[async_trait]
pub trait StoreGate: Send + Sync {
    async fn ensure_connected(&self) -> AppResult<()>;

    fn is_open(&self) -> bool;
}

type ConnectFuture<C> = Shared<BoxFuture<'static, Result<C, String>>>;

enum GateState<C> {
    Closed,
    Connecting { attempt: u64, future: ConnectFuture<C> },
    Open(C),
}

pub struct ConnectionGate<K: Connector> {
    connector: Arc<K>,
    connect_timeout: Duration,
    state: Mutex<GateState<K::Connection>>,
    attempts: AtomicU64,
}

impl<K: Connector> ConnectionGate<K> {
    /// Creates a closed gate; nothing connects until the first request
    pub fn new(connector: K, connect_timeout: Duration) -> Self {
        Self {
            connector: Arc::new(connector),
            connect_timeout,
            state: Mutex::new(GateState::Closed),
            attempts: AtomicU64::new(0),
        }
    }

    /// Returns the open connection, establishing it first if needed
    pub async fn connection(&self) -> AppResult<K::Connection> {
        let (attempt, future) = {
            let mut state = self.lock_state();
            match &*state {
                GateState::Open(conn) => return Ok(conn.clone()),
                GateState::Connecting { attempt, future } => (*attempt, future.clone()),
                GateState::Closed => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.connect_future(attempt);
                    *state = GateState::Connecting {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;

        // Only the attempt we waited on may change the state
        let mut state = self.lock_state();
        if matches!(&*state, GateState::Connecting { attempt: current, .. } if *current == attempt)
        {
            *state = match &result {
                Ok(conn) => GateState::Open(conn.clone()),
                Err(_) => GateState::Closed,
            };
        }

        result.map_err(AppError::ConnectionUnavailable)
    }

    /// Drops the shared connection so the next caller reconnects
    pub fn close(&self) {
        let mut state = self.lock_state();
        if matches!(&*state, GateState::Open(_)) {
            *state = GateState::Closed;
            tracing::warn!(store = self.connector.name(), "Shared store connection closed");
        }
    }

    /// Number of connect attempts started so far
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    fn connect_future(&self, attempt: u64) -> ConnectFuture<K::Connection> {
        let connector = self.connector.clone();
        let timeout = self.connect_timeout;

        async move {
            tracing::info!(store = connector.name(), attempt, "Connecting to shared store");
            match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(Ok(conn)) => {
                    tracing::info!(store = connector.name(), attempt, "Shared store connected");
                    Ok(conn)
                }
                Ok(Err(e)) => {
                    tracing::error!(store = connector.name(), attempt, error = %e, "Shared store connect failed");
                    Err(e.to_string())
                }
                Err(_) => {
                    tracing::error!(store = connector.name(), attempt, ?timeout, "Shared store connect timed out");
                    Err(format!("connect timed out after {:?}", timeout))
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> MutexGuard<'_, GateState<K::Connection>> {
        // The state is only ever replaced wholesale, so a poisoned lock still holds a valid value
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<K: Connector> StoreGate for ConnectionGate<K> {
    async fn ensure_connected(&self) -> AppResult<()> {
        self.connection().await.map(|_| ())
    }

    fn is_open(&self) -> bool {
        matches!(&*self.lock_state(), GateState::Open(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Connector that counts attempts and can be told to fail
    struct FakeConnector {
        calls: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
        delay: Duration,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Connection = usize;

        async fn connect(&self) -> AppResult<usize> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                Err(AppError::Internal("connection refused".to_string()))
            } else {
                Ok(call)
            }
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn gate(delay: Duration, fail: bool) -> (Arc<ConnectionGate<FakeConnector>>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(AtomicBool::new(fail));
        let connector = FakeConnector {
            calls: calls.clone(),
            fail: fail.clone(),
            delay,
        };
        (
            Arc::new(ConnectionGate::new(connector, Duration::from_secs(5))),
            calls,
            fail,
        )
    }

    #[tokio::test]
    async fn test_gate_starts_closed_and_connects_lazily() {
        let (gate, calls, _) = gate(Duration::ZERO, false);
        assert!(!gate.is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        gate.ensure_connected().await.unwrap();

        assert!(gate.is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_callers_share_one_attempt() {
        let (gate, calls, _) = gate(Duration::from_millis(50), false);

        let tasks = (0..16).map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.connection().await })
        });
        let results = join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().unwrap(), 1);
        }
        assert_eq!(gate.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_open_gate_does_not_reconnect() {
        let (gate, calls, _) = gate(Duration::ZERO, false);

        for _ in 0..5 {
            gate.ensure_connected().await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failed_attempt_is_shared_then_retried() {
        let (gate, calls, fail) = gate(Duration::from_millis(50), true);

        let tasks = (0..8).map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move { gate.connection().await })
        });
        let results = join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            match result.unwrap() {
                Err(AppError::ConnectionUnavailable(msg)) => {
                    assert!(msg.contains("connection refused"))
                }
                other => panic!("expected ConnectionUnavailable, got {:?}", other),
            }
        }
        assert!(!gate.is_open());

        fail.store(false, Ordering::SeqCst);
        assert_eq!(gate.connection().await.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stalled_connect_times_out() {
        tokio::time::pause();
        let calls = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector {
            calls: calls.clone(),
            fail: Arc::new(AtomicBool::new(false)),
            delay: Duration::from_secs(3600),
        };
        let gate = ConnectionGate::new(connector, Duration::from_secs(1));

        let result = gate.connection().await;

        assert!(matches!(result, Err(AppError::ConnectionUnavailable(msg)) if msg.contains("timed out")));
        assert!(!gate.is_open());
    }

    #[tokio::test]
    async fn test_close_forces_reconnect() {
        let (gate, calls, _) = gate(Duration::ZERO, false);
        gate.ensure_connected().await.unwrap();

        gate.close();
        assert!(!gate.is_open());
        gate.ensure_connected().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
