//! Scripted driver shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rowscan::DbError;
use rowscan::DbResult;
use rowscan::db::{Driver, DriverHandle, MemoryCursor, RowCursor, Value};
use rowscan::models::{ConnectTarget, PoolLimits, QueryParam};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Outcome of the next driver call.
pub enum Step {
    Rows(MemoryCursor),
    Affected(u64),
    Closed,
    /// Wait until every caller holding the barrier arrives, then report a
    /// closed pool.
    ClosedTogether(Arc<Barrier>),
    Fail(&'static str),
}

#[derive(Default)]
struct Shared {
    opens: AtomicUsize,
    closes: AtomicUsize,
    failing_opens: AtomicUsize,
    next_handle: AtomicU64,
    steps: Mutex<VecDeque<Step>>,
    targets: Mutex<Vec<ConnectTarget>>,
    limits: Mutex<Vec<PoolLimits>>,
    /// Serial of the handle that served each call, in call order.
    calls: Mutex<Vec<u64>>,
    /// Row limit passed to each query, in call order.
    row_limits: Mutex<Vec<Option<usize>>>,
}

#[derive(Clone, Default)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_driver(&self) -> Arc<dyn Driver> {
        Arc::new(self.clone())
    }

    /// Queue the outcome of a future query or exec call.
    pub fn push(&self, step: Step) {
        self.shared.steps.lock().unwrap().push_back(step);
    }

    /// Make the next `n` open attempts fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.shared.failing_opens.store(n, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<u64> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn row_limits(&self) -> Vec<Option<usize>> {
        self.shared.row_limits.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<ConnectTarget> {
        self.shared.targets.lock().unwrap().clone()
    }

    pub fn limits(&self) -> Vec<PoolLimits> {
        self.shared.limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(
        &self,
        target: &ConnectTarget,
        limits: PoolLimits,
    ) -> DbResult<Arc<dyn DriverHandle>> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.targets.lock().unwrap().push(target.clone());
        self.shared.limits.lock().unwrap().push(limits);

        let failing = self.shared.failing_opens.load(Ordering::SeqCst);
        if failing > 0 {
            self.shared.failing_opens.store(failing - 1, Ordering::SeqCst);
            return Err(DbError::connection(
                "Failed to connect: connection refused",
                "Check that the MySQL server is running and accessible",
            ));
        }

        let serial = self.shared.next_handle.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(MockHandle {
            shared: Arc::clone(&self.shared),
            serial,
            closed: AtomicBool::new(false),
        }))
    }
}

struct MockHandle {
    shared: Arc<Shared>,
    serial: u64,
    closed: AtomicBool,
}

impl MockHandle {
    fn next_step(&self) -> DbResult<Option<Step>> {
        self.shared.calls.lock().unwrap().push(self.serial);
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::connection_closed());
        }
        Ok(self.shared.steps.lock().unwrap().pop_front())
    }
}

/// Rows served when no step is queued.
pub fn default_rows() -> MemoryCursor {
    MemoryCursor::new(["id", "userName"]).with_row(vec![Value::Int(1), Value::from("ada")])
}

#[async_trait]
impl DriverHandle for MockHandle {
    async fn query(
        &self,
        _sql: &str,
        _params: &[QueryParam],
        max_rows: Option<usize>,
    ) -> DbResult<Box<dyn RowCursor + Send>> {
        self.shared.row_limits.lock().unwrap().push(max_rows);
        let cursor = match self.next_step()? {
            Some(Step::Rows(cursor)) => cursor,
            Some(Step::Affected(_)) => MemoryCursor::new(["id"]),
            Some(Step::Closed) => return Err(DbError::connection_closed()),
            Some(Step::ClosedTogether(barrier)) => {
                barrier.wait().await;
                return Err(DbError::connection_closed());
            }
            Some(Step::Fail(message)) => {
                return Err(DbError::database(message, None, "Check the SQL"));
            }
            None => default_rows(),
        };

        Ok(Box::new(match max_rows {
            Some(n) => cursor.limit(n),
            None => cursor,
        }))
    }

    async fn execute(&self, _sql: &str, _params: &[QueryParam]) -> DbResult<u64> {
        match self.next_step()? {
            Some(Step::Affected(n)) => Ok(n),
            Some(Step::Rows(_)) | None => Ok(1),
            Some(Step::Closed) => Err(DbError::connection_closed()),
            Some(Step::ClosedTogether(barrier)) => {
                barrier.wait().await;
                Err(DbError::connection_closed())
            }
            Some(Step::Fail(message)) => Err(DbError::database(message, None, "Check the SQL")),
        }
    }

    async fn close(&self) -> DbResult<()> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
