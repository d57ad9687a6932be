//! Per-worker store sessions
//!
//! A worker checks out exactly one [`WorkerContext`] for its lifetime. The
//! context opens its [`Session`] on first use and drops it when the worker
//! is done, so there is never a shared map keyed by thread.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use super::{StoreError, StoreHandle};

/// Identifier of one worker in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerId(pub usize);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A worker's own connection to the store
pub struct Session {
    conn: duckdb::Connection,
    worker: WorkerId,
}

impl Session {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn connection(&self) -> &duckdb::Connection {
        &self.conn
    }

    /// Mutable access, needed to open transactions
    pub fn connection_mut(&mut self) -> &mut duckdb::Connection {
        &mut self.conn
    }
}

/// Registry of checked-out worker contexts
pub struct SessionPool {
    store: Arc<StoreHandle>,
    active: Mutex<HashSet<WorkerId>>,
    closed: AtomicBool,
    opened: AtomicUsize,
}

impl SessionPool {
    pub fn new(store: Arc<StoreHandle>) -> Arc<Self> {
        Arc::new(Self {
            store,
            active: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
        })
    }

    pub fn store(&self) -> &Arc<StoreHandle> {
        &self.store
    }

    /// Check out the context for a worker
    ///
    /// Fails with [`StoreError::SessionInUse`] while another context for the
    /// same worker is alive.
    pub fn checkout(self: &Arc<Self>, worker: WorkerId) -> Result<WorkerContext, StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::PoolClosed);
        }
        let mut active = self.active.lock().map_err(|_| StoreError::LockPoisoned)?;
        if !active.insert(worker) {
            return Err(StoreError::SessionInUse(worker.0));
        }
        Ok(WorkerContext {
            pool: Arc::clone(self),
            worker,
            session: None,
        })
    }

    /// Number of sessions opened over the pool's lifetime
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of contexts currently checked out
    pub fn active_count(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Refuse further checkouts
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let still_active = self.active_count();
        if still_active > 0 {
            warn!(still_active, "Session pool shut down with contexts still checked out");
        } else {
            debug!(opened = self.sessions_opened(), "Session pool shut down");
        }
    }

    fn release(&self, worker: WorkerId) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&worker);
        }
    }
}

/// A worker's checked-out context, holding its lazily opened session
pub struct WorkerContext {
    pool: Arc<SessionPool>,
    worker: WorkerId,
    session: Option<Session>,
}

impl WorkerContext {
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Get the worker's session, opening it on first use
    pub fn session(&mut self) -> Result<&mut Session, StoreError> {
        if self.session.is_none() {
            let conn = self.pool.store.connect()?;
            self.pool.opened.fetch_add(1, Ordering::SeqCst);
            debug!(worker = %self.worker, "Opened store session");
            self.session = Some(Session {
                conn,
                worker: self.worker,
            });
        }
        self.session.as_mut().ok_or(StoreError::PoolClosed)
    }
}

impl Drop for WorkerContext {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            debug!(worker = %self.worker, "Closed store session");
        }
        self.pool.release(self.worker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Arc<SessionPool> {
        SessionPool::new(Arc::new(StoreHandle::memory().unwrap()))
    }

    #[test]
    fn test_session_is_lazy_and_reused() {
        let pool = pool();
        let mut ctx = pool.checkout(WorkerId(0)).unwrap();
        assert!(!ctx.has_session());
        assert_eq!(pool.sessions_opened(), 0);

        ctx.session().unwrap();
        ctx.session().unwrap();
        assert!(ctx.has_session());
        assert_eq!(pool.sessions_opened(), 1);
    }

    #[test]
    fn test_second_checkout_for_same_worker_fails() {
        let pool = pool();
        let _ctx = pool.checkout(WorkerId(3)).unwrap();
        assert!(matches!(
            pool.checkout(WorkerId(3)),
            Err(StoreError::SessionInUse(3))
        ));
        assert!(pool.checkout(WorkerId(4)).is_ok());
    }

    #[test]
    fn test_drop_releases_worker() {
        let pool = pool();
        {
            let mut ctx = pool.checkout(WorkerId(1)).unwrap();
            ctx.session().unwrap();
            assert_eq!(pool.active_count(), 1);
        }
        assert_eq!(pool.active_count(), 0);
        assert!(pool.checkout(WorkerId(1)).is_ok());
    }

    #[test]
    fn test_shutdown_refuses_checkout() {
        let pool = pool();
        pool.shutdown();
        assert!(pool.is_closed());
        assert!(matches!(
            pool.checkout(WorkerId(0)),
            Err(StoreError::PoolClosed)
        ));
    }

    #[test]
    fn test_sessions_see_shared_tables() {
        let pool = pool();
        pool.store().ensure_tables(false).unwrap();

        let mut ctx = pool.checkout(WorkerId(0)).unwrap();
        let session = ctx.session().unwrap();
        session
            .connection()
            .execute(
                "INSERT INTO metadata_anchors (id, day_counter) VALUES (1, 5)",
                [],
            )
            .unwrap();

        assert_eq!(pool.store().row_count("metadata_anchors").unwrap(), 1);
    }
}
