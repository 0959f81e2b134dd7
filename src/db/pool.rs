use std::{
    collections::VecDeque,
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::sync::Notify;

use crate::{
    config::DbConfig,
    db::{
        connection::{Connection, ConnectionFactory},
        postgres::{PgClient, PgConnector},
    },
    error::{CloseError, PoolError, PoolInitError},
};

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Fixed capacity chosen at construction
    pub size: usize,
    /// Connections waiting in the pool
    pub idle: usize,
    /// Connections checked out by callers
    pub in_use: usize,
}

/// A fixed-size pool of reusable connections
///
/// Every connection is opened up front. `acquire` hands one out and waits
/// while none are idle; `release` puts it back and wakes one waiter.
///
/// The idle deque is the only shared state. Its length is the number of
/// connections available for immediate checkout, so availability and
/// membership always change together under the same lock.
pub struct Pool<C> {
    idle: Mutex<VecDeque<C>>,
    available: Notify,
    size: usize,
}

impl Pool<PgClient> {
    /// Opens a Postgres pool with `max_connections` sessions
    pub async fn connect(
        config: &DbConfig,
        max_connections: usize,
    ) -> Result<Self, PoolInitError> {
        Self::connect_with(&PgConnector, config, max_connections).await
    }
}

impl<C: Connection> Pool<C> {
    /// Builds a pool by calling `factory` once per slot
    ///
    /// Fails on the first slot that cannot connect. Sessions opened for
    /// earlier slots are dropped without being closed.
    pub async fn connect_with<F>(
        factory: &F,
        config: &DbConfig,
        max_connections: usize,
    ) -> Result<Self, PoolInitError>
    where
        F: ConnectionFactory<Connection = C> + ?Sized,
    {
        if max_connections == 0 {
            return Err(PoolInitError::ZeroCapacity);
        }

        let mut conns = VecDeque::with_capacity(max_connections);
        for slot in 0..max_connections {
            match factory.connect(config).await {
                Ok(conn) => conns.push_back(conn),
                Err(source) => {
                    tracing::error!(
                        slot,
                        opened = conns.len(),
                        error = %source,
                        "Pool construction failed"
                    );
                    return Err(PoolInitError::Connect { slot, source });
                }
            }
        }

        tracing::info!(pool_size = max_connections, target_db = %config, "Connection pool ready");

        Ok(Self {
            idle: Mutex::new(conns),
            available: Notify::new(),
            size: max_connections,
        })
    }

    /// Waits until a connection is idle and takes it
    ///
    /// There is no deadline and no ordering among waiters. Dropping the
    /// returned future before it completes gives up the wait without
    /// taking a connection.
    pub async fn acquire(&self) -> C {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();

            if let Some(conn) = self.try_acquire() {
                return conn;
            }

            notified.await;
        }
    }

    /// Takes an idle connection if there is one, without waiting
    pub fn try_acquire(&self) -> Option<C> {
        let mut idle = self.lock_idle();
        let conn = idle.pop_front();
        if conn.is_some() {
            tracing::trace!(idle = idle.len(), "Connection acquired");
        }
        conn
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout`
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<C, PoolError> {
        tokio::time::timeout(timeout, self.acquire())
            .await
            .map_err(|_| PoolError::AcquireTimeout(timeout))
    }

    /// Returns a connection previously handed out by this pool
    ///
    /// Never blocks. Releasing a connection that did not come from this
    /// pool, or releasing one twice, breaks the pool's accounting.
    pub fn release(&self, conn: C) {
        {
            let mut idle = self.lock_idle();
            if idle.len() >= self.size {
                tracing::error!(
                    pool_size = self.size,
                    idle = idle.len(),
                    "Released more connections than the pool owns"
                );
            }
            idle.push_back(conn);
            tracing::trace!(idle = idle.len(), "Connection released");
        }
        self.available.notify_one();
    }

    /// Acquires a connection wrapped in a guard that releases it on drop
    pub async fn get(&self) -> PooledConnection<'_, C> {
        let conn = self.acquire().await;
        PooledConnection {
            pool: self,
            conn: Some(conn),
        }
    }

    /// Current occupancy
    pub fn status(&self) -> PoolStatus {
        let idle = self.lock_idle().len();
        PoolStatus {
            size: self.size,
            idle,
            in_use: self.size.saturating_sub(idle),
        }
    }

    /// Fixed capacity of the pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Closes every idle connection
    ///
    /// Each idle connection is closed exactly once, even after a failure;
    /// the first failure is returned. Checked-out connections are left
    /// alone, so callers must release them first. The pool must not be
    /// used after this call.
    pub async fn close(&self) -> Result<(), CloseError> {
        let drained: Vec<C> = self.lock_idle().drain(..).collect();
        let idle = drained.len();

        if idle < self.size {
            tracing::warn!(
                checked_out = self.size - idle,
                "Closing pool with connections still checked out"
            );
        }

        let mut first_error = None;
        for conn in drained {
            if let Err(e) = conn.close().await {
                tracing::error!(error = %e, "Failed to close pooled connection");
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(closed = idle, "Connection pool closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<C>> {
        // Critical sections never panic midway, so a poisoned deque is still consistent
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A connection on loan from a [`Pool`], returned when dropped
pub struct PooledConnection<'a, C: Connection> {
    pool: &'a Pool<C>,
    conn: Option<C>,
}

impl<C: Connection> PooledConnection<'_, C> {
    /// Takes the connection out of the guard
    ///
    /// The caller becomes responsible for passing it to [`Pool::release`].
    pub fn detach(mut self) -> C {
        self.conn.take().expect("connection present until drop")
    }
}

impl<C: Connection> Deref for PooledConnection<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl<C: Connection> DerefMut for PooledConnection<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl<C: Connection> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
