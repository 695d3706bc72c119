//! Database connection management.
//!
//! Holds a small pool of rusqlite connections, each behind its own Mutex,
//! so independent writers never contend on a single process-wide lock.
//! WAL mode lets readers proceed while a writer holds the file lock.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use chatlens_core::error::ChatlensError;

use crate::migrations;

/// Pooled SQLite database.
pub struct Database {
    conns: Vec<Mutex<Connection>>,
    next: AtomicUsize,
    closed: AtomicBool,
}

impl Database {
    /// Open (or create) a database at the given path with `pool_size`
    /// connections.
    ///
    /// Configures WAL mode, synchronous=NORMAL and a busy timeout on every
    /// connection, then runs all pending migrations once.
    pub fn new(path: &Path, pool_size: usize, busy_timeout: Duration) -> Result<Self, ChatlensError> {
        if pool_size == 0 {
            return Err(ChatlensError::Config("pool size must be at least 1".into()));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut conns = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open(path)
                .map_err(|e| ChatlensError::Storage(format!("Failed to open database: {}", e)))?;
            configure(&conn, busy_timeout)?;
            conns.push(Mutex::new(conn));
        }

        info!(path = %path.display(), pool_size, "Database opened");

        let db = Self {
            conns,
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Open an in-memory database with a single connection (for testing).
    pub fn in_memory() -> Result<Self, ChatlensError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChatlensError::Storage(format!("Failed to open in-memory db: {}", e)))?;
        configure(&conn, Duration::from_secs(5))?;

        let db = Self {
            conns: vec![Mutex::new(conn)],
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        };

        db.with_conn(migrations::run_migrations)?;

        Ok(db)
    }

    /// Execute a closure with one pooled connection.
    ///
    /// Prefers an idle connection; if all are busy, waits on the next one in
    /// round-robin order. The connection's lock is held for the duration of
    /// the closure only.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ChatlensError>
    where
        F: FnOnce(&Connection) -> Result<T, ChatlensError>,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChatlensError::ShuttingDown);
        }

        let n = self.conns.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed) % n;

        for offset in 0..n {
            if let Ok(conn) = self.conns[(start + offset) % n].try_lock() {
                return f(&conn);
            }
        }

        let conn = self.conns[start]
            .lock()
            .map_err(|e| ChatlensError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Number of pooled connections.
    pub fn pool_size(&self) -> usize {
        self.conns.len()
    }

    /// Refuse further work. Connections are released when the database is
    /// dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("Database closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn configure(conn: &Connection, busy_timeout: Duration) -> Result<(), ChatlensError> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| ChatlensError::Storage(format!("Failed to set busy timeout: {}", e)))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -16384;",
    )
    .map_err(|e| ChatlensError::Storage(format!("Failed to set pragmas: {}", e)))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool_size", &self.conns.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
