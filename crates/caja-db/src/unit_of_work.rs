//! # Unit of Work
//!
//! Every multi-step mutation (sale create/update/delete, product create with
//! opening stock, manual stock adjustments) runs inside one `UnitOfWork`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gate.begin(&pool)                                                      │
//! │     │  1. wait for the process-wide write gate (async mutex)            │
//! │     │  2. BEGIN on a pooled connection                                  │
//! │     ▼                                                                   │
//! │  UnitOfWork ── conn() ──► read stock, check, write items + movements   │
//! │     │                                                                   │
//! │     ├── commit()  → COMMIT, then release the gate                       │
//! │     └── dropped / rollback() / `?` early return                         │
//! │                   → ROLLBACK, then release the gate                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gate serializes writers inside this process, so two sales racing for
//! the last unit see each other's stock. Writers in another process are
//! kept out by SQLite's own lock and surface as `DbError::Busy`.

use std::sync::Arc;

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::DbResult;

/// Process-wide write serializer shared by every repository of a `Database`.
#[derive(Debug, Clone, Default)]
pub struct WriteGate {
    lock: Arc<Mutex<()>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the gate, then opens a transaction.
    pub async fn begin(&self, pool: &SqlitePool) -> DbResult<UnitOfWork> {
        let guard = Arc::clone(&self.lock).lock_owned().await;
        let tx = pool.begin().await?;
        debug!("Unit of work started");
        Ok(UnitOfWork { tx, _guard: guard })
    }
}

/// An open transaction holding the write gate.
///
/// Field order matters: the transaction is dropped (rolled back) before the
/// gate is released.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl UnitOfWork {
    /// Connection to run statements on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commits every statement run through [`conn`](Self::conn).
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards everything. Dropping the unit of work has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!("Unit of work rolled back");
        Ok(())
    }
}
