//! Single-writer actor.
//!
//! SQLite allows one writer at a time; instead of letting transactions
//! contend on the busy handler, every mutation is shipped to one dedicated
//! blocking task that runs each job inside an immediate transaction. Jobs
//! are therefore serialized, which also makes in-transaction existence
//! checks race-free.

use std::sync::Arc;

use diesel::prelude::*;
use log::error;
use tokio::sync::{mpsc, oneshot};

use quizkit_core::errors::{DatabaseError, Error, Result};

use super::DbPool;
use crate::errors::StorageError;

type Job = Box<dyn FnOnce(&mut SqliteConnection) + Send>;

/// Wrapper so application errors pass through `immediate_transaction`
/// (which requires `From<diesel::result::Error>`) and still roll back.
enum TxError {
    App(Error),
    Db(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Db(e)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl WriteHandle {
    /// Runs `job` on the writer task inside one immediate transaction.
    /// Returning `Err` rolls the whole transaction back.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let wrapped: Job = Box::new(move |conn| {
            let outcome = conn
                .immediate_transaction(|conn| job(conn).map_err(TxError::App))
                .map_err(|e| match e {
                    TxError::App(err) => err,
                    TxError::Db(err) => StorageError::from(err).into(),
                });
            let _ = reply_tx.send(outcome);
        });
        self.tx.send(wrapped).map_err(|_| {
            Error::Database(DatabaseError::Internal("writer task is gone".to_string()))
        })?;
        reply_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer dropped the job before replying".to_string(),
            ))
        })?
    }
}

/// Spawns the writer task. The handle is cheap to clone; dropping every
/// clone shuts the task down.
pub fn spawn_writer(pool: Arc<DbPool>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
    tokio::task::spawn_blocking(move || {
        while let Some(job) = rx.blocking_recv() {
            match pool.get() {
                Ok(mut conn) => job(&mut conn),
                // Dropping the job drops its reply sender; the caller sees
                // a database error.
                Err(e) => error!("writer could not acquire a connection: {e}"),
            }
        }
    });
    WriteHandle { tx }
}
