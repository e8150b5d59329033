// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection serializer.
//!
//! Work items enter an unbounded FIFO queue. One dispatcher task takes them
//! in order and awaits each statement on the connection thread before taking
//! the next, so at most one statement is in flight and execution order is
//! submission order. Every item's reply runs exactly once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sqlrest_core::{Payload, SqlRestError};

use crate::database::{Database, unwrap_call_err};
use crate::statement::Statement;

/// Receives the result of one work item.
pub type Reply = Box<dyn FnOnce(Result<Payload, SqlRestError>) + Send + 'static>;

struct WorkItem {
    statement: Statement,
    reply: Reply,
}

/// Sole owner of a [`Database`]. See the module docs for ordering guarantees.
pub struct Serializer {
    intake: Mutex<Option<mpsc::UnboundedSender<WorkItem>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl Serializer {
    /// Take ownership of `db` and start the dispatcher on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(db: Database) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Handle::current();
        let dispatcher = runtime.spawn(dispatch(db, rx));
        Self {
            intake: Mutex::new(Some(tx)),
            dispatcher: Mutex::new(Some(dispatcher)),
            runtime,
        }
    }

    /// Queue `statement`; `reply` is called once it has run.
    ///
    /// Never blocks and never calls `reply` inline. After [`close`](Self::close)
    /// the reply receives [`SqlRestError::NotOpen`] from a spawned task.
    pub fn submit(&self, statement: Statement, reply: Reply) {
        if let Err(item) = self.enqueue(WorkItem { statement, reply }) {
            self.runtime.spawn(async move {
                (item.reply)(Err(SqlRestError::NotOpen));
            });
        }
    }

    /// Future form of [`submit`](Self::submit). The item is queued before this returns.
    pub fn execute(&self, statement: Statement) -> Completion {
        let (tx, rx) = oneshot::channel();
        let reply: Reply = Box::new(move |result| {
            let _ = tx.send(result);
        });
        match self.enqueue(WorkItem { statement, reply }) {
            Ok(()) => Completion::Pending(rx),
            Err(_) => Completion::ready(Err(SqlRestError::NotOpen)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.intake
            .lock()
            .map(|intake| intake.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Stop intake, run everything already queued, then close the database.
    ///
    /// Idempotent: later calls return `Ok(())` immediately.
    pub async fn close(&self) -> Result<(), SqlRestError> {
        let sender = self
            .intake
            .lock()
            .map_err(|_| SqlRestError::Internal("serializer intake lock poisoned".into()))?
            .take();
        drop(sender);

        let dispatcher = self
            .dispatcher
            .lock()
            .map_err(|_| SqlRestError::Internal("serializer dispatcher lock poisoned".into()))?
            .take();
        if let Some(handle) = dispatcher {
            handle
                .await
                .map_err(|e| SqlRestError::Internal(format!("dispatcher task failed: {e}")))?;
        }
        Ok(())
    }

    fn enqueue(&self, item: WorkItem) -> Result<(), WorkItem> {
        let Ok(intake) = self.intake.lock() else {
            return Err(item);
        };
        match intake.as_ref() {
            Some(tx) => tx.send(item).map_err(|e| e.0),
            None => Err(item),
        }
    }
}

async fn dispatch(db: Database, mut rx: mpsc::UnboundedReceiver<WorkItem>) {
    debug!(path = %db.path(), "serializer started");

    while let Some(WorkItem { statement, reply }) = rx.recv().await {
        let path = db.path().to_string();
        let result = db
            .connection()
            .call(move |conn| statement.run(conn, &path))
            .await
            .map_err(unwrap_call_err);
        reply(result);
    }

    debug!(path = %db.path(), "serializer drained");
    if let Err(e) = db.close().await {
        warn!(error = %e, "error closing database");
    }
}

/// Resolves with the result of one submitted work item.
pub enum Completion {
    Ready(Option<Result<Payload, SqlRestError>>),
    Pending(oneshot::Receiver<Result<Payload, SqlRestError>>),
}

impl Completion {
    /// A completion that already holds its result.
    pub fn ready(result: Result<Payload, SqlRestError>) -> Self {
        Completion::Ready(Some(result))
    }
}

impl Future for Completion {
    type Output = Result<Payload, SqlRestError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Completion::Ready(slot) => Poll::Ready(slot.take().unwrap_or_else(|| {
                Err(SqlRestError::Internal("completion polled after resolving".into()))
            })),
            // A dropped sender means the dispatcher went away without replying.
            Completion::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(SqlRestError::NotOpen))),
        }
    }
}
