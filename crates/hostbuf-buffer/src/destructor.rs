//! One-shot hand-off between a buffer's destruction sequence and a thread
//! waiting for it.
//!
//! Each [`DestructorPromise`] is stored in the buffer; the matching
//! [`DestructorFuture`] goes to the waiter. Resolving the promise is the
//! last thing the destruction sequence does. Built on a `bounded(1)`
//! crossbeam channel, so resolving never blocks and a late waiter still
//! sees the signal.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Create a linked promise/future pair.
pub(crate) fn channel() -> (DestructorPromise, DestructorFuture) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (DestructorPromise { tx }, DestructorFuture { rx })
}

/// Resolving side, held by the buffer.
#[derive(Debug)]
pub(crate) struct DestructorPromise {
    tx: Sender<()>,
}

impl DestructorPromise {
    /// Signal that teardown completed.
    pub(crate) fn resolve(self) {
        // The waiter may have given up already; nothing to do then.
        let _ = self.tx.send(());
    }
}

/// Awaitable token that resolves when a buffer's teardown completes.
///
/// If the buffer's promise is dropped without being resolved (finalization
/// unwound), waiting returns as well:
/// nobody is left to signal.
#[derive(Debug)]
#[must_use = "dropping the future discards the only way to wait for teardown"]
pub struct DestructorFuture {
    rx: Receiver<()>,
}

impl DestructorFuture {
    /// Block until teardown completes.
    pub fn wait(self) {
        let _ = self.rx.recv();
    }

    /// Block for at most `timeout`. Returns `true` if teardown completed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// Non-blocking check. Returns `true` if teardown completed.
    pub fn is_ready(&self) -> bool {
        match self.rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => true,
            Err(TryRecvError::Empty) => false,
        }
    }
}
