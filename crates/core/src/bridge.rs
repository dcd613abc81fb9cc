//! Callback → blocking bridge.
//!
//! The game backend only exposes callback-completing operations ("call me back
//! with the result, from whatever thread you like"). Request handlers want a
//! plain value. [`await_callback`] hands the operation a single-use
//! [`Completion`] and parks the calling thread until the completion fires.
//!
//! ## State machine
//!
//! ```text
//! Pending ──deliver──▶ Completed
//!    │
//!    └──cancel / timeout / abandon──▶ Cancelled
//! ```
//!
//! Terminal states never revert. Anything delivered after the call left
//! `Pending` is dropped and `deliver` reports `false`.
//!
//! ## Blocking
//!
//! The waiting thread is blocked, not yielding. Async callers must run the
//! bridge on a blocking pool (e.g. `tokio::task::spawn_blocking`); the pool
//! size then bounds how many backend calls can be in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a bridge call did not produce a value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The waiting call was interrupted through its [`Canceller`].
    #[error("backend call was cancelled")]
    Cancelled,

    /// The backend did not complete within the configured bound.
    ///
    /// The backend operation itself keeps running; its late result is ignored.
    #[error("backend did not complete within {0:?}")]
    TimedOut(Duration),

    /// Every completion handle was dropped without delivering a value.
    #[error("backend dropped the completion without delivering a result")]
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelReason {
    Interrupted,
    TimedOut(Duration),
    Abandoned,
}

impl From<CancelReason> for BridgeError {
    fn from(reason: CancelReason) -> Self {
        match reason {
            CancelReason::Interrupted => BridgeError::Cancelled,
            CancelReason::TimedOut(after) => BridgeError::TimedOut(after),
            CancelReason::Abandoned => BridgeError::Abandoned,
        }
    }
}

enum State<T> {
    Pending,
    /// `None` once the waiter has taken the value.
    Completed(Option<T>),
    Cancelled(CancelReason),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
    /// Live [`Completion`] handles; reaching zero while pending abandons the call.
    completions: AtomicUsize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // The state is a plain enum that is never left half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move `Pending → Cancelled(reason)`. Returns whether the transition happened.
    fn cancel(&self, reason: CancelReason) -> bool {
        let mut state = self.lock();
        if !matches!(*state, State::Pending) {
            return false;
        }
        *state = State::Cancelled(reason);
        drop(state);
        self.ready.notify_all();
        true
    }
}

trait Interrupt: Send + Sync {
    fn interrupt(&self) -> bool;
}

impl<T: Send> Interrupt for Shared<T> {
    fn interrupt(&self) -> bool {
        self.cancel(CancelReason::Interrupted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Completion
// ─────────────────────────────────────────────────────────────────────────────

/// The completion function handed to a backend operation.
///
/// Only the first [`deliver`](Completion::deliver) across all clones has an
/// effect. Dropping every clone without delivering releases the waiter with
/// [`BridgeError::Abandoned`].
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completion<T> {
    fn new(shared: Arc<Shared<T>>) -> Self {
        shared.completions.fetch_add(1, Ordering::Relaxed);
        Self { shared }
    }

    /// Deliver the result. Returns `false` if the call already left `Pending`.
    pub fn deliver(&self, value: T) -> bool {
        let mut state = self.shared.lock();
        if !matches!(*state, State::Pending) {
            tracing::trace!("ignoring delivery to a settled bridge call");
            return false;
        }
        *state = State::Completed(Some(value));
        drop(state);
        self.shared.ready.notify_all();
        true
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self::new(self.shared.clone())
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if self.shared.completions.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.cancel(CancelReason::Abandoned);
        }
    }
}

impl<T> core::fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

/// Interrupts a pending bridge call from any thread.
#[derive(Clone)]
pub struct Canceller {
    target: Arc<dyn Interrupt>,
}

impl Canceller {
    /// Cancel the call. Returns `false` if it had already completed or failed.
    pub fn cancel(&self) -> bool {
        self.target.interrupt()
    }

    /// Arm a guard that cancels the call when dropped.
    ///
    /// Dropping the guard after the call completed is a no-op.
    pub fn cancel_on_drop(self) -> CancelOnDrop {
        CancelOnDrop { canceller: self }
    }
}

impl core::fmt::Debug for Canceller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Canceller").finish_non_exhaustive()
    }
}

/// See [`Canceller::cancel_on_drop`].
#[derive(Debug)]
pub struct CancelOnDrop {
    canceller: Canceller,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.canceller.cancel() {
            tracing::debug!("bridge call cancelled by drop guard");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bridge call
// ─────────────────────────────────────────────────────────────────────────────

/// One pending bridge invocation.
///
/// Build it first when the caller needs a [`Canceller`] before blocking;
/// otherwise use [`await_callback`].
pub struct BridgeCall<T> {
    shared: Arc<Shared<T>>,
    timeout: Option<Duration>,
}

impl<T: Send + 'static> BridgeCall<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::Pending),
                ready: Condvar::new(),
                completions: AtomicUsize::new(0),
            }),
            timeout: None,
        }
    }

    /// Give up waiting after `timeout`. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn canceller(&self) -> Canceller {
        Canceller {
            target: self.shared.clone(),
        }
    }

    /// Invoke `operation` with the completion and block until it settles.
    ///
    /// A call cancelled before `wait` runs fails immediately and `operation`
    /// is never invoked.
    pub fn wait<F>(self, operation: F) -> Result<T, BridgeError>
    where
        F: FnOnce(Completion<T>),
    {
        if let State::Cancelled(reason) = &*self.shared.lock() {
            return Err((*reason).into());
        }

        operation(Completion::new(self.shared.clone()));

        let deadline = self.timeout.map(|t| (t, Instant::now() + t));
        let mut state = self.shared.lock();

        loop {
            match &mut *state {
                State::Completed(value) => return value.take().ok_or(BridgeError::Abandoned),
                State::Cancelled(reason) => return Err((*reason).into()),
                State::Pending => {}
            }

            state = match deadline {
                None => self
                    .shared
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some((timeout, deadline)) => {
                    let now = Instant::now();
                    if now >= deadline {
                        *state = State::Cancelled(CancelReason::TimedOut(timeout));
                        continue;
                    }
                    self.shared
                        .ready
                        .wait_timeout(state, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0)
                }
            };
        }
    }
}

impl<T: Send + 'static> Default for BridgeCall<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a callback-style operation and block until its completion fires.
///
/// No timeout; see [`BridgeCall`] for bounded or cancellable waits.
pub fn await_callback<T, F>(operation: F) -> Result<T, BridgeError>
where
    T: Send + 'static,
    F: FnOnce(Completion<T>),
{
    BridgeCall::new().wait(operation)
}
