//! Smol-backed local executor
//!
//! Tasks run on a smol `LocalExecutor`; [`next_turn`] waits on an async-io timer.

use core_affinity::{CoreId, set_for_current};
use log::trace;
use scoped_tls::scoped_thread_local;
use smol::{LocalExecutor, Timer};
use std::{
    future::Future,
    io::Result,
    pin::Pin,
    task::{Context, Poll},
    thread::{self, JoinHandle},
    time::Duration,
};

scoped_thread_local!(pub(super) static LOCAL: LocalExecutor<'_>);

/// Completion handle of a local task.
///
/// Awaiting it yields `Ok(T)` once the task finishes. Smol propagates panics to the
/// awaiter, so `Err` never occurs here. Dropping the handle leaves the task running.
pub struct Task<T> {
    inner: Option<smol::Task<T>>,
}

impl<T> Future for Task<T> {
    type Output = std::result::Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.inner.as_mut() {
            Some(inner) => Pin::new(inner).poll(cx).map(Ok),
            None => Poll::Ready(Err(TaskError { _private: () })),
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        // a dropped smol task is cancelled; keep the tokio semantics instead
        if let Some(inner) = self.inner.take() {
            inner.detach();
        }
    }
}

impl<T> Task<T> {
    /// Lets the task run to completion without anyone awaiting it.
    pub fn detach(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.detach();
        }
    }

    /// Drops the task; it stops at its next suspension point.
    pub fn cancel(mut self) {
        drop(self.inner.take());
    }

    /// Returns `true` once the task has produced its output.
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().is_none_or(|inner| inner.is_finished())
    }
}

/// Error type kept for API parity with the tokio runtime.
#[derive(Debug)]
pub struct TaskError {
    _private: (),
}

impl TaskError {
    /// Always `true`: the only way to observe this error is a cancelled handle.
    pub fn is_cancelled(&self) -> bool {
        true
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task cancelled")
    }
}

impl std::error::Error for TaskError {}

/// Configures and runs a smol [`LocalExecutor`] on a single thread.
#[derive(Debug, Default)]
pub struct LocalExecutorBuilder {
    core_id: Option<CoreId>,
    name: String,
}

impl LocalExecutorBuilder {
    /// Creates a new LocalExecutorBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the executor thread started by [`spawn`](Self::spawn).
    pub fn name(mut self, name: &str) -> Self {
        self.name = String::from(name);
        self
    }

    /// Pins the executor thread to the specified CPU core
    pub fn core_id(mut self, core_id: CoreId) -> Self {
        self.core_id = Some(core_id);
        self
    }

    /// Runs the executor on the current thread until `f` completes.
    pub fn run<T>(mut self, f: impl Future<Output = T>) -> T {
        if let Some(core_id) = self.core_id.take() {
            set_for_current(core_id);
        }

        let local_ex = LocalExecutor::new();
        LOCAL.set(&local_ex, || {
            futures_lite::future::block_on(local_ex.run(f))
        })
    }

    /// Starts a named thread running the executor until the generated future completes.
    pub fn spawn<G, F, T>(mut self, fut_gen: G) -> Result<JoinHandle<T>>
    where
        G: FnOnce() -> F + Send + 'static,
        F: Future<Output = T> + 'static,
        T: Send + 'static,
    {
        let mut core_id = self.core_id.take();

        thread::Builder::new().name(self.name).spawn(move || {
            if let Some(core_id) = core_id.take() {
                set_for_current(core_id);
            }

            let local_ex = LocalExecutor::new();
            LOCAL.set(&local_ex, || {
                futures_lite::future::block_on(local_ex.run(fut_gen()))
            })
        })
    }
}

/// Spawns a task onto the current executor; it runs once the caller yields.
///
/// # Panics
///
/// Panics if called outside of a `LocalExecutor` created by [`LocalExecutorBuilder`].
pub fn spawn_local<T: 'static>(future: impl Future<Output = T> + 'static) -> Task<T> {
    if LOCAL.is_set() {
        LOCAL.with(|local_ex| Task {
            inner: Some(local_ex.spawn(future)),
        })
    } else {
        panic!("`spawn_local()` must be called from a `LocalExecutor`")
    }
}

/// Yields so other ready tasks on the executor can run.
pub async fn yield_local() {
    futures_lite::future::yield_now().await
}

/// Completes after the executor has gone through at least one full turn.
///
/// An async-io timer whose deadline has already passed is ready on its first poll,
/// so a zero-length timer would never suspend. One millisecond matches the
/// granularity tokio rounds its zero-length sleep up to.
pub async fn next_turn() {
    trace!("waiting for next executor turn");
    Timer::after(NEXT_TURN).await;
}

const NEXT_TURN: Duration = Duration::from_millis(1);
