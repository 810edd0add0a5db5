//! Tokio-backed local executor
//!
//! Tasks run on a `LocalSet` driven by a current-thread runtime with timers enabled,
//! which is what [`next_turn`] relies on.

use core_affinity::{CoreId, set_for_current};
use log::trace;
use scoped_tls::scoped_thread_local;
use std::{
    future::Future,
    io::Result,
    pin::Pin,
    task::{Context, Poll},
    thread::{self, JoinHandle},
    time::Duration,
};
use tokio::task::LocalSet;

scoped_thread_local!(pub(super) static LOCAL: LocalSet);

/// Completion handle of a local task.
///
/// Awaiting it yields `Ok(T)` once the task finishes, or `Err(TaskError)` if the task
/// panicked or was cancelled. Dropping the handle leaves the task running.
pub struct Task<T> {
    inner: tokio::task::JoinHandle<T>,
}

impl<T> Future for Task<T> {
    type Output = std::result::Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner)
            .poll(cx)
            .map(|result| result.map_err(|e| TaskError { inner: e }))
    }
}

impl<T> Task<T> {
    /// Lets the task run to completion without anyone awaiting it.
    pub fn detach(self) {
        drop(self.inner);
    }

    /// Aborts the task at its next suspension point.
    pub fn cancel(self) {
        self.inner.abort();
    }

    /// Returns `true` once the task has produced its output (or failed).
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// Error returned when awaiting a [`Task`] whose future panicked or was aborted.
#[derive(Debug)]
pub struct TaskError {
    inner: tokio::task::JoinError,
}

impl TaskError {
    /// Returns `true` if the task was cancelled rather than panicking.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for TaskError {}

/// Configures and runs a tokio [`LocalSet`] on a single thread.
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
        block_on_local(f)
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
            block_on_local(fut_gen())
        })
    }
}

fn block_on_local<T>(f: impl Future<Output = T>) -> T {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime");

    let local_set = LocalSet::new();
    LOCAL.set(&local_set, || rt.block_on(local_set.run_until(f)))
}

/// Spawns a task onto the current executor; it runs once the caller yields.
///
/// # Panics
///
/// Panics if called outside of a `LocalSet` created by [`LocalExecutorBuilder`].
pub fn spawn_local<T: 'static>(future: impl Future<Output = T> + 'static) -> Task<T> {
    if LOCAL.is_set() {
        LOCAL.with(|local_set| Task {
            inner: local_set.spawn_local(future),
        })
    } else {
        panic!("`spawn_local()` must be called from a tokio `LocalSet`")
    }
}

/// Yields so other ready tasks on the executor can run.
pub async fn yield_local() {
    tokio::task::yield_now().await
}

/// Completes after the executor has gone through at least one full turn.
///
/// Backed by a zero-length tokio timer, which is only fired by the time driver once
/// the tasks that are currently runnable have been polled.
pub async fn next_turn() {
    trace!("waiting for next executor turn");
    tokio::time::sleep(Duration::ZERO).await
}
