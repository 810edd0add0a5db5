//! # stitch-rt - Single-Threaded Scheduling for Stream Stages
//!
//! `stitch-rt` is the scheduling layer underneath `stitch`. Every stage pump, tee pump,
//! pipe loop and deferred injection in a stitch pipeline runs as a local task on one
//! thread, so stage state lives in `Rc<RefCell<..>>` and never needs a lock.
//!
//! ## Two Kinds of Follow-up Work
//!
//! - **Immediate**: [`spawn_local()`] queues a task that runs as soon as the current
//!   task yields. [`yield_local()`] gives other ready tasks a chance to run.
//! - **Deferred**: [`defer()`] queues a task that only starts after at least one full
//!   executor turn (a zero-length timer, the equivalent of `setTimeout(0)`). Stages use
//!   it to inject bytes once the chunks already in flight have settled.
//!
//! Both return a [`Task<T>`] completion handle that can be awaited, detached or
//! cancelled.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stitch_rt::{LocalExecutorBuilder, defer, spawn_local};
//!
//! LocalExecutorBuilder::default().run(async {
//!     let late = defer(async { "deferred" });
//!     let early = spawn_local(async { "immediate" });
//!
//!     assert_eq!(early.await.unwrap(), "immediate");
//!     assert_eq!(late.await.unwrap(), "deferred");
//! });
//! ```
//!
//! ### With CPU Pinning
//!
//! ```rust,no_run
//! use stitch_rt::LocalExecutorBuilder;
//! use core_affinity::CoreId;
//!
//! LocalExecutorBuilder::new()
//!     .name("render-0")
//!     .core_id(CoreId { id: 0 })
//!     .run(async {
//!         println!("pinned to CPU core 0");
//!     });
//! ```
//!
//! ## Feature Flags
//!
//! - **`runtime-tokio`** (default): tokio's `LocalSet` on a current-thread runtime
//! - **`runtime-smol`**: smol's `LocalExecutor`
//!
//! **Note:** Only one runtime feature can be enabled at a time.

#![warn(rust_2018_idioms)]
#![warn(missing_docs)]

#[cfg(feature = "runtime-smol")]
mod smol;

#[cfg(feature = "runtime-smol")]
pub use smol::*;

#[cfg(feature = "runtime-tokio")]
mod tokio;

#[cfg(feature = "runtime-tokio")]
pub use tokio::*;

#[cfg(not(any(feature = "runtime-smol", feature = "runtime-tokio")))]
compile_error!("Either 'runtime-smol' or 'runtime-tokio' feature must be enabled");

#[cfg(all(feature = "runtime-smol", feature = "runtime-tokio"))]
compile_error!(
    "Only one runtime feature can be enabled at a time: 'runtime-smol' or 'runtime-tokio'"
);

/// Runs `future` after at least one full executor turn.
///
/// The returned [`Task`] resolves with the future's output. Unlike [`spawn_local()`],
/// which only waits for the spawning task to yield, a deferred task waits on a
/// zero-length timer, so chunks that are already moving between tasks get delivered
/// before it starts.
///
/// # Panics
///
/// Panics if called outside of [`LocalExecutorBuilder::run`] or
/// [`LocalExecutorBuilder::spawn`].
///
/// # Example
///
/// ```rust,no_run
/// use std::{cell::RefCell, rc::Rc};
/// use stitch_rt::{LocalExecutorBuilder, defer, spawn_local};
///
/// LocalExecutorBuilder::default().run(async {
///     let order = Rc::new(RefCell::new(Vec::new()));
///
///     let o = order.clone();
///     let late = defer(async move { o.borrow_mut().push("deferred") });
///     let o = order.clone();
///     let early = spawn_local(async move { o.borrow_mut().push("immediate") });
///
///     early.await.unwrap();
///     late.await.unwrap();
///     assert_eq!(*order.borrow(), vec!["immediate", "deferred"]);
/// });
/// ```
pub fn defer<T: 'static>(future: impl std::future::Future<Output = T> + 'static) -> Task<T> {
    spawn_local(async move {
        next_turn().await;
        future.await
    })
}
