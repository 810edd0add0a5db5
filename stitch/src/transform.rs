//! # Transform Stages - One Pump per Stage
//!
//! A [`TransformStage`] turns a [`Transformer`] into a writable/readable pair. Chunks
//! written to the stage's writable are pulled by a single background pump task, handed
//! to [`Transformer::transform`] one at a time, and whatever the transformer enqueues
//! through its [`Controller`] appears on the stage's readable.
//!
//! ```text
//!             TransformStage<I, O>
//!  ┌──────────────────────────────────────────────────┐
//!  │                                                  │
//!  │  writable ─▶ [input] ─▶ pump ─▶ transform(chunk) │
//!  │                           │        │             │
//!  │                           │   controller.enqueue │
//!  │                           ▼        ▼             │
//!  │   input end ─▶ flush()   [output] ─▶ readable    │
//!  │                                                  │
//!  └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering
//!
//! The pump awaits `transform` for chunk N, including anything the transformer
//! awaits inside it, before it reads chunk N+1. It then waits for room in the output
//! before reading again, so a slow consumer holds back the whole stage.
//!
//! ## Failure
//!
//! | event                               | output               | input      |
//! |-------------------------------------|----------------------|------------|
//! | `transform`/`flush` returns `Err(e)` | aborted with `e`     | canceled   |
//! | input errored with `e`              | aborted with `e`     | -          |
//! | output canceled by its reader       | -                    | canceled   |
//! | [`Controller::error`]`(e)`          | aborted with `e`     | canceled   |
//! | [`Controller::terminate`]           | closed               | canceled   |
//!
//! A stage that failed never reads or writes again.
//!
//! ## Example: Upper-casing Stage
//!
//! ```rust,no_run
//! use stitch::{Controller, StreamError, TransformStage, Transformer, collect, from_iter, pipe_through};
//! use stitch_rt::LocalExecutorBuilder;
//!
//! struct Upper;
//!
//! impl Transformer<String, String> for Upper {
//!     fn name(&self) -> &str {
//!         "Upper"
//!     }
//!
//!     async fn transform(&mut self, chunk: String, controller: &Controller<String>) -> Result<(), StreamError> {
//!         controller.enqueue(chunk.to_uppercase())
//!     }
//! }
//!
//! LocalExecutorBuilder::default().run(async {
//!     let source = from_iter(vec!["a".to_string(), "b".to_string()]);
//!     let output = pipe_through(source, TransformStage::new(Upper));
//!     assert_eq!(collect(output).await.unwrap(), vec!["A", "B"]);
//! });
//! ```

use std::rc::Rc;

use log::trace;

use crate::{
    config::StreamConfig,
    error::StreamError,
    stream::{ReadableStream, WritableStream, channel},
    stream_internal::CancelHandle,
    transform_internal::pump,
};

/// Per-chunk strategy run by a [`TransformStage`].
///
/// `transform` is required; `flush` defaults to doing nothing. Ready-made variants:
/// [`Passthrough`] forwards chunks unchanged and [`Map`] converts each chunk with a
/// closure. Stages that need end-of-stream work implement `flush` themselves.
#[allow(async_fn_in_trait)]
pub trait Transformer<I, O> {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Processes one chunk. Returning `Err` fails the stage.
    async fn transform(&mut self, chunk: I, controller: &Controller<O>) -> Result<(), StreamError>;

    /// Runs once after the last chunk, before the output closes. Returning `Err` fails
    /// the stage instead of closing it.
    async fn flush(&mut self, _controller: &Controller<O>) -> Result<(), StreamError> {
        Ok(())
    }
}

/// Forwards every chunk unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl<T> Transformer<T, T> for Passthrough {
    fn name(&self) -> &str {
        "Passthrough"
    }

    async fn transform(&mut self, chunk: T, controller: &Controller<T>) -> Result<(), StreamError> {
        controller.enqueue(chunk)
    }
}

/// Converts each chunk into exactly one output chunk.
pub struct Map<F> {
    name: String,
    f: F,
}

impl<F> Map<F> {
    /// Wraps `f` under the given log name.
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_owned(),
            f,
        }
    }
}

impl<I, O, F> Transformer<I, O> for Map<F>
where
    F: FnMut(I) -> Result<O, StreamError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&mut self, chunk: I, controller: &Controller<O>) -> Result<(), StreamError> {
        let mapped = (self.f)(chunk)?;
        controller.enqueue(mapped)
    }
}

/// A transformer's handle on its stage.
///
/// Cloning is cheap; deferred tasks started by a transformer keep a clone so they can
/// enqueue into the stage output after `transform` has returned.
pub struct Controller<O> {
    name: Rc<str>,
    output: Rc<WritableStream<O>>,
    input: Rc<dyn CancelHandle>,
}

impl<O> Clone for Controller<O> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            output: Rc::clone(&self.output),
            input: Rc::clone(&self.input),
        }
    }
}

impl<O> Controller<O> {
    pub(crate) fn new(name: &str, output: WritableStream<O>, input: Rc<dyn CancelHandle>) -> Self {
        Self {
            name: Rc::from(name),
            output: Rc::new(output),
            input,
        }
    }

    /// Name of the stage this controller belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `chunk` to the stage output without waiting for room.
    pub fn enqueue(&self, chunk: O) -> Result<(), StreamError> {
        self.output.enqueue(chunk)
    }

    /// Fails the stage: aborts the output with `reason` and cancels the input.
    pub fn error(&self, reason: StreamError) {
        trace!("{} errored: {}", self.name, reason);
        self.output.abort(reason.clone());
        self.input.cancel(reason);
    }

    /// Ends the stage early: closes the output and cancels the input.
    pub fn terminate(&self) {
        trace!("{} terminated", self.name);
        // already closed or errored outputs stay as they are
        let _ = self.output.close();
        self.input
            .cancel(StreamError::Canceled(format!("{} terminated", self.name)));
    }

    /// Room left in the stage output; see [`WritableStream::desired_size`].
    pub fn desired_size(&self) -> Option<isize> {
        self.output.desired_size()
    }

    /// Waits until the stage output has room again.
    pub async fn ready(&self) -> Result<(), StreamError> {
        self.output.ready().await
    }

    /// Waits until the stage output stops accepting chunks.
    pub async fn closed(&self) {
        self.output.closed().await
    }

    /// Returns `true` while the stage output accepts chunks.
    pub fn is_open(&self) -> bool {
        self.output.is_writable()
    }

    pub(crate) fn close(&self) -> Result<(), StreamError> {
        self.output.close()
    }
}

/// A running transformer: write chunks into [`writable`](Self::writable), read
/// results from [`readable`](Self::readable).
///
/// Creating a stage spawns its pump, so it must happen on a stitch-rt executor.
pub struct TransformStage<I, O> {
    writable: WritableStream<I>,
    readable: ReadableStream<O>,
}

impl<I: 'static, O: 'static> TransformStage<I, O> {
    /// Starts `transformer` with the default [`StreamConfig`].
    pub fn new<T>(transformer: T) -> Self
    where
        T: Transformer<I, O> + 'static,
    {
        Self::with_config(transformer, &StreamConfig::default())
    }

    /// Starts `transformer`; `config` applies to both the input and output streams.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a stitch-rt executor.
    pub fn with_config<T>(transformer: T, config: &StreamConfig) -> Self
    where
        T: Transformer<I, O> + 'static,
    {
        let (writable, input) = channel(config);
        let (output, readable) = channel(config);
        let controller = Controller::new(transformer.name(), output, input.cancel_handle());

        trace!("starting {} pump", controller.name());
        stitch_rt::spawn_local(pump(transformer, input, controller)).detach();

        Self { writable, readable }
    }
}

impl<I, O> TransformStage<I, O> {
    /// The stage input.
    pub fn writable(&self) -> &WritableStream<I> {
        &self.writable
    }

    /// The stage output.
    pub fn readable(&mut self) -> &mut ReadableStream<O> {
        &mut self.readable
    }

    /// Splits the stage into its input and output ends.
    pub fn into_parts(self) -> (WritableStream<I>, ReadableStream<O>) {
        (self.writable, self.readable)
    }
}
