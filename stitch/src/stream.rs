//! # Streams - Backpressured Single-Threaded Channels
//!
//! Every edge of a stitch pipeline is a [`channel`]: a [`WritableStream`] that chunks
//! are pushed into and a [`ReadableStream`] they are pulled from.
//!
//! ```text
//!   producer                                           consumer
//!      │  write().await ─┐                   ┌─ read().await  │
//!      ▼                 ▼                   │                ▼
//!  WritableStream ──▶ [ chunk │ chunk │ … ] ─┘          ReadableStream
//!                    (≤ high-water mark)
//! ```
//!
//! ## Lifecycle
//!
//! | action                 | reader sees                   | writer sees                  |
//! |------------------------|-------------------------------|------------------------------|
//! | `writable.close()`     | queued chunks, then `None`    | further writes fail          |
//! | `writable.abort(e)`    | `Err(e)` (queue discarded)    | further writes fail          |
//! | `readable.cancel(e)`   | `None`                        | writes fail with `e`         |
//! | drop readable          | -                             | as `cancel`                  |
//! | drop writable (open)   | `Err(Aborted)`                | -                            |
//!
//! ## Backpressure
//!
//! [`WritableStream::write`] waits until fewer than `high_water_mark` chunks are
//! queued. [`WritableStream::enqueue`] skips the wait, and
//! [`WritableStream::desired_size`] reports the remaining room, so transform stages
//! can push what a callback produces and then wait once via
//! [`WritableStream::ready`].

use std::{
    cell::RefCell,
    future::poll_fn,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::Stream;
use log::trace;

use crate::{
    config::StreamConfig,
    error::StreamError,
    stream_internal::{CancelHandle, Shared},
};

/// Where a [`ReadableStream`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadableState {
    /// Chunks may still arrive or are queued.
    Readable,
    /// Every chunk was consumed, or the reader canceled.
    Closed,
    /// The writer aborted; reads fail.
    Errored,
}

/// Where a [`WritableStream`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritableState {
    /// Writes are accepted.
    Writable,
    /// The writer closed the stream.
    Closed,
    /// The writer aborted or the reader canceled; writes fail.
    Aborted,
}

/// Creates a connected writable/readable pair.
///
/// # Example
///
/// ```rust,no_run
/// use stitch::{StreamConfig, channel};
/// use stitch_rt::LocalExecutorBuilder;
///
/// LocalExecutorBuilder::default().run(async {
///     let (writable, mut readable) = channel::<u32>(&StreamConfig::new().high_water_mark(2));
///     writable.write(1).await.unwrap();
///     writable.write(2).await.unwrap();
///     writable.close().unwrap();
///
///     assert_eq!(readable.read().await, Ok(Some(1)));
///     assert_eq!(readable.read().await, Ok(Some(2)));
///     assert_eq!(readable.read().await, Ok(None));
/// });
/// ```
pub fn channel<T>(config: &StreamConfig) -> (WritableStream<T>, ReadableStream<T>) {
    let shared = Rc::new(RefCell::new(Shared::new(config.get_high_water_mark())));
    (
        WritableStream {
            shared: Rc::clone(&shared),
        },
        ReadableStream {
            shared,
            finished: false,
        },
    )
}

/// Pull end of a stream.
///
/// There is exactly one reader per stream. It also implements
/// [`futures::Stream`], yielding an error at most once before ending.
pub struct ReadableStream<T> {
    shared: Rc<RefCell<Shared<T>>>,
    finished: bool,
}

impl<T> ReadableStream<T> {
    /// Waits for the next chunk.
    ///
    /// Returns `Ok(None)` once the stream is closed or canceled and `Err` for as long
    /// as the stream is errored.
    pub async fn read(&mut self) -> Result<Option<T>, StreamError> {
        poll_fn(|cx| self.shared.borrow_mut().poll_read(cx)).await
    }

    /// Stops reading: queued chunks are dropped and writers fail with `reason`.
    pub fn cancel(&mut self, reason: StreamError) {
        if self.shared.borrow_mut().cancel(reason) {
            trace!("readable canceled");
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> ReadableState {
        self.shared.borrow().readable_state()
    }

    pub(crate) fn cancel_handle(&self) -> Rc<dyn CancelHandle>
    where
        T: 'static,
    {
        self.shared.clone()
    }
}

impl<T> Stream for ReadableStream<T> {
    type Item = Result<T, StreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let polled = self.shared.borrow_mut().poll_read(cx);
        match polled {
            Poll::Ready(Ok(Some(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Ok(None)) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Err(err)) => {
                self.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for ReadableStream<T> {
    fn drop(&mut self) {
        if self
            .shared
            .borrow_mut()
            .cancel(StreamError::Canceled("readable dropped".to_owned()))
        {
            trace!("readable dropped while active");
        }
    }
}

/// Push end of a stream.
///
/// Not `Clone`: a writable has one owner. Pipes borrow it, so a writable left open
/// by one pipe can be handed to the next.
pub struct WritableStream<T> {
    shared: Rc<RefCell<Shared<T>>>,
}

impl<T> WritableStream<T> {
    /// Waits for room below the high-water mark, then queues `chunk`.
    pub async fn write(&self, chunk: T) -> Result<(), StreamError> {
        self.ready().await?;
        self.enqueue(chunk)
    }

    /// Queues `chunk` without waiting for room.
    pub fn enqueue(&self, chunk: T) -> Result<(), StreamError> {
        self.shared.borrow_mut().enqueue(chunk)
    }

    /// Waits until a write would be accepted without exceeding the high-water mark.
    ///
    /// Fails as soon as the stream can no longer be written to.
    pub async fn ready(&self) -> Result<(), StreamError> {
        poll_fn(|cx| self.shared.borrow_mut().poll_ready(cx)).await
    }

    /// Waits until writes are no longer accepted: closed, aborted or canceled.
    pub async fn closed(&self) {
        poll_fn(|cx| self.shared.borrow_mut().poll_closed(cx)).await
    }

    /// Closes the stream; the reader drains what is queued and then sees the end.
    pub fn close(&self) -> Result<(), StreamError> {
        self.shared.borrow_mut().close()
    }

    /// Errors the stream: queued chunks are discarded and the reader sees `reason`.
    ///
    /// Has no effect once the stream is closed, errored or canceled.
    pub fn abort(&self, reason: StreamError) {
        if self.shared.borrow_mut().abort(reason) {
            trace!("writable aborted");
        }
    }

    /// Room left below the high-water mark: `Some(0)` when closed, `None` once
    /// errored or canceled, negative when overfilled via [`enqueue`](Self::enqueue).
    pub fn desired_size(&self) -> Option<isize> {
        self.shared.borrow().desired_size()
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> WritableState {
        self.shared.borrow().writable_state()
    }

    /// Returns `true` while writes are accepted.
    pub fn is_writable(&self) -> bool {
        self.shared.borrow().is_active()
    }
}

impl<T> Drop for WritableStream<T> {
    fn drop(&mut self) {
        if self
            .shared
            .borrow_mut()
            .abort(StreamError::Aborted("writable dropped before close".to_owned()))
        {
            trace!("writable dropped while open");
        }
    }
}
