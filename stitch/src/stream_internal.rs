use std::{
    cell::RefCell,
    collections::VecDeque,
    task::{Context, Poll, Waker},
};

use crate::{
    error::StreamError,
    stream::{ReadableState, WritableState},
};

/// Lifecycle of the channel shared by a readable/writable pair.
#[derive(Debug)]
enum Status {
    /// Writes accepted.
    Active,
    /// Writer closed; queued chunks can still be read.
    Closed,
    /// Writer aborted; the reader sees the error.
    Errored(StreamError),
    /// Reader canceled; writers see the reason.
    Canceled(StreamError),
}

/// State behind both ends of a stream.
///
/// Only ever touched from the executor thread, so a `RefCell` is enough. Wakers are
/// woken while the cell is borrowed; that only schedules the woken task.
pub(crate) struct Shared<T> {
    queue: VecDeque<T>,
    high_water_mark: usize,
    status: Status,
    read_waker: Option<Waker>,
    write_wakers: Vec<Waker>,
}

impl<T> Shared<T> {
    pub(crate) fn new(high_water_mark: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            high_water_mark: high_water_mark.max(1),
            status: Status::Active,
            read_waker: None,
            write_wakers: Vec::new(),
        }
    }

    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn wake_writers(&mut self) {
        for waker in self.write_wakers.drain(..) {
            waker.wake();
        }
    }

    fn write_error(&self) -> Option<StreamError> {
        match &self.status {
            Status::Active => None,
            Status::Closed => Some(StreamError::closed()),
            Status::Errored(err) | Status::Canceled(err) => Some(err.clone()),
        }
    }

    pub(crate) fn poll_read(&mut self, cx: &mut Context<'_>) -> Poll<Result<Option<T>, StreamError>> {
        if let Some(chunk) = self.queue.pop_front() {
            self.wake_writers();
            return Poll::Ready(Ok(Some(chunk)));
        }
        match &self.status {
            Status::Active => {
                self.read_waker = Some(cx.waker().clone());
                Poll::Pending
            }
            Status::Closed | Status::Canceled(_) => Poll::Ready(Ok(None)),
            Status::Errored(err) => Poll::Ready(Err(err.clone())),
        }
    }

    pub(crate) fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), StreamError>> {
        if let Some(err) = self.write_error() {
            return Poll::Ready(Err(err));
        }
        if self.queue.len() < self.high_water_mark {
            return Poll::Ready(Ok(()));
        }
        if !self.write_wakers.iter().any(|w| w.will_wake(cx.waker())) {
            self.write_wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }

    /// Ready once writes are rejected. Shares the writer wakers, so a read wakes it
    /// spuriously and it re-registers.
    pub(crate) fn poll_closed(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if !self.is_active() {
            return Poll::Ready(());
        }
        if !self.write_wakers.iter().any(|w| w.will_wake(cx.waker())) {
            self.write_wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }

    pub(crate) fn enqueue(&mut self, chunk: T) -> Result<(), StreamError> {
        if let Some(err) = self.write_error() {
            return Err(err);
        }
        self.queue.push_back(chunk);
        self.wake_reader();
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<(), StreamError> {
        if let Some(err) = self.write_error() {
            return Err(err);
        }
        self.status = Status::Closed;
        self.wake_reader();
        self.wake_writers();
        Ok(())
    }

    /// Errors the stream for the reader. No-op once closed, errored or canceled.
    pub(crate) fn abort(&mut self, reason: StreamError) -> bool {
        if !matches!(self.status, Status::Active) {
            return false;
        }
        self.queue.clear();
        self.status = Status::Errored(reason);
        self.wake_reader();
        self.wake_writers();
        true
    }

    /// Discards queued chunks and rejects further writes. No-op once errored or
    /// canceled.
    pub(crate) fn cancel(&mut self, reason: StreamError) -> bool {
        match self.status {
            Status::Active => {
                self.queue.clear();
                self.status = Status::Canceled(reason);
                self.wake_reader();
                self.wake_writers();
                true
            }
            Status::Closed => {
                self.queue.clear();
                false
            }
            Status::Errored(_) | Status::Canceled(_) => false,
        }
    }

    pub(crate) fn desired_size(&self) -> Option<isize> {
        match self.status {
            Status::Active => Some(self.high_water_mark as isize - self.queue.len() as isize),
            Status::Closed => Some(0),
            Status::Errored(_) | Status::Canceled(_) => None,
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self.status, Status::Active)
    }

    pub(crate) fn readable_state(&self) -> ReadableState {
        match self.status {
            Status::Active => ReadableState::Readable,
            Status::Closed if !self.queue.is_empty() => ReadableState::Readable,
            Status::Closed | Status::Canceled(_) => ReadableState::Closed,
            Status::Errored(_) => ReadableState::Errored,
        }
    }

    pub(crate) fn writable_state(&self) -> WritableState {
        match self.status {
            Status::Active => WritableState::Writable,
            Status::Closed => WritableState::Closed,
            Status::Errored(_) | Status::Canceled(_) => WritableState::Aborted,
        }
    }
}

/// Cancels the input side of a stage without knowing its chunk type.
///
/// A [`Controller`](crate::Controller) is typed by the stage's output only, yet
/// `error` and `terminate` must reach the input as well.
pub(crate) trait CancelHandle {
    fn cancel(&self, reason: StreamError);
}

impl<T> CancelHandle for RefCell<Shared<T>> {
    fn cancel(&self, reason: StreamError) {
        self.borrow_mut().cancel(reason);
    }
}
