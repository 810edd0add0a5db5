use std::{cell::RefCell, rc::Rc};

use bytes::Bytes;
use log::trace;
use stitch_codec::{TextDecoder, encode_text};
use stitch_rt::{Task, defer};

use crate::{
    error::StreamError,
    transform::{Controller, Transformer},
};

/// Coalesces bursts of small chunks into one.
///
/// Incoming bytes are decoded and appended to a text buffer. The first chunk of a
/// burst schedules a deferred emit; chunks arriving before it fires only grow the
/// buffer. At most one emit is outstanding at a time, and the end of the stream waits
/// for it, so nothing is lost. A multi-byte character split across chunks is held back
/// until it is complete; bytes that never complete one are forwarded raw at the end.
#[derive(Default)]
pub struct BufferedTransform {
    decoder: TextDecoder,
    buffer: Rc<RefCell<String>>,
    pending: Option<Task<Result<(), StreamError>>>,
}

impl BufferedTransform {
    /// Creates a stage with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer<Bytes, Bytes> for BufferedTransform {
    fn name(&self) -> &str {
        "BufferedTransform"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        let text = self.decoder.decode(&chunk);
        self.buffer.borrow_mut().push_str(&text);

        if self.pending.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let buffer = Rc::clone(&self.buffer);
        let controller = controller.clone();
        self.pending = Some(defer(async move {
            let text = std::mem::take(&mut *buffer.borrow_mut());
            if text.is_empty() {
                return Ok(());
            }
            trace!("emitting {} buffered bytes", text.len());
            controller.enqueue(encode_text(&text))
        }));
        Ok(())
    }

    async fn flush(&mut self, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        if let Some(pending) = self.pending.take() {
            pending.await??;
        }
        if let Some(tail) = self.decoder.finish() {
            trace!("forwarding {} undecodable trailing bytes", tail.len());
            controller.enqueue(tail)?;
        }
        Ok(())
    }
}
