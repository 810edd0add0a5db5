use bytes::Bytes;
use log::trace;
use stitch_rt::{Task, defer};

use crate::{
    error::StreamError,
    transform::{Controller, Transformer},
};

/// Injects a fixed piece of text once, right after the first chunk has settled.
///
/// The first chunk is forwarded immediately and the prefix is scheduled with
/// [`defer`](stitch_rt::defer), so it lands after the chunks that are already in
/// flight rather than at the very start of the stream. If the stream ends before any
/// chunk arrives, the prefix is emitted at the end instead. It is never emitted twice.
pub struct PrefixTransform {
    prefix: Bytes,
    scheduled: bool,
    pending: Option<Task<Result<(), StreamError>>>,
}

impl PrefixTransform {
    /// Creates a stage that injects `prefix`. Empty prefixes emit nothing.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: Bytes::copy_from_slice(prefix.as_bytes()),
            scheduled: false,
            pending: None,
        }
    }
}

impl Transformer<Bytes, Bytes> for PrefixTransform {
    fn name(&self) -> &str {
        "PrefixTransform"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        controller.enqueue(chunk)?;

        if !self.scheduled {
            self.scheduled = true;
            let prefix = self.prefix.clone();
            let controller = controller.clone();
            self.pending = Some(defer(async move {
                if prefix.is_empty() {
                    return Ok(());
                }
                trace!("injecting {} prefix bytes", prefix.len());
                controller.enqueue(prefix)
            }));
        }
        Ok(())
    }

    async fn flush(&mut self, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        if let Some(pending) = self.pending.take() {
            return pending.await?;
        }
        if !self.scheduled && !self.prefix.is_empty() {
            self.scheduled = true;
            controller.enqueue(self.prefix.clone())?;
        }
        Ok(())
    }
}
