use bytes::Bytes;

use crate::{
    error::StreamError,
    transform::{Controller, Transformer},
};

/// Forwards chunks unchanged and emits a fixed suffix once the stream ends.
pub struct SuffixTransform {
    suffix: Bytes,
}

impl SuffixTransform {
    /// Creates a stage that ends the stream with `suffix`. Empty suffixes emit nothing.
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: Bytes::copy_from_slice(suffix.as_bytes()),
        }
    }
}

impl Transformer<Bytes, Bytes> for SuffixTransform {
    fn name(&self) -> &str {
        "SuffixTransform"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        controller.enqueue(chunk)
    }

    async fn flush(&mut self, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        if self.suffix.is_empty() {
            return Ok(());
        }
        controller.enqueue(self.suffix.clone())
    }
}
