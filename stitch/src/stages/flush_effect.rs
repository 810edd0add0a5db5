use std::future::Future;

use bytes::{Bytes, BytesMut};
use futures::future::LocalBoxFuture;

use crate::{
    error::StreamError,
    transform::{Controller, Transformer},
};

/// Boxed text producer, as stored by [`Pipeline`](crate::Pipeline).
pub type FlushEffectFn = Box<dyn FnMut() -> LocalBoxFuture<'static, Result<String, StreamError>>>;

/// Prepends freshly produced text to every chunk.
///
/// For each chunk the producer is awaited first; its text and the chunk leave the stage
/// as a single chunk, effect first. An empty effect forwards the chunk untouched.
pub struct FlushEffectTransform<F> {
    produce: F,
}

impl<F> FlushEffectTransform<F> {
    /// Creates a stage that calls `produce` once per chunk.
    pub fn new(produce: F) -> Self {
        Self { produce }
    }
}

impl<F, Fut> Transformer<Bytes, Bytes> for FlushEffectTransform<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, StreamError>>,
{
    fn name(&self) -> &str {
        "FlushEffectTransform"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        let effect = (self.produce)().await?;
        if effect.is_empty() {
            return controller.enqueue(chunk);
        }

        let mut joined = BytesMut::with_capacity(effect.len() + chunk.len());
        joined.extend_from_slice(effect.as_bytes());
        joined.extend_from_slice(&chunk);
        controller.enqueue(joined.freeze())
    }
}
