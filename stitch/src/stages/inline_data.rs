use std::pin::pin;

use bytes::Bytes;
use futures::future::{Either, select};
use log::{debug, trace};
use stitch_rt::{Task, defer};

use crate::{
    error::StreamError,
    stream::ReadableStream,
    transform::{Controller, Transformer},
};

/// Merges a secondary byte stream into the primary one.
///
/// The first primary chunk is forwarded and then a deferred task starts draining the
/// side stream into the output, chunk by chunk. Primary chunks that arrive meanwhile
/// are forwarded as they come, so the two interleave. The primary stream only ends once
/// the side stream has been fully drained. When the primary stream carries no chunks at
/// all, the side stream is drained at its end. A side-stream error fails the stage.
pub struct InlineDataTransform {
    side: Option<ReadableStream<Bytes>>,
    drain: Option<Task<()>>,
}

impl InlineDataTransform {
    /// Creates a stage that merges `side` into the stream it is piped into.
    pub fn new(side: ReadableStream<Bytes>) -> Self {
        Self {
            side: Some(side),
            drain: None,
        }
    }
}

impl Transformer<Bytes, Bytes> for InlineDataTransform {
    fn name(&self) -> &str {
        "InlineDataTransform"
    }

    async fn transform(&mut self, chunk: Bytes, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        controller.enqueue(chunk)?;

        if let Some(side) = self.side.take() {
            trace!("scheduling side stream drain");
            self.drain = Some(defer(drain_side_stream(side, controller.clone())));
        }
        Ok(())
    }

    async fn flush(&mut self, controller: &Controller<Bytes>) -> Result<(), StreamError> {
        if let Some(drain) = self.drain.take() {
            drain.await?;
        } else if let Some(side) = self.side.take() {
            trace!("primary stream was empty, draining side stream now");
            drain_side_stream(side, controller.clone()).await;
        }
        Ok(())
    }
}

async fn drain_side_stream(mut side: ReadableStream<Bytes>, controller: Controller<Bytes>) {
    loop {
        // a side stream that never ends must not outlive a shut-down stage
        let next = {
            let read = pin!(side.read());
            let closed = pin!(controller.closed());
            match select(read, closed).await {
                Either::Left((next, _)) => Some(next),
                Either::Right(_) => None,
            }
        };
        let Some(next) = next else {
            trace!("stage output shut down, canceling side stream");
            side.cancel(StreamError::Canceled("inline data output shut down".into()));
            return;
        };

        match next {
            Ok(Some(chunk)) => {
                if controller.enqueue(chunk).is_err() || controller.ready().await.is_err() {
                    // the dropped side stream is canceled
                    return;
                }
            }
            Ok(None) => {
                trace!("side stream drained");
                return;
            }
            Err(err) => {
                debug!("side stream errored: {}", err);
                controller.error(StreamError::SideStream(err.to_string()));
                return;
            }
        }
    }
}
