use log::{debug, trace, warn};

use crate::{
    stream::ReadableStream,
    transform::{Controller, Transformer},
};

/// Drives one stage: read a chunk, transform it, wait for room, repeat. Flushes and
/// closes the output once the input ends.
pub(crate) async fn pump<I, O, T>(
    mut transformer: T,
    mut input: ReadableStream<I>,
    controller: Controller<O>,
) where
    T: Transformer<I, O>,
{
    loop {
        let chunk = match input.read().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                debug!("{} input errored: {}", controller.name(), err);
                controller.error(err);
                return;
            }
        };

        if let Err(err) = transformer.transform(chunk, &controller).await {
            warn!("{} transform failed: {}", controller.name(), err);
            controller.error(err);
            return;
        }

        if let Err(err) = controller.ready().await {
            trace!("{} output gone: {}", controller.name(), err);
            input.cancel(err);
            return;
        }
    }

    // the input also ends when the stage was errored or terminated from elsewhere
    if !controller.is_open() {
        trace!("{} input ended after stage shut down", controller.name());
        return;
    }

    if let Err(err) = transformer.flush(&controller).await {
        warn!("{} flush failed: {}", controller.name(), err);
        controller.error(err);
        return;
    }

    match controller.close() {
        Ok(()) => trace!("{} closed", controller.name()),
        Err(err) => trace!("{} not closed: {}", controller.name(), err),
    }
}
