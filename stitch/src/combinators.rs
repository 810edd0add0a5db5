//! Stream combinators: pipe, tee, chain, and conversions to and from collections.

use bytes::Bytes;
use log::{debug, trace};
use stitch_codec::TextDecoder;
use stitch_rt::spawn_local;

use crate::{
    config::StreamConfig,
    error::StreamError,
    stream::{ReadableStream, WritableStream, channel},
    transform::TransformStage,
};

/// What [`pipe`] leaves alone when it finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipeOptions {
    /// Keep the sink open after the source ends.
    pub prevent_close: bool,
    /// Do not abort the sink when the source errors.
    pub prevent_abort: bool,
}

impl PipeOptions {
    /// Options that keep the sink open for another source.
    pub fn keep_open() -> Self {
        Self {
            prevent_close: true,
            ..Self::default()
        }
    }
}

/// Moves every chunk of `source` into `sink`, honoring the sink's backpressure.
///
/// Once the source ends the sink is closed, unless `options.prevent_close` is set.
/// A source error aborts the sink (unless `options.prevent_abort`) and is returned.
/// A write error cancels the source and is returned.
pub async fn pipe<T>(
    mut source: ReadableStream<T>,
    sink: &WritableStream<T>,
    options: PipeOptions,
) -> Result<(), StreamError> {
    loop {
        let chunk = match source.read().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(err) => {
                if !options.prevent_abort {
                    sink.abort(err.clone());
                }
                return Err(err);
            }
        };
        if let Err(err) = sink.write(chunk).await {
            source.cancel(err.clone());
            return Err(err);
        }
    }

    if options.prevent_close {
        Ok(())
    } else {
        sink.close()
    }
}

/// Pipes `source` into `stage` on a background task and returns the stage's output.
pub fn pipe_through<I: 'static, O>(source: ReadableStream<I>, stage: TransformStage<I, O>) -> ReadableStream<O> {
    let (writable, readable) = stage.into_parts();
    spawn_local(async move {
        if let Err(err) = pipe(source, &writable, PipeOptions::default()).await {
            debug!("pipe_through stopped: {}", err);
        }
    })
    .detach();
    readable
}

/// Splits `source` into two branches that each see every chunk, in order.
///
/// A single pump reads the source and writes each chunk to both branches, waiting for
/// the slower one. A canceled branch is skipped from then on; the source is canceled
/// once both are. A source error errors both branches.
pub fn tee<T: Clone + 'static>(source: ReadableStream<T>) -> (ReadableStream<T>, ReadableStream<T>) {
    let config = StreamConfig::default();
    let (first, first_readable) = channel(&config);
    let (second, second_readable) = channel(&config);

    spawn_local(async move {
        let mut source = source;
        let (mut first_open, mut second_open) = (true, true);

        loop {
            let chunk = match source.read().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => {
                    trace!("tee source ended");
                    let _ = first.close();
                    let _ = second.close();
                    return;
                }
                Err(err) => {
                    debug!("tee source errored: {}", err);
                    first.abort(err.clone());
                    second.abort(err);
                    return;
                }
            };

            let copy = chunk.clone();
            (first_open, second_open) = futures::join!(
                forward(&first, first_open, copy),
                forward(&second, second_open, chunk),
            );

            if !first_open && !second_open {
                trace!("both tee branches canceled");
                source.cancel(StreamError::Canceled("both tee branches canceled".to_owned()));
                return;
            }
        }
    })
    .detach();

    (first_readable, second_readable)
}

async fn forward<T>(branch: &WritableStream<T>, open: bool, chunk: T) -> bool {
    if !open {
        return false;
    }
    branch.write(chunk).await.is_ok()
}

/// Concatenates `sources`: all chunks of the first, then all of the second, and so on.
///
/// Sources are consumed strictly one after another. An empty list yields a stream
/// that is already closed. If a source errors, the output errors and the remaining
/// sources are canceled.
pub fn chain<T: 'static>(sources: Vec<ReadableStream<T>>) -> ReadableStream<T> {
    let (writable, readable) = channel(&StreamConfig::default());

    if sources.is_empty() {
        let _ = writable.close();
        return readable;
    }

    spawn_local(async move {
        let last = sources.len() - 1;
        for (index, source) in sources.into_iter().enumerate() {
            let options = PipeOptions {
                prevent_close: index != last,
                ..PipeOptions::default()
            };
            if let Err(err) = pipe(source, &writable, options).await {
                debug!("chain stopped at source {}: {}", index, err);
                return;
            }
        }
    })
    .detach();

    readable
}

/// Returns a closed stream that yields `chunks` in order.
///
/// All chunks are queued up front, so this works outside an executor too.
pub fn from_iter<T, I>(chunks: I) -> ReadableStream<T>
where
    I: IntoIterator<Item = T>,
{
    let (writable, readable) = channel(&StreamConfig::default());
    for chunk in chunks {
        // a fresh channel accepts every enqueue
        let _ = writable.enqueue(chunk);
    }
    let _ = writable.close();
    readable
}

/// Reads `source` to the end.
pub async fn collect<T>(mut source: ReadableStream<T>) -> Result<Vec<T>, StreamError> {
    let mut chunks = Vec::new();
    while let Some(chunk) = source.read().await? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Reads `source` to the end and decodes it as UTF-8, replacing invalid sequences.
pub async fn collect_string(mut source: ReadableStream<Bytes>) -> Result<String, StreamError> {
    let mut decoder = TextDecoder::new();
    let mut text = String::new();
    while let Some(chunk) = source.read().await? {
        text.push_str(&decoder.decode(&chunk));
    }
    if let Some(tail) = decoder.finish() {
        text.push_str(&String::from_utf8_lossy(&tail));
    }
    Ok(text)
}
