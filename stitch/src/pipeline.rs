//! # Pipeline - Progressive Document Assembly
//!
//! [`Pipeline`] wires the byte stages around a rendered document stream. Every stage is
//! optional; the ones that are configured always run in this order:
//!
//! ```text
//!  rendered ─▶ buffered ─▶ flush effect ─▶ prefix ─▶ inline data ─▶ suffix ─▶ output
//! ```
//!
//! With full buffering the rendered stream is first read to its end, and its
//! completion signal awaited, before anything flows into the stages.
//!
//! ## Document Suffix
//!
//! [`Pipeline::document_suffix`] takes trailing markup such as
//! `"<script>boot()</script></body></html>"` and splits it on
//! [`DOCUMENT_CLOSE_TAG`]: the part before the tag is injected early as a prefix, and
//! the close tag itself becomes the suffix, so it stays the very last thing written
//! even when side data is merged in.

use std::future::Future;

use bytes::Bytes;
use futures::{FutureExt, future::LocalBoxFuture};
use log::debug;

use crate::{
    combinators::{collect, from_iter, pipe_through},
    config::StreamConfig,
    error::StreamError,
    stages::{
        BufferedTransform, FlushEffectFn, FlushEffectTransform, InlineDataTransform, PrefixTransform,
        SuffixTransform,
    },
    stream::ReadableStream,
    transform::TransformStage,
};

/// Markup that closes a document.
pub const DOCUMENT_CLOSE_TAG: &str = "</body></html>";

/// The primary byte stream handed to [`Pipeline::run`], with an optional signal that
/// completes once rendering is fully done.
pub struct RenderedStream {
    readable: ReadableStream<Bytes>,
    all_ready: Option<LocalBoxFuture<'static, Result<(), StreamError>>>,
}

impl RenderedStream {
    /// Wraps a rendered byte stream without a completion signal.
    pub fn new(readable: ReadableStream<Bytes>) -> Self {
        Self {
            readable,
            all_ready: None,
        }
    }

    /// Attaches the signal awaited in full-buffering mode.
    pub fn with_all_ready<F>(mut self, all_ready: F) -> Self
    where
        F: Future<Output = Result<(), StreamError>> + 'static,
    {
        self.all_ready = Some(all_ready.boxed_local());
        self
    }
}

/// Builder for the stage chain applied to a [`RenderedStream`].
///
/// # Example
///
/// ```rust,no_run
/// use stitch::{Pipeline, RenderedStream, collect_string, encode_text, from_iter};
/// use stitch_rt::LocalExecutorBuilder;
///
/// LocalExecutorBuilder::default().run(async {
///     let rendered = from_iter(vec![encode_text("<html><body><main>hi</main>")]);
///     let output = Pipeline::new()
///         .document_suffix("<script>boot()</script></body></html>")
///         .run(RenderedStream::new(rendered))
///         .await
///         .unwrap();
///
///     let html = collect_string(output).await.unwrap();
///     assert!(html.ends_with("</body></html>"));
/// });
/// ```
pub struct Pipeline {
    config: StreamConfig,
    buffered: bool,
    full_buffering: bool,
    flush_effect: Option<FlushEffectFn>,
    prefix: Option<String>,
    inline_data: Option<ReadableStream<Bytes>>,
    suffix: Option<String>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            config: StreamConfig::default(),
            buffered: true,
            full_buffering: false,
            flush_effect: None,
            prefix: None,
            inline_data: None,
            suffix: None,
        }
    }
}

impl Pipeline {
    /// Creates a pipeline with only the buffering stage enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream settings for every stage.
    pub fn config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables the coalescing stage. Enabled by default.
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// Waits for the whole rendered stream and its completion signal before emitting.
    pub fn full_buffering(mut self, full_buffering: bool) -> Self {
        self.full_buffering = full_buffering;
        self
    }

    /// Prepends the text produced by `produce` to every chunk.
    pub fn flush_effect<F, Fut>(mut self, mut produce: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<String, StreamError>> + 'static,
    {
        self.flush_effect = Some(Box::new(move || produce().boxed_local()));
        self
    }

    /// Injects `prefix` once, after the first chunk has settled.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_owned());
        self
    }

    /// Merges `side` into the output once the first chunk has been forwarded.
    pub fn inline_data(mut self, side: ReadableStream<Bytes>) -> Self {
        self.inline_data = Some(side);
        self
    }

    /// Appends `suffix` at the end of the output.
    pub fn suffix(mut self, suffix: &str) -> Self {
        self.suffix = Some(suffix.to_owned());
        self
    }

    /// Splits trailing document markup on [`DOCUMENT_CLOSE_TAG`]: what precedes the tag
    /// becomes the prefix, the tag becomes the suffix.
    pub fn document_suffix(self, suffix: &str) -> Self {
        let unclosed = suffix.split(DOCUMENT_CLOSE_TAG).next().unwrap_or_default();
        self.prefix(unclosed).suffix(DOCUMENT_CLOSE_TAG)
    }

    /// Names of the stages [`run`](Self::run) will apply, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.buffered {
            names.push("buffered");
        }
        if self.flush_effect.is_some() {
            names.push("flush_effect");
        }
        if self.prefix.is_some() {
            names.push("prefix");
        }
        if self.inline_data.is_some() {
            names.push("inline_data");
        }
        if self.suffix.is_some() {
            names.push("suffix");
        }
        names
    }

    /// Applies the configured stages to `rendered` and returns the final stream.
    ///
    /// Returns early only in full-buffering mode, when reading the rendered stream or
    /// awaiting its completion signal fails.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a stitch-rt executor.
    pub async fn run(self, rendered: RenderedStream) -> Result<ReadableStream<Bytes>, StreamError> {
        debug!("running pipeline with stages {:?}", self.stage_names());

        let Pipeline {
            config,
            buffered,
            full_buffering,
            flush_effect,
            prefix,
            inline_data,
            suffix,
        } = self;
        let RenderedStream {
            mut readable,
            all_ready,
        } = rendered;

        if full_buffering {
            let drained = collect(readable);
            let chunks = match all_ready {
                Some(all_ready) => {
                    let (chunks, ready) = futures::join!(drained, all_ready);
                    ready?;
                    chunks?
                }
                None => drained.await?,
            };
            debug!("fully buffered {} chunks", chunks.len());
            readable = from_iter(chunks);
        }

        if buffered {
            readable = pipe_through(readable, TransformStage::with_config(BufferedTransform::new(), &config));
        }
        if let Some(produce) = flush_effect {
            readable = pipe_through(readable, TransformStage::with_config(FlushEffectTransform::new(produce), &config));
        }
        if let Some(prefix) = prefix {
            readable = pipe_through(readable, TransformStage::with_config(PrefixTransform::new(&prefix), &config));
        }
        if let Some(side) = inline_data {
            readable = pipe_through(readable, TransformStage::with_config(InlineDataTransform::new(side), &config));
        }
        if let Some(suffix) = suffix {
            readable = pipe_through(readable, TransformStage::with_config(SuffixTransform::new(&suffix), &config));
        }

        Ok(readable)
    }
}
