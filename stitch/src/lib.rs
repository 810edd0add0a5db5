//! # stitch - Composable Byte-Stream Pipelines
//!
//! `stitch` assembles a streamed document out of a primary byte stream and a few kinds
//! of injected content, without buffering the whole document unless asked to. It is
//! single-threaded: every pump runs as a local task on a `stitch-rt` executor, and all
//! shared state lives in `Rc<RefCell<..>>`.
//!
//! ## Building Blocks
//!
//! - **Streams**: [`channel`] creates a [`WritableStream`]/[`ReadableStream`] pair with
//!   backpressure bounded by [`StreamConfig`].
//! - **Combinators**: [`pipe`], [`pipe_through`], [`tee`] and [`chain`] connect streams;
//!   [`from_iter`], [`collect`] and [`collect_string`] convert to and from collections.
//! - **Transform stages**: a [`Transformer`] run by a [`TransformStage`], reporting
//!   output through its [`Controller`].
//! - **Byte stages**: [`BufferedTransform`], [`FlushEffectTransform`],
//!   [`PrefixTransform`], [`InlineDataTransform`] and [`SuffixTransform`].
//! - **Orchestration**: [`Pipeline`] applies the byte stages to a [`RenderedStream`] in
//!   a fixed order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stitch::{Pipeline, RenderedStream, collect_string, encode_text, from_iter};
//! use stitch_rt::LocalExecutorBuilder;
//!
//! LocalExecutorBuilder::default().run(async {
//!     let rendered = from_iter(vec![encode_text("<main>"), encode_text("hello</main>")]);
//!     let data = from_iter(vec![encode_text("<script>data</script>")]);
//!
//!     let output = Pipeline::new()
//!         .inline_data(data)
//!         .suffix("</body></html>")
//!         .run(RenderedStream::new(rendered))
//!         .await
//!         .unwrap();
//!
//!     let html = collect_string(output).await.unwrap();
//!     assert!(html.starts_with("<main>"));
//!     assert!(html.contains("<script>data</script>"));
//!     assert!(html.ends_with("</body></html>"));
//! });
//! ```
//!
//! ## Feature Flags
//!
//! - **`runtime-tokio`** (default): run on tokio through `stitch-rt`
//! - **`runtime-smol`**: run on smol through `stitch-rt`

#![warn(rust_2018_idioms)]
#![allow(dead_code)]
#![warn(missing_docs)]

pub(crate) mod combinators;
pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod pipeline;
pub(crate) mod stream;
pub(crate) mod stream_internal;
pub(crate) mod transform;
pub(crate) mod transform_internal;

pub mod stages;

pub use combinators::{PipeOptions, chain, collect, collect_string, from_iter, pipe, pipe_through, tee};
pub use config::{DEFAULT_HIGH_WATER_MARK, StreamConfig};
pub use error::StreamError;
pub use pipeline::{DOCUMENT_CLOSE_TAG, Pipeline, RenderedStream};
pub use stages::{
    BufferedTransform, FlushEffectFn, FlushEffectTransform, InlineDataTransform, PrefixTransform,
    SuffixTransform,
};
pub use stitch_codec::{decode_text, encode_text};
pub use stream::{ReadableState, ReadableStream, WritableState, WritableStream, channel};
pub use transform::{Controller, Map, Passthrough, TransformStage, Transformer};
