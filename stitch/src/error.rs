use thiserror::Error;

/// Errors observed while moving chunks through streams and stages.
///
/// The same value travels both ways: a stage that fails aborts its output with it
/// (downstream readers see it from `read`) and cancels its input with it (upstream
/// writers see it from `write`). It is therefore `Clone`, and carries text rather
/// than boxed sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The upstream producer failed.
    #[error("source read failed: {0}")]
    SourceRead(String),

    /// The downstream sink rejected a write, e.g. because it is already closed.
    #[error("sink write failed: {0}")]
    SinkWrite(String),

    /// A `transform` or `flush` callback failed.
    #[error("transform callback failed: {0}")]
    TransformCallback(String),

    /// The secondary stream merged by an inline-data stage failed.
    #[error("side stream failed: {0}")]
    SideStream(String),

    /// The reader gave up on the stream.
    #[error("stream canceled: {0}")]
    Canceled(String),

    /// The writer gave up on the stream.
    #[error("stream aborted: {0}")]
    Aborted(String),

    /// A deferred task panicked or was cancelled before completing.
    #[error("deferred task failed: {0}")]
    Task(String),
}

impl StreamError {
    pub(crate) fn closed() -> Self {
        StreamError::SinkWrite("stream is closed".to_owned())
    }
}

impl From<stitch_rt::TaskError> for StreamError {
    fn from(err: stitch_rt::TaskError) -> Self {
        StreamError::Task(err.to_string())
    }
}
