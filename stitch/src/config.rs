use log::warn;

/// Default number of chunks a stream queues before its writer is held back.
pub const DEFAULT_HIGH_WATER_MARK: usize = 1;

/// Settings shared by the streams a stage or pipeline creates.
///
/// # Example
///
/// ```rust
/// use stitch::StreamConfig;
///
/// let config = StreamConfig::new().high_water_mark(8);
/// assert_eq!(config.get_high_water_mark(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    high_water_mark: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

impl StreamConfig {
    /// Creates a config with [`DEFAULT_HIGH_WATER_MARK`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many chunks may queue before `write` waits. Zero is raised to one,
    /// since a stream that can hold nothing could never make progress.
    pub fn high_water_mark(mut self, chunks: usize) -> Self {
        if chunks == 0 {
            warn!("high water mark of 0 chunks raised to 1");
        }
        self.high_water_mark = chunks.max(1);
        self
    }

    /// Returns the configured high-water mark, in chunks.
    pub fn get_high_water_mark(&self) -> usize {
        self.high_water_mark
    }
}
