//! Byte-stream stages used by [`Pipeline`](crate::Pipeline).
//!
//! Each stage is a [`Transformer`](crate::Transformer) over `Bytes`:
//!
//! | stage                    | per chunk                         | at end of stream              |
//! |--------------------------|-----------------------------------|-------------------------------|
//! | [`BufferedTransform`]    | coalesce text, deferred emit      | wait for the pending emit     |
//! | [`FlushEffectTransform`] | prepend produced text             | -                             |
//! | [`PrefixTransform`]      | forward, deferred prefix once     | emit prefix if still pending  |
//! | [`InlineDataTransform`]  | forward, then deferred side drain | wait for the drain            |
//! | [`SuffixTransform`]      | forward                           | emit suffix                   |
//!
//! "Deferred" means scheduled with [`stitch_rt::defer`], so chunks already in flight
//! reach the stage output first.

mod buffered;
mod flush_effect;
mod inline_data;
mod prefix;
mod suffix;

pub use buffered::BufferedTransform;
pub use flush_effect::{FlushEffectFn, FlushEffectTransform};
pub use inline_data::InlineDataTransform;
pub use prefix::PrefixTransform;
pub use suffix::SuffixTransform;
