//! # Stitch Demos
//!
//! Runnable demonstrations of stitch pipelines.
//!
//! ## Running Demos
//!
//! ```bash
//! cargo run -p demos --example progressive_render
//! ```
//!
//! Or on the smol runtime:
//!
//! ```bash
//! cargo run -p demos --example progressive_render --no-default-features --features runtime-smol
//! ```

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

/// Stand-ins for the renderer and data sources a real server would plug in
pub mod helpers;
