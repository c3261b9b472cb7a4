//! # Cloudless Parallel
//!
//! Execution strategies for per-pixel raster work.
//!
//! Every strategy produces results in index order, so a reduction computed
//! with `Sequential` is bit-identical to the same reduction computed with
//! `Parallel`. Without the `parallel` feature all modes run sequentially.

pub mod strategy;

pub use strategy::{num_threads, ProcessingMode};
