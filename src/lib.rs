mod binner;
mod bins;
mod config;
mod engine;
mod error;
mod pipeline;
mod prefix_sum;
mod reduce;

pub use binner::bin_sequential;
pub use bins::{BinLayout, BinVector};
pub use config::{BinSpan, HistogramConfig, DEFAULT_NUM_BINS};
pub use engine::Engine;
pub use error::{HistogramError, Result};
pub use pipeline::{histogram_sequential, Histogram};
pub use prefix_sum::prefix_sum_sequential;
pub use reduce::reduce_sequential;
