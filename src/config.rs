use std::env;

use tracing::warn;

use crate::error::{HistogramError, Result};

pub const DEFAULT_NUM_BINS: usize = 3;

/// How the width of each bin is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinSpan {
    /// `ceil(max_value / num_bins)`, computed from the data.
    #[default]
    Derived,
    Fixed(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramConfig {
    pub num_bins: usize,
    pub span: BinSpan,
    /// Number of fork-join chunks. Tuning only, results do not depend on it.
    /// Read by `Engine::from_config`; a run uses its engine's own count.
    pub chunks: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
            span: BinSpan::Derived,
            chunks: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl HistogramConfig {
    pub fn new(num_bins: usize) -> Self {
        Self {
            num_bins,
            ..Default::default()
        }
    }

    pub fn with_span(mut self, span: BinSpan) -> Self {
        self.span = span;
        self
    }

    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = chunks;
        self
    }

    /// Apply overrides from the environment.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `BINSCAN_BINS` | `num_bins` |
    /// | `BINSCAN_SPAN` | `span` (a positive integer, or `derived`) |
    /// | `BINSCAN_CHUNKS` | `chunks` |
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("BINSCAN_BINS") {
            match val.parse::<usize>() {
                Ok(n) => self.num_bins = n,
                Err(_) => warn!(value = %val, "ignoring unparseable BINSCAN_BINS"),
            }
        }
        if let Ok(val) = env::var("BINSCAN_SPAN") {
            if val.eq_ignore_ascii_case("derived") {
                self.span = BinSpan::Derived;
            } else {
                match val.parse::<u32>() {
                    Ok(s) => self.span = BinSpan::Fixed(s),
                    Err(_) => warn!(value = %val, "ignoring unparseable BINSCAN_SPAN"),
                }
            }
        }
        if let Ok(val) = env::var("BINSCAN_CHUNKS") {
            match val.parse::<usize>() {
                Ok(n) => self.chunks = n,
                Err(_) => warn!(value = %val, "ignoring unparseable BINSCAN_CHUNKS"),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_layout()?;
        if self.chunks == 0 {
            return Err(HistogramError::invalid("chunk count must be positive"));
        }
        Ok(())
    }

    /// Checks only the fields that shape the bins.
    pub fn validate_layout(&self) -> Result<()> {
        if self.num_bins == 0 {
            return Err(HistogramError::invalid("bin count must be positive"));
        }
        if self.span == BinSpan::Fixed(0) {
            return Err(HistogramError::invalid("bin span must be positive"));
        }
        Ok(())
    }
}
