use std::ops::Deref;

use crate::config::{BinSpan, HistogramConfig};
use crate::error::{HistogramError, Result};

/// Per-bin counts. The length is fixed at construction.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BinVector(Box<[u32]>);

impl BinVector {
    pub fn zeros(len: usize) -> Self {
        Self(vec![0; len].into_boxed_slice())
    }

    /// A vector with a single `1` at `index`.
    pub fn one_hot(len: usize, index: usize) -> Result<Self> {
        if index >= len {
            return Err(HistogramError::OutOfRange { index, len });
        }
        Ok(Self::unit(len, index))
    }

    fn unit(len: usize, index: usize) -> Self {
        let mut v = Self::zeros(len);
        v.0[index] = 1;
        v
    }

    /// Element-wise addition, the combine step of the reduction.
    pub fn merge(&mut self, other: &BinVector) -> Result<()> {
        if self.len() != other.len() {
            return Err(HistogramError::invalid(format!(
                "cannot merge {} bins into {}",
                other.len(),
                self.len()
            )));
        }
        self.add(other);
        Ok(())
    }

    // Callers have already checked widths.
    pub(crate) fn merged(mut self, other: &BinVector) -> Self {
        debug_assert_eq!(self.len(), other.len());
        self.add(other);
        self
    }

    fn add(&mut self, other: &BinVector) {
        for (a, b) in self.0.iter_mut().zip(other.iter()) {
            *a += b;
        }
    }

    pub fn total(&self) -> u64 {
        self.iter().map(|&c| c as u64).sum()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0.into_vec()
    }
}

impl Deref for BinVector {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        &self.0
    }
}

impl From<Vec<u32>> for BinVector {
    fn from(v: Vec<u32>) -> Self {
        Self(v.into_boxed_slice())
    }
}

impl std::fmt::Debug for BinVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Bin geometry resolved from the data and the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLayout {
    num_bins: usize,
    span: u32,
    max_value: u32,
}

impl BinLayout {
    /// A layout with an explicit span, for callers that already know the
    /// maximum of their data.
    pub fn new(num_bins: usize, span: u32, max_value: u32) -> Result<Self> {
        if num_bins == 0 {
            return Err(HistogramError::invalid("bin count must be positive"));
        }
        if span == 0 {
            return Err(HistogramError::invalid("bin span must be positive"));
        }
        Ok(Self {
            num_bins,
            span,
            max_value,
        })
    }


    /// Resolves the layout for `values`. The caller's slice is left untouched;
    /// the maximum is read from a sorted working copy.
    ///
    /// `config.chunks` is not consulted here.
    pub fn derive(values: &[u32], config: &HistogramConfig) -> Result<Self> {
        config.validate_layout()?;

        if u32::try_from(values.len()).is_err() {
            return Err(HistogramError::invalid(format!(
                "{} values exceed the supported count range",
                values.len()
            )));
        }

        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        let max_value = *sorted
            .last()
            .ok_or_else(|| HistogramError::invalid("input sequence is empty"))?;

        let span = match config.span {
            BinSpan::Fixed(span) => span,
            BinSpan::Derived => {
                let span = (max_value as u64).div_ceil(config.num_bins as u64) as u32;
                if span == 0 {
                    return Err(HistogramError::invalid(
                        "maximum value is 0, no bin span can be derived",
                    ));
                }
                span
            }
        };

        Self::new(config.num_bins, span, max_value)
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    /// Value 0 shares bin 0 with `1..=span`. Anything past the last nominal
    /// bin is clamped into it.
    pub fn bin_index(&self, value: u32) -> usize {
        let adjusted = value.saturating_sub(1);
        ((adjusted / self.span) as usize).min(self.num_bins - 1)
    }

    pub fn one_hot(&self, value: u32) -> BinVector {
        BinVector::unit(self.num_bins, self.bin_index(value))
    }

    /// Inclusive upper bound of each bin, counted down from the maximum.
    ///
    /// Diagnostic only: `bin_index` never consults these, and with a rounded-up
    /// span the lower bounds can go negative or disagree with the clamp.
    pub fn upper_bounds(&self) -> Vec<i64> {
        let span = self.span as i64;
        (0..self.num_bins)
            .map(|i| {
                let steps = (self.num_bins - 1 - i) as i64;
                (self.max_value as i64).saturating_sub(steps.saturating_mul(span))
            })
            .collect()
    }
}
