//! The full map / reduce / scan pipeline, parallel and sequential.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::binner::bin_sequential;
use crate::bins::{BinLayout, BinVector};
use crate::config::HistogramConfig;
use crate::engine::Engine;
use crate::error::{HistogramError, Result};
use crate::prefix_sum::prefix_sum_sequential;
use crate::reduce::reduce_sequential;

/// Output of one pipeline run, every stage included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    layout: BinLayout,
    upper_bounds: Vec<i64>,
    one_hot: Arc<[BinVector]>,
    counts: BinVector,
    cumulative: BinVector,
}

impl Histogram {
    pub fn layout(&self) -> &BinLayout {
        &self.layout
    }

    /// Per-bin inclusive upper bounds, for display.
    pub fn upper_bounds(&self) -> &[i64] {
        &self.upper_bounds
    }

    pub fn one_hot(&self) -> &[BinVector] {
        &self.one_hot
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn cumulative(&self) -> &[u32] {
        &self.cumulative
    }

    pub fn count(&self, bin: usize) -> Result<u32> {
        self.counts.get(bin).copied().ok_or(HistogramError::OutOfRange {
            index: bin,
            len: self.counts.len(),
        })
    }

    pub fn cumulative_at(&self, bin: usize) -> Result<u32> {
        self.cumulative
            .get(bin)
            .copied()
            .ok_or(HistogramError::OutOfRange {
                index: bin,
                len: self.cumulative.len(),
            })
    }

    /// Number of input values, i.e. the last cumulative count.
    pub fn total(&self) -> u32 {
        self.cumulative.last().copied().unwrap_or(0)
    }

    fn assemble(
        layout: BinLayout,
        one_hot: Arc<[BinVector]>,
        counts: BinVector,
        cumulative: Vec<u32>,
    ) -> Self {
        debug_assert_eq!(counts.total(), one_hot.len() as u64);
        debug_assert_eq!(cumulative.last().copied(), Some(one_hot.len() as u32));
        Self {
            layout,
            upper_bounds: layout.upper_bounds(),
            one_hot,
            counts,
            cumulative: cumulative.into(),
        }
    }
}

impl Engine {
    /// Runs bin, reduce and scan on the engine's worker pool.
    #[instrument(skip_all, fields(n = values.len(), chunks = self.chunks()))]
    pub async fn histogram(&self, values: &[u32], config: &HistogramConfig) -> Result<Histogram> {
        let layout = BinLayout::derive(values, config)?;
        debug!(?layout, "layout resolved");

        let one_hot: Arc<[BinVector]> = self.bin(values, &layout).await?.into();
        let counts = self.reduce(Arc::clone(&one_hot), layout.num_bins()).await?;
        debug!(counts = ?counts, "reduce done");
        let cumulative = self.prefix_sum(&counts).await?;
        debug!(?cumulative, "scan done");

        info!(num_bins = layout.num_bins(), span = layout.span(), "parallel histogram built");
        Ok(Histogram::assemble(layout, one_hot, counts, cumulative))
    }
}

#[instrument(skip_all, fields(n = values.len()))]
pub fn histogram_sequential(values: &[u32], config: &HistogramConfig) -> Result<Histogram> {
    let layout = BinLayout::derive(values, config)?;

    let one_hot: Arc<[BinVector]> = bin_sequential(values, &layout)?.into();
    let counts = reduce_sequential(&one_hot, layout.num_bins())?;
    let cumulative = prefix_sum_sequential(&counts);

    info!(num_bins = layout.num_bins(), span = layout.span(), "sequential histogram built");
    Ok(Histogram::assemble(layout, one_hot, counts, cumulative))
}

fn write_row(f: &mut fmt::Formatter<'_>, row: &[impl fmt::Display]) -> fmt::Result {
    for x in row {
        write!(f, "{x} ")?;
    }
    writeln!(f)
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BINS (span {}): ", self.layout.span())?;
        write_row(f, self.upper_bounds())?;

        writeln!(f, "\nSTEP 1: MAP")?;
        for (i, row) in self.one_hot.iter().enumerate() {
            write!(f, "{{ ")?;
            for x in row.iter() {
                write!(f, "{x} ")?;
            }
            if i + 1 == self.one_hot.len() {
                writeln!(f, "}}")?;
            } else {
                write!(f, "}}, ")?;
            }
        }

        writeln!(f, "\nSTEP 2: REDUCE")?;
        write_row(f, self.counts())?;

        writeln!(f, "\nSTEP 3: SCAN")?;
        write_row(f, self.cumulative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BinSpan;

    use rand::Rng;
    use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256PlusPlus};

    const REFERENCE: [u32; 8] = [0, 7, 8, 10, 24, 48, 73, 120];

    #[tokio::test]
    async fn reference_scenario() -> anyhow::Result<()> {
        let config = HistogramConfig::new(3).with_chunks(4);
        let engine = Engine::from_config(&config)?;

        let hist = engine.histogram(&REFERENCE, &config).await?;

        assert_eq!(hist.layout().span(), 40);
        assert_eq!(hist.counts(), &[5, 2, 1]);
        assert_eq!(hist.cumulative(), &[5, 7, 8]);
        assert_eq!(hist.upper_bounds(), &[40, 80, 120]);
        assert_eq!(hist.total(), 8);

        assert_eq!(hist, histogram_sequential(&REFERENCE, &config)?);
        Ok(())
    }

    #[tokio::test]
    async fn single_value_with_fixed_span() -> anyhow::Result<()> {
        let engine = Engine::new(2)?;

        // 5 - 1 = 4, 4 / 2 = bin 2.
        let config = HistogramConfig::new(4).with_span(BinSpan::Fixed(2));
        let hist = engine.histogram(&[5], &config).await?;
        assert_eq!(hist.counts(), &[0, 0, 1, 0]);
        assert_eq!(hist.cumulative(), &[0, 0, 1, 1]);

        // A span that covers the value puts it in the first bin.
        let config = HistogramConfig::new(4).with_span(BinSpan::Fixed(5));
        let hist = engine.histogram(&[5], &config).await?;
        assert_eq!(hist.counts(), &[1, 0, 0, 0]);
        assert_eq!(hist.cumulative(), &[1, 1, 1, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_rejected_before_dispatch() -> anyhow::Result<()> {
        let engine = Engine::new(2)?;
        let config = HistogramConfig::new(3);

        for values in [&[][..], &[0u32, 0, 0][..]] {
            assert!(matches!(
                engine.histogram(values, &config).await,
                Err(HistogramError::InvalidInput(_))
            ));
            assert!(matches!(
                histogram_sequential(values, &config),
                Err(HistogramError::InvalidInput(_))
            ));
        }

        let zero_bins = HistogramConfig::new(0);
        assert!(matches!(
            engine.histogram(&REFERENCE, &zero_bins).await,
            Err(HistogramError::InvalidInput(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn engine_chunk_count_wins_over_config() -> anyhow::Result<()> {
        let config = HistogramConfig::new(3).with_chunks(0);
        let engine = Engine::new(3)?;

        let hist = engine.histogram(&REFERENCE, &config).await?;
        assert_eq!(hist.cumulative(), &[5, 7, 8]);
        assert_eq!(hist, histogram_sequential(&REFERENCE, &config)?);
        Ok(())
    }

    #[test]
    fn accessors_reject_missing_bins() -> anyhow::Result<()> {
        let hist = histogram_sequential(&REFERENCE, &HistogramConfig::new(3))?;
        assert_eq!(hist.count(1)?, 2);
        assert_eq!(hist.cumulative_at(1)?, 7);
        assert!(matches!(
            hist.count(3),
            Err(HistogramError::OutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            hist.cumulative_at(9),
            Err(HistogramError::OutOfRange { index: 9, len: 3 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn properties_hold_for_random_inputs() -> anyhow::Result<()> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);

        for _ in 0..10 {
            let n = rng.gen_range(1..=60);
            let num_bins = rng.gen_range(1..=12);
            let values: Vec<u32> = (0..n).map(|_| rng.gen_range(1..=5_000)).collect();
            let config = HistogramConfig::new(num_bins);
            let expected = histogram_sequential(&values, &config)?;

            assert_eq!(expected.counts().len(), num_bins);
            assert_eq!(expected.counts().iter().sum::<u32>(), n as u32);
            assert_eq!(expected.total(), n as u32);
            assert!(expected.cumulative().windows(2).all(|w| w[0] <= w[1]));
            for k in 1..=num_bins {
                let head: u32 = expected.counts()[..k].iter().sum();
                assert_eq!(head, expected.cumulative()[k - 1]);
            }

            for chunks in 1..=n {
                let hist = Engine::new(chunks)?.histogram(&values, &config).await?;
                assert_eq!(hist, expected, "n={n} bins={num_bins} chunks={chunks}");
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn reruns_are_identical() -> anyhow::Result<()> {
        let config = HistogramConfig::new(5).with_chunks(3);
        let engine = Engine::from_config(&config)?;

        let first = engine.histogram(&REFERENCE, &config).await?;
        let second = engine.histogram(&REFERENCE, &config).await?;
        assert_eq!(first, second);
        assert_eq!(
            histogram_sequential(&REFERENCE, &config)?,
            histogram_sequential(&REFERENCE, &config)?
        );
        Ok(())
    }

    #[test]
    fn display_lists_every_stage() -> anyhow::Result<()> {
        let hist = histogram_sequential(&[0, 48, 120], &HistogramConfig::new(3))?;
        let text = hist.to_string();

        assert!(text.starts_with("BINS (span 40): 40 80 120 \n"));
        assert!(text.contains("STEP 1: MAP\n{ 1 0 0 }, { 0 1 0 }, { 0 0 1 }\n"));
        assert!(text.contains("STEP 2: REDUCE\n1 1 1 \n"));
        assert!(text.ends_with("STEP 3: SCAN\n1 2 3 \n"));
        Ok(())
    }
}
