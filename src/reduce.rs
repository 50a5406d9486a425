use std::sync::Arc;

use tracing::debug;

use crate::bins::BinVector;
use crate::engine::Engine;
use crate::error::{HistogramError, Result};

impl Engine {
    /// Element-wise sum of `rows` into a single histogram.
    ///
    /// Each chunk is folded from the zero vector on its own task, then the
    /// chunk sums are merged pairwise, level by level.
    pub async fn reduce(
        &self,
        rows: impl Into<Arc<[BinVector]>>,
        num_bins: usize,
    ) -> Result<BinVector> {
        let rows = rows.into();
        check_widths(&rows, num_bins)?;

        let mut level = self
            .fork_join(rows, move |_, chunk| fold(chunk, num_bins))
            .await?;
        debug!(partials = level.len(), "chunk sums done");

        while level.len() > 1 {
            let mut pairs = level.into_iter();
            let mut next = Vec::new();
            while let Some(left) = pairs.next() {
                next.push(match pairs.next() {
                    Some(right) => left.merged(&right),
                    None => left,
                });
            }
            level = next;
        }

        Ok(level.pop().unwrap_or_else(|| BinVector::zeros(num_bins)))
    }
}

pub fn reduce_sequential(rows: &[BinVector], num_bins: usize) -> Result<BinVector> {
    check_widths(rows, num_bins)?;
    Ok(fold(rows, num_bins))
}

fn fold(rows: &[BinVector], num_bins: usize) -> BinVector {
    rows.iter()
        .fold(BinVector::zeros(num_bins), |acc, row| acc.merged(row))
}

fn check_widths(rows: &[BinVector], num_bins: usize) -> Result<()> {
    match rows.iter().position(|row| row.len() != num_bins) {
        Some(i) => Err(HistogramError::invalid(format!(
            "row {i} has {} bins, expected {num_bins}",
            rows[i].len()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binner::bin_sequential;
    use crate::bins::BinLayout;
    use crate::config::HistogramConfig;

    use rand::Rng;
    use rand_xoshiro::{rand_core::SeedableRng, Xoshiro256PlusPlus};

    fn rows(indices: &[usize], num_bins: usize) -> Vec<BinVector> {
        indices
            .iter()
            .map(|&i| BinVector::one_hot(num_bins, i).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn sums_reference_rows() -> anyhow::Result<()> {
        let rows = rows(&[0, 0, 0, 0, 0, 1, 1, 2], 3);
        let hist = Engine::new(3)?.reduce(rows, 3).await?;
        assert_eq!(hist.into_vec(), vec![5, 2, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_input_is_identity() -> anyhow::Result<()> {
        let hist = Engine::new(4)?.reduce(Vec::<BinVector>::new(), 4).await?;
        assert_eq!(hist, BinVector::zeros(4));
        assert_eq!(reduce_sequential(&[], 4)?, BinVector::zeros(4));
        Ok(())
    }

    #[tokio::test]
    async fn mismatched_width_rejected() -> anyhow::Result<()> {
        let mut rows = rows(&[0, 1], 3);
        rows.push(BinVector::zeros(2));
        let result = Engine::new(2)?.reduce(rows.clone(), 3).await;
        assert!(matches!(result, Err(HistogramError::InvalidInput(_))));
        assert!(reduce_sequential(&rows, 3).is_err());
        Ok(())
    }

    #[tokio::test]
    async fn chunking_never_changes_the_sum() -> anyhow::Result<()> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let values: Vec<u32> = (0..97).map(|_| rng.gen_range(0..=1_000)).collect();
        let layout = BinLayout::derive(&values, &HistogramConfig::new(6))?;
        let mapped: Arc<[BinVector]> = bin_sequential(&values, &layout)?.into();
        let expected = reduce_sequential(&mapped, 6)?;

        assert_eq!(expected.total(), values.len() as u64);

        for chunks in 1..=values.len() {
            let hist = Engine::new(chunks)?.reduce(Arc::clone(&mapped), 6).await?;
            assert_eq!(hist, expected, "chunks={chunks}");
        }
        Ok(())
    }
}
