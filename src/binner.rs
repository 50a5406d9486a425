use std::sync::Arc;

use tracing::debug;

use crate::bins::{BinLayout, BinVector};
use crate::engine::Engine;
use crate::error::{HistogramError, Result};

impl Engine {
    /// Maps every value to a one-hot vector marking its bin, in input order.
    pub async fn bin(&self, values: &[u32], layout: &BinLayout) -> Result<Vec<BinVector>> {
        check_nonempty(values)?;
        let layout = *layout;
        let input: Arc<[u32]> = Arc::from(values);

        let parts = self
            .fork_join(input, move |_, chunk| {
                chunk.iter().map(|&v| layout.one_hot(v)).collect::<Vec<_>>()
            })
            .await?;

        let mapped: Vec<BinVector> = parts.into_iter().flatten().collect();
        debug!(values = mapped.len(), num_bins = layout.num_bins(), "map done");
        Ok(mapped)
    }
}

pub fn bin_sequential(values: &[u32], layout: &BinLayout) -> Result<Vec<BinVector>> {
    check_nonempty(values)?;
    Ok(values.iter().map(|&v| layout.one_hot(v)).collect())
}

fn check_nonempty(values: &[u32]) -> Result<()> {
    if values.is_empty() {
        return Err(HistogramError::invalid("input sequence is empty"));
    }
    Ok(())
}
