use std::sync::Arc;

use tracing::debug;

use crate::engine::Engine;
use crate::error::Result;

impl Engine {
    /// Inclusive prefix sum. Sums wrap on overflow.
    ///
    /// Up-sweep: every chunk reports its total. The totals are scanned into
    /// per-chunk carry-ins, then the down-sweep rescans each chunk starting
    /// from its carry-in.
    pub async fn prefix_sum(&self, input: &[u32]) -> Result<Vec<u32>> {
        if input.len() <= 1 {
            return Ok(Vec::from(input));
        }

        let input: Arc<[u32]> = Arc::from(input);

        let totals = self
            .fork_join(Arc::clone(&input), |_, chunk| {
                chunk.iter().fold(0u32, |acc, &x| acc.wrapping_add(x))
            })
            .await?;

        let carries: Arc<[u32]> = totals
            .iter()
            .scan(0u32, |acc, &total| {
                let carry = *acc;
                *acc = acc.wrapping_add(total);
                Some(carry)
            })
            .collect();
        debug!(chunks = carries.len(), "up-sweep done");

        let parts = self
            .fork_join(input, move |index, chunk| scan_from(carries[index], chunk))
            .await?;

        Ok(parts.concat())
    }
}

pub fn prefix_sum_sequential(input: &[u32]) -> Vec<u32> {
    scan_from(0, input)
}

fn scan_from(carry: u32, chunk: &[u32]) -> Vec<u32> {
    chunk
        .iter()
        .scan(carry, |acc, &x| {
            *acc = acc.wrapping_add(x);
            Some(*acc)
        })
        .collect()
}
