use std::sync::Arc;

use futures::future::try_join_all;
use tracing::trace;

use crate::config::HistogramConfig;
use crate::error::{HistogramError, Result};

/// Fork-join executor over tokio's blocking pool.
///
/// Work is split into contiguous, uniformly sized chunks; each chunk runs as
/// its own task and hands its result back to the caller, which does all
/// combining. Results never depend on the chunk count.
#[derive(Debug, Clone)]
pub struct Engine {
    chunks: usize,
}

impl Engine {
    pub fn new(chunks: usize) -> Result<Self> {
        if chunks == 0 {
            return Err(HistogramError::invalid("chunk count must be positive"));
        }
        Ok(Self { chunks })
    }

    pub fn from_config(config: &HistogramConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.chunks)
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub(crate) fn chunk_len(&self, len: usize) -> usize {
        len.div_ceil(self.chunks).max(1)
    }

    /// Runs `f(chunk_index, chunk)` for every chunk of `input` and returns the
    /// results in chunk order.
    pub(crate) async fn fork_join<T, R, F>(&self, input: Arc<[T]>, f: F) -> Result<Vec<R>>
    where
        T: Send + Sync + 'static,
        R: Send + 'static,
        F: Fn(usize, &[T]) -> R + Send + Sync + 'static,
    {
        let len = input.len();
        if len == 0 {
            return Ok(Vec::new());
        }

        let chunk_len = self.chunk_len(len);
        let num_chunks = len.div_ceil(chunk_len);
        trace!(len, chunk_len, num_chunks, "fork");

        let f = Arc::new(f);
        // Capacity covers every chunk, so workers never block on send.
        let (sender, receiver) = flume::bounded(num_chunks);

        let handles = (0..num_chunks).map(|index| {
            let input = Arc::clone(&input);
            let f = Arc::clone(&f);
            let sender = sender.clone();
            tokio::task::spawn_blocking(move || {
                let start = index * chunk_len;
                let end = (start + chunk_len).min(input.len());
                let out = (*f)(index, &input[start..end]);
                // A dropped receiver means the join already failed.
                let _ = sender.send((index, out));
            })
        });
        let handles: Vec<_> = handles.collect();
        drop(sender);

        try_join_all(handles).await?;

        let mut slots: Vec<Option<R>> = (0..num_chunks).map(|_| None).collect();
        for _ in 0..num_chunks {
            let (index, out) = receiver
                .recv_async()
                .await
                .map_err(|_| HistogramError::ChannelClosed)?;
            slots[index] = Some(out);
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or(HistogramError::ChannelClosed))
            .collect()
    }
}
