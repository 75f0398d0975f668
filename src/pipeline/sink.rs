use crate::output::{BatchWriter, OutputError};
use crate::pipeline::channel::Receiver;
use crate::pipeline::expand::Reading;
use crate::pipeline::in_flight::InFlight;
use crate::pipeline::runner::PipelineError;
use serde::Serialize;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub readings: u64,
    pub batches: u64,
}

/// Accumulates readings and hands full batches to a writer.
///
/// The final partial batch is only written by [`BatchSink::finish`]; an
/// aborted run never flushes it.
pub struct BatchSink<W> {
    writer: W,
    batch: Vec<Reading>,
    batch_size: usize,
    in_flight: InFlight,
    stats: SinkStats,
}

impl<W: BatchWriter> BatchSink<W> {
    pub fn new(writer: W, batch_size: usize, in_flight: InFlight) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            writer,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            in_flight,
            stats: SinkStats::default(),
        }
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Readings waiting in the current batch
    pub fn buffered(&self) -> usize {
        self.batch.len()
    }

    pub async fn push(&mut self, reading: Reading) -> Result<(), OutputError> {
        self.batch.push(reading);
        self.in_flight.consumed();
        self.stats.readings += 1;

        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), OutputError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        self.writer.write_batch(&self.batch).await?;
        self.stats.batches += 1;
        debug!(
            batch = self.stats.batches,
            readings = self.batch.len(),
            "Flushed batch"
        );
        self.batch.clear();
        Ok(())
    }

    /// Flush the final partial batch and finalize the writer.
    pub async fn finish(mut self) -> Result<SinkStats, OutputError> {
        if let Err(e) = self.flush().await {
            self.abort().await;
            return Err(e);
        }
        if let Err(e) = self.writer.finish().await {
            error!(error = %e, "Failed to finish output");
            self.abort().await;
            return Err(e);
        }
        Ok(self.stats)
    }

    /// Drop buffered readings and discard everything the writer produced.
    pub async fn abort(mut self) {
        if !self.batch.is_empty() {
            debug!(readings = self.batch.len(), "Discarding unflushed batch");
            self.batch.clear();
        }
        if let Err(e) = self.writer.abort().await {
            warn!(error = %e, "Failed to discard output");
        }
    }
}

/// Run the batching sink until the reading channel is closed and drained.
///
/// Returns the sink without its final flush so the caller can choose between
/// [`BatchSink::finish`] and [`BatchSink::abort`] once the rest of the
/// pipeline has settled.
pub async fn run_sink<W: BatchWriter>(
    mut input: Receiver<Reading>,
    mut sink: BatchSink<W>,
) -> Result<BatchSink<W>, PipelineError> {
    while let Some(reading) = input.recv().await {
        if let Err(e) = sink.push(reading).await {
            error!(error = %e, "Batch write failed");
            // Unblock producers before discarding the output
            input.close();
            sink.abort().await;
            return Err(PipelineError::Output(e));
        }
    }
    Ok(sink)
}
