use crate::config::types::PipelineConfig;
use crate::output::{BatchWriter, OutputError};
use crate::pipeline::channel::{create_channel, share_receiver, Sender};
use crate::pipeline::expand::{run_expander, ExpanderStats};
use crate::pipeline::in_flight::InFlight;
use crate::pipeline::sink::{run_sink, BatchSink};
use crate::source::processor::{
    FatalRecordError, IntervalJob, LineOutcome, LineProcessor, RecordCounts, ScanStats,
};
use crate::source::reader::{LineReader, ReaderError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

/// Errors that can occur during pipeline operation
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Record(#[from] FatalRecordError),

    #[error("read error: {0}")]
    Reader(#[from] ReaderError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("channel send error")]
    ChannelSend,

    #[error("pipeline task failed: {0}")]
    Join(#[from] JoinError),

    #[error("{pending} readings were submitted but never reached a batch")]
    LostReadings { pending: usize },
}

/// What a completed run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub lines: u64,
    pub records: RecordCounts,
    pub rejected: u64,
    pub jobs: u64,
    pub readings: u64,
    pub batches: u64,
    pub workers: usize,
    pub elapsed_ms: u64,
}

/// Run the line processor over the whole input.
///
/// Submits one job per interval block and stops at the first fatal record
/// error or at the end-of-data record. Dropping `output` on return closes the
/// interval queue.
pub async fn run_line_processor<R: AsyncRead + Unpin>(
    reader: &mut LineReader<R>,
    mut processor: LineProcessor,
    output: Sender<IntervalJob>,
) -> Result<ScanStats, PipelineError> {
    let mut buf = Vec::new();
    let mut end_of_data = false;

    info!("Line processor started");

    while let Some(line_no) = reader.next_line(&mut buf).await? {
        match processor.process_line(line_no, &buf) {
            Ok(LineOutcome::Job(job)) => {
                if output.send(job).await.is_err() {
                    warn!(line = line_no, "Interval channel closed");
                    return Err(PipelineError::ChannelSend);
                }
            }
            Ok(LineOutcome::EndOfData) => {
                end_of_data = true;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!(
                    line = e.line,
                    record_type = %e.record_type,
                    error = %e.error,
                    "Fatal record error, stopping"
                );
                return Err(e.into());
            }
        }
    }

    if !end_of_data {
        warn!(
            lines = reader.lines_read(),
            "Input ended without an end-of-data record"
        );
    }

    let stats = processor.into_stats();
    info!(
        lines = stats.lines,
        jobs = stats.records.interval_data,
        rejected = stats.rejected,
        bytes = reader.bytes_read(),
        "Line processor finished"
    );
    Ok(stats)
}

/// Run the full pipeline: line processor, expansion pool, and batching sink.
///
/// Shutdown order is fixed. The interval queue is closed when the line
/// processor returns, every worker is joined (they hold the only reading
/// senders), and the sink then sees the reading queue closed and drained. The
/// final batch is flushed and the writer finished only when nothing failed;
/// otherwise the writer is aborted.
pub async fn run_pipeline<R, W>(
    mut reader: LineReader<R>,
    writer: W,
    config: &PipelineConfig,
) -> Result<PipelineSummary, PipelineError>
where
    R: AsyncRead + Unpin,
    W: BatchWriter + 'static,
{
    let started = Instant::now();
    let workers = config.workers.max(1);
    let in_flight = InFlight::new();

    let (job_tx, job_rx) = create_channel::<IntervalJob>(config.interval_queue_capacity);
    let (reading_tx, reading_rx) = create_channel(config.reading_queue_capacity);

    info!(
        workers,
        batch_size = config.batch_size,
        interval_queue_capacity = config.interval_queue_capacity,
        reading_queue_capacity = config.reading_queue_capacity,
        "Starting pipeline"
    );

    let sink = BatchSink::new(writer, config.batch_size, in_flight.clone());
    let sink_handle = tokio::spawn(run_sink(reading_rx, sink));

    let jobs = share_receiver(job_rx);
    let worker_handles: Vec<_> = (0..workers)
        .map(|worker_id| {
            tokio::spawn(run_expander(
                worker_id,
                Arc::clone(&jobs),
                reading_tx.clone(),
                in_flight.clone(),
            ))
        })
        .collect();

    // Workers now own the only handles on both queues
    drop(reading_tx);
    drop(jobs);

    let scan = run_line_processor(&mut reader, LineProcessor::new(), job_tx).await;

    let mut expanded = ExpanderStats::default();
    let mut worker_error = None;
    for result in futures::future::join_all(worker_handles).await {
        match result {
            Ok(Ok(stats)) => expanded.merge(stats),
            Ok(Err(e)) => {
                worker_error.get_or_insert(e);
            }
            Err(e) => {
                worker_error.get_or_insert(PipelineError::Join(e));
            }
        }
    }
    debug!(jobs = expanded.jobs, readings = expanded.readings, "Workers joined");

    // A failed sink has already aborted its writer
    let sink = sink_handle.await??;

    let scan = match scan {
        Ok(scan) => scan,
        Err(e) => return abort(sink, e).await,
    };
    if let Some(e) = worker_error {
        return abort(sink, e).await;
    }
    let pending = in_flight.pending();
    if pending != 0 {
        return abort(sink, PipelineError::LostReadings { pending }).await;
    }

    let written = sink.finish().await?;
    let summary = PipelineSummary {
        lines: scan.lines,
        records: scan.records,
        rejected: scan.rejected,
        jobs: expanded.jobs,
        readings: written.readings,
        batches: written.batches,
        workers,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        lines = summary.lines,
        jobs = summary.jobs,
        readings = summary.readings,
        batches = summary.batches,
        rejected = summary.rejected,
        elapsed_ms = summary.elapsed_ms,
        "Pipeline finished"
    );

    Ok(summary)
}

async fn abort<W: BatchWriter>(
    sink: BatchSink<W>,
    error: PipelineError,
) -> Result<PipelineSummary, PipelineError> {
    error!(error = %error, "Pipeline failed, discarding output");
    sink.abort().await;
    Err(error)
}
