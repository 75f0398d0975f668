use crate::pipeline::channel::{Sender, SharedReceiver};
use crate::pipeline::in_flight::InFlight;
use crate::pipeline::runner::PipelineError;
use crate::source::processor::IntervalJob;
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use tracing::{debug, warn};

/// One flattened meter reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub nmi: Arc<str>,
    /// End of the interval the consumption was measured over
    pub timestamp: NaiveDateTime,
    pub consumption: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpanderStats {
    pub jobs: u64,
    pub readings: u64,
}

impl ExpanderStats {
    pub fn merge(&mut self, other: ExpanderStats) {
        self.jobs += other.jobs;
        self.readings += other.readings;
    }
}

/// Expand one interval job into its readings, in timestamp order.
///
/// Value `i` (0-based) is stamped at midnight of the interval date plus
/// `(i + 1)` interval lengths, so the first reading lands one interval after
/// midnight and the last at midnight of the next day.
pub fn expand(job: &IntervalJob) -> impl Iterator<Item = Reading> + '_ {
    let midnight = job.interval_date.and_time(NaiveTime::MIN);
    let minutes = i64::from(job.interval_length.minutes());

    job.values
        .iter()
        .enumerate()
        .map(move |(i, &consumption)| Reading {
            nmi: Arc::clone(&job.nmi),
            timestamp: midnight + Duration::minutes(minutes * (i as i64 + 1)),
            consumption,
        })
}

/// Run one expansion worker.
///
/// Takes jobs from the shared interval queue until it is closed and drained,
/// submitting every reading to the reading queue.
pub async fn run_expander(
    worker_id: usize,
    jobs: SharedReceiver<IntervalJob>,
    output: Sender<Reading>,
    in_flight: InFlight,
) -> Result<ExpanderStats, PipelineError> {
    let mut stats = ExpanderStats::default();

    debug!(worker_id, "Expansion worker started");

    loop {
        // The lock is held only while waiting for the next job
        let job = jobs.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        for reading in expand(&job) {
            in_flight.submitted();
            if output.send(reading).await.is_err() {
                in_flight.withdrawn();
                warn!(worker_id, line = job.line, "Reading channel closed");
                return Err(PipelineError::ChannelSend);
            }
            stats.readings += 1;
        }
        stats.jobs += 1;
    }

    debug!(
        worker_id,
        jobs = stats.jobs,
        readings = stats.readings,
        "Expansion worker finished"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nem12::IntervalLength;
    use crate::pipeline::channel::{create_channel, share_receiver};
    use chrono::NaiveDate;

    fn make_job(nmi: &str, date: (i32, u32, u32), minutes: u32) -> IntervalJob {
        let interval_length = IntervalLength::new(minutes).unwrap();
        IntervalJob {
            nmi: Arc::from(nmi),
            interval_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            interval_length,
            values: (0..interval_length.values_per_day())
                .map(|i| i as f64 * 0.5)
                .collect(),
            line: 1,
        }
    }

    fn fmt(ts: NaiveDateTime) -> String {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn test_thirty_minute_day_yields_48_readings() {
        let job = make_job("NMI0000001", (2023, 1, 1), 30);
        let readings: Vec<_> = expand(&job).collect();

        assert_eq!(readings.len(), 48);
        assert_eq!(fmt(readings[0].timestamp), "2023-01-01 00:30:00");
        assert_eq!(fmt(readings[1].timestamp), "2023-01-01 01:00:00");
        assert_eq!(fmt(readings[47].timestamp), "2023-01-02 00:00:00");
    }

    #[test]
    fn test_five_minute_day_yields_288_readings() {
        let job = make_job("NMI0000001", (2023, 1, 1), 5);
        let readings: Vec<_> = expand(&job).collect();

        assert_eq!(readings.len(), 288);
        assert_eq!(fmt(readings[0].timestamp), "2023-01-01 00:05:00");
        assert_eq!(fmt(readings[287].timestamp), "2023-01-02 00:00:00");
    }

    #[test]
    fn test_ith_reading_is_i_intervals_after_midnight() {
        for minutes in [1, 5, 10, 15, 30, 60, 1440] {
            let job = make_job("NMI", (2024, 2, 29), minutes);
            let midnight = job.interval_date.and_time(NaiveTime::MIN);

            for (i, reading) in expand(&job).enumerate() {
                let expected = midnight + Duration::minutes(i64::from(minutes) * (i as i64 + 1));
                assert_eq!(reading.timestamp, expected);
                assert_eq!(reading.consumption, job.values[i]);
                assert_eq!(&*reading.nmi, "NMI");
            }
        }
    }

    #[test]
    fn test_readings_are_strictly_ordered() {
        let job = make_job("NMI", (2023, 6, 30), 15);
        let readings: Vec<_> = expand(&job).collect();
        assert!(readings.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_run_expander_drains_queue() {
        let (job_tx, job_rx) = create_channel(4);
        let (reading_tx, mut reading_rx) = create_channel(1000);
        let in_flight = InFlight::new();

        let handle = tokio::spawn(run_expander(
            0,
            share_receiver(job_rx),
            reading_tx,
            in_flight.clone(),
        ));

        job_tx.send(make_job("A", (2023, 1, 1), 30)).await.unwrap();
        job_tx.send(make_job("B", (2023, 1, 2), 60)).await.unwrap();
        drop(job_tx);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, ExpanderStats { jobs: 2, readings: 72 });
        assert_eq!(in_flight.pending(), 72);

        let mut received = 0;
        while reading_rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 72);
    }

    #[tokio::test]
    async fn test_run_expander_fails_when_sink_is_gone() {
        let (job_tx, job_rx) = create_channel(1);
        let (reading_tx, reading_rx) = create_channel(1);
        let in_flight = InFlight::new();
        drop(reading_rx);

        job_tx.send(make_job("A", (2023, 1, 1), 30)).await.unwrap();
        drop(job_tx);

        let result = run_expander(0, share_receiver(job_rx), reading_tx, in_flight.clone()).await;
        assert!(matches!(result, Err(PipelineError::ChannelSend)));
        assert_eq!(in_flight.pending(), 0);
    }
}
