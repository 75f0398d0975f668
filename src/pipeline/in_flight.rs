use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Count of readings submitted to the reading queue but not yet in a batch.
///
/// Producers call [`InFlight::submitted`] before sending, never after, so the
/// count cannot drop to zero while a send is still pending. The sink calls
/// [`InFlight::consumed`] once the reading is in its batch.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn consumed(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }

    /// Roll back a submission whose send failed
    pub fn withdrawn(&self) {
        self.consumed();
    }

    pub fn pending(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_are_shared_between_clones() {
        let producer = InFlight::new();
        let consumer = producer.clone();

        producer.submitted();
        producer.submitted();
        assert_eq!(consumer.pending(), 2);

        consumer.consumed();
        producer.withdrawn();
        assert_eq!(producer.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_balance() {
        let in_flight = InFlight::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let in_flight = in_flight.clone();
                tokio::spawn(async move {
                    for _ in 0..1000 {
                        in_flight.submitted();
                        tokio::task::yield_now().await;
                        in_flight.consumed();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(in_flight.pending(), 0);
    }
}
