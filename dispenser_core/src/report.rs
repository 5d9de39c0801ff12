//! Interaction records and their background delivery.
//!
//! The controller never blocks on the network: records go through a bounded
//! channel to a worker thread that owns a `RecordSink`. A full queue drops the
//! new record with a warning. Dropping the `Reporter` drains what is queued,
//! unless `cancel` was called first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::feedback::Review;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// One completed interaction, as posted to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Gesture duration in whole milliseconds.
    #[serde(rename = "pir_time")]
    pub gesture_ms: u64,
    #[serde(rename = "user_review")]
    pub review: Review,
}

impl InteractionRecord {
    pub fn new(gesture: Duration, review: Review) -> Self {
        Self {
            gesture_ms: u64::try_from(gesture.as_millis()).unwrap_or(u64::MAX),
            review,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Destination for interaction records. Delivery is attempted once.
pub trait RecordSink: Send {
    fn deliver(&mut self, record: &InteractionRecord) -> Result<(), SinkError>;
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn deliver(&mut self, record: &InteractionRecord) -> Result<(), SinkError> {
        (**self).deliver(record)
    }
}

/// Writes records to the log instead of a collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn deliver(&mut self, record: &InteractionRecord) -> Result<(), SinkError> {
        info!(
            pir_time = record.gesture_ms,
            user_review = record.review.as_str(),
            "interaction record"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of reporter activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
}

pub struct Reporter {
    tx: Option<xch::Sender<InteractionRecord>>,
    cancelled: Arc<AtomicBool>,
    counters: Arc<Counters>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Reporter {
    /// Start the delivery worker. `queue_depth` is clamped to at least 1.
    pub fn spawn<K: RecordSink + 'static>(mut sink: K, queue_depth: usize) -> Self {
        let (tx, rx) = xch::bounded::<InteractionRecord>(queue_depth.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_worker = cancelled.clone();
        let counters = Arc::new(Counters::default());
        let counters_worker = counters.clone();

        let join_handle = std::thread::spawn(move || {
            // Ends when every sender is gone and the queue is empty.
            for record in rx.iter() {
                if cancelled_worker.load(Ordering::Relaxed) {
                    debug!("reporter cancelled, discarding queued records");
                    break;
                }
                match sink.deliver(&record) {
                    Ok(()) => {
                        counters_worker.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        counters_worker.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, pir_time = record.gesture_ms, "failed to send interaction record");
                    }
                }
            }
            tracing::trace!("reporter thread exiting cleanly");
        });

        Self {
            tx: Some(tx),
            cancelled,
            counters,
            join_handle: Some(join_handle),
        }
    }

    /// Queue a record without blocking. Returns false if it was dropped.
    pub fn submit(&self, record: InteractionRecord) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        match tx.try_send(record) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(pir_time = record.gesture_ms, "report queue full, dropping record");
                false
            }
            Err(xch::TrySendError::Disconnected(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("reporter worker gone, dropping record");
                false
            }
        }
    }

    /// Discard anything still queued instead of draining it on drop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ReporterStats {
        ReporterStats {
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, wait for the worker, and return final counts.
    pub fn shutdown(mut self) -> ReporterStats {
        self.close_and_join();
        self.stats()
    }

    fn close_and_join(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!("reporter thread panicked during shutdown: {:?}", e);
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.close_and_join();
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("stats", &self.stats())
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;

    #[test]
    fn wire_field_names() {
        let rec = InteractionRecord::new(Duration::from_millis(1234), Review::Satisfactory);
        assert_eq!(
            rec.to_json().unwrap(),
            r#"{"pir_time":1234,"user_review":"satisfactory"}"#
        );
    }

    #[test]
    fn duration_truncates_to_whole_millis() {
        let rec = InteractionRecord::new(Duration::from_micros(199_999), Review::Less);
        assert_eq!(rec.gesture_ms, 199);
    }

    struct Collect(Arc<Mutex<Vec<InteractionRecord>>>);

    impl RecordSink for Collect {
        fn deliver(&mut self, record: &InteractionRecord) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(*record);
            Ok(())
        }
    }

    #[test]
    fn drop_drains_queue() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter = Reporter::spawn(Collect(seen.clone()), 4);
        for ms in [10, 20, 30] {
            assert!(reporter.submit(InteractionRecord::new(
                Duration::from_millis(ms),
                Review::More
            )));
        }
        let stats = reporter.shutdown();
        assert_eq!(stats.delivered, 3);
        let got: Vec<u64> = seen.lock().unwrap().iter().map(|r| r.gesture_ms).collect();
        assert_eq!(got, vec![10, 20, 30]);
    }

    /// Blocks inside `deliver` until released, so the queue can be filled.
    struct Gated {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl RecordSink for Gated {
        fn deliver(&mut self, _record: &InteractionRecord) -> Result<(), SinkError> {
            let _ = self.entered.send(());
            let _ = self.release.recv();
            Err("collector unreachable".into())
        }
    }

    #[test]
    fn full_queue_drops_newest_and_failures_are_counted() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let reporter = Reporter::spawn(
            Gated {
                entered: entered_tx,
                release: release_rx,
            },
            1,
        );
        let rec = InteractionRecord::new(Duration::from_millis(5), Review::Less);

        assert!(reporter.submit(rec));
        entered_rx.recv().unwrap(); // worker holds the first record
        assert!(reporter.submit(rec)); // fills the single slot
        assert!(!reporter.submit(rec)); // dropped

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        let stats = reporter.shutdown();
        assert_eq!(
            stats,
            ReporterStats {
                delivered: 0,
                failed: 2,
                dropped: 1
            }
        );
    }
}
