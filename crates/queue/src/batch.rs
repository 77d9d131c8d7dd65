//! In-memory bounded buffer that flushes on size or age (spec.md §4.4).

use parking_lot::Mutex;
use serde_json::Value;
use std::time::{Duration, Instant};

/// Point-in-time counters for `BatchQueue` (spec.md §4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    pub total_added: u64,
    pub total_flushed: u64,
    pub pending_count: usize,
    pub time_since_flush: Duration,
}

struct Inner {
    buffer: Vec<Value>,
    total_added: u64,
    total_flushed: u64,
    last_flush: Instant,
}

/// Flush-on-size-or-age buffer. All operations are mutually exclusive via
/// an internal mutex; records are never dropped silently.
pub struct BatchQueue {
    max_size: usize,
    flush_interval: Duration,
    inner: Mutex<Inner>,
}

impl BatchQueue {
    pub fn new(max_size: usize, flush_interval: Duration) -> Self {
        Self {
            max_size,
            flush_interval,
            inner: Mutex::new(Inner {
                buffer: Vec::new(),
                total_added: 0,
                total_flushed: 0,
                last_flush: Instant::now(),
            }),
        }
    }

    /// Appends `record`. Returns the drained batch (in insertion order) if
    /// this add crossed `max_size` or the flush interval has elapsed;
    /// otherwise `None` and the record stays buffered.
    pub fn add(&self, record: Value) -> Option<Vec<Value>> {
        let mut inner = self.inner.lock();
        inner.buffer.push(record);
        inner.total_added += 1;

        let should_flush =
            inner.buffer.len() >= self.max_size || inner.last_flush.elapsed() >= self.flush_interval;

        if should_flush {
            Some(Self::drain(&mut inner))
        } else {
            None
        }
    }

    /// Unconditionally drains whatever is buffered, even if empty.
    pub fn flush(&self) -> Vec<Value> {
        let mut inner = self.inner.lock();
        Self::drain(&mut inner)
    }

    fn drain(inner: &mut Inner) -> Vec<Value> {
        let batch = std::mem::take(&mut inner.buffer);
        inner.total_flushed += batch.len() as u64;
        inner.last_flush = Instant::now();
        batch
    }

    pub fn stats(&self) -> BatchStats {
        let inner = self.inner.lock();
        BatchStats {
            total_added: inner.total_added,
            total_flushed: inner.total_flushed,
            pending_count: inner.buffer.len(),
            time_since_flush: inner.last_flush.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn buffers_below_size_threshold() {
        let q = BatchQueue::new(3, Duration::from_secs(60));
        assert_eq!(q.add(json!(1)), None);
        assert_eq!(q.add(json!(2)), None);
        assert_eq!(q.stats().pending_count, 2);
    }

    #[test]
    fn flushes_on_size_threshold_with_insertion_order() {
        let q = BatchQueue::new(3, Duration::from_secs(60));
        assert_eq!(q.add(json!(1)), None);
        assert_eq!(q.add(json!(2)), None);
        let batch = q.add(json!(3)).expect("should flush at size 3");
        assert_eq!(batch, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(q.stats().pending_count, 0);
    }

    #[test]
    fn flushes_on_age_regardless_of_size() {
        let q = BatchQueue::new(100, Duration::from_millis(1));
        assert_eq!(q.add(json!(1)), None);
        std::thread::sleep(Duration::from_millis(5));
        let batch = q.add(json!(2)).expect("should flush once interval elapses");
        assert_eq!(batch, vec![json!(1), json!(2)]);
    }

    #[test]
    fn explicit_flush_drains_even_if_empty() {
        let q = BatchQueue::new(10, Duration::from_secs(60));
        assert_eq!(q.flush(), Vec::<Value>::new());
        q.add(json!(1));
        assert_eq!(q.flush(), vec![json!(1)]);
        assert_eq!(q.stats().pending_count, 0);
    }

    #[test]
    fn flush_completeness_matches_insertion_sequence() {
        let q = BatchQueue::new(1000, Duration::from_secs(60));
        let input: Vec<Value> = (0..25).map(|i| json!(i)).collect();
        let mut observed = Vec::new();
        for record in &input {
            if let Some(batch) = q.add(record.clone()) {
                observed.extend(batch);
            }
        }
        observed.extend(q.flush());
        assert_eq!(observed, input);
        assert_eq!(q.stats().pending_count, 0);
    }

    #[test]
    fn stats_track_totals() {
        let q = BatchQueue::new(2, Duration::from_secs(60));
        q.add(json!(1));
        q.add(json!(2));
        let stats = q.stats();
        assert_eq!(stats.total_added, 2);
        assert_eq!(stats.total_flushed, 2);
    }
}
