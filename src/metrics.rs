//! Emission accounting for the segmentation pipeline.
//!
//! Pure bookkeeping, no I/O: atomic counters plus exponentially-smoothed
//! latency averages. Producers never block on it and it never fails; export
//! formatting is out of scope, consumers take [`MetricsSnapshot`]s.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;

/// Exponentially-weighted moving average, seeded by the first sample.
#[derive(Debug, Default)]
struct Ewma {
    value: f64,
}

impl Ewma {
    fn observe(&mut self, sample: f64) {
        if self.value == 0.0 {
            self.value = sample;
        } else {
            self.value = self.value * 0.8 + sample * 0.2;
        }
    }
}

/// Point-in-time view of the collected metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Partial events handed to the notifier (attempted, not delivered).
    pub partials_emitted: u64,
    /// Final events handed to the notifier (attempted, not delivered).
    pub finals_emitted: u64,
    /// First partials that beat the aggressive latency threshold.
    pub ultra_fast_partials: u64,
    /// Events the notifier had to drop on delivery failure.
    pub dropped_deliveries: u64,
    /// Smoothed utterance-start-to-first-partial latency (ms).
    pub avg_first_partial_latency_ms: f64,
    /// Smoothed utterance-end-to-final-emission latency (ms).
    pub avg_final_latency_ms: f64,
    /// Mean final transcript length (chars).
    pub avg_final_text_len: f64,
}

/// Collector observed by every emission in the pipeline.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    partials_emitted: AtomicU64,
    finals_emitted: AtomicU64,
    ultra_fast_partials: AtomicU64,
    dropped_deliveries: AtomicU64,
    final_text_chars: AtomicU64,
    first_partial_latency_ms: Mutex<Ewma>,
    final_latency_ms: Mutex<Ewma>,
}

impl MetricsCollector {
    /// Record an attempted partial emission.
    ///
    /// `latency_ms` is the utterance age at emission; it only feeds the
    /// first-partial average when `is_first` is set.
    pub fn record_partial(&self, latency_ms: f64, is_first: bool, ultra_fast: bool) {
        self.partials_emitted.fetch_add(1, Ordering::Relaxed);
        if ultra_fast {
            self.ultra_fast_partials.fetch_add(1, Ordering::Relaxed);
        }
        if is_first {
            self.first_partial_latency_ms.lock().observe(latency_ms);
        }
    }

    /// Record an attempted final emission.
    pub fn record_final(&self, latency_ms: f64, text_len: usize) {
        self.finals_emitted.fetch_add(1, Ordering::Relaxed);
        self.final_text_chars
            .fetch_add(text_len as u64, Ordering::Relaxed);
        self.final_latency_ms.lock().observe(latency_ms);
    }

    /// Record an event dropped by the notifier on delivery failure.
    pub fn record_dropped_delivery(&self) {
        self.dropped_deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let finals = self.finals_emitted.load(Ordering::Relaxed);
        let chars = self.final_text_chars.load(Ordering::Relaxed);
        MetricsSnapshot {
            partials_emitted: self.partials_emitted.load(Ordering::Relaxed),
            finals_emitted: finals,
            ultra_fast_partials: self.ultra_fast_partials.load(Ordering::Relaxed),
            dropped_deliveries: self.dropped_deliveries.load(Ordering::Relaxed),
            avg_first_partial_latency_ms: self.first_partial_latency_ms.lock().value,
            avg_final_latency_ms: self.final_latency_ms.lock().value,
            avg_final_text_len: if finals == 0 {
                0.0
            } else {
                chars as f64 / finals as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let metrics = MetricsCollector::default();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.partials_emitted, 0);
        assert_eq!(snapshot.finals_emitted, 0);
        assert_eq!(snapshot.avg_first_partial_latency_ms, 0.0);
        assert_eq!(snapshot.avg_final_text_len, 0.0);
    }

    #[test]
    fn test_ewma_seeded_by_first_sample() {
        let metrics = MetricsCollector::default();
        metrics.record_partial(180.0, true, true);
        assert_eq!(metrics.snapshot().avg_first_partial_latency_ms, 180.0);

        // avg = 180*0.8 + 280*0.2 = 200
        metrics.record_partial(280.0, true, false);
        let avg = metrics.snapshot().avg_first_partial_latency_ms;
        assert!((avg - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_first_partials_do_not_move_the_average() {
        let metrics = MetricsCollector::default();
        metrics.record_partial(150.0, true, false);
        metrics.record_partial(900.0, false, false);
        metrics.record_partial(900.0, false, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.partials_emitted, 3);
        assert_eq!(snapshot.avg_first_partial_latency_ms, 150.0);
    }

    #[test]
    fn test_ultra_fast_counter() {
        let metrics = MetricsCollector::default();
        metrics.record_partial(120.0, true, true);
        metrics.record_partial(400.0, false, false);
        assert_eq!(metrics.snapshot().ultra_fast_partials, 1);
    }

    #[test]
    fn test_final_accounting() {
        let metrics = MetricsCollector::default();
        metrics.record_final(250.0, 10);
        metrics.record_final(350.0, 30);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.finals_emitted, 2);
        assert_eq!(snapshot.avg_final_text_len, 20.0);
        // 250 seeded, then 250*0.8 + 350*0.2 = 270.
        assert!((snapshot.avg_final_latency_ms - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_dropped_deliveries() {
        let metrics = MetricsCollector::default();
        metrics.record_dropped_delivery();
        metrics.record_dropped_delivery();
        assert_eq!(metrics.snapshot().dropped_deliveries, 2);
    }
}
