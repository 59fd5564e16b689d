//! Runtime counters (A4), trimmed from the teacher's metrics module down
//! to what the event loop and tests actually observe: no web export, no
//! historical sampling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub route_count: u64,
    pub uptime_seconds: u64,
}

#[derive(Debug)]
struct Inner {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    packets_dropped: AtomicU64,
    start_time: Instant,
}

#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                packets_sent: AtomicU64::new(0),
                packets_received: AtomicU64::new(0),
                packets_dropped: AtomicU64::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    pub fn increment_packets_sent(&self) {
        self.inner.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_packets_received(&self) {
        self.inner.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_packets_dropped(&self) {
        self.inner.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, route_count: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent: self.inner.packets_sent.load(Ordering::Relaxed),
            packets_received: self.inner.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.inner.packets_dropped.load(Ordering::Relaxed),
            route_count: route_count as u64,
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let metrics = Metrics::new();
        metrics.increment_packets_sent();
        metrics.increment_packets_sent();
        metrics.increment_packets_received();
        metrics.increment_packets_dropped();

        let snapshot = metrics.snapshot(3);
        assert_eq!(snapshot.packets_sent, 2);
        assert_eq!(snapshot.packets_received, 1);
        assert_eq!(snapshot.packets_dropped, 1);
        assert_eq!(snapshot.route_count, 3);
    }
}
