//! Global traffic counters
//!
//! Counts every frame through the codec and reports throughput once per
//! check interval. Nothing is throttled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficSnapshot {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub packets_read: u64,
    pub packets_written: u64,
}

#[derive(Debug)]
pub struct TrafficMonitor {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    packets_read: AtomicU64,
    packets_written: AtomicU64,
    check_interval: Duration,
}

impl Default for TrafficMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TrafficMonitor {
    pub fn new(check_interval: Duration) -> Self {
        Self {
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            packets_read: AtomicU64::new(0),
            packets_written: AtomicU64::new(0),
            check_interval,
        }
    }

    pub fn record_read(&self, bytes: usize) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
        self.packets_read.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_written(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.packets_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            packets_read: self.packets_read.load(Ordering::Relaxed),
            packets_written: self.packets_written.load(Ordering::Relaxed),
        }
    }

    /// Log the per-interval deltas until `cancel` fires
    pub fn spawn_reporter(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            let period = monitor.check_interval.max(Duration::from_millis(10));
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval.tick().await;

            let mut last = monitor.snapshot();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = interval.tick() => {
                        let now = monitor.snapshot();
                        if now != last {
                            debug!(
                                target: "traffic",
                                read_bytes = now.bytes_read - last.bytes_read,
                                written_bytes = now.bytes_written - last.bytes_written,
                                read_packets = now.packets_read - last.packets_read,
                                written_packets = now.packets_written - last.packets_written,
                                interval_ms = period.as_millis() as u64,
                                "Traffic"
                            );
                        }
                        last = now;
                    }
                }
            }
        })
    }
}
