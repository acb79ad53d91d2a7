use serde::Serialize;
use std::time::{Duration, Instant};

/// Counters for one activation of a video data output.
///
/// Queue wait is measured on the consumer side: from the moment a frame is
/// offered to the queue until the delegate is called with it.
#[derive(Debug)]
pub struct DeliveryStats {
    activated_at: Instant,
    delivered: u64,
    dropped: u64,
    bytes: u64,
    last_wait: Duration,
    max_wait: Duration,
    callback_total: Duration,
}

/// Serializable view of [`DeliveryStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySnapshot {
    pub delivered_count: u64,
    pub drop_count: u64,
    /// Dropped share of all offered frames, in percent.
    pub drop_rate: f64,
    /// Delivered frames per second since activation.
    pub fps: f64,
    pub bytes_delivered: u64,
    pub queue_wait_ms: f64,
    pub max_queue_wait_ms: f64,
    /// Mean time spent inside the delegate's frame callback.
    pub mean_callback_ms: f64,
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self {
            activated_at: Instant::now(),
            delivered: 0,
            dropped: 0,
            bytes: 0,
            last_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
            callback_total: Duration::ZERO,
        }
    }

    /// A frame reached the delegate after `waited` in the queue and the
    /// callback took `callback`.
    pub fn record_delivery(&mut self, bytes: usize, waited: Duration, callback: Duration) {
        self.delivered += 1;
        self.bytes += bytes as u64;
        self.last_wait = waited;
        self.max_wait = self.max_wait.max(waited);
        self.callback_total += callback;
    }

    /// A frame was discarded at a full queue.
    pub fn record_drop(&mut self) {
        self.dropped += 1;
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn mean_callback(&self) -> Duration {
        match u32::try_from(self.delivered) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.callback_total / n,
            Err(_) => self.callback_total.div_f64(self.delivered as f64),
        }
    }

    pub fn drop_rate(&self) -> f64 {
        let offered = self.delivered + self.dropped;
        if offered == 0 {
            0.0
        } else {
            self.dropped as f64 * 100.0 / offered as f64
        }
    }

    pub fn fps(&self) -> f64 {
        let secs = self.activated_at.elapsed().as_secs_f64();
        if self.delivered == 0 || secs <= 0.0 {
            0.0
        } else {
            self.delivered as f64 / secs
        }
    }

    /// Start over, as on a fresh activation.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            delivered_count: self.delivered,
            drop_count: self.dropped,
            drop_rate: self.drop_rate(),
            fps: self.fps(),
            bytes_delivered: self.bytes,
            queue_wait_ms: as_ms(self.last_wait),
            max_queue_wait_ms: as_ms(self.max_wait),
            mean_callback_ms: as_ms(self.mean_callback()),
        }
    }
}

impl Default for DeliveryStats {
    fn default() -> Self {
        Self::new()
    }
}
