use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thread_priority::{set_current_thread_priority, ThreadPriority};
use tracing::{debug, warn};

use crate::camera::error::{CameraError, Result};
use crate::capture::frame::FrameSample;
use crate::diagnostics::stats::{DeliverySnapshot, DeliveryStats};

/// Label given to the delivery thread when none is configured.
pub const DEFAULT_QUEUE_LABEL: &str = "sample-buffer-queue";

/// How often the delivery thread re-checks its shutdown flag while idle.
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Receives frames from a [`VideoDataOutput`].
///
/// Every callback runs on the output's delivery thread, never on the thread
/// that configured the session nor on the camera's producer thread. The
/// sample is only borrowed for the duration of the call.
pub trait SampleBufferDelegate: Send + Sync + 'static {
    fn on_frame(&self, sample: &FrameSample);

    /// Frames were discarded because delivery fell behind. `total_dropped`
    /// counts every discard since the output was activated.
    fn on_frame_dropped(&self, _total_dropped: u64) {}
}

/// Scheduling priority the delivery thread ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryPriority {
    /// The thread has not started yet.
    Pending,
    Elevated,
    /// The OS refused; delivery continues at normal priority.
    Unavailable,
}

/// A frame waiting in the delivery queue.
struct Queued {
    sample: FrameSample,
    offered_at: Instant,
}

/// Producer-side handle to an active output's delivery queue.
#[derive(Clone)]
pub struct OutputPort {
    tx: Sender<Queued>,
    discard_late: bool,
    stats: Arc<Mutex<DeliveryStats>>,
}

impl OutputPort {
    /// Offer a frame to the delivery queue.
    ///
    /// With late-frame discarding on, this never blocks and never calls into
    /// the delegate: a full queue drops the frame and counts it. Otherwise
    /// the producer waits for space.
    pub fn offer(&self, sample: FrameSample) {
        let queued = Queued {
            sample,
            offered_at: Instant::now(),
        };
        if !self.discard_late {
            // Receiver gone means the output is shutting down.
            let _ = self.tx.send(queued);
            return;
        }

        match self.tx.try_send(queued) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => self.stats.lock().record_drop(),
        }
    }
}

struct ActiveDelivery {
    tx: Sender<Queued>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Frame output attached to a capture session.
///
/// Frames are handed to the delegate on a dedicated, priority-raised thread
/// through a bounded queue of `queue_depth` slots.
pub struct VideoDataOutput {
    always_discards_late_frames: bool,
    queue_depth: usize,
    queue_label: String,
    delegate: Option<Arc<dyn SampleBufferDelegate>>,
    stats: Arc<Mutex<DeliveryStats>>,
    priority: Arc<Mutex<DeliveryPriority>>,
    active: Option<ActiveDelivery>,
}

impl VideoDataOutput {
    pub fn new() -> Self {
        Self {
            always_discards_late_frames: true,
            queue_depth: 1,
            queue_label: DEFAULT_QUEUE_LABEL.to_string(),
            delegate: None,
            stats: Arc::new(Mutex::new(DeliveryStats::new())),
            priority: Arc::new(Mutex::new(DeliveryPriority::Pending)),
            active: None,
        }
    }

    pub fn set_always_discards_late_frames(&mut self, discard: bool) {
        self.always_discards_late_frames = discard;
    }

    pub fn always_discards_late_frames(&self) -> bool {
        self.always_discards_late_frames
    }

    /// Number of frames that may wait for the delegate. Zero is raised to one.
    pub fn set_queue_depth(&mut self, depth: usize) {
        self.queue_depth = depth.max(1);
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Install the delegate and name the thread it will be called on.
    ///
    /// Takes effect the next time the output is activated.
    pub fn set_sample_buffer_delegate(
        &mut self,
        delegate: Arc<dyn SampleBufferDelegate>,
        queue_label: impl Into<String>,
    ) {
        self.delegate = Some(delegate);
        self.queue_label = queue_label.into();
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn queue_label(&self) -> &str {
        &self.queue_label
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Priority outcome of the current (or last) delivery thread.
    pub fn delivery_priority(&self) -> DeliveryPriority {
        *self.priority.lock()
    }

    pub fn diagnostics(&self) -> DeliverySnapshot {
        self.stats.lock().snapshot()
    }

    /// Start the delivery thread and return the producer handle.
    ///
    /// Returns `Ok(None)` when no delegate is installed: frames reaching the
    /// output are then simply not delivered anywhere.
    pub(crate) fn activate(&mut self) -> Result<Option<OutputPort>> {
        let Some(delegate) = self.delegate.clone() else {
            return Ok(None);
        };

        if let Some(active) = &self.active {
            return Ok(Some(self.port(active.tx.clone())));
        }

        self.stats.lock().reset();
        *self.priority.lock() = DeliveryPriority::Pending;
        let (tx, rx) = crossbeam_channel::bounded(self.queue_depth);
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = DeliveryWorker {
            rx,
            delegate,
            stats: Arc::clone(&self.stats),
            priority: Arc::clone(&self.priority),
            shutdown: Arc::clone(&shutdown),
        };
        let handle = std::thread::Builder::new()
            .name(self.queue_label.clone())
            .spawn(move || worker.run())
            .map_err(|e| {
                CameraError::StreamStart(format!("failed to spawn delivery thread: {e}"))
            })?;

        debug!(
            "video output activated (queue '{}', depth {}, discard late: {})",
            self.queue_label, self.queue_depth, self.always_discards_late_frames
        );

        let port = self.port(tx.clone());
        self.active = Some(ActiveDelivery {
            tx,
            shutdown,
            worker: Some(handle),
        });
        Ok(Some(port))
    }

    fn port(&self, tx: Sender<Queued>) -> OutputPort {
        OutputPort {
            tx,
            discard_late: self.always_discards_late_frames,
            stats: Arc::clone(&self.stats),
        }
    }

    /// Stop the delivery thread. Frames still queued are discarded.
    /// Idempotent.
    pub(crate) fn deactivate(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.shutdown.store(true, Ordering::Relaxed);
        drop(active.tx);
        if let Some(handle) = active.worker.take() {
            if handle.join().is_err() {
                warn!("delivery thread '{}' panicked", self.queue_label);
            }
        }
    }
}

impl Default for VideoDataOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VideoDataOutput {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// State owned by the delivery thread.
struct DeliveryWorker {
    rx: Receiver<Queued>,
    delegate: Arc<dyn SampleBufferDelegate>,
    stats: Arc<Mutex<DeliveryStats>>,
    priority: Arc<Mutex<DeliveryPriority>>,
    shutdown: Arc<AtomicBool>,
}

impl DeliveryWorker {
    /// One delegate call per received frame, until shutdown or until every
    /// producer handle is gone. Drops counted by producers are reported
    /// from here.
    fn run(self) {
        self.raise_priority();

        let mut reported_drops = 0;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return;
            }
            let received = self.rx.recv_timeout(WORKER_POLL_INTERVAL);
            self.report_drops(&mut reported_drops);

            match received {
                Ok(queued) => self.deliver(queued),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn raise_priority(&self) {
        let outcome = match set_current_thread_priority(ThreadPriority::Max) {
            Ok(()) => DeliveryPriority::Elevated,
            Err(e) => {
                warn!("delivery thread priority not raised: {e:?}");
                DeliveryPriority::Unavailable
            }
        };
        *self.priority.lock() = outcome;
    }

    fn report_drops(&self, reported: &mut u64) {
        let total = self.stats.lock().dropped();
        if total > *reported {
            *reported = total;
            self.delegate.on_frame_dropped(total);
        }
    }

    fn deliver(&self, queued: Queued) {
        let waited = queued.offered_at.elapsed();
        let bytes = queued.sample.byte_len();

        let started = Instant::now();
        self.delegate.on_frame(&queued.sample);
        let callback = started.elapsed();
        drop(queued);

        self.stats.lock().record_delivery(bytes, waited, callback);
    }
}
