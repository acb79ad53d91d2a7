use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One unit of video data delivered by a capture input.
///
/// Pixel data is shared behind an `Arc` so the same frame can be fanned out
/// to the preview ring and the output queue without copying.
#[derive(Debug, Clone)]
pub struct FrameSample {
    /// Raw pixel data (RGB24).
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp in microseconds since the input started.
    pub timestamp_us: u64,
    /// Per-input frame counter, starting at 1.
    pub sequence: u64,
}

impl FrameSample {
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_us: u64, sequence: u64) -> Self {
        Self {
            data: Arc::from(data),
            width,
            height,
            timestamp_us,
            sequence,
        }
    }

    /// Size of the pixel payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Thread-safe ring buffer holding the most recent frames for a preview.
///
/// Stores up to `capacity` frames, overwriting the oldest when full.
/// Frames are wrapped in `Arc` so readers get a cheap reference-counted
/// pointer instead of cloning pixel buffers.
pub struct FrameBuffer {
    frames: Mutex<Vec<Option<Arc<FrameSample>>>>,
    capacity: usize,
    write_idx: Mutex<usize>,
    /// Monotonic counter incremented on each push.
    sequence: AtomicU64,
}

impl FrameBuffer {
    /// Create a new ring buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let frames = (0..capacity).map(|_| None).collect();
        Self {
            frames: Mutex::new(frames),
            capacity,
            write_idx: Mutex::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Push a new frame into the buffer, overwriting the oldest if full.
    pub fn push(&self, frame: FrameSample) {
        let mut frames = self.frames.lock();
        let mut idx = self.write_idx.lock();
        frames[*idx] = Some(Arc::new(frame));
        *idx = (*idx + 1) % self.capacity;
        self.sequence.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of frames pushed since creation.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the most recently pushed frame, if any.
    pub fn latest(&self) -> Option<Arc<FrameSample>> {
        let frames = self.frames.lock();
        let idx = self.write_idx.lock();
        let latest_idx = if *idx == 0 {
            self.capacity - 1
        } else {
            *idx - 1
        };
        frames[latest_idx].clone()
    }

    /// Drop every stored frame. The sequence counter is kept.
    pub fn clear(&self) {
        let mut frames = self.frames.lock();
        for slot in frames.iter_mut() {
            *slot = None;
        }
    }
}
