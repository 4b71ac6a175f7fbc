use cava_viz::Frame;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

struct Slot {
    frame: Frame,
    sequence: u64,
}

/// Latest-frame handoff between the ingestion thread and the render loop.
///
/// Only the newest frame is kept; a publish replaces whatever was there.
/// Both sides hold the lock just long enough to move or clone one frame, so
/// neither can stall the other.
pub struct SharedFrameBuffer {
    slot: Mutex<Slot>,
    source_closed: AtomicBool,
}

impl SharedFrameBuffer {
    /// `initial_len` zero bins are served until the first publish.
    pub fn new(initial_len: usize) -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: vec![0; initial_len],
                sequence: 0,
            }),
            source_closed: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, frame: Frame) {
        let mut slot = self.slot.lock();
        slot.frame = frame;
        slot.sequence += 1;
    }

    /// An independent copy of the current frame.
    pub fn snapshot(&self) -> Frame {
        self.slot.lock().frame.clone()
    }

    /// Like [`snapshot`](Self::snapshot), paired with the number of publishes
    /// so far, so readers can tell a fresh frame from a repeated one.
    pub fn snapshot_with_sequence(&self) -> (Frame, u64) {
        let slot = self.slot.lock();
        (slot.frame.clone(), slot.sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.slot.lock().sequence
    }

    pub fn mark_source_closed(&self) {
        self.source_closed.store(true, Ordering::Release);
    }

    pub fn mark_source_open(&self) {
        self.source_closed.store(false, Ordering::Release);
    }

    /// Set once the ingestion worker has stopped producing frames.
    pub fn is_source_closed(&self) -> bool {
        self.source_closed.load(Ordering::Acquire)
    }
}
