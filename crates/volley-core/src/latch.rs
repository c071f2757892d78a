//! Write-busy interlock between the tick path and the record writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared busy flag guarding the recording buffer during write-back.
///
/// The tick path sets the flag immediately before handing a frame to the
/// record sink and then must not flush again until the sink's completion
/// path calls [`complete`](WriteLatch::complete). The flag is a single
/// word: the setter and clearer never race on the same transition
/// (busy is only set while clear, and only cleared while set), so no
/// stronger protocol is needed.
///
/// Clones share the underlying flag.
#[derive(Clone, Debug)]
pub struct WriteLatch {
    busy: Arc<AtomicBool>,
}

impl WriteLatch {
    /// Create a latch in the idle state.
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a write-back is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark a write-back as in progress. Called by the flusher only.
    pub fn begin(&self) {
        self.busy.store(true, Ordering::Release);
    }

    /// Signal completion of the outstanding write-back.
    ///
    /// Called from the sink's completion path (on hardware, the DMA
    /// transfer-done callback).
    pub fn complete(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl Default for WriteLatch {
    fn default() -> Self {
        Self::new()
    }
}
