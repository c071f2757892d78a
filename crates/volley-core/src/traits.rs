//! Traits at the hardware boundary: fabric, clock, and record sink.
//!
//! The generator core is written against these three seams so that the
//! platform drivers (multicast fabric, timer peripheral, recording DMA
//! engine) and the test doubles are interchangeable. All are object-safe
//! and `Send` so a core can be moved onto a runner thread.

use crate::id::{RoutingKey, Tick};
use crate::latch::WriteLatch;

/// Non-blocking "send one packet" primitive of the multicast fabric.
pub trait FabricLink: Send {
    /// Attempt to enqueue one multicast packet with no payload.
    ///
    /// Returns `false` when the fabric is congested and the packet was
    /// not accepted. Congestion is transient; callers retry.
    fn try_send(&mut self, key: RoutingKey) -> bool;
}

/// The hardware timer counter and wait primitives.
///
/// `now()` reads a *down-counting* timer register: the value decreases as
/// wall-clock time passes within a tick. The dispatch throttle paces
/// packet emission against this counter, so test implementations must
/// advance (decrement) it over repeated reads or busy-waits would never
/// terminate.
pub trait HardwareClock: Send {
    /// Current value of the down-counting timer register.
    fn now(&self) -> u32;

    /// Busy-wait for approximately `us` microseconds.
    fn busy_wait_us(&self, us: u32);

    /// Release the CPU for roughly `us` microseconds (congestion back-off).
    fn relax_us(&self, us: u32);

    /// Low-power wait until the next interrupt-class event.
    ///
    /// Used while waiting for the record writer to signal completion.
    fn wait_for_event(&self);
}

/// One tick's recording payload: the populated bit-plane layers.
///
/// Bit `s` of layer `k` means "source `s` emitted at least `k + 1` spikes
/// this tick". Only the populated layers are carried; each layer is
/// `ceil(n_sources / 32)` words.
#[derive(Clone, Copy, Debug)]
pub struct RecordFrame<'a> {
    /// The tick this payload represents.
    pub time: Tick,
    /// The populated layers, lowest spike count first.
    pub layers: &'a [Vec<u32>],
}

impl RecordFrame<'_> {
    /// Number of populated layers in this frame.
    pub fn n_layers(&self) -> u32 {
        self.layers.len() as u32
    }

    /// Append the serialized form `{time, n_layers, layers}` to `out`.
    ///
    /// All words little-endian. Layers beyond `n_layers` are never
    /// emitted; downstream readers rely on this exact layout.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.time.0.to_le_bytes());
        out.extend_from_slice(&self.n_layers().to_le_bytes());
        for layer in self.layers {
            for word in layer {
                out.extend_from_slice(&word.to_le_bytes());
            }
        }
    }

    /// Serialize into a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.layers.iter().map(|l| l.len() * 4).sum::<usize>());
        self.encode_into(&mut out);
        out
    }
}

/// Asynchronous "record and notify" primitive of the recording subsystem.
///
/// `submit` must capture whatever it needs from the frame before
/// returning; the borrow ends with the call, and the flusher zeroes the
/// layers immediately after. Completion of the underlying transfer is
/// signalled by calling [`WriteLatch::complete`] on the supplied latch;
/// a sink that completes synchronously may do so before returning.
pub trait RecordSink: Send {
    /// Begin writing one frame back to the spike-history store.
    fn submit(&mut self, frame: &RecordFrame<'_>, latch: &WriteLatch);

    /// Notification that the core has finished processing a tick.
    fn end_of_tick(&mut self, time: Tick);
}
