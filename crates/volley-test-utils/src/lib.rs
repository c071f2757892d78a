//! Test utilities and mock hardware for Volley development.
//!
//! Provides mock implementations of the hardware-boundary traits
//! ([`FabricLink`], [`HardwareClock`], [`RecordSink`]) with shared
//! handles so tests can inspect what the core did after driving it.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use volley_core::{FabricLink, HardwareClock, RecordFrame, RecordSink, RoutingKey, Tick, WriteLatch};

// ── TestClock ────────────────────────────────────────────────────

struct ClockInner {
    /// Down-counting timer register; decremented on every read so
    /// busy-waits against it always terminate in tests.
    counter: AtomicU32,
    /// Accumulated microseconds of busy-waiting, for jitter assertions.
    busy_us: AtomicU64,
    /// Accumulated microseconds of congestion back-off.
    relax_us: AtomicU64,
    /// Write latches waiting for a simulated transfer-done event.
    pending: Mutex<Vec<WriteLatch>>,
}

/// A simulated down-counting hardware timer.
///
/// Clones share the underlying state, so a test can keep a handle while
/// the core owns another behind `Box<dyn HardwareClock>`. The counter
/// steps down by one on each `now()` read; `wait_for_event` completes
/// one pending deferred write, standing in for the transfer-done
/// interrupt.
#[derive(Clone)]
pub struct TestClock {
    inner: Arc<ClockInner>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ClockInner {
                counter: AtomicU32::new(u32::MAX / 2),
                busy_us: AtomicU64::new(0),
                relax_us: AtomicU64::new(0),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Total microseconds spent in `busy_wait_us`.
    pub fn busy_us(&self) -> u64 {
        self.inner.busy_us.load(Ordering::Relaxed)
    }

    /// Total microseconds spent in `relax_us`.
    pub fn relaxed_us(&self) -> u64 {
        self.inner.relax_us.load(Ordering::Relaxed)
    }

    /// Register a latch to be completed by a later `wait_for_event`.
    pub fn defer_completion(&self, latch: WriteLatch) {
        self.inner.pending.lock().unwrap().push(latch);
    }

    /// Number of deferred completions not yet delivered.
    pub fn pending_completions(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareClock for TestClock {
    fn now(&self) -> u32 {
        self.inner.counter.fetch_sub(1, Ordering::Relaxed)
    }

    fn busy_wait_us(&self, us: u32) {
        self.inner.counter.fetch_sub(us, Ordering::Relaxed);
        self.inner.busy_us.fetch_add(u64::from(us), Ordering::Relaxed);
    }

    fn relax_us(&self, us: u32) {
        self.inner.counter.fetch_sub(us, Ordering::Relaxed);
        self.inner.relax_us.fetch_add(u64::from(us), Ordering::Relaxed);
    }

    fn wait_for_event(&self) {
        let latch = self.inner.pending.lock().unwrap().pop();
        if let Some(latch) = latch {
            latch.complete();
        }
    }
}

// ── MockFabric ───────────────────────────────────────────────────

struct FabricInner {
    sent: Mutex<Vec<RoutingKey>>,
    refuse_remaining: AtomicU32,
    refusals_seen: AtomicU32,
}

/// A capturing multicast fabric.
///
/// Accepts every packet by default; `refuse_next(n)` makes the next `n`
/// send attempts fail so the bounded-retry path gets exercised.
#[derive(Clone)]
pub struct MockFabric {
    inner: Arc<FabricInner>,
}

impl MockFabric {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FabricInner {
                sent: Mutex::new(Vec::new()),
                refuse_remaining: AtomicU32::new(0),
                refusals_seen: AtomicU32::new(0),
            }),
        }
    }

    /// Make the next `n` send attempts report congestion.
    pub fn refuse_next(&self, n: u32) {
        self.inner.refuse_remaining.store(n, Ordering::Relaxed);
    }

    /// Every key accepted so far, in emission order.
    pub fn sent(&self) -> Vec<RoutingKey> {
        self.inner.sent.lock().unwrap().clone()
    }

    /// Number of packets accepted so far.
    pub fn sent_count(&self) -> usize {
        self.inner.sent.lock().unwrap().len()
    }

    /// Number of refused attempts observed.
    pub fn refusals_seen(&self) -> u32 {
        self.inner.refusals_seen.load(Ordering::Relaxed)
    }
}

impl Default for MockFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl FabricLink for MockFabric {
    fn try_send(&mut self, key: RoutingKey) -> bool {
        let remaining = self.inner.refuse_remaining.load(Ordering::Relaxed);
        if remaining > 0 {
            self.inner
                .refuse_remaining
                .store(remaining - 1, Ordering::Relaxed);
            self.inner.refusals_seen.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.inner.sent.lock().unwrap().push(key);
        true
    }
}

// ── Record sinks ─────────────────────────────────────────────────

/// A frame captured by a test sink, decoded for assertions.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub time: Tick,
    pub n_layers: u32,
    pub layers: Vec<Vec<u32>>,
    pub bytes: Vec<u8>,
}

impl CapturedFrame {
    fn capture(frame: &RecordFrame<'_>) -> Self {
        Self {
            time: frame.time,
            n_layers: frame.n_layers(),
            layers: frame.layers.to_vec(),
            bytes: frame.to_bytes(),
        }
    }

    /// Total spikes in this frame: popcount summed over layers.
    pub fn total_spikes(&self) -> u64 {
        self.layers
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|w| u64::from(w.count_ones()))
            .sum()
    }

    /// Whether bit `source` of layer `k` is set.
    pub fn bit(&self, layer: usize, source: u32) -> bool {
        self.layers[layer][(source / 32) as usize] & (1 << (source % 32)) != 0
    }
}

struct SinkInner {
    frames: Mutex<Vec<CapturedFrame>>,
    ticks_completed: Mutex<Vec<Tick>>,
}

/// A record sink that captures frames and completes synchronously.
#[derive(Clone)]
pub struct CollectingSink {
    inner: Arc<SinkInner>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SinkInner {
                frames: Mutex::new(Vec::new()),
                ticks_completed: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn frames(&self) -> Vec<CapturedFrame> {
        self.inner.frames.lock().unwrap().clone()
    }

    pub fn ticks_completed(&self) -> Vec<Tick> {
        self.inner.ticks_completed.lock().unwrap().clone()
    }

    /// Spikes summed over every captured frame.
    pub fn total_spikes(&self) -> u64 {
        self.frames().iter().map(CapturedFrame::total_spikes).sum()
    }
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSink for CollectingSink {
    fn submit(&mut self, frame: &RecordFrame<'_>, latch: &WriteLatch) {
        self.inner
            .frames
            .lock()
            .unwrap()
            .push(CapturedFrame::capture(frame));
        latch.complete();
    }

    fn end_of_tick(&mut self, time: Tick) {
        self.inner.ticks_completed.lock().unwrap().push(time);
    }
}

/// A record sink whose completions arrive later, through the clock's
/// `wait_for_event` path, the shape of a DMA engine raising its
/// transfer-done interrupt while the timer path waits.
pub struct DeferredSink {
    inner: Arc<SinkInner>,
    clock: TestClock,
}

impl DeferredSink {
    pub fn new(clock: &TestClock) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                frames: Mutex::new(Vec::new()),
                ticks_completed: Mutex::new(Vec::new()),
            }),
            clock: clock.clone(),
        }
    }

    pub fn frames(&self) -> Vec<CapturedFrame> {
        self.inner.frames.lock().unwrap().clone()
    }
}

impl RecordSink for DeferredSink {
    fn submit(&mut self, frame: &RecordFrame<'_>, latch: &WriteLatch) {
        self.inner
            .frames
            .lock()
            .unwrap()
            .push(CapturedFrame::capture(frame));
        self.clock.defer_completion(latch.clone());
    }

    fn end_of_tick(&mut self, time: Tick) {
        self.inner.ticks_completed.lock().unwrap().push(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_counts_down() {
        let clock = TestClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b < a);
    }

    #[test]
    fn mock_fabric_refusal_window() {
        let fabric = MockFabric::new();
        let mut link = fabric.clone();
        fabric.refuse_next(2);
        assert!(!link.try_send(RoutingKey(1)));
        assert!(!link.try_send(RoutingKey(1)));
        assert!(link.try_send(RoutingKey(1)));
        assert_eq!(fabric.sent_count(), 1);
        assert_eq!(fabric.refusals_seen(), 2);
    }

    #[test]
    fn deferred_sink_completes_via_clock_event() {
        let clock = TestClock::new();
        let mut sink = DeferredSink::new(&clock);
        let latch = WriteLatch::new();
        latch.begin();
        let layers = vec![vec![1u32]];
        sink.submit(
            &RecordFrame {
                time: Tick(0),
                layers: &layers,
            },
            &latch,
        );
        assert!(latch.is_busy());
        clock.wait_for_event();
        assert!(!latch.is_busy());
    }
}
