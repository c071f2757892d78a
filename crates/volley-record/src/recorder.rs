//! Tick-end flush of the accumulator through the asynchronous sink.

use volley_core::{HardwareClock, RecordSink, SourceId, Tick, WriteLatch};

use crate::accumulator::SpikeAccumulator;

/// Owns the spike accumulator and the write-busy interlock.
///
/// Marking is always live (whether sources are recorded has nothing to
/// do with whether packets are emitted), but frames are only handed to
/// the sink when recording is enabled in the system region.
#[derive(Debug)]
pub struct Recorder {
    acc: SpikeAccumulator,
    latch: WriteLatch,
    enabled: bool,
}

impl Recorder {
    /// Create a recorder for `n_sources` sources.
    pub fn new(n_sources: u32, enabled: bool) -> Self {
        Self {
            acc: SpikeAccumulator::new(n_sources),
            latch: WriteLatch::new(),
            enabled,
        }
    }

    /// Whether frames are handed to the sink at tick end.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Re-arm or disarm the sink hand-off. Buffers are kept either way.
    ///
    /// Used on resume, when the host may have toggled recording in the
    /// system region.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// A handle to the write-busy latch, for sinks that complete later.
    pub fn latch(&self) -> WriteLatch {
        self.latch.clone()
    }

    /// The underlying accumulator.
    pub fn accumulator(&self) -> &SpikeAccumulator {
        &self.acc
    }

    /// Record that `source` emitted `count` spikes this tick.
    pub fn mark(&mut self, source: SourceId, count: u32) {
        self.acc.mark(source, count);
    }

    /// Clear the per-tick scratch before a new sweep.
    pub fn reset(&mut self) {
        self.acc.reset();
    }

    /// Hand the populated layers for tick `time` to the sink.
    ///
    /// Waits for any outstanding write-back first (low-power wait on the
    /// latch), then submits and zeroes the populated layers. Empty ticks
    /// submit nothing. No-op when recording is disabled.
    pub fn flush(&mut self, time: Tick, sink: &mut dyn RecordSink, clock: &dyn HardwareClock) {
        if !self.enabled {
            return;
        }
        while self.latch.is_busy() {
            clock.wait_for_event();
        }
        if self.acc.is_empty() {
            return;
        }
        self.latch.begin();
        sink.submit(&self.acc.frame(time), &self.latch);
        self.acc.reset();
    }

    /// Flush and then wait until the sink has drained.
    ///
    /// Used on the pause path: no outstanding write-back may be abandoned
    /// when the core parks.
    pub fn finalise(&mut self, time: Tick, sink: &mut dyn RecordSink, clock: &dyn HardwareClock) {
        self.flush(time, sink, clock);
        while self.latch.is_busy() {
            clock.wait_for_event();
        }
    }
}
