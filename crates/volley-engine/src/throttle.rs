//! Hardware-counter-paced packet dispatch.
//!
//! Bursts from the fast lane would otherwise hit the fabric back to
//! back; spacing consecutive sends by a fixed number of counter ticks
//! keeps the multicast tree from saturating. The spacing busy-wait is a
//! correctness mechanism, not an optimisation: a sleeping spacer would
//! bunch packets at wakeup granularity.

use volley_core::{FabricLink, HardwareClock, RoutingKey};

/// Paces individual packet emissions against the down-counting timer.
#[derive(Clone, Copy, Debug)]
pub struct DispatchThrottle {
    expected_time: u32,
    gap: u32,
}

impl DispatchThrottle {
    /// Create a throttle leaving `gap` counter ticks between sends.
    pub fn new(gap: u32) -> Self {
        Self {
            expected_time: 0,
            gap,
        }
    }

    /// Arm for a new tick: the first send may go out `gap` counter ticks
    /// from now.
    pub fn arm(&mut self, clock: &dyn HardwareClock) {
        self.expected_time = clock.now().wrapping_sub(self.gap);
    }

    /// Emit one packet, pacing and retrying until the fabric accepts it.
    ///
    /// Busy-waits until the counter has counted down to the armed
    /// deadline, steps the deadline by the gap, then retries the
    /// non-blocking send with a 1 microsecond relax between attempts.
    /// Congestion is transient by contract, so the retry never gives up.
    pub fn send(&mut self, clock: &dyn HardwareClock, fabric: &mut dyn FabricLink, key: RoutingKey) {
        while clock.now() > self.expected_time {
            std::hint::spin_loop();
        }
        self.expected_time = self.expected_time.wrapping_sub(self.gap);

        while !fabric.try_send(key) {
            clock.relax_us(1);
        }
    }

    /// The configured inter-send gap in counter ticks.
    pub fn gap(&self) -> u32 {
        self.gap
    }
}
