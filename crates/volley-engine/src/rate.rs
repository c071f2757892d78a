//! Rate controller: map an incoming rate onto one source's regime.

use volley_core::GlobalSourceId;

use crate::params::{ParameterBlock, Regime};
use crate::table::SourceTable;

/// Where a rate update landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateTarget {
    /// The id fell in this core's window and the record was updated.
    Applied,
    /// The id belongs to another core; nothing was touched.
    Foreign,
}

impl SourceTable {
    /// Apply a rate in hertz to the source with global id `id`.
    ///
    /// Converts to a per-tick rate and swaps the record's regime:
    /// strictly above the cutoff selects the fast lane with a fresh
    /// `exp(-rate * dt)`; at or below it selects the slow lane with the
    /// mean interval `1 / (rate * dt)` (zero for non-positive rates, the
    /// silent state). The slow countdown is carried over, not
    /// reinitialised; the sweep rolls a fresh interval the next time it
    /// crosses zero. Applying the same rate twice leaves the record
    /// unchanged.
    pub fn set_rate(
        &mut self,
        params: &ParameterBlock,
        id: GlobalSourceId,
        rate_hz: f64,
    ) -> RateTarget {
        let Some(local) = params.owns(id) else {
            log::debug!("rate update for foreign source {id} ignored");
            return RateTarget::Foreign;
        };

        let r_tick = params.rate_per_tick(rate_hz);
        let record = self.get_mut(local);
        if r_tick > params.slow_fast_cutoff {
            record.regime = Regime::Fast {
                exp_minus_lambda: (-r_tick).exp(),
            };
        } else {
            let mean_isi_ticks = if rate_hz > 0.0 {
                params.ticks_per_second / rate_hz
            } else {
                0.0
            };
            let time_to_spike_ticks = match record.regime {
                Regime::Slow {
                    time_to_spike_ticks,
                    ..
                } => time_to_spike_ticks,
                Regime::Fast { .. } => 0.0,
            };
            record.regime = Regime::Slow {
                mean_isi_ticks,
                time_to_spike_ticks,
            };
        }
        RateTarget::Applied
    }
}
