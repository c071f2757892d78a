//! Parameter block, system configuration, and source record codecs.
//!
//! These are the structures the loader lays down in shared memory and the
//! core writes back at pause. All fields little-endian; layouts are fixed
//! and documented per struct so host-side tooling can read them back.

use volley_core::{GlobalSourceId, LoadError, SourceId, StoreError, Tick};
use volley_rand::Seed;

// ── Primitive codec helpers ──────────────────────────────────────

pub(crate) fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

pub(crate) fn read_f64(buf: &[u8], at: usize) -> f64 {
    f64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

// ── SystemConfig ─────────────────────────────────────────────────

/// Simulation timing and subsystem slots from the system region.
///
/// Layout (24 bytes): `timer_period_us`, `run_forever`, `total_ticks`,
/// `recording_enabled`, `host_msg_priority`, `dma_priority`, all `u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemConfig {
    /// Length of one simulation tick in microseconds.
    pub timer_period_us: u32,
    /// When set, `total_ticks` is ignored and the run never pauses itself.
    pub run_forever: bool,
    /// Number of ticks in a finite run.
    pub total_ticks: u32,
    /// Whether per-tick spike bitfields are handed to the record sink.
    pub recording_enabled: bool,
    /// Platform priority slot for host message dispatch. Informational.
    pub host_msg_priority: u32,
    /// Platform priority slot for DMA completion. Informational.
    pub dma_priority: u32,
}

impl SystemConfig {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 24;

    /// The tick at which a finite run pauses, or `None` for endless runs.
    pub fn run_limit(&self) -> Option<Tick> {
        if self.run_forever {
            None
        } else {
            Some(Tick(self.total_ticks))
        }
    }

    /// Append the encoded form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.timer_period_us.to_le_bytes());
        out.extend_from_slice(&u32::from(self.run_forever).to_le_bytes());
        out.extend_from_slice(&self.total_ticks.to_le_bytes());
        out.extend_from_slice(&u32::from(self.recording_enabled).to_le_bytes());
        out.extend_from_slice(&self.host_msg_priority.to_le_bytes());
        out.extend_from_slice(&self.dma_priority.to_le_bytes());
    }

    /// Decode from the start of a system region.
    pub fn decode(buf: &[u8]) -> Result<Self, LoadError> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(LoadError::Truncated {
                what: "system region",
                needed: Self::ENCODED_LEN,
                got: buf.len(),
            });
        }
        Ok(Self {
            timer_period_us: read_u32(buf, 0),
            run_forever: read_u32(buf, 4) != 0,
            total_ticks: read_u32(buf, 8),
            recording_enabled: read_u32(buf, 12) != 0,
            host_msg_priority: read_u32(buf, 16),
            dma_priority: read_u32(buf, 20),
        })
    }
}

// ── Regime / SourceRecord ────────────────────────────────────────

/// Which sampling lane a source is on.
///
/// Exactly one set of derived quantities is live at a time; switching
/// regime swaps the variant. `Fast` holds the event-count sampler input
/// `exp(-rate * dt)`; `Slow` holds the mean inter-spike interval in tick
/// units and the running countdown to the next spike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Regime {
    /// Poisson-by-event-count: high per-tick rates.
    Fast {
        /// `exp(-rate * dt)`; `0.0` means the rate is beyond the
        /// representable range and the source clamps to silence.
        exp_minus_lambda: f64,
    },
    /// Exponential-interval sampling: rare events.
    Slow {
        /// `1 / (rate * dt)` in ticks; `0.0` is the silent state.
        mean_isi_ticks: f64,
        /// Remaining ticks until the next spike; decremented per tick.
        time_to_spike_ticks: f64,
    },
}

/// One Poisson source: its active window and sampling state.
///
/// Wire layout (28 bytes): `start: u32`, `end: u32`, `tag: u32`
/// (0 fast, 1 slow), then two `f64` slots: fast uses the first for
/// `exp_minus_lambda`, slow uses them for `mean_isi_ticks` and
/// `time_to_spike_ticks`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceRecord {
    /// First tick (inclusive) the source may emit.
    pub start: Tick,
    /// First tick (exclusive) after which the source is silent.
    pub end: Tick,
    /// Current sampling regime and its derived quantities.
    pub regime: Regime,
}

impl SourceRecord {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 28;

    /// Whether the half-open activity window `[start, end)` covers `t`.
    pub fn active_at(&self, t: Tick) -> bool {
        self.start <= t && t < self.end
    }

    /// Append the encoded form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.start.0.to_le_bytes());
        out.extend_from_slice(&self.end.0.to_le_bytes());
        match self.regime {
            Regime::Fast { exp_minus_lambda } => {
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&exp_minus_lambda.to_le_bytes());
                out.extend_from_slice(&0f64.to_le_bytes());
            }
            Regime::Slow {
                mean_isi_ticks,
                time_to_spike_ticks,
            } => {
                out.extend_from_slice(&1u32.to_le_bytes());
                out.extend_from_slice(&mean_isi_ticks.to_le_bytes());
                out.extend_from_slice(&time_to_spike_ticks.to_le_bytes());
            }
        }
    }

    /// Decode record `index` from `buf` (used for error reporting only).
    pub fn decode(buf: &[u8], index: usize) -> Result<Self, LoadError> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(LoadError::Truncated {
                what: "source record",
                needed: Self::ENCODED_LEN,
                got: buf.len(),
            });
        }
        let start = Tick(read_u32(buf, 0));
        let end = Tick(read_u32(buf, 4));
        let tag = read_u32(buf, 8);
        let a = read_f64(buf, 12);
        let b = read_f64(buf, 20);
        let regime = match tag {
            0 => Regime::Fast {
                exp_minus_lambda: a,
            },
            1 => Regime::Slow {
                mean_isi_ticks: a,
                time_to_spike_ticks: b,
            },
            tag => return Err(LoadError::UnknownRegimeTag { index, tag }),
        };
        Ok(Self { start, end, regime })
    }
}

// ── ParameterBlock ───────────────────────────────────────────────

/// Immutable-per-run configuration plus the random stream seed.
///
/// Laid out at the start of the parameter region, followed immediately
/// by `n_sources` source records. Layout (68 bytes): seven `u32`s
/// (`has_key`, `base_key`, `rate_update_mask`, `random_backoff_us`,
/// `inter_spike_gap_ticks`, `first_source_id`, `n_sources`), three
/// `f64`s (`slow_fast_cutoff`, `seconds_per_tick`, `ticks_per_second`),
/// then the four seed words.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterBlock {
    /// Whether spikes are emitted onto the fabric at all.
    pub has_key: bool,
    /// OR-ed with the local source index to form the emit key.
    pub base_key: u32,
    /// AND mask recovering a global source id from a fabric key.
    pub rate_update_mask: u32,
    /// Maximum random start-of-tick delay in microseconds.
    pub random_backoff_us: u32,
    /// Hardware-counter ticks between consecutive dispatches.
    pub inter_spike_gap_ticks: u32,
    /// Global id of this core's first source.
    pub first_source_id: GlobalSourceId,
    /// Number of sources owned by this core.
    pub n_sources: u32,
    /// Per-tick rate at or above which a source uses the fast lane.
    pub slow_fast_cutoff: f64,
    /// Length of one tick in seconds.
    pub seconds_per_tick: f64,
    /// Reciprocal of `seconds_per_tick`.
    pub ticks_per_second: f64,
    /// Four-word state for the random stream.
    pub seed: Seed,
}

impl ParameterBlock {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = 68;

    /// Convert a rate in hertz to a per-tick rate.
    pub fn rate_per_tick(&self, rate_hz: f64) -> f64 {
        rate_hz * self.seconds_per_tick
    }

    /// Map a global id into this core's window, if it falls inside.
    pub fn owns(&self, id: GlobalSourceId) -> Option<SourceId> {
        let local = id.0.wrapping_sub(self.first_source_id.0);
        (local < self.n_sources).then_some(SourceId(local))
    }

    /// Structural validation at load time.
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.n_sources == 0 {
            return Err(LoadError::NoSources);
        }
        Ok(())
    }

    /// Append the encoded form to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u32::from(self.has_key).to_le_bytes());
        out.extend_from_slice(&self.base_key.to_le_bytes());
        out.extend_from_slice(&self.rate_update_mask.to_le_bytes());
        out.extend_from_slice(&self.random_backoff_us.to_le_bytes());
        out.extend_from_slice(&self.inter_spike_gap_ticks.to_le_bytes());
        out.extend_from_slice(&self.first_source_id.0.to_le_bytes());
        out.extend_from_slice(&self.n_sources.to_le_bytes());
        out.extend_from_slice(&self.slow_fast_cutoff.to_le_bytes());
        out.extend_from_slice(&self.seconds_per_tick.to_le_bytes());
        out.extend_from_slice(&self.ticks_per_second.to_le_bytes());
        for word in self.seed.0 {
            out.extend_from_slice(&word.to_le_bytes());
        }
    }

    /// Decode from the start of a parameter region.
    pub fn decode(buf: &[u8]) -> Result<Self, LoadError> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(LoadError::Truncated {
                what: "parameter block",
                needed: Self::ENCODED_LEN,
                got: buf.len(),
            });
        }
        Ok(Self {
            has_key: read_u32(buf, 0) != 0,
            base_key: read_u32(buf, 4),
            rate_update_mask: read_u32(buf, 8),
            random_backoff_us: read_u32(buf, 12),
            inter_spike_gap_ticks: read_u32(buf, 16),
            first_source_id: GlobalSourceId(read_u32(buf, 20)),
            n_sources: read_u32(buf, 24),
            slow_fast_cutoff: read_f64(buf, 28),
            seconds_per_tick: read_f64(buf, 36),
            ticks_per_second: read_f64(buf, 44),
            seed: Seed([
                read_u32(buf, 52),
                read_u32(buf, 56),
                read_u32(buf, 60),
                read_u32(buf, 64),
            ]),
        })
    }

    /// Write the encoded form over the start of a parameter region.
    pub fn store(&self, region: &mut [u8]) -> Result<(), StoreError> {
        if region.len() < Self::ENCODED_LEN {
            return Err(StoreError::RegionTooSmall {
                what: "parameter block",
                needed: Self::ENCODED_LEN,
                got: region.len(),
            });
        }
        let mut bytes = Vec::with_capacity(Self::ENCODED_LEN);
        self.encode_into(&mut bytes);
        region[..Self::ENCODED_LEN].copy_from_slice(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> ParameterBlock {
        ParameterBlock {
            has_key: true,
            base_key: 0x0400_0000,
            rate_update_mask: 0x0000_FFFF,
            random_backoff_us: 10,
            inter_spike_gap_ticks: 2,
            first_source_id: GlobalSourceId(64),
            n_sources: 4,
            slow_fast_cutoff: 0.25,
            seconds_per_tick: 0.001,
            ticks_per_second: 1000.0,
            seed: Seed([1, 2, 3, 4]),
        }
    }

    #[test]
    fn parameter_block_round_trips() {
        let block = block();
        let mut bytes = Vec::new();
        block.encode_into(&mut bytes);
        assert_eq!(bytes.len(), ParameterBlock::ENCODED_LEN);
        assert_eq!(ParameterBlock::decode(&bytes).unwrap(), block);
    }

    #[test]
    fn truncated_block_is_an_error() {
        let err = ParameterBlock::decode(&[0u8; 12]).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { .. }));
    }

    #[test]
    fn owns_maps_window_and_rejects_outside() {
        let block = block();
        assert_eq!(block.owns(GlobalSourceId(64)), Some(SourceId(0)));
        assert_eq!(block.owns(GlobalSourceId(67)), Some(SourceId(3)));
        assert_eq!(block.owns(GlobalSourceId(68)), None);
        assert_eq!(block.owns(GlobalSourceId(63)), None);
        assert_eq!(block.owns(GlobalSourceId(0)), None);
    }

    #[test]
    fn source_record_round_trips_both_regimes() {
        let fast = SourceRecord {
            start: Tick(0),
            end: Tick(100),
            regime: Regime::Fast {
                exp_minus_lambda: 0.5,
            },
        };
        let slow = SourceRecord {
            start: Tick(10),
            end: Tick(90),
            regime: Regime::Slow {
                mean_isi_ticks: 250.0,
                time_to_spike_ticks: -1.5,
            },
        };
        for record in [fast, slow] {
            let mut bytes = Vec::new();
            record.encode_into(&mut bytes);
            assert_eq!(bytes.len(), SourceRecord::ENCODED_LEN);
            assert_eq!(SourceRecord::decode(&bytes, 0).unwrap(), record);
        }
    }

    #[test]
    fn unknown_regime_tag_is_an_error() {
        let mut bytes = Vec::new();
        SourceRecord {
            start: Tick(0),
            end: Tick(1),
            regime: Regime::Fast {
                exp_minus_lambda: 0.0,
            },
        }
        .encode_into(&mut bytes);
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        let err = SourceRecord::decode(&bytes, 3).unwrap_err();
        assert_eq!(err, LoadError::UnknownRegimeTag { index: 3, tag: 7 });
    }

    #[test]
    fn activity_window_is_half_open() {
        let record = SourceRecord {
            start: Tick(5),
            end: Tick(8),
            regime: Regime::Fast {
                exp_minus_lambda: 0.5,
            },
        };
        assert!(!record.active_at(Tick(4)));
        assert!(record.active_at(Tick(5)));
        assert!(record.active_at(Tick(7)));
        assert!(!record.active_at(Tick(8)));
    }

    #[test]
    fn system_config_round_trips() {
        let config = SystemConfig {
            timer_period_us: 1000,
            run_forever: false,
            total_ticks: 5000,
            recording_enabled: true,
            host_msg_priority: 1,
            dma_priority: 0,
        };
        let mut bytes = Vec::new();
        config.encode_into(&mut bytes);
        assert_eq!(bytes.len(), SystemConfig::ENCODED_LEN);
        assert_eq!(SystemConfig::decode(&bytes).unwrap(), config);
        assert_eq!(config.run_limit(), Some(Tick(5000)));
    }

    #[test]
    fn endless_run_has_no_limit() {
        let config = SystemConfig {
            timer_period_us: 1000,
            run_forever: true,
            total_ticks: 0,
            recording_enabled: false,
            host_msg_priority: 1,
            dma_priority: 0,
        };
        assert_eq!(config.run_limit(), None);
    }
}
