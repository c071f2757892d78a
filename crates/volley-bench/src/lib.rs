//! Benchmark profiles and utilities for the Volley spike generator.
//!
//! Provides pre-built shared-memory images for benchmarking:
//!
//! - [`reference_image`]: 100 fast sources at 1 kHz
//! - [`stress_image`]: 1000 sources, mixed fast and slow lanes

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use volley_core::{GlobalSourceId, Tick};
use volley_engine::{CoreMemory, ParameterBlock, Regime, SourceRecord, SystemConfig};
use volley_rand::Seed;

fn system(run_forever: bool, total_ticks: u32) -> SystemConfig {
    SystemConfig {
        timer_period_us: 1000,
        run_forever,
        total_ticks,
        recording_enabled: true,
        host_msg_priority: 1,
        dma_priority: 0,
    }
}

fn params(n_sources: u32, seed: u32) -> ParameterBlock {
    ParameterBlock {
        has_key: true,
        base_key: 0x0400_0000,
        rate_update_mask: 0x0000_FFFF,
        random_backoff_us: 0,
        inter_spike_gap_ticks: 0,
        first_source_id: GlobalSourceId(0),
        n_sources,
        slow_fast_cutoff: 0.25,
        seconds_per_tick: 0.001,
        ticks_per_second: 1000.0,
        seed: Seed([seed, seed ^ 0x9E37_79B9, seed.rotate_left(13), 7]),
    }
}

fn fast(rate_per_tick: f64) -> SourceRecord {
    SourceRecord {
        start: Tick(0),
        end: Tick(u32::MAX),
        regime: Regime::Fast {
            exp_minus_lambda: (-rate_per_tick).exp(),
        },
    }
}

fn slow(mean_isi_ticks: f64) -> SourceRecord {
    SourceRecord {
        start: Tick(0),
        end: Tick(u32::MAX),
        regime: Regime::Slow {
            mean_isi_ticks,
            time_to_spike_ticks: 0.0,
        },
    }
}

/// Build the reference image: 100 fast sources at one expected spike per
/// tick each.
pub fn reference_image(seed: u32) -> CoreMemory {
    CoreMemory::builder()
        .system(system(true, 0))
        .parameters(params(100, seed))
        .sources(vec![fast(1.0); 100])
        .build()
}

/// Build the stress image: 1000 sources, half fast at lambda 2, half
/// slow with a 50-tick mean interval.
pub fn stress_image(seed: u32) -> CoreMemory {
    let mut sources = Vec::with_capacity(1000);
    for i in 0..1000 {
        if i % 2 == 0 {
            sources.push(fast(2.0));
        } else {
            sources.push(slow(50.0));
        }
    }
    CoreMemory::builder()
        .system(system(true, 0))
        .parameters(params(1000, seed))
        .sources(sources)
        .build()
}
