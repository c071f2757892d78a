//! Volley: real-time Poisson spike generation for neuromorphic
//! multicast fabrics.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Volley sub-crates. Each core instance models a contiguous
//! sub-population of independent Poisson sources: every timer tick it
//! draws how many spikes each source emits, paces the resulting packets
//! onto the fabric, and records a per-tick bitfield of firing sources.
//!
//! # Quick start
//!
//! ```rust
//! use volley::prelude::*;
//! use volley::rand::Seed;
//! use volley_test_utils::{CollectingSink, MockFabric, TestClock};
//!
//! // Lay out the shared-memory image the way the loader would:
//! // one source, a 50-tick finite run, recording on.
//! let mem = CoreMemory::builder()
//!     .system(SystemConfig {
//!         timer_period_us: 1000,
//!         run_forever: false,
//!         total_ticks: 50,
//!         recording_enabled: true,
//!         host_msg_priority: 1,
//!         dma_priority: 0,
//!     })
//!     .parameters(ParameterBlock {
//!         has_key: true,
//!         base_key: 0x0400_0000,
//!         rate_update_mask: 0x0000_FFFF,
//!         random_backoff_us: 0,
//!         inter_spike_gap_ticks: 0,
//!         first_source_id: GlobalSourceId(0),
//!         n_sources: 1,
//!         slow_fast_cutoff: 0.25,
//!         seconds_per_tick: 0.001,
//!         ticks_per_second: 1000.0,
//!         seed: Seed([1, 2, 3, 4]),
//!     })
//!     .sources(vec![SourceRecord {
//!         start: Tick(0),
//!         end: Tick(u32::MAX),
//!         regime: Regime::Slow { mean_isi_ticks: 0.0, time_to_spike_ticks: 0.0 },
//!     }])
//!     .build();
//!
//! let fabric = MockFabric::new();
//! let mut core = SpikeCore::load(
//!     &mem,
//!     Box::new(TestClock::new()),
//!     Box::new(fabric.clone()),
//!     Box::new(CollectingSink::new()),
//! )
//! .unwrap();
//!
//! // Switch the source to 1 kHz and run the whole finite window.
//! let mut mem = mem;
//! core.set_rate(GlobalSourceId(0), 1000.0);
//! while let Ok(TickOutcome::Ran(_)) = core.on_timer_tick(&mut mem) {}
//!
//! assert!(core.is_paused());
//! assert!(fabric.sent_count() > 0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `volley-core` | Ids, wire codec, errors, hardware traits |
//! | [`rand`] | `volley-rand` | KISS stream and Poisson samplers |
//! | [`record`] | `volley-record` | Spike accumulator and recorder |
//! | [`engine`] | `volley-engine` | Core, memory image, runner |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and ids (`volley-core`).
pub use volley_core as types;

/// Seeded random stream and samplers (`volley-rand`).
pub use volley_rand as rand;

/// Spike accumulator and recorder (`volley-record`).
pub use volley_record as record;

/// The spike core, shared-memory image, and realtime runner
/// (`volley-engine`).
pub use volley_engine as engine;

/// Common imports for typical Volley usage.
///
/// ```rust
/// use volley::prelude::*;
/// ```
pub mod prelude {
    // Ids and hardware traits
    pub use volley_core::{
        FabricLink, GlobalSourceId, HardwareClock, RecordFrame, RecordSink, RoutingKey, SourceId,
        Tick, WriteLatch,
    };

    // Errors
    pub use volley_core::{LoadError, StoreError};

    // Random stream
    pub use volley_rand::KissRng;

    // Recording
    pub use volley_record::{Recorder, SpikeAccumulator};

    // Engine
    pub use volley_engine::{
        CoreMemory, ParameterBlock, Provenance, RealtimeRunner, Regime, SourceRecord, SpikeCore,
        SystemConfig, TickOutcome,
    };
}
