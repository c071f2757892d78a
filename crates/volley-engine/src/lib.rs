//! Simulation engine for the Volley spike generator.
//!
//! One [`SpikeCore`] models a contiguous sub-population of independent
//! Poisson sources on a single processing core: each timer tick it draws
//! how many spikes every source emits, paces the resulting multicast
//! packets onto the fabric, and records a per-tick bitfield of firing
//! sources. Rate updates arrive from the fabric and from host messages;
//! pause and resume round-trip all source state through shared memory.
//!
//! # Callback priority contract
//!
//! On the target platform the entry points are callbacks at distinct
//! pre-emption priorities: multicast packet above DMA-complete above
//! host message above timer tick, and the timer is never re-entered.
//! The rate-update paths ([`SpikeCore::on_multicast_packet`],
//! [`SpikeCore::on_host_message`]) and the write-latch completion are
//! short non-blocking mutators of single-word or single-record state;
//! a timer sweep interrupted by one may observe a source mid-update for
//! one tick, which is the documented weak-consistency model. No lock is
//! required and none is taken.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod core;
pub mod intake;
pub mod memory;
pub mod params;
pub mod rate;
pub mod runner;
pub mod table;
pub mod throttle;

pub use crate::core::{Provenance, SpikeCore, TickOutcome};
pub use intake::RateUpdate;
pub use memory::{CoreMemory, CoreMemoryBuilder, Region};
pub use params::{ParameterBlock, Regime, SourceRecord, SystemConfig};
pub use rate::RateTarget;
pub use runner::{RealtimeRunner, SubmitError};
pub use table::SourceTable;
pub use throttle::DispatchThrottle;
