//! Per-tick spike recording for the Volley spike generator.
//!
//! A [`SpikeAccumulator`] collects which sources fired how many times in
//! the current tick as a ragged stack of bit-plane layers; a [`Recorder`]
//! owns the accumulator plus the write-busy interlock and hands frames to
//! the asynchronous record sink at tick end.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod accumulator;
pub mod recorder;

pub use accumulator::SpikeAccumulator;
pub use recorder::Recorder;
