//! Seeded random stream and derived samplers for the Volley spike generator.
//!
//! The spike schedule is a pure function of the four-word seed and the
//! source parameters, so everything stochastic in the generation path
//! draws from one [`KissRng`] owned by the core. The generator state can
//! be read back at any point and written into the parameter block at
//! pause, letting a resumed run continue the exact same stream.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod kiss;
pub mod sampler;

pub use kiss::{KissRng, Seed};
