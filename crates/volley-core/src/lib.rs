//! Core types and traits for the Volley spike generator.
//!
//! This is the leaf crate with zero internal Volley dependencies. It defines
//! the fundamental abstractions shared across the workspace: strongly-typed
//! ids, the s16.15 wire codec, error types, the write-busy latch, and the
//! traits at the hardware boundary (fabric, clock, record sink).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod fixed;
pub mod id;
pub mod latch;
pub mod traits;

// Re-export core types at crate root for convenience.
pub use error::{LoadError, StoreError};
pub use id::{GlobalSourceId, RoutingKey, SourceId, Tick};
pub use latch::WriteLatch;
pub use traits::{FabricLink, HardwareClock, RecordFrame, RecordSink};
