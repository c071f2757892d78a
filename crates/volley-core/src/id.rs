//! Strongly-typed identifiers for sources, ticks, and routing keys.

use std::fmt;

/// Index of a source local to one core instance.
///
/// Sources are stored densely; `SourceId(n)` is the n-th record in the
/// source table and the low bits OR-ed into the emit routing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Population-wide source identifier.
///
/// Rate updates address sources globally; each core owns the window
/// `[first_source_id, first_source_id + n_sources)` and maps a global id
/// to a [`SourceId`] by subtracting its window start. Ids outside the
/// window belong to another core and are ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalSourceId(pub u32);

impl fmt::Display for GlobalSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GlobalSourceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing simulation tick counter.
///
/// One tick is one period of the periodic timer, the fundamental unit of
/// simulated time. Source activity windows are half-open `[start, end)`
/// ranges of ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tick(pub u32);

impl Tick {
    /// The tick one past this one.
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Tick {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Opaque multicast routing identifier on the fabric.
///
/// Emit keys are constructed as `base_key | local_source_index`; incoming
/// rate-update keys are AND-ed with the configured mask to recover a
/// [`GlobalSourceId`]. The fabric itself never interprets key contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutingKey(pub u32);

impl RoutingKey {
    /// Combine a base key with a local source index.
    pub fn for_source(base: u32, source: SourceId) -> Self {
        Self(base | source.0)
    }

    /// Extract a global source id using the configured update mask.
    pub fn masked_id(self, mask: u32) -> GlobalSourceId {
        GlobalSourceId(self.0 & mask)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for RoutingKey {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_source_ors_low_bits() {
        let key = RoutingKey::for_source(0x0010_0000, SourceId(3));
        assert_eq!(key, RoutingKey(0x0010_0003));
    }

    #[test]
    fn masked_id_recovers_global_id() {
        let key = RoutingKey(0xFFFF_0205);
        assert_eq!(key.masked_id(0x0000_FFFF), GlobalSourceId(0x0205));
    }

    #[test]
    fn key_displays_as_hex() {
        assert_eq!(RoutingKey(0x0010_0003).to_string(), "0x00100003");
    }

    #[test]
    fn tick_next_increments() {
        assert_eq!(Tick(41).next(), Tick(42));
    }
}
