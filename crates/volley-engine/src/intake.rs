//! Message intake: decoding rate updates from fabric and host traffic.
//!
//! Two entry points feed the rate controller. A multicast packet carries
//! one update: the target id in the key (under the configured mask) and
//! the rate as an s16.15 word in the payload. A host message carries a
//! batch: a count word followed by `{id, rate}` pairs. Malformed host
//! payloads are diagnosed and dropped; foreign traffic must never take
//! the core down.

use smallvec::SmallVec;

use volley_core::fixed::s1615_to_f64;
use volley_core::{GlobalSourceId, RoutingKey};

use crate::params::read_u32;

/// One decoded rate update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateUpdate {
    /// Target source, globally addressed.
    pub id: GlobalSourceId,
    /// New rate in hertz.
    pub rate_hz: f64,
}

/// Decode a multicast rate-update packet.
pub fn decode_multicast_update(key: RoutingKey, payload: u32, mask: u32) -> RateUpdate {
    RateUpdate {
        id: key.masked_id(mask),
        rate_hz: s1615_to_f64(payload),
    }
}

/// Decode a host-message batch of rate updates.
///
/// Word 0 is the item count, then `{id: u32, rate: s16.15}` pairs. A
/// payload shorter than its declared count yields the complete pairs
/// that are present.
pub fn decode_host_batch(payload: &[u8]) -> SmallVec<[RateUpdate; 8]> {
    let mut updates = SmallVec::new();
    if payload.len() < 4 {
        log::warn!("host rate message too short ({} bytes), dropped", payload.len());
        return updates;
    }
    let declared = read_u32(payload, 0) as usize;
    let available = (payload.len() - 4) / 8;
    if available < declared {
        log::warn!(
            "host rate message declares {declared} items but carries {available}, \
             applying the complete ones"
        );
    }
    for i in 0..declared.min(available) {
        let at = 4 + i * 8;
        updates.push(RateUpdate {
            id: GlobalSourceId(read_u32(payload, at)),
            rate_hz: s1615_to_f64(read_u32(payload, at + 4)),
        });
    }
    updates
}
