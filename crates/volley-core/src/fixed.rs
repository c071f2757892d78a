//! s16.15 fixed-point codec for rates on the wire.
//!
//! Rate updates travel the fabric as a single 32-bit word: a signed
//! 16.15 fixed-point value in hertz. Internally all rates are `f64`;
//! this module only converts at the wire boundary.

/// Scale factor for the s16.15 format: one unit is `1 / 32768`.
const SCALE: f64 = 32768.0;

/// Decode a raw s16.15 word into hertz.
pub fn s1615_to_f64(raw: u32) -> f64 {
    (raw as i32) as f64 / SCALE
}

/// Encode a rate in hertz as an s16.15 word.
///
/// Saturates at the representable range (±65536 Hz, just under); NaN
/// encodes as zero.
pub fn f64_to_s1615(value: f64) -> u32 {
    if value.is_nan() {
        return 0;
    }
    let scaled = (value * SCALE).round();
    let clamped = scaled.clamp(i32::MIN as f64, i32::MAX as f64);
    (clamped as i32) as u32
}
