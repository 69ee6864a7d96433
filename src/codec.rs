//! Fixed-point codec for the safety-filter link.
//!
//! Physical quantities (m, m/s, rad, rad/s, m/s²) travel as `i16` in
//! milli-units. This halves the payload compared to `f32` at the cost of
//! ~1 mm / 1 mrad resolution and a ±32.767 unit range. There is no range
//! check: values outside the range wrap modulo 2¹⁶ and come back with the
//! wrong sign or magnitude.

/// Scale factor: physical units → milli-units.
pub const SCALE: f32 = 1000.0;

/// Largest magnitude that survives a round trip.
pub const MAX_PHYSICAL: f32 = i16::MAX as f32 / SCALE;

/// Quantize a physical value, rounding toward zero.
///
/// The product is truncated to `i32` and then narrowed, so out-of-range
/// values wrap instead of saturating. NaN encodes as 0.
#[inline]
pub fn encode(value: f32) -> i16 {
    (value * SCALE) as i32 as i16
}

/// Restore a physical value from milli-units.
#[inline]
pub fn decode(raw: i16) -> f32 {
    raw as f32 / SCALE
}

/// Append `value` as little-endian milli-units.
pub(crate) fn put(buf: &mut [u8], offset: usize, value: f32) {
    buf[offset..offset + 2].copy_from_slice(&encode(value).to_le_bytes());
}

/// Read little-endian milli-units at `offset`.
pub(crate) fn get(buf: &[u8], offset: usize) -> f32 {
    decode(i16::from_le_bytes([buf[offset], buf[offset + 1]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn truncates_toward_zero() {
        assert_eq!(encode(1.2345), 1234);
        assert_eq!(encode(-1.2345), -1234);
        assert_eq!(encode(0.0009), 0);
        assert_eq!(encode(-0.0009), 0);
    }

    #[test]
    fn decodes_milli_units() {
        assert_eq!(decode(1500), 1.5);
        assert_eq!(decode(-250), -0.25);
        assert_eq!(decode(0), 0.0);
    }

    #[test]
    fn out_of_range_wraps() {
        // 40.0 → 40000 → 40000 - 65536
        assert_eq!(encode(40.0), -25536);
        assert_eq!(encode(-40.0), 25536);
        assert!(decode(encode(40.0)) < 0.0);
    }

    #[test]
    fn nan_encodes_as_zero() {
        assert_eq!(encode(f32::NAN), 0);
    }

    #[test]
    fn put_get_little_endian() {
        let mut buf = [0u8; 4];
        put(&mut buf, 2, 0.5);
        assert_eq!(buf, [0, 0, 0xF4, 0x01]);
        assert_eq!(get(&buf, 2), 0.5);
    }

    proptest! {
        #[test]
        fn round_trip_within_one_milli_unit(x in -MAX_PHYSICAL..MAX_PHYSICAL) {
            let back = decode(encode(x));
            prop_assert!((back - x).abs() <= 1.1e-3, "{} -> {}", x, back);
            // Truncation never moves away from zero
            prop_assert!(back.abs() <= x.abs() + 1e-5);
        }
    }
}
