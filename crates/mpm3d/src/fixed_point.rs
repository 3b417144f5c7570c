//! Fixed-point encoding for order-independent grid accumulation.
//!
//! The compute backend has no floating-point atomics, so scattered values
//! are scaled to i32 before an atomic integer add and scaled back when
//! read. Integer addition is exactly associative and commutative, which
//! makes the parallel scatter deterministic under any evaluation order.
//!
//! Encoding truncates toward zero, matching the WGSL `i32()` conversion,
//! so the CPU reference and the GPU shaders produce identical raw cell
//! values for identical inputs. Round-trip error is bounded by
//! `1 / multiplier`.

/// Encode a real value as a scaled integer.
#[inline]
pub fn encode(value: f32, multiplier: f32) -> i32 {
    (value * multiplier) as i32
}

/// Decode a scaled integer back to a real value.
#[inline]
pub fn decode(raw: i32, multiplier_inverse: f32) -> f32 {
    raw as f32 * multiplier_inverse
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_error_bound() {
        let multiplier = 1e7f32;
        let inv = 1.0 / multiplier;
        for v in [0.0, 1.0, -1.0, 0.123_456, -42.5, 13.37, 0.75, -0.001] {
            let back = decode(encode(v, multiplier), inv);
            assert!(
                (back - v).abs() <= inv,
                "round trip of {} drifted to {} (bound {})",
                v,
                back,
                inv
            );
        }
    }

    #[test]
    fn test_truncates_toward_zero() {
        // Matches WGSL i32(): -0.7 scaled must not round away from zero.
        assert_eq!(encode(0.7, 10.0), 7);
        assert_eq!(encode(-0.7, 10.0), -7);
        assert_eq!(encode(0.79, 10.0), 7);
        assert_eq!(encode(-0.79, 10.0), -7);
    }

    #[test]
    fn test_zero_is_exact() {
        assert_eq!(encode(0.0, 1e7), 0);
        assert_eq!(decode(0, 1e-7), 0.0);
    }
}
