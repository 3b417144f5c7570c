//! Quadratic B-spline kernel shared by every scatter and gather stage.
//!
//! Scatter (P2G) and gather (G2P) must use the *same* weights or the
//! transfer stops conserving momentum, so this is the only definition on
//! the CPU side; the WGSL side has a single textually shared copy in
//! `mpm_common.wgsl`.

/// APIC D-matrix inverse for quadratic B-splines at grid spacing 1:
/// D = (1/4) I, so D^-1 = 4.
pub const APIC_D_INVERSE: f32 = 4.0;

/// Per-axis weights for the three grid planes at offsets {-1, 0, +1}
/// around `floor(p)`, where `d = (p - floor(p)) - 0.5` is the fractional
/// offset from the cell center, `d` in [-0.5, 0.5).
#[inline]
pub fn quadratic_weights(d: f32) -> [f32; 3] {
    [
        0.5 * (0.5 - d) * (0.5 - d),
        0.75 - d * d,
        0.5 * (0.5 + d) * (0.5 + d),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_partition_of_unity() {
        // The quadratic B-spline is a partition of unity: the three plane
        // weights must sum to exactly 1 for any in-range offset.
        for d in [-0.5, -0.25, 0.0, 0.1, 0.333, 0.499] {
            let w = quadratic_weights(d);
            let sum = w[0] + w[1] + w[2];
            assert!(
                (sum - 1.0).abs() < 1e-6,
                "weights must sum to 1 at d={}: got {}",
                d,
                sum
            );
        }
    }

    #[test]
    fn test_weights_symmetry() {
        // Mirroring the offset swaps the outer weights.
        for d in [0.0, 0.2, 0.45] {
            let w_pos = quadratic_weights(d);
            let w_neg = quadratic_weights(-d);
            assert!((w_pos[0] - w_neg[2]).abs() < 1e-6);
            assert!((w_pos[1] - w_neg[1]).abs() < 1e-6);
            assert!((w_pos[2] - w_neg[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_weights_nonnegative() {
        for d in [-0.5, -0.3, 0.0, 0.3, 0.4999] {
            for w in quadratic_weights(d) {
                assert!(w >= 0.0, "negative weight {} at d={}", w, d);
            }
        }
    }
}
