//! Dense vector helpers for embedding math.
//!
//! Norms below [`NORM_EPSILON`] are treated as zero: cosine similarity
//! against a zero vector is 0 and normalizing a zero vector is a no-op.
//! A zero embedding is a legitimate initial state, not an error.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Norms at or below this are treated as zero.
pub const NORM_EPSILON: f32 = 1e-8;

/// Dot product over the common prefix of `a` and `b`.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean (L2) norm.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of `a` and `b`, or 0 if either is (near) zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a <= NORM_EPSILON || norm_b <= NORM_EPSILON {
        return 0.0;
    }
    dot(a, b) / (norm_a * norm_b)
}

/// Scale `v` to unit length in place. Returns `false` and leaves `v`
/// untouched when its norm is at or below [`NORM_EPSILON`].
pub fn normalize(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm <= NORM_EPSILON {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// `target += scale * delta`, component-wise over the common prefix.
pub fn add_scaled(target: &mut [f32], delta: &[f32], scale: f32) {
    for (t, d) in target.iter_mut().zip(delta) {
        *t += scale * d;
    }
}

/// Short hex fingerprint of a vector's exact bit pattern.
///
/// Two vectors with identical components always share a fingerprint;
/// any mutation almost certainly changes it. Used for change detection,
/// not for security.
pub fn fingerprint(v: &[f32]) -> String {
    let mut hasher = DefaultHasher::new();
    v.len().hash(&mut hasher);
    for x in v {
        x.to_bits().hash(&mut hasher);
    }
    format!("{:06x}", hasher.finish() & 0x00FF_FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_of_three_four() {
        assert!((l2_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_parallel_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_against_zero_is_zero() {
        assert!(cosine_similarity(&[0.0; 4], &[1.0; 4]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0; 4], &[0.0; 4]).abs() < f32::EPSILON);
    }

    #[test]
    fn normalize_guards_zero() {
        let mut zero = vec![0.0_f32; 3];
        assert!(!normalize(&mut zero));
        assert!(zero.iter().all(|x| x.abs() < f32::EPSILON));

        let mut v = vec![0.0_f32, 3.0, 4.0];
        assert!(normalize(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn add_scaled_accumulates() {
        let mut t = vec![1.0_f32, 1.0];
        add_scaled(&mut t, &[2.0, -4.0], 0.5);
        assert!((t[0] - 2.0).abs() < 1e-6);
        assert!((t[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn fingerprint_is_six_hex_digits_and_tracks_changes() {
        let a = fingerprint(&[0.1, 0.2, 0.3]);
        assert_eq!(a.len(), 6);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, fingerprint(&[0.1, 0.2, 0.3]));
        assert_ne!(a, fingerprint(&[0.1, 0.2, 0.300_001]));
    }
}
