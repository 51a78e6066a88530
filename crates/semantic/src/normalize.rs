//! Vector fitting and L2 normalization.
//!
//! Different embedding providers hand back vectors of different lengths.
//! Everything stored or queried goes through [`fit_to_dimension`] first so the
//! store only ever sees one shape: exactly `dim` values with unit L2 norm.

/// Norms at or below this are treated as "no signal".
const MIN_NORM: f64 = 1e-12;

/// Truncate or zero-pad `vector` to `dim` values, then L2-normalize.
///
/// Padding happens before normalization so the padded zeros take part in the
/// norm. Degenerate input (all zeros, NaN, infinities) yields the zero vector
/// rather than an error.
pub fn fit_to_dimension(vector: &[f32], dim: usize) -> Vec<f32> {
    let mut out: Vec<f32> = vector.iter().copied().take(dim).collect();
    out.resize(dim, 0.0);
    l2_normalize_in_place(&mut out);
    out
}

/// In-place L2 normalization.
///
/// The squared norm is accumulated in f64 so large finite components cannot
/// overflow to infinity. When the norm is non-finite or `<= 1e-12` every
/// component is set to zero.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f64 = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    let norm = norm_sq.sqrt();
    if !norm.is_finite() || norm <= MIN_NORM {
        v.iter_mut().for_each(|x| *x = 0.0);
        return;
    }
    let inv_norm = norm.recip();
    for x in v.iter_mut() {
        *x = (f64::from(*x) * inv_norm) as f32;
    }
}
