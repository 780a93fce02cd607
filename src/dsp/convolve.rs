//! Direct linear convolution
//!
//! Used offline to merge impulse responses. Every output sample is computed
//! independently from read-only inputs, so the work is split across the
//! rayon pool one output index at a time.

use rayon::prelude::*;

/// Full linear convolution of `a` and `b`
///
/// `c[n] = sum_m b[m] * a[n - m]` over `0 <= n - m < a.len()`, with
/// `c.len() == a.len() + b.len() - 1`. The result does not depend on
/// argument order, but the inner loop runs over `b`, so pass the longer
/// sequence as `a`. Either input empty yields an empty output.
pub fn direct_conv(a: &[f32], b: &[f32]) -> Vec<f32> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut c = vec![0.0f32; a.len() + b.len() - 1];

    c.par_iter_mut().enumerate().for_each(|(n, out)| {
        // m ranges so that n - m stays inside a
        let m_start = (n + 1).saturating_sub(a.len());
        let m_end = n.min(b.len() - 1);

        let mut acc = 0.0f32;
        for m in m_start..=m_end {
            acc += b[m] * a[n - m];
        }
        *out = acc;
    });

    c
}
