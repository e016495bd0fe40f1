use std::borrow::Cow;

use realfft::RealFftPlanner;

use crate::error::KernelError;

/// Size threshold (n * m) above which we dispatch to the FFT path.
/// Below this, the naive O(n*m) loop wins due to lower constant overhead.
const FFT_THRESHOLD: usize = 256 * 1024;

/// Compute the sliding dot product between a query subsequence `q` and series `ts`.
///
/// Element `i` of the result is `dot(q, ts[i..i+m])`; the result has
/// `ts.len() - q.len() + 1` elements. Large inputs go through an FFT.
pub fn sliding_dot_product(q: &[f64], ts: &[f64]) -> Result<Vec<f64>, KernelError> {
    let m = q.len();
    let n = ts.len();
    if n < m || m == 0 {
        return Err(KernelError::SeriesTooShort { len: n, window: m });
    }
    if n * m > FFT_THRESHOLD {
        sliding_dot_product_fft(q, ts)
    } else {
        Ok(sliding_dot_product_naive(q, ts))
    }
}

/// Naive O(n*m) sliding dot product. `ts` must be at least as long as `q`.
pub fn sliding_dot_product_naive(q: &[f64], ts: &[f64]) -> Vec<f64> {
    let m = q.len();
    let n_subs = ts.len() + 1 - m;

    (0..n_subs)
        .map(|i| q.iter().zip(&ts[i..i + m]).map(|(a, b)| a * b).sum())
        .collect()
}

/// FFT-based O(n log n) sliding dot product via cross-correlation.
pub fn sliding_dot_product_fft(q: &[f64], ts: &[f64]) -> Result<Vec<f64>, KernelError> {
    let m = q.len();
    let n = ts.len();
    if n < m || m == 0 {
        return Err(KernelError::SeriesTooShort { len: n, window: m });
    }
    let n_subs = n - m + 1;
    let fft_len = (n + m - 1).next_power_of_two();

    let mut planner = RealFftPlanner::<f64>::new();
    let fft_forward = planner.plan_fft_forward(fft_len);
    let fft_inverse = planner.plan_fft_inverse(fft_len);

    // Reversed query, zero-padded
    let mut q_padded = vec![0.0; fft_len];
    for (dst, src) in q_padded.iter_mut().zip(q.iter().rev()) {
        *dst = *src;
    }
    let mut ts_padded = vec![0.0; fft_len];
    ts_padded[..n].copy_from_slice(ts);

    let fft_err = |e: realfft::FftError| KernelError::Computation(e.to_string());

    let mut q_spectrum = fft_forward.make_output_vec();
    let mut ts_spectrum = fft_forward.make_output_vec();
    fft_forward
        .process(&mut q_padded, &mut q_spectrum)
        .map_err(fft_err)?;
    fft_forward
        .process(&mut ts_padded, &mut ts_spectrum)
        .map_err(fft_err)?;

    for (q_val, ts_val) in q_spectrum.iter_mut().zip(ts_spectrum.iter()) {
        *q_val *= ts_val;
    }

    let mut result = vec![0.0; fft_len];
    fft_inverse
        .process(&mut q_spectrum, &mut result)
        .map_err(fft_err)?;

    // realfft inverse is unnormalized
    let norm = 1.0 / fft_len as f64;
    Ok(result[m - 1..m - 1 + n_subs]
        .iter()
        .map(|&x| x * norm)
        .collect())
}

/// Replace non-finite samples with zero so dot-product recurrences stay finite.
///
/// Windows that contained such samples are already flagged invalid by
/// `RollingStats`, so the substituted values never reach a result.
pub fn sanitize(ts: &[f64]) -> Cow<'_, [f64]> {
    if ts.iter().all(|v| v.is_finite()) {
        Cow::Borrowed(ts)
    } else {
        Cow::Owned(
            ts.iter()
                .map(|&v| if v.is_finite() { v } else { 0.0 })
                .collect(),
        )
    }
}
