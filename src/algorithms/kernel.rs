use std::ops::{Mul, Neg};

use crate::algorithms::common::sliding_dot_product;
use crate::core::config::PrecisionType;
use crate::core::exclusion::ExclusionZone;
use crate::core::matrix_profile::{Profile, StatsView};
use crate::error::KernelError;

/// Numeric settings for one kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelOptions {
    pub precision: PrecisionType,
    /// SUM_THRESH profiles only accumulate correlations above this value.
    pub corr_threshold: f64,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            precision: PrecisionType::Double,
            corr_threshold: f64::NEG_INFINITY,
        }
    }
}

/// One side of a join: samples and the normalization statistics of each of
/// its subsequences.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a> {
    /// Samples, non-finite values already replaced.
    pub series: &'a [f64],
    pub stats: StatsView<'a>,
}

impl Operand<'_> {
    /// Number of subsequences, checked against the statistics.
    fn subsequences(&self, window: usize) -> Result<usize, KernelError> {
        if window == 0 || self.series.len() < window {
            return Err(KernelError::SeriesTooShort {
                len: self.series.len(),
                window,
            });
        }
        let n = self.series.len() - window + 1;
        if self.stats.len() != n {
            return Err(KernelError::ProfileLength {
                expected: n,
                got: self.stats.len(),
            });
        }
        Ok(n)
    }
}

/// Arguments of one kernel invocation over a tile.
#[derive(Debug, Clone, Copy)]
pub struct JoinRequest<'a> {
    /// Row operand.
    pub a: Operand<'a>,
    /// Column operand; `None` joins `a` with itself.
    pub b: Option<Operand<'a>>,
    pub window: usize,
    /// Band excluded from the row pass, over offsets `j - i`.
    pub exclusion: ExclusionZone,
    /// Band excluded from the column pass, over offsets `i - j`.
    pub exclusion_transposed: ExclusionZone,
    pub options: KernelOptions,
}

/// A pairwise correlation kernel.
///
/// Given a request, the kernel folds every admitted subsequence pair into
/// the running profiles. Row-operand positions are updated in `profile_a`
/// and column-operand positions in `profile_b`; without a second operand both
/// sides of each pair update `profile_a`. Entries are only ever replaced by
/// better ones. An error leaves the profiles in an unspecified state.
pub trait JoinKernel: Send + Sync {
    fn run_join(
        &self,
        request: &JoinRequest<'_>,
        profile_a: &mut Profile,
        profile_b: Option<&mut Profile>,
    ) -> Result<(), KernelError>;
}

/// Reference kernel: diagonal traversal on the CPU.
///
/// Each diagonal is seeded from one sliding dot product and advanced with the
/// O(1) recurrence `QT[i][j] = QT[i-1][j-1] - a[i-1]*b[j-1] + a[i+m-1]*b[j+m-1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuKernel;

impl JoinKernel for CpuKernel {
    fn run_join(
        &self,
        request: &JoinRequest<'_>,
        profile_a: &mut Profile,
        profile_b: Option<&mut Profile>,
    ) -> Result<(), KernelError> {
        let m = request.window;
        let n_a = request.a.subsequences(m)?;
        check_profile(profile_a, n_a)?;
        if let Some(b) = request.b.as_ref() {
            let n_b = b.subsequences(m)?;
            if let Some(pb) = profile_b.as_deref() {
                check_profile(pb, n_b)?;
                if pb.kind() != profile_a.kind() {
                    return Err(KernelError::ProfileKindMismatch);
                }
            }
        }

        match request.options.precision {
            PrecisionType::Double => run::<f64, f64>(request, profile_a, profile_b),
            PrecisionType::Mixed => run::<f64, f32>(request, profile_a, profile_b),
            PrecisionType::Single => run::<f32, f32>(request, profile_a, profile_b),
            PrecisionType::Invalid => Err(KernelError::InvalidPrecision),
        }
    }
}

fn check_profile(profile: &Profile, expected: usize) -> Result<(), KernelError> {
    if profile.len() != expected {
        return Err(KernelError::ProfileLength {
            expected,
            got: profile.len(),
        });
    }
    Ok(())
}

/// Floating-point type the kernel can compute in.
trait Real: Copy + PartialEq + Neg<Output = Self> + Mul<Output = Self> {
    const ZERO: Self;
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
    fn mul_add(self, a: Self, b: Self) -> Self;
    fn is_nan(self) -> bool;
}

impl Real for f64 {
    const ZERO: Self = 0.0;
    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v
    }
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline(always)]
    fn mul_add(self, a: Self, b: Self) -> Self {
        f64::mul_add(self, a, b)
    }
    #[inline(always)]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}

impl Real for f32 {
    const ZERO: Self = 0.0;
    #[inline(always)]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
    #[inline(always)]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline(always)]
    fn mul_add(self, a: Self, b: Self) -> Self {
        f32::mul_add(self, a, b)
    }
    #[inline(always)]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

/// An operand converted to the kernel's working precision.
///
/// `Q` carries samples, means and the dot-product recurrence; `C` carries the
/// inverse standard deviations and the final correlation.
struct Prepared<Q, C> {
    ts: Vec<Q>,
    mean: Vec<Q>,
    m_mean: Vec<Q>,
    m_sigma_inv: Vec<C>,
}

impl<Q: Real, C: Real> Prepared<Q, C> {
    fn new(op: &Operand<'_>, m: usize) -> Self {
        let m_f = m as f64;
        Self {
            ts: op.series.iter().map(|&v| Q::from_f64(v)).collect(),
            mean: op.stats.mean.iter().map(|&v| Q::from_f64(v)).collect(),
            m_mean: op.stats.mean.iter().map(|&v| Q::from_f64(m_f * v)).collect(),
            m_sigma_inv: op.stats.m_sigma_inv.iter().map(|&v| C::from_f64(v)).collect(),
        }
    }
}

/// Pearson correlation of rows `i` of `a` and `j` of `b`, from their dot product.
#[inline(always)]
fn correlation<Q: Real, C: Real>(
    qt: Q,
    a: &Prepared<Q, C>,
    i: usize,
    b: &Prepared<Q, C>,
    j: usize,
) -> f32 {
    let si = a.m_sigma_inv[i];
    let sj = b.m_sigma_inv[j];
    if si.is_nan() || sj.is_nan() {
        f32::NAN
    } else if si == C::ZERO && sj == C::ZERO {
        // both constant: identical after z-normalization
        1.0
    } else if si == C::ZERO || sj == C::ZERO {
        0.0
    } else {
        let cov = a.m_mean[i].mul_add(b.mean[j], -qt);
        (-(C::from_f64(cov.to_f64())) * si * sj).to_f64() as f32
    }
}

/// Advance the dot product one step along a diagonal to `(i, j)`.
#[inline(always)]
fn step<Q: Real>(qt: Q, a: &[Q], b: &[Q], i: usize, j: usize, m: usize) -> Q {
    let qt = (-a[i - 1]).mul_add(b[j - 1], qt);
    a[i + m - 1].mul_add(b[j + m - 1], qt)
}

fn run<Q: Real, C: Real>(
    request: &JoinRequest<'_>,
    profile_a: &mut Profile,
    profile_b: Option<&mut Profile>,
) -> Result<(), KernelError> {
    let m = request.window;
    let a = Prepared::<Q, C>::new(&request.a, m);
    match request.b.as_ref() {
        None => self_pass(request, &a, profile_a),
        Some(op_b) => {
            let b = Prepared::<Q, C>::new(op_b, m);
            cross_pass(request, &a, &b, profile_a, profile_b)
        }
    }
}

/// Join an operand with itself, walking diagonals `k >= 0` once and
/// updating both ends of every admitted pair.
fn self_pass<Q: Real, C: Real>(
    request: &JoinRequest<'_>,
    a: &Prepared<Q, C>,
    profile: &mut Profile,
) -> Result<(), KernelError> {
    let m = request.window;
    let series = request.a.series;
    let n = series.len() - m + 1;
    let threshold = request.options.corr_threshold;
    let qt_first = sliding_dot_product(&series[0..m], series)?;

    for k in 0..n {
        let row_ok = !request.exclusion.contains(k as i64);
        let col_ok = k > 0 && !request.exclusion_transposed.contains(k as i64);
        if !row_ok && !col_ok {
            continue;
        }
        let mut qt = Q::from_f64(qt_first[k]);
        for i in 0..(n - k) {
            let j = i + k;
            if i > 0 {
                qt = step(qt, &a.ts, &a.ts, i, j, m);
            }
            let r = correlation(qt, a, i, a, j);
            if row_ok {
                profile.update(i, r, j, threshold);
            }
            if col_ok {
                profile.update(j, r, i, threshold);
            }
        }
    }
    Ok(())
}

/// Join two operands over every diagonal of the `n_a x n_b` tile.
fn cross_pass<Q: Real, C: Real>(
    request: &JoinRequest<'_>,
    a: &Prepared<Q, C>,
    b: &Prepared<Q, C>,
    profile_a: &mut Profile,
    mut profile_b: Option<&mut Profile>,
) -> Result<(), KernelError> {
    let m = request.window;
    let (series_a, series_b) = match request.b.as_ref() {
        Some(op_b) => (request.a.series, op_b.series),
        None => return Ok(()),
    };
    let n_a = series_a.len() - m + 1;
    let n_b = series_b.len() - m + 1;
    let threshold = request.options.corr_threshold;

    // Diagonals starting on the first row: dot(A[0..m], B[k..k+m])
    let qt_rows = sliding_dot_product(&series_a[0..m], series_b)?;
    // Diagonals starting on the first column: dot(B[0..m], A[k..k+m])
    let qt_cols = sliding_dot_product(&series_b[0..m], series_a)?;

    let mut visit = |i: usize, j: usize, r: f32| {
        profile_a.update(i, r, j, threshold);
        if let Some(pb) = profile_b.as_deref_mut() {
            pb.update(j, r, i, threshold);
        }
    };

    for k in 0..n_b {
        if request.exclusion.contains(k as i64) {
            continue;
        }
        let mut qt = Q::from_f64(qt_rows[k]);
        for p in 0..n_a.min(n_b - k) {
            let (i, j) = (p, p + k);
            if p > 0 {
                qt = step(qt, &a.ts, &b.ts, i, j, m);
            }
            visit(i, j, correlation(qt, a, i, b, j));
        }
    }

    for k in 1..n_a {
        if request.exclusion_transposed.contains(k as i64) {
            continue;
        }
        let mut qt = Q::from_f64(qt_cols[k]);
        for p in 0..n_b.min(n_a - k) {
            let (i, j) = (p + k, p);
            if p > 0 {
                qt = step(qt, &a.ts, &b.ts, i, j, m);
            }
            visit(i, j, correlation(qt, a, i, b, j));
        }
    }
    Ok(())
}
