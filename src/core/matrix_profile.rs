use crate::core::config::{PiecewiseConfig, ProfileKind};
use crate::core::neighbors::NeighborProfile;
use crate::core::packed_entry::PackedEntry;

/// Number of subsequences of length `window` in a series of length `len`,
/// or `None` if there are none.
#[inline]
pub fn profile_len(len: usize, window: usize) -> Option<usize> {
    if window == 0 || len < window {
        None
    } else {
        Some(len - window + 1)
    }
}

/// Rolling mean and inverse standard deviation for all subsequences of length `m`.
///
/// Computed via a single-pass sliding window over cumulative sums and
/// sums-of-squares. Windows touching a NaN sample are marked invalid and have
/// NaN statistics.
#[derive(Debug, Clone)]
pub struct RollingStats {
    pub mean: Vec<f64>,
    /// Precomputed `1 / (sqrt(m) * sigma)` for each subsequence.
    /// Zero for constant subsequences (sigma == 0), NaN for invalid windows.
    /// The Pearson correlation of subsequences `i` and `j` is then
    /// `r = (QT - m*mu_i*mu_j) * m_sigma_inv[i] * m_sigma_inv[j]`.
    pub m_sigma_inv: Vec<f64>,
    pub has_constant: bool,
    pub has_invalid: bool,
}

impl RollingStats {
    /// Compute rolling statistics for subsequences of length `m`.
    ///
    /// Returns `None` when the series is shorter than `m`.
    pub fn compute(ts: &[f64], m: usize) -> Option<Self> {
        let n_subs = profile_len(ts.len(), m)?;
        let n = ts.len();

        let mut cumsum = vec![0.0; n + 1];
        let mut cumsum_sq = vec![0.0; n + 1];
        let mut nan_count = vec![0usize; n + 1];
        for i in 0..n {
            let (v, bad) = if ts[i].is_finite() {
                (ts[i], 0)
            } else {
                (0.0, 1)
            };
            cumsum[i + 1] = cumsum[i] + v;
            cumsum_sq[i + 1] = cumsum_sq[i] + v * v;
            nan_count[i + 1] = nan_count[i] + bad;
        }

        let mut mean = vec![0.0; n_subs];
        let mut m_sigma_inv = vec![0.0; n_subs];
        let mut has_constant = false;
        let mut has_invalid = false;

        let m_f = m as f64;
        let sqrt_m = m_f.sqrt();
        for i in 0..n_subs {
            if nan_count[i + m] > nan_count[i] {
                mean[i] = f64::NAN;
                m_sigma_inv[i] = f64::NAN;
                has_invalid = true;
                continue;
            }
            let sum = cumsum[i + m] - cumsum[i];
            let sum_sq = cumsum_sq[i + m] - cumsum_sq[i];
            let mu = sum / m_f;
            // Variance via E[X^2] - E[X]^2, clamped to 0 for numerical stability
            let var = (sum_sq / m_f - mu * mu).max(0.0);
            let sigma = var.sqrt();
            mean[i] = mu;
            if sigma < 1e-15 {
                m_sigma_inv[i] = 0.0;
                has_constant = true;
            } else {
                m_sigma_inv[i] = 1.0 / (sqrt_m * sigma);
            }
        }

        Some(Self {
            mean,
            m_sigma_inv,
            has_constant,
            has_invalid,
        })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Statistics for subsequences `start..start + len`.
    pub fn slice(&self, start: usize, len: usize) -> StatsView<'_> {
        StatsView {
            mean: &self.mean[start..start + len],
            m_sigma_inv: &self.m_sigma_inv[start..start + len],
        }
    }

    pub fn view(&self) -> StatsView<'_> {
        self.slice(0, self.len())
    }
}

/// Borrowed window of [`RollingStats`], as handed to a kernel for one tile.
#[derive(Debug, Clone, Copy)]
pub struct StatsView<'a> {
    pub mean: &'a [f64],
    pub m_sigma_inv: &'a [f64],
}

impl StatsView<'_> {
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// A running profile of one of the four supported kinds.
///
/// Every variant holds exactly one entry per subsequence start position.
#[derive(Debug, Clone)]
pub enum Profile {
    /// Best correlation and neighbor index per position.
    NnIndex(Vec<PackedEntry>),
    /// Best correlation per position.
    Nn(Vec<f32>),
    /// Sum of correlations above the threshold per position.
    SumThresh(Vec<f64>),
    /// Bounded best-neighbor lists per position.
    AllNeighbors(NeighborProfile),
}

impl Profile {
    /// Allocate a profile of `kind` for a series of length `series_len`, every
    /// entry set to its "nothing found" value.
    ///
    /// Returns `None` if the series has no subsequence of length `window` or
    /// the kind is invalid; callers must skip such series.
    pub fn allocate(
        kind: ProfileKind,
        series_len: usize,
        window: usize,
        match_capacity: usize,
    ) -> Option<Self> {
        let len = profile_len(series_len, window)?;
        Self::with_len(kind, len, match_capacity)
    }

    /// Allocate for the kind and limits in `config`. ALL_NEIGHBORS profiles
    /// also accumulate the configured reduced matrix.
    pub fn for_config(config: &PiecewiseConfig, series_len: usize) -> Option<Self> {
        let profile = Self::allocate(
            config.profile_kind,
            series_len,
            config.window,
            config.max_matches_per_column,
        )?;
        match (profile, config.matrix_output) {
            (Self::AllNeighbors(p), Some(dims)) => {
                let height = dims.neighbor_rows.unwrap_or(p.len());
                Some(Self::AllNeighbors(p.with_matrix(height, dims.height, dims.width)))
            }
            (profile, _) => Some(profile),
        }
    }

    /// Allocate with an explicit entry count.
    pub fn with_len(kind: ProfileKind, len: usize, match_capacity: usize) -> Option<Self> {
        match kind {
            ProfileKind::NnIndex => Some(Self::NnIndex(vec![PackedEntry::SENTINEL; len])),
            ProfileKind::Nn => Some(Self::Nn(vec![PackedEntry::SENTINEL.corr; len])),
            ProfileKind::SumThresh => Some(Self::SumThresh(vec![0.0; len])),
            ProfileKind::AllNeighbors => Some(Self::AllNeighbors(NeighborProfile::new(
                len,
                match_capacity,
            ))),
            ProfileKind::Invalid => None,
        }
    }

    /// A fresh profile with the same kind, length and limits.
    pub fn empty_like(&self) -> Self {
        match self {
            Self::NnIndex(v) => Self::NnIndex(vec![PackedEntry::SENTINEL; v.len()]),
            Self::Nn(v) => Self::Nn(vec![PackedEntry::SENTINEL.corr; v.len()]),
            Self::SumThresh(v) => Self::SumThresh(vec![0.0; v.len()]),
            Self::AllNeighbors(p) => Self::AllNeighbors(p.empty_tile(p.len(), 0, 0)),
        }
    }

    /// A fresh profile of the same kind with `len` entries.
    pub fn empty_with_len(&self, len: usize) -> Self {
        match self {
            Self::NnIndex(_) => Self::NnIndex(vec![PackedEntry::SENTINEL; len]),
            Self::Nn(_) => Self::Nn(vec![PackedEntry::SENTINEL.corr; len]),
            Self::SumThresh(_) => Self::SumThresh(vec![0.0; len]),
            Self::AllNeighbors(p) => Self::AllNeighbors(NeighborProfile::new(len, p.capacity)),
        }
    }

    /// A fresh tile-local profile of `len` entries placed at `position`,
    /// with neighbors relative to `neighbor_offset`. ALL_NEIGHBORS tiles
    /// accumulate into a matrix of the same geometry as this profile's.
    pub fn empty_tile(&self, len: usize, position: usize, neighbor_offset: usize) -> Self {
        match self {
            Self::AllNeighbors(p) => {
                Self::AllNeighbors(p.empty_tile(len, position, neighbor_offset))
            }
            other => other.empty_with_len(len),
        }
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::NnIndex(_) => ProfileKind::NnIndex,
            Self::Nn(_) => ProfileKind::Nn,
            Self::SumThresh(_) => ProfileKind::SumThresh,
            Self::AllNeighbors(_) => ProfileKind::AllNeighbors,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::NnIndex(v) => v.len(),
            Self::Nn(v) => v.len(),
            Self::SumThresh(v) => v.len(),
            Self::AllNeighbors(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record a correlation between position `idx` and `neighbor`.
    ///
    /// 1NN kinds keep the maximum. SUM_THRESH adds, and ALL_NEIGHBORS offers
    /// to the bounded list, correlations strictly above `threshold`.
    #[inline(always)]
    pub fn update(&mut self, idx: usize, corr: f32, neighbor: usize, threshold: f64) {
        match self {
            Self::NnIndex(v) => v[idx].offer(corr, neighbor as i32),
            Self::Nn(v) => {
                if corr > v[idx] {
                    v[idx] = corr;
                }
            }
            Self::SumThresh(v) => {
                if corr as f64 > threshold {
                    v[idx] += corr as f64;
                }
            }
            Self::AllNeighbors(p) => {
                if corr as f64 > threshold {
                    p.offer(idx, neighbor, corr);
                }
            }
        }
    }

    /// Merge a tile-local profile covering positions `position..` into this
    /// one. Neighbor indices of the tile are relative to `neighbor_offset`.
    ///
    /// Both profiles must be of the same kind; returns false otherwise.
    pub fn merge_tile(&mut self, tile: &Profile, position: usize, neighbor_offset: usize) -> bool {
        match (self, tile) {
            (Self::NnIndex(full), Self::NnIndex(part)) => {
                for (dst, src) in full[position..position + part.len()].iter_mut().zip(part) {
                    if src.corr > dst.corr {
                        *dst = PackedEntry::new(src.corr, src.index + neighbor_offset as i32);
                    }
                }
            }
            (Self::Nn(full), Self::Nn(part)) => {
                for (dst, src) in full[position..position + part.len()].iter_mut().zip(part) {
                    if *src > *dst {
                        *dst = *src;
                    }
                }
            }
            (Self::SumThresh(full), Self::SumThresh(part)) => {
                for (dst, src) in full[position..position + part.len()].iter_mut().zip(part) {
                    *dst += *src;
                }
            }
            (Self::AllNeighbors(full), Self::AllNeighbors(part)) => {
                full.merge_tile(part, position, neighbor_offset);
            }
            _ => return false,
        }
        true
    }

    /// Merge a whole profile of the same shape (element-wise best or sum).
    pub fn merge(&mut self, other: &Profile) -> bool {
        self.len() == other.len() && self.merge_tile(other, 0, 0)
    }

    /// Packed entries, for 1NN_INDEX profiles.
    pub fn as_packed(&self) -> Option<&[PackedEntry]> {
        match self {
            Self::NnIndex(v) => Some(v),
            _ => None,
        }
    }

    /// Flat 64-bit words, for 1NN_INDEX profiles.
    pub fn to_packed_words(&self) -> Option<Vec<u64>> {
        self.as_packed()
            .map(|v| v.iter().map(|e| e.to_bits()).collect())
    }

    /// Best correlation per position, for the 1NN kinds.
    pub fn correlations(&self) -> Option<Vec<f32>> {
        match self {
            Self::NnIndex(v) => Some(v.iter().map(|e| e.corr).collect()),
            Self::Nn(v) => Some(v.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MatrixDims;
    use crate::core::neighbors::EMPTY_CELL;

    #[test]
    fn test_profile_len() {
        assert_eq!(profile_len(10, 4), Some(7));
        assert_eq!(profile_len(4, 4), Some(1));
        assert_eq!(profile_len(3, 4), None);
        assert_eq!(profile_len(0, 4), None);
    }

    #[test]
    fn test_rolling_stats_simple() {
        // ts = [1, 2, 3, 4, 5], m = 3
        // Means: 2, 3, 4; stds: sqrt(2/3)
        let ts = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = RollingStats::compute(&ts, 3).unwrap();

        assert_eq!(stats.len(), 3);
        assert!((stats.mean[0] - 2.0).abs() < 1e-10);
        assert!((stats.mean[1] - 3.0).abs() < 1e-10);
        assert!((stats.mean[2] - 4.0).abs() < 1e-10);

        let expected = 1.0 / (3.0_f64.sqrt() * (2.0_f64 / 3.0).sqrt());
        for s in &stats.m_sigma_inv {
            assert!((s - expected).abs() < 1e-10);
        }
        assert!(!stats.has_constant);
        assert!(!stats.has_invalid);
    }

    #[test]
    fn test_rolling_stats_constant() {
        let ts = vec![5.0; 10];
        let stats = RollingStats::compute(&ts, 4).unwrap();
        assert!(stats.has_constant);
        for s in &stats.m_sigma_inv {
            assert_eq!(*s, 0.0);
        }
    }

    #[test]
    fn test_rolling_stats_nan_windows() {
        let ts = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0, 7.0];
        let stats = RollingStats::compute(&ts, 3).unwrap();
        assert!(stats.has_invalid);
        // Windows 0, 1, 2 contain index 2
        for i in 0..3 {
            assert!(stats.m_sigma_inv[i].is_nan(), "window {i}");
        }
        for i in 3..5 {
            assert!(stats.m_sigma_inv[i].is_finite(), "window {i}");
        }
        assert!((stats.mean[4] - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_rolling_stats_too_short() {
        assert!(RollingStats::compute(&[1.0, 2.0], 3).is_none());
    }

    #[test]
    fn test_allocate_sentinels() {
        let p = Profile::allocate(ProfileKind::NnIndex, 10, 4, 1).unwrap();
        assert_eq!(p.len(), 7);
        for e in p.as_packed().unwrap() {
            assert_eq!(e.to_bits(), PackedEntry::SENTINEL.to_bits());
        }
        assert!(Profile::allocate(ProfileKind::NnIndex, 3, 4, 1).is_none());
        assert!(Profile::allocate(ProfileKind::Invalid, 10, 4, 1).is_none());

        match Profile::allocate(ProfileKind::SumThresh, 10, 4, 1).unwrap() {
            Profile::SumThresh(v) => assert!(v.iter().all(|&x| x == 0.0)),
            other => panic!("unexpected kind {:?}", other.kind()),
        }
    }

    #[test]
    fn test_update_kinds() {
        let mut p = Profile::with_len(ProfileKind::NnIndex, 3, 1).unwrap();
        p.update(1, 0.5, 2, f64::NEG_INFINITY);
        p.update(1, 0.4, 0, f64::NEG_INFINITY);
        let e = p.as_packed().unwrap()[1];
        assert_eq!((e.corr, e.index), (0.5, 2));

        let mut p = Profile::with_len(ProfileKind::SumThresh, 2, 1).unwrap();
        p.update(0, 0.9, 1, 0.5);
        p.update(0, 0.4, 1, 0.5);
        p.update(0, 0.6, 1, 0.5);
        match p {
            Profile::SumThresh(v) => assert!((v[0] - 1.5).abs() < 1e-6),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_merge_tile_offsets_indices() {
        let mut full = Profile::with_len(ProfileKind::NnIndex, 6, 1).unwrap();
        let mut tile = full.empty_with_len(2);
        tile.update(0, 0.7, 1, f64::NEG_INFINITY);
        tile.update(1, 0.2, 0, f64::NEG_INFINITY);
        assert!(full.merge_tile(&tile, 3, 10));

        let entries = full.as_packed().unwrap();
        assert_eq!((entries[3].corr, entries[3].index), (0.7, 11));
        assert_eq!((entries[4].corr, entries[4].index), (0.2, 10));
        assert!(entries[0].is_unmatched());

        // A worse tile never regresses
        let mut worse = full.empty_with_len(2);
        worse.update(0, 0.1, 0, f64::NEG_INFINITY);
        full.merge_tile(&worse, 3, 0);
        assert_eq!(full.as_packed().unwrap()[3].index, 11);
    }

    #[test]
    fn test_merge_kind_mismatch() {
        let mut a = Profile::with_len(ProfileKind::NnIndex, 2, 1).unwrap();
        let b = Profile::with_len(ProfileKind::Nn, 2, 1).unwrap();
        assert!(!a.merge(&b));
        let shorter = Profile::with_len(ProfileKind::NnIndex, 1, 1).unwrap();
        assert!(!a.merge(&shorter));
    }

    #[test]
    fn test_all_neighbors_respects_threshold() {
        let mut p = Profile::with_len(ProfileKind::AllNeighbors, 1, 8).unwrap();
        p.update(0, 0.9, 1, 0.5);
        p.update(0, 0.5, 2, 0.5);
        p.update(0, 0.2, 3, 0.5);
        p.update(0, f32::NAN, 4, f64::NEG_INFINITY);
        match p {
            Profile::AllNeighbors(n) => {
                let rows: Vec<u64> = n.columns[0].ranked().map(|m| m.row).collect();
                assert_eq!(rows, vec![1]);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_for_config_attaches_matrix() {
        let config = PiecewiseConfig {
            profile_kind: ProfileKind::AllNeighbors,
            matrix_output: Some(MatrixDims::new(2, 2)),
            ..PiecewiseConfig::new(4)
        };
        let mut full = Profile::for_config(&config, 11).unwrap();
        let mut local = full.empty_like();
        local.update(7, 0.8, 1, f64::NEG_INFINITY);
        assert!(full.merge(&local));
        match full {
            // 8 x 8 grid in 4 x 4 blocks: (row 1, col 7) lands in cell (0, 1)
            Profile::AllNeighbors(n) => {
                let m = n.matrix().unwrap();
                assert!((m.get(0, 1) - 0.8).abs() < 1e-6);
                assert_eq!(m.get(1, 1), EMPTY_CELL);
            }
            _ => unreachable!(),
        }

        let plain = PiecewiseConfig::new(4).with_profile_kind(ProfileKind::AllNeighbors);
        match Profile::for_config(&plain, 11).unwrap() {
            Profile::AllNeighbors(n) => assert!(n.matrix().is_none()),
            _ => unreachable!(),
        }
    }
}
