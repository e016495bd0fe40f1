use tracing::debug;

use crate::algorithms::common::sanitize;
use crate::algorithms::kernel::{CpuKernel, JoinKernel, JoinRequest, KernelOptions, Operand};
use crate::core::config::PiecewiseConfig;
use crate::core::exclusion::{ExclusionZone, JoinKind};
use crate::core::matrix_profile::{profile_len, Profile, RollingStats};
use crate::error::JoinError;

/// Runs self-joins and cross-joins over whole segments by splitting them into
/// tiles and handing each tile to a [`JoinKernel`].
///
/// Each tile is computed into a fresh tile-local profile which is then merged
/// into the running profile at the tile's offsets, so results never depend on
/// the tile size.
#[derive(Debug, Clone)]
pub struct JoinInvoker<K: JoinKernel = CpuKernel> {
    kernel: K,
    window: usize,
    exclusion_radius: usize,
    tile_subsequences: usize,
    options: KernelOptions,
}

impl JoinInvoker<CpuKernel> {
    pub fn new(config: &PiecewiseConfig) -> Self {
        Self::with_kernel(config, CpuKernel)
    }
}

impl<K: JoinKernel> JoinInvoker<K> {
    pub fn with_kernel(config: &PiecewiseConfig, kernel: K) -> Self {
        Self {
            kernel,
            window: config.window,
            exclusion_radius: config.exclusion_radius(),
            tile_subsequences: config.tile_subsequences().max(1),
            options: KernelOptions {
                precision: config.precision,
                corr_threshold: config.correlation_threshold(),
            },
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Join `series` with itself, excluding trivial matches within the
    /// exclusion radius of the diagonal.
    ///
    /// An empty `profile` is first filled with sentinels of its kind.
    pub fn self_join(&self, series: &[f64], profile: &mut Profile) -> Result<(), JoinError> {
        let n = self.subsequences(series)?;
        self.ensure_sized(profile, n)?;
        let stats = self.stats(series)?;
        let clean = sanitize(series);
        let tile = self.tile_subsequences;

        let mut tiles = 0usize;
        for row_start in (0..n).step_by(tile) {
            let rows = tile.min(n - row_start);
            // Tiles below the diagonal mirror the ones above it
            for col_start in (row_start..n).step_by(tile) {
                let cols = tile.min(n - col_start);
                let a = self.operand(&clean, &stats, row_start, rows);
                let (exclusion, exclusion_transposed) =
                    self.zones(JoinKind::SelfJoin, row_start, col_start, rows, cols);

                if row_start == col_start {
                    let request = JoinRequest {
                        a,
                        b: None,
                        window: self.window,
                        exclusion,
                        exclusion_transposed,
                        options: self.options,
                    };
                    let mut local = profile.empty_tile(rows, row_start, row_start);
                    self.kernel.run_join(&request, &mut local, None)?;
                    profile.merge_tile(&local, row_start, row_start);
                } else {
                    let request = JoinRequest {
                        a,
                        b: Some(self.operand(&clean, &stats, col_start, cols)),
                        window: self.window,
                        exclusion,
                        exclusion_transposed,
                        options: self.options,
                    };
                    let mut local_rows = profile.empty_tile(rows, row_start, col_start);
                    let mut local_cols = profile.empty_tile(cols, col_start, row_start);
                    self.kernel
                        .run_join(&request, &mut local_rows, Some(&mut local_cols))?;
                    profile.merge_tile(&local_rows, row_start, col_start);
                    profile.merge_tile(&local_cols, col_start, row_start);
                }
                tiles += 1;
            }
        }
        debug!(len = series.len(), subsequences = n, tiles, "self-join done");
        Ok(())
    }

    /// Join `series_a` against `series_b`, updating both running profiles.
    ///
    /// Entries of `profile_a` hold neighbors in `series_b` and vice versa.
    /// No exclusion zone applies. Empty profiles are first filled with
    /// sentinels; the two profiles must be of the same kind.
    pub fn cross_join(
        &self,
        series_a: &[f64],
        series_b: &[f64],
        profile_a: &mut Profile,
        profile_b: &mut Profile,
    ) -> Result<(), JoinError> {
        if profile_a.kind() != profile_b.kind() {
            return Err(JoinError::ProfileKindMismatch);
        }
        let n_a = self.subsequences(series_a)?;
        let n_b = self.subsequences(series_b)?;
        self.ensure_sized(profile_a, n_a)?;
        self.ensure_sized(profile_b, n_b)?;
        let stats_a = self.stats(series_a)?;
        let stats_b = self.stats(series_b)?;
        let clean_a = sanitize(series_a);
        let clean_b = sanitize(series_b);
        let tile = self.tile_subsequences;

        let mut tiles = 0usize;
        for row_start in (0..n_a).step_by(tile) {
            let rows = tile.min(n_a - row_start);
            for col_start in (0..n_b).step_by(tile) {
                let cols = tile.min(n_b - col_start);
                let (exclusion, exclusion_transposed) =
                    self.zones(JoinKind::Cross, row_start, col_start, rows, cols);
                let request = JoinRequest {
                    a: self.operand(&clean_a, &stats_a, row_start, rows),
                    b: Some(self.operand(&clean_b, &stats_b, col_start, cols)),
                    window: self.window,
                    exclusion,
                    exclusion_transposed,
                    options: self.options,
                };
                let mut local_a = profile_a.empty_tile(rows, row_start, col_start);
                let mut local_b = profile_b.empty_tile(cols, col_start, row_start);
                self.kernel
                    .run_join(&request, &mut local_a, Some(&mut local_b))?;
                profile_a.merge_tile(&local_a, row_start, col_start);
                profile_b.merge_tile(&local_b, col_start, row_start);
                tiles += 1;
            }
        }
        debug!(len_a = series_a.len(), len_b = series_b.len(), tiles, "cross-join done");
        Ok(())
    }

    fn subsequences(&self, series: &[f64]) -> Result<usize, JoinError> {
        profile_len(series.len(), self.window).ok_or(JoinError::SegmentTooShort {
            len: series.len(),
            window: self.window,
        })
    }

    fn stats(&self, series: &[f64]) -> Result<RollingStats, JoinError> {
        RollingStats::compute(series, self.window).ok_or(JoinError::SegmentTooShort {
            len: series.len(),
            window: self.window,
        })
    }

    /// Fill an unsized profile with sentinels, or check a sized one.
    fn ensure_sized(&self, profile: &mut Profile, expected: usize) -> Result<(), JoinError> {
        if profile.is_empty() {
            *profile = profile.empty_with_len(expected);
        } else if profile.len() != expected {
            return Err(JoinError::ProfileSize {
                expected,
                got: profile.len(),
            });
        }
        Ok(())
    }

    /// The samples and statistics of subsequences `start..start + count`.
    fn operand<'a>(
        &self,
        series: &'a [f64],
        stats: &'a RollingStats,
        start: usize,
        count: usize,
    ) -> Operand<'a> {
        Operand {
            series: &series[start..start + count + self.window - 1],
            stats: stats.slice(start, count),
        }
    }

    fn zones(
        &self,
        kind: JoinKind,
        row_start: usize,
        col_start: usize,
        rows: usize,
        cols: usize,
    ) -> (ExclusionZone, ExclusionZone) {
        let r = self.exclusion_radius;
        (
            ExclusionZone::for_pass(kind, false, r, row_start, col_start).clamped(rows, cols),
            ExclusionZone::for_pass(kind, true, r, row_start, col_start).clamped(cols, rows),
        )
    }
}
