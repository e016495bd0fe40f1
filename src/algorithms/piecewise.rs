use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::algorithms::kernel::{CpuKernel, JoinKernel};
use crate::algorithms::tiled_join::JoinInvoker;
use crate::core::config::PiecewiseConfig;
use crate::core::matrix_profile::Profile;
use crate::error::{ConfigError, JoinError, OutputError, PiecewiseError};
use crate::output::encoder::OutputEncoder;

/// Minimum number of accepted segments before cross-joins run in parallel.
#[cfg(feature = "parallel")]
const MIN_PARALLEL_SEGMENTS: usize = 2;

/// An accepted segment: its samples and its running profile.
#[derive(Debug, Clone)]
pub struct SegmentRecord {
    series: Vec<f64>,
    profile: Profile,
}

impl SegmentRecord {
    pub fn series(&self) -> &[f64] {
        &self.series
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}

/// Outcome of one [`PiecewiseProfile::process_pending`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Incremental matrix profile over a growing set of disjoint segments.
///
/// Segments are queued with [`add_segment`](Self::add_segment) and joined by
/// [`process_pending`](Self::process_pending), in arrival order: each new
/// segment is cross-joined against every accepted one, updating both
/// profiles, and then self-joined. Segment ids are dense and never reused.
///
/// A failed join leaves the accepted profiles partially updated; the manager
/// is then poisoned and refuses further processing.
#[derive(Debug)]
pub struct PiecewiseProfile<K: JoinKernel = CpuKernel> {
    config: PiecewiseConfig,
    invoker: JoinInvoker<K>,
    accepted: Vec<SegmentRecord>,
    pending: VecDeque<Vec<f64>>,
    poisoned: bool,
}

impl PiecewiseProfile<CpuKernel> {
    pub fn new(config: PiecewiseConfig) -> Result<Self, ConfigError> {
        Self::with_kernel(config, CpuKernel)
    }
}

impl<K: JoinKernel> PiecewiseProfile<K> {
    pub fn with_kernel(config: PiecewiseConfig, kernel: K) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            window = config.window,
            kind = config.profile_kind.as_str(),
            precision = config.precision.as_str(),
            max_tile_len = config.max_tile_len,
            "piecewise profile configured"
        );
        Ok(Self {
            invoker: JoinInvoker::with_kernel(&config, kernel),
            config,
            accepted: Vec::new(),
            pending: VecDeque::new(),
            poisoned: false,
        })
    }

    pub fn config(&self) -> &PiecewiseConfig {
        &self.config
    }

    /// Queue a copy of `values`. Nothing is computed until the next
    /// [`process_pending`](Self::process_pending).
    pub fn add_segment(&mut self, values: &[f64]) {
        self.pending.push_back(values.to_vec());
    }

    /// Number of segments queued but not yet processed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of accepted segments.
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn segment(&self, id: usize) -> Option<&SegmentRecord> {
        self.accepted.get(id)
    }

    pub fn segments(&self) -> &[SegmentRecord] {
        &self.accepted
    }

    /// Running profile of segment `id`.
    pub fn profile(&self, id: usize) -> Option<&Profile> {
        self.accepted.get(id).map(|r| &r.profile)
    }

    /// Drain the queue in FIFO order, joining each segment into the set.
    ///
    /// Segments shorter than the window are dropped with a warning and do
    /// not consume an id.
    pub fn process_pending(&mut self) -> Result<ProcessSummary, PiecewiseError> {
        if self.poisoned {
            return Err(PiecewiseError::Poisoned);
        }
        let mut summary = ProcessSummary::default();
        while let Some(series) = self.pending.pop_front() {
            let id = self.accepted.len();
            let Some(profile) = Profile::for_config(&self.config, series.len()) else {
                warn!(
                    len = series.len(),
                    window = self.config.window,
                    "segment is shorter than the window, skipping it"
                );
                summary.rejected += 1;
                continue;
            };
            if let Err(source) = self.join_segment(series, profile) {
                self.poisoned = true;
                return Err(PiecewiseError::Join {
                    segment: id,
                    source,
                });
            }
            summary.accepted += 1;
        }

        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            segments = self.accepted.len(),
            "processed pending segments"
        );
        Ok(summary)
    }

    fn join_segment(&mut self, series: Vec<f64>, mut profile: Profile) -> Result<(), JoinError> {
        let id = self.accepted.len();
        cross_join_accepted(&self.invoker, &mut self.accepted, &series, &mut profile)?;
        self.invoker.self_join(&series, &mut profile)?;
        info!(
            segment = id,
            len = series.len(),
            profile_len = profile.len(),
            "segment accepted"
        );
        self.accepted.push(SegmentRecord { series, profile });
        Ok(())
    }

    /// Write `mp_<id>` (and `mpi_<id>` for 1NN_INDEX) for every accepted
    /// segment into `dir`, creating it if needed.
    pub fn write_profiles(&self, dir: impl AsRef<Path>) -> Result<(), PiecewiseError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| OutputError {
            path: dir.to_path_buf(),
            source,
        })?;
        let encoder = OutputEncoder::from_config(&self.config);
        for (id, record) in self.accepted.iter().enumerate() {
            let mp_path = dir.join(format!("mp_{id}"));
            let mpi_path = dir.join(format!("mpi_{id}"));
            encoder.write_profile_files(&record.profile, &mp_path, &mpi_path)?;
        }
        info!(dir = %dir.display(), segments = self.accepted.len(), "wrote profiles");
        Ok(())
    }
}

/// Cross-join `series` against every accepted segment.
///
/// Accepted profiles are updated in place. Contributions to the new profile
/// are merged in segment order, so the result is the same whether the joins
/// ran sequentially or in parallel.
fn cross_join_accepted<K: JoinKernel>(
    invoker: &JoinInvoker<K>,
    accepted: &mut [SegmentRecord],
    series: &[f64],
    profile: &mut Profile,
) -> Result<(), JoinError> {
    #[cfg(feature = "parallel")]
    if accepted.len() >= MIN_PARALLEL_SEGMENTS {
        use rayon::prelude::*;

        let locals = accepted
            .par_iter_mut()
            .map(|record| {
                let mut local = profile.empty_like();
                invoker.cross_join(series, &record.series, &mut local, &mut record.profile)?;
                Ok(local)
            })
            .collect::<Result<Vec<Profile>, JoinError>>()?;
        for local in &locals {
            let merged = profile.merge(local);
            debug_assert!(merged, "task-local profile differs in kind or length");
        }
        return Ok(());
    }

    for record in accepted.iter_mut() {
        invoker.cross_join(series, &record.series, profile, &mut record.profile)?;
    }
    Ok(())
}
