//! Incremental matrix profiles over a growing set of time-series segments.
//!
//! # Examples
//!
//! ```
//! use piecewise_mp::{PiecewiseConfig, PiecewiseProfile};
//!
//! let segment = vec![1.0, 2.0, 3.0, 4.0, 5.0, 1.0, 2.0, 3.0, 4.0, 5.0];
//! let mut pw = PiecewiseProfile::new(PiecewiseConfig::new(4)).unwrap();
//! pw.add_segment(&segment);
//! pw.add_segment(&segment);
//! pw.process_pending().unwrap();
//!
//! assert_eq!(pw.len(), 2);
//! assert_eq!(pw.profile(1).unwrap().len(), segment.len() - 4 + 1);
//! ```

pub mod algorithms;
pub mod core;
pub mod error;
pub mod io;
pub mod output;

pub use crate::algorithms::kernel::{CpuKernel, JoinKernel, JoinRequest, KernelOptions, Operand};
pub use crate::algorithms::piecewise::{PiecewiseProfile, ProcessSummary, SegmentRecord};
pub use crate::algorithms::tiled_join::JoinInvoker;
pub use crate::core::config::{MatrixDims, PiecewiseConfig, PrecisionType, ProfileKind};
pub use crate::core::exclusion::{ExclusionZone, JoinKind};
pub use crate::core::matrix_profile::{Profile, RollingStats, StatsView};
pub use crate::core::neighbors::{
    reduce_all_neighbors, Match, MatchHeap, MatrixAccumulator, NeighborProfile, ReducedMatrix,
    EMPTY_CELL,
};
pub use crate::core::packed_entry::{pack, sentinel, to_distance, unpack, PackedEntry};
pub use crate::error::{ConfigError, JoinError, KernelError, LoadError, OutputError, PiecewiseError};
pub use crate::io::loader::{parse_series, read_series};
pub use crate::output::encoder::OutputEncoder;
pub use crate::output::format::format_significant;
