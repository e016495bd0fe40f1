use std::path::PathBuf;

use thiserror::Error;

/// Invalid or undecodable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: window must be at least 3, got {window}")]
    WindowTooSmall { window: usize },
    #[error("config: profile kind is invalid")]
    InvalidProfileKind,
    #[error("config: precision is invalid")]
    InvalidPrecision,
    #[error("config: tile length {max_tile_len} must be at least twice the window {window}")]
    TileTooSmall { max_tile_len: usize, window: usize },
    #[error("config: exclusion zone denominator must be non-zero")]
    ZeroExclusionDenom,
    #[error("config: matrix output dimensions must be non-zero, got {height}x{width}")]
    EmptyMatrix { height: usize, width: usize },
    #[error("config: max matches per column must be non-zero")]
    ZeroMatchCapacity,
    #[error("config: could not decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config: could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by a correlation kernel. Fatal to the join that issued it.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel: precision is invalid")]
    InvalidPrecision,
    #[error("kernel: profile kinds differ between operands")]
    ProfileKindMismatch,
    #[error("kernel: profile length {got} does not match {expected} subsequences")]
    ProfileLength { expected: usize, got: usize },
    #[error("kernel: series of length {len} is shorter than the window {window}")]
    SeriesTooShort { len: usize, window: usize },
    #[error("kernel: computation failed: {0}")]
    Computation(String),
}

/// Failure of one self-join or cross-join.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join: segment of length {len} has no subsequences of window {window}")]
    SegmentTooShort { len: usize, window: usize },
    #[error("join: running profile has {got} entries, expected {expected}")]
    ProfileSize { expected: usize, got: usize },
    #[error("join: profile kinds differ between operands")]
    ProfileKindMismatch,
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Failure of the piecewise manager.
#[derive(Debug, Error)]
pub enum PiecewiseError {
    #[error("piecewise: joining segment {segment} failed: {source}")]
    Join {
        segment: usize,
        #[source]
        source: JoinError,
    },
    #[error("piecewise: state is inconsistent after an earlier join failure")]
    Poisoned,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Failure to write a profile file.
#[derive(Debug, Error)]
#[error("output: could not write {path}: {source}")]
pub struct OutputError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Failure to load a time series from text.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to open {path} for reading: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse line {line} of {name}: {token:?}")]
    InvalidToken {
        name: String,
        line: usize,
        token: String,
    },
}
