use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default tile side in samples.
pub const DEFAULT_MAX_TILE_LEN: usize = 1 << 20;

/// Which profile a join maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileKind {
    /// Best correlation plus the neighbor index, packed into one word.
    #[serde(rename = "1NN_INDEX")]
    NnIndex,
    /// Best correlation only.
    #[serde(rename = "1NN")]
    Nn,
    /// Sum of correlations above a threshold.
    #[serde(rename = "SUM_THRESH")]
    SumThresh,
    /// Bounded list of the best neighbors per position.
    #[serde(rename = "ALL_NEIGHBORS")]
    AllNeighbors,
    #[serde(rename = "INVALID")]
    Invalid,
}

impl ProfileKind {
    /// Parse a kind name. Unknown names map to [`ProfileKind::Invalid`].
    pub fn parse(s: &str) -> Self {
        match s {
            "1NN_INDEX" => Self::NnIndex,
            "1NN" => Self::Nn,
            "SUM_THRESH" => Self::SumThresh,
            "ALL_NEIGHBORS" => Self::AllNeighbors,
            _ => Self::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NnIndex => "1NN_INDEX",
            Self::Nn => "1NN",
            Self::SumThresh => "SUM_THRESH",
            Self::AllNeighbors => "ALL_NEIGHBORS",
            Self::Invalid => "INVALID",
        }
    }
}

/// Arithmetic used by the correlation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrecisionType {
    Double,
    Mixed,
    Single,
    Invalid,
}

impl PrecisionType {
    /// Select a precision from command-line style flags, first set flag wins.
    /// No flag set yields [`PrecisionType::Invalid`].
    pub fn from_flags(double: bool, mixed: bool, single: bool) -> Self {
        if double {
            Self::Double
        } else if mixed {
            Self::Mixed
        } else if single {
            Self::Single
        } else {
            Self::Invalid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "DOUBLE",
            Self::Mixed => "MIXED",
            Self::Single => "SINGLE",
            Self::Invalid => "INVALID",
        }
    }
}

/// Target resolution of the dense ALL_NEIGHBORS output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDims {
    pub height: usize,
    pub width: usize,
    /// Neighbor rows of the match grid being reduced. Defaults to the
    /// profile's own length.
    #[serde(default)]
    pub neighbor_rows: Option<usize>,
}

impl MatrixDims {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            neighbor_rows: None,
        }
    }
}

/// Configuration for piecewise matrix profile computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PiecewiseConfig {
    /// Subsequence length.
    pub window: usize,
    pub profile_kind: ProfileKind,
    pub precision: PrecisionType,
    /// Emit Pearson correlation instead of z-normalized Euclidean distance.
    pub output_pearson: bool,
    /// Maximum tile side, in samples.
    pub max_tile_len: usize,
    /// Exclusion zone denominator: radius = ceil(window / exclusion_zone_denom).
    pub exclusion_zone_denom: usize,
    /// Euclidean distance threshold. SUM_THRESH and ALL_NEIGHBORS profiles
    /// only record pairs whose correlation is strictly above the matching
    /// correlation cutoff.
    pub distance_threshold: Option<f64>,
    /// Heap capacity per position for ALL_NEIGHBORS profiles.
    pub max_matches_per_column: usize,
    /// Reduce ALL_NEIGHBORS output to a dense matrix of this size.
    pub matrix_output: Option<MatrixDims>,
}

impl Default for PiecewiseConfig {
    fn default() -> Self {
        Self {
            window: 0,
            profile_kind: ProfileKind::NnIndex,
            precision: PrecisionType::Double,
            output_pearson: false,
            max_tile_len: DEFAULT_MAX_TILE_LEN,
            exclusion_zone_denom: 4,
            distance_threshold: None,
            max_matches_per_column: 100,
            matrix_output: None,
        }
    }
}

impl PiecewiseConfig {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            ..Self::default()
        }
    }

    pub fn with_profile_kind(mut self, kind: ProfileKind) -> Self {
        self.profile_kind = kind;
        self
    }

    pub fn with_precision(mut self, precision: PrecisionType) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_max_tile_len(mut self, max_tile_len: usize) -> Self {
        self.max_tile_len = max_tile_len;
        self
    }

    pub fn with_output_pearson(mut self, output_pearson: bool) -> Self {
        self.output_pearson = output_pearson;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 3 {
            return Err(ConfigError::WindowTooSmall {
                window: self.window,
            });
        }
        if self.profile_kind == ProfileKind::Invalid {
            return Err(ConfigError::InvalidProfileKind);
        }
        if self.precision == PrecisionType::Invalid {
            return Err(ConfigError::InvalidPrecision);
        }
        if self.max_tile_len / 2 < self.window {
            return Err(ConfigError::TileTooSmall {
                max_tile_len: self.max_tile_len,
                window: self.window,
            });
        }
        if self.exclusion_zone_denom == 0 {
            return Err(ConfigError::ZeroExclusionDenom);
        }
        if self.max_matches_per_column == 0 {
            return Err(ConfigError::ZeroMatchCapacity);
        }
        if let Some(dims) = self.matrix_output {
            if dims.height == 0 || dims.width == 0 {
                return Err(ConfigError::EmptyMatrix {
                    height: dims.height,
                    width: dims.width,
                });
            }
        }
        Ok(())
    }

    /// Self-join exclusion radius around the diagonal.
    pub fn exclusion_radius(&self) -> usize {
        self.window.div_ceil(self.exclusion_zone_denom.max(1))
    }

    /// Correlation equivalent of `distance_threshold`; pairs must exceed it
    /// to contribute to a SUM_THRESH sum or an ALL_NEIGHBORS list.
    pub fn correlation_threshold(&self) -> f64 {
        match self.distance_threshold {
            Some(t) if !t.is_nan() => 1.0 - (t * t) / (2.0 * self.window as f64),
            _ => f64::NEG_INFINITY,
        }
    }

    /// Number of subsequences per tile side.
    pub fn tile_subsequences(&self) -> usize {
        self.max_tile_len.saturating_sub(self.window) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_kind() {
        assert_eq!(ProfileKind::parse("1NN_INDEX"), ProfileKind::NnIndex);
        assert_eq!(ProfileKind::parse("1NN"), ProfileKind::Nn);
        assert_eq!(ProfileKind::parse("SUM_THRESH"), ProfileKind::SumThresh);
        assert_eq!(ProfileKind::parse("ALL_NEIGHBORS"), ProfileKind::AllNeighbors);
        assert_eq!(ProfileKind::parse("1nn_index"), ProfileKind::Invalid);
        assert_eq!(ProfileKind::parse(""), ProfileKind::Invalid);
    }

    #[test]
    fn test_precision_from_flags() {
        assert_eq!(PrecisionType::from_flags(true, true, true), PrecisionType::Double);
        assert_eq!(PrecisionType::from_flags(false, true, true), PrecisionType::Mixed);
        assert_eq!(PrecisionType::from_flags(false, false, true), PrecisionType::Single);
        assert_eq!(PrecisionType::from_flags(false, false, false), PrecisionType::Invalid);
    }

    #[test]
    fn test_exclusion_radius() {
        assert_eq!(PiecewiseConfig::new(4).exclusion_radius(), 1);
        assert_eq!(PiecewiseConfig::new(8).exclusion_radius(), 2);
        assert_eq!(PiecewiseConfig::new(10).exclusion_radius(), 3);
    }

    #[test]
    fn test_validate() {
        assert!(PiecewiseConfig::new(4).validate().is_ok());
        assert!(matches!(
            PiecewiseConfig::new(2).validate(),
            Err(ConfigError::WindowTooSmall { window: 2 })
        ));
        assert!(matches!(
            PiecewiseConfig::new(4)
                .with_profile_kind(ProfileKind::Invalid)
                .validate(),
            Err(ConfigError::InvalidProfileKind)
        ));
        assert!(matches!(
            PiecewiseConfig::new(4)
                .with_precision(PrecisionType::Invalid)
                .validate(),
            Err(ConfigError::InvalidPrecision)
        ));
        assert!(matches!(
            PiecewiseConfig::new(8).with_max_tile_len(15).validate(),
            Err(ConfigError::TileTooSmall { .. })
        ));
    }

    #[test]
    fn test_from_json_defaults() {
        let config = PiecewiseConfig::from_json_str(r#"{"window": 16}"#).unwrap();
        assert_eq!(config.window, 16);
        assert_eq!(config.profile_kind, ProfileKind::NnIndex);
        assert_eq!(config.precision, PrecisionType::Double);
        assert_eq!(config.max_tile_len, DEFAULT_MAX_TILE_LEN);
        assert!(!config.output_pearson);
    }

    #[test]
    fn test_from_json_names() {
        let json = r#"{
            "window": 8,
            "profile_kind": "SUM_THRESH",
            "precision": "MIXED",
            "distance_threshold": 2.0
        }"#;
        let config = PiecewiseConfig::from_json_str(json).unwrap();
        assert_eq!(config.profile_kind, ProfileKind::SumThresh);
        assert_eq!(config.precision, PrecisionType::Mixed);
        // 1 - 4 / 16
        assert!((config.correlation_threshold() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(PiecewiseConfig::from_json_str(r#"{"window": 1}"#).is_err());
        assert!(PiecewiseConfig::from_json_str(r#"{"window": 8, "precision": "HALF"}"#).is_err());
    }

    #[test]
    fn test_no_threshold_accepts_everything() {
        let config = PiecewiseConfig::new(8);
        assert_eq!(config.correlation_threshold(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_matrix_neighbor_rows_default() {
        let json = r#"{"window": 8, "matrix_output": {"height": 4, "width": 6}}"#;
        let config = PiecewiseConfig::from_json_str(json).unwrap();
        assert_eq!(config.matrix_output, Some(MatrixDims::new(4, 6)));

        let json = r#"{"window": 8, "matrix_output": {"height": 4, "width": 6, "neighbor_rows": 90}}"#;
        let dims = PiecewiseConfig::from_json_str(json).unwrap().matrix_output.unwrap();
        assert_eq!(dims.neighbor_rows, Some(90));
    }
}
