use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::error::LoadError;

/// Read a whitespace-separated series of numbers from `path`.
pub fn read_series(path: impl AsRef<Path>) -> Result<Vec<f64>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "reading time series");
    let values = parse_series(BufReader::new(file), &path.display().to_string())?;
    info!(count = values.len(), "read time series");
    Ok(values)
}

/// Parse a series, one or more values per line.
///
/// An empty line stands for one missing sample and reads as NaN; anything
/// but a trailing empty line is worth a warning. `name` labels errors.
pub fn parse_series<R: BufRead>(reader: R, name: &str) -> Result<Vec<f64>, LoadError> {
    let mut values = Vec::new();
    let mut lines = reader.lines().enumerate().peekable();
    while let Some((idx, line)) = lines.next() {
        let line = line.map_err(|source| LoadError::Read {
            name: name.to_string(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if lines.peek().is_some() {
                warn!(line = idx + 1, name, "empty line in input, reading it as NaN");
            }
            values.push(f64::NAN);
            continue;
        }
        for token in trimmed.split_whitespace() {
            let v = token.parse::<f64>().map_err(|_| LoadError::InvalidToken {
                name: name.to_string(),
                line: idx + 1,
                token: token.to_string(),
            })?;
            values.push(v);
        }
    }
    Ok(values)
}
