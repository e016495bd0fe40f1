use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::core::config::PiecewiseConfig;
use crate::core::matrix_profile::Profile;
use crate::core::neighbors::NeighborProfile;
use crate::core::packed_entry::to_distance;
use crate::error::OutputError;
use crate::output::format::format_significant;

/// Significant digits of every written value.
pub const OUTPUT_DIGITS: usize = 10;

/// Writes profiles as newline-delimited text.
///
/// Correlations are written as z-normalized Euclidean distances unless
/// Pearson output is requested. SUM_THRESH sums are written as they are.
#[derive(Debug, Clone, Copy)]
pub struct OutputEncoder {
    window: usize,
    output_pearson: bool,
}

impl OutputEncoder {
    pub fn new(window: usize, output_pearson: bool) -> Self {
        Self {
            window,
            output_pearson,
        }
    }

    pub fn from_config(config: &PiecewiseConfig) -> Self {
        Self::new(config.window, config.output_pearson)
    }

    #[inline]
    fn value(&self, corr: f64) -> f64 {
        if self.output_pearson {
            corr
        } else {
            to_distance(corr, self.window)
        }
    }

    /// Write `profile` to `values`, and neighbor indices to `indices` when the
    /// profile carries them.
    ///
    /// Indices are written one-based, with -1 for positions that never found
    /// a neighbor. ALL_NEIGHBORS profiles write their reduced matrix if one
    /// was computed, or one `col row value` line per retained match.
    pub fn write_profile(
        &self,
        profile: &Profile,
        values: &mut dyn Write,
        indices: Option<&mut dyn Write>,
    ) -> io::Result<()> {
        match profile {
            Profile::NnIndex(entries) => {
                for e in entries {
                    writeln!(values, "{}", self.format(e.corr as f64))?;
                }
                if let Some(out) = indices {
                    for e in entries {
                        let index = if e.is_unmatched() { -1 } else { e.index as i64 + 1 };
                        writeln!(out, "{index}")?;
                    }
                }
            }
            Profile::Nn(corrs) => {
                for &c in corrs {
                    writeln!(values, "{}", self.format(c as f64))?;
                }
            }
            Profile::SumThresh(sums) => {
                for &s in sums {
                    writeln!(values, "{}", format_significant(s, OUTPUT_DIGITS))?;
                }
            }
            Profile::AllNeighbors(p) => self.write_neighbors(p, values)?,
        }
        Ok(())
    }

    fn write_neighbors(&self, profile: &NeighborProfile, out: &mut dyn Write) -> io::Result<()> {
        if let Some(matrix) = profile.matrix() {
            for row in matrix.rows() {
                let line: Vec<String> = row.iter().map(|&c| self.format(c)).collect();
                writeln!(out, "{}", line.join(" "))?;
            }
            return Ok(());
        }
        for heap in &profile.columns {
            for m in heap.ranked() {
                writeln!(out, "{} {} {}", m.col, m.row, self.format(m.corr as f64))?;
            }
        }
        Ok(())
    }

    fn format(&self, corr: f64) -> String {
        format_significant(self.value(corr), OUTPUT_DIGITS)
    }

    /// Write `profile` to `mp_path`, plus `mpi_path` for profiles with
    /// neighbor indices.
    pub fn write_profile_files(
        &self,
        profile: &Profile,
        mp_path: &Path,
        mpi_path: &Path,
    ) -> Result<(), OutputError> {
        let mut values = create(mp_path)?;
        let result = match profile {
            Profile::NnIndex(_) => {
                let mut indices = create(mpi_path)?;
                self.write_profile(profile, &mut values, Some(&mut indices as &mut dyn Write))
                    .and_then(|()| indices.flush())
                    .map_err(|source| OutputError {
                        path: mpi_path.to_path_buf(),
                        source,
                    })
            }
            _ => self
                .write_profile(profile, &mut values, None)
                .map_err(|source| OutputError {
                    path: mp_path.to_path_buf(),
                    source,
                }),
        };
        result?;
        values.flush().map_err(|source| OutputError {
            path: mp_path.to_path_buf(),
            source,
        })
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, OutputError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| OutputError {
            path: path.to_path_buf(),
            source,
        })
}
