/// Whether a join compares a segment with itself or with another segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    SelfJoin,
    Cross,
}

/// Half-open band `[lower, upper)` of excluded diagonal offsets.
///
/// A pair `(i, j)` of row index `i` and column index `j` lies on diagonal
/// `d = j - i`; it is excluded from nearest-neighbor candidacy when
/// `lower <= d < upper`. An empty band has `lower >= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionZone {
    pub lower: i64,
    pub upper: i64,
}

impl ExclusionZone {
    pub const EMPTY: Self = Self { lower: 0, upper: 0 };

    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    /// Band of half-width `radius` centred on the main diagonal: `|d| <= radius`.
    pub fn around_diagonal(radius: usize) -> Self {
        let r = radius as i64;
        Self {
            lower: -r,
            upper: r + 1,
        }
    }

    /// Exclusion band for one pass of a tile.
    ///
    /// `row_start` and `col_start` are the tile's global subsequence offsets in
    /// the row and column operands. For a self-join the global band
    /// `|j - i| <= radius` is shifted into tile-local offsets; cross-joins
    /// between distinct segments exclude nothing. When `transpose` is set the
    /// pass iterates with rows and columns swapped, so the band is mirrored
    /// into that index space. Width is never affected by orientation.
    pub fn for_pass(
        kind: JoinKind,
        transpose: bool,
        radius: usize,
        row_start: usize,
        col_start: usize,
    ) -> Self {
        let zone = match kind {
            JoinKind::Cross => return Self::EMPTY,
            JoinKind::SelfJoin => {
                let shift = col_start as i64 - row_start as i64;
                let base = Self::around_diagonal(radius);
                Self {
                    lower: base.lower - shift,
                    upper: base.upper - shift,
                }
            }
        };
        if transpose {
            zone.transposed()
        } else {
            zone
        }
    }

    /// Mirror the band for a pass with rows and columns swapped.
    pub fn transposed(self) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        Self {
            lower: 1 - self.upper,
            upper: 1 - self.lower,
        }
    }

    /// Restrict the band to the diagonals present in a `rows x cols` tile.
    pub fn clamped(self, rows: usize, cols: usize) -> Self {
        let min_d = 1 - rows as i64;
        let max_d = cols as i64;
        let lower = self.lower.max(min_d);
        let upper = self.upper.min(max_d);
        if lower >= upper {
            Self::EMPTY
        } else {
            Self { lower, upper }
        }
    }

    #[inline(always)]
    pub fn contains(&self, offset: i64) -> bool {
        self.lower <= offset && offset < self.upper
    }

    pub fn is_empty(&self) -> bool {
        self.lower >= self.upper
    }

    pub fn width(&self) -> i64 {
        (self.upper - self.lower).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_join_band() {
        let z = ExclusionZone::for_pass(JoinKind::SelfJoin, false, 2, 0, 0);
        assert_eq!(z, ExclusionZone::new(-2, 3));
        for d in -2..=2 {
            assert!(z.contains(d));
        }
        assert!(!z.contains(-3));
        assert!(!z.contains(3));
    }

    #[test]
    fn test_cross_join_is_empty() {
        for transpose in [false, true] {
            let z = ExclusionZone::for_pass(JoinKind::Cross, transpose, 5, 10, 40);
            assert!(z.is_empty());
            assert_eq!(z.width(), 0);
            assert!(!z.contains(0));
        }
    }

    #[test]
    fn test_orientation_preserves_width() {
        for (row, col) in [(0, 0), (0, 16), (16, 0), (32, 64)] {
            let a = ExclusionZone::for_pass(JoinKind::SelfJoin, false, 3, row, col);
            let b = ExclusionZone::for_pass(JoinKind::SelfJoin, true, 3, row, col);
            assert_eq!(a.width(), b.width());
            assert_eq!(a.width(), 7);
        }
    }

    #[test]
    fn test_transpose_mirrors_offsets() {
        let z = ExclusionZone::new(-1, 4);
        let t = z.transposed();
        for d in -10..10 {
            assert_eq!(z.contains(d), t.contains(-d), "offset {d}");
        }
        assert_eq!(t.transposed(), z);
    }

    #[test]
    fn test_shift_for_off_diagonal_tile() {
        // Tile rows start at 0, columns at 10: global d = local d + 10
        let z = ExclusionZone::for_pass(JoinKind::SelfJoin, false, 2, 0, 10);
        assert!(z.contains(-10));
        assert!(z.contains(-8));
        assert!(!z.contains(-7));
        assert!(!z.contains(0));
    }

    #[test]
    fn test_clamped() {
        let z = ExclusionZone::for_pass(JoinKind::SelfJoin, false, 2, 0, 10);
        // A 5x5 tile spans offsets -4..=4, all of which are far from the band
        assert!(z.clamped(5, 5).is_empty());
        // A 9x5 tile reaches offset -8
        assert_eq!(z.clamped(9, 5), ExclusionZone::new(-8, -7));
    }
}
