use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::warn;

/// One candidate neighbor pair for ALL_NEIGHBORS profiles.
///
/// `col` is the position in the profile's own segment, `row` the neighbor's
/// position in the operand it was joined against.
#[derive(Debug, Clone, Copy)]
pub struct Match {
    pub row: u64,
    pub col: u64,
    pub corr: f32,
}

impl Match {
    pub fn new(row: u64, col: u64, corr: f32) -> Self {
        Self { row, col, corr }
    }
}

// Ranked by correlation; coordinates only make the order total.
impl Ord for Match {
    fn cmp(&self, other: &Self) -> Ordering {
        self.corr
            .total_cmp(&other.corr)
            .then_with(|| other.col.cmp(&self.col))
            .then_with(|| other.row.cmp(&self.row))
    }
}

impl PartialOrd for Match {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Match {}

/// Best `capacity` matches for one profile position.
///
/// Stored as a min-heap so the worst retained match is evicted in O(log k).
/// Matches compete under the total [`Match`] order, so the retained set is
/// the same whatever order the matches arrive in.
#[derive(Debug, Clone, Default)]
pub struct MatchHeap {
    heap: BinaryHeap<Reverse<Match>>,
}

impl MatchHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a match; kept if there is room or it outranks the worst retained one.
    #[inline]
    pub fn offer(&mut self, m: Match, capacity: usize) {
        if self.heap.len() < capacity {
            self.heap.push(Reverse(m));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if *worst < m {
                self.heap.pop();
                self.heap.push(Reverse(m));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Matches in ascending rank order: best correlation first.
    pub fn ranked(&self) -> impl Iterator<Item = Match> {
        self.heap
            .clone()
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(m)| m)
    }
}

/// Value of a reduced-matrix cell no match has mapped into.
pub const EMPTY_CELL: f64 = -1.0;

/// Dense down-sampled view of an ALL_NEIGHBORS profile.
///
/// Cells hold the maximum correlation of the matches mapping into them, or
/// [`EMPTY_CELL`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedMatrix {
    pub height: usize,
    pub width: usize,
    cells: Vec<f64>,
}

impl ReducedMatrix {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![EMPTY_CELL; height * width],
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.width + col]
    }

    #[inline]
    fn raise(&mut self, row: usize, col: usize, corr: f64) {
        let cell = &mut self.cells[row * self.width + col];
        if *cell < corr {
            *cell = corr;
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks(self.width.max(1))
    }
}

/// Reduced matrix fed directly with every admitted match.
///
/// A `height x width` match grid (rows are neighbor positions, columns are
/// profile positions) maps onto the output grid in blocks of
/// `ceil(height / output_height) x ceil(width / output_width)`. Coordinates
/// given to [`add`](Self::add) are shifted by the accumulator's offsets
/// first, so a tile can accumulate in global coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixAccumulator {
    height: usize,
    width: usize,
    reduced_rows: usize,
    reduced_cols: usize,
    row_offset: usize,
    col_offset: usize,
    dropped: usize,
    matrix: ReducedMatrix,
}

impl MatrixAccumulator {
    pub fn new(height: usize, width: usize, output_height: usize, output_width: usize) -> Self {
        Self {
            height,
            width,
            reduced_rows: height.div_ceil(output_height.max(1)).max(1),
            reduced_cols: width.div_ceil(output_width.max(1)).max(1),
            row_offset: 0,
            col_offset: 0,
            dropped: 0,
            matrix: ReducedMatrix::new(output_height, output_width),
        }
    }

    /// An empty accumulator with the same geometry whose input coordinates
    /// are shifted by `row_offset` and `col_offset`.
    pub fn at_offset(&self, row_offset: usize, col_offset: usize) -> Self {
        Self {
            height: self.height,
            width: self.width,
            reduced_rows: self.reduced_rows,
            reduced_cols: self.reduced_cols,
            row_offset,
            col_offset,
            dropped: 0,
            matrix: ReducedMatrix::new(self.matrix.height, self.matrix.width),
        }
    }

    /// Raise the cell `(row, col)` maps into. Matches outside the declared
    /// grid, or mapping outside the output grid, are counted and dropped.
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, corr: f32) {
        let row = row + self.row_offset;
        let col = col + self.col_offset;
        let cell_row = row / self.reduced_rows;
        let cell_col = col / self.reduced_cols;
        if row >= self.height
            || col >= self.width
            || cell_row >= self.matrix.height
            || cell_col >= self.matrix.width
        {
            self.dropped += 1;
            return;
        }
        self.matrix.raise(cell_row, cell_col, corr as f64);
    }

    fn same_geometry(&self, other: &MatrixAccumulator) -> bool {
        self.height == other.height
            && self.width == other.width
            && self.matrix.height == other.matrix.height
            && self.matrix.width == other.matrix.width
    }

    /// Cell-wise maximum with an accumulator of the same geometry.
    /// Returns false, leaving `self` untouched, if the geometries differ.
    pub fn merge(&mut self, other: &MatrixAccumulator) -> bool {
        if !self.same_geometry(other) {
            return false;
        }
        for (dst, &src) in self.matrix.cells.iter_mut().zip(&other.matrix.cells) {
            if *dst < src {
                *dst = src;
            }
        }
        true
    }

    /// Number of matches dropped by [`add`](Self::add).
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn matrix(&self) -> &ReducedMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> ReducedMatrix {
        self.matrix
    }
}

/// Per-position bounded neighbor lists, optionally with a reduced matrix
/// accumulated from every admitted match.
#[derive(Debug, Clone)]
pub struct NeighborProfile {
    pub columns: Vec<MatchHeap>,
    pub capacity: usize,
    grid: Option<MatrixAccumulator>,
}

impl NeighborProfile {
    pub fn new(len: usize, capacity: usize) -> Self {
        Self {
            columns: vec![MatchHeap::new(); len],
            capacity,
            grid: None,
        }
    }

    /// Also accumulate matches into an `output_height x output_width`
    /// matrix over a grid of `height` neighbor rows.
    pub fn with_matrix(mut self, height: usize, output_height: usize, output_width: usize) -> Self {
        self.grid = Some(MatrixAccumulator::new(
            height,
            self.columns.len(),
            output_height,
            output_width,
        ));
        self
    }

    /// A fresh profile of `len` positions for a tile placed at `position`
    /// whose neighbors are relative to `neighbor_offset`. The tile feeds a
    /// matrix of the same geometry as this one, in global coordinates.
    pub fn empty_tile(&self, len: usize, position: usize, neighbor_offset: usize) -> Self {
        Self {
            columns: vec![MatchHeap::new(); len],
            capacity: self.capacity,
            grid: self
                .grid
                .as_ref()
                .map(|g| g.at_offset(neighbor_offset, position)),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn matrix(&self) -> Option<&ReducedMatrix> {
        self.grid.as_ref().map(MatrixAccumulator::matrix)
    }

    #[inline(always)]
    pub fn offer(&mut self, col: usize, row: usize, corr: f32) {
        let capacity = self.capacity;
        self.columns[col].offer(Match::new(row as u64, col as u64, corr), capacity);
        if let Some(grid) = &mut self.grid {
            grid.add(row, col, corr);
        }
    }

    /// Merge a tile-local profile placed at `position`, whose match rows are
    /// relative to `neighbor_offset`. Tile matrices are merged cell-wise.
    pub fn merge_tile(&mut self, tile: &NeighborProfile, position: usize, neighbor_offset: usize) {
        let capacity = self.capacity;
        for (local, heap) in tile.columns.iter().enumerate() {
            let col = position + local;
            for m in heap.ranked() {
                let shifted = Match::new(m.row + neighbor_offset as u64, col as u64, m.corr);
                self.columns[col].offer(shifted, capacity);
            }
        }
        if let (Some(grid), Some(part)) = (&mut self.grid, &tile.grid) {
            if part.dropped() > 0 {
                warn!(
                    dropped = part.dropped(),
                    height = part.height,
                    width = part.width,
                    "matches do not fit into the reduced matrix, dropping them"
                );
            }
            grid.merge(part);
        }
    }

    /// Total number of retained matches.
    pub fn match_count(&self) -> usize {
        self.columns.iter().map(MatchHeap::len).sum()
    }

    /// Reduce the retained matches into a dense matrix and keep it for
    /// output, replacing any accumulated one.
    pub fn reduce(&mut self, height: usize, output_height: usize, output_width: usize) {
        let mut grid = MatrixAccumulator::new(height, self.len(), output_height, output_width);
        self.fill(&mut grid);
        self.grid = Some(grid);
    }

    fn fill(&self, grid: &mut MatrixAccumulator) {
        for heap in &self.columns {
            for m in heap.ranked() {
                grid.add(m.row as usize, m.col as usize, m.corr);
            }
        }
        if grid.dropped() > 0 {
            warn!(
                dropped = grid.dropped(),
                height = grid.height,
                width = grid.width,
                "matches do not fit into the reduced matrix, dropping them"
            );
        }
    }
}

/// Down-sample the retained matches of a `height x width` match grid to
/// `output_height x output_width` by keeping the maximum correlation per
/// output cell.
///
/// A match whose coordinates fall outside the declared grid, or whose mapped
/// cell falls outside the output grid, is logged and dropped.
pub fn reduce_all_neighbors(
    profile: &NeighborProfile,
    height: usize,
    width: usize,
    output_height: usize,
    output_width: usize,
) -> ReducedMatrix {
    let mut grid = MatrixAccumulator::new(height, width, output_height, output_width);
    profile.fill(&mut grid);
    grid.into_matrix()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_keeps_best() {
        let mut h = MatchHeap::new();
        for (i, c) in [0.1_f32, 0.9, 0.5, 0.3, 0.7].iter().enumerate() {
            h.offer(Match::new(i as u64, 0, *c), 3);
        }
        assert_eq!(h.len(), 3);
        let corrs: Vec<f32> = h.ranked().map(|m| m.corr).collect();
        assert_eq!(corrs, vec![0.9, 0.7, 0.5]);
    }

    #[test]
    fn test_heap_tie_keeps_lower_coordinates() {
        let mut h = MatchHeap::new();
        h.offer(Match::new(0, 0, 0.5), 1);
        h.offer(Match::new(1, 0, 0.5), 1);
        let kept: Vec<Match> = h.ranked().collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].row, 0);
    }

    #[test]
    fn test_merge_tile_offsets() {
        let mut tile = NeighborProfile::new(2, 4);
        tile.offer(0, 3, 0.8);
        tile.offer(1, 0, 0.6);

        let mut full = NeighborProfile::new(10, 4);
        full.merge_tile(&tile, 5, 100);

        let at5: Vec<Match> = full.columns[5].ranked().collect();
        assert_eq!(at5.len(), 1);
        assert_eq!((at5[0].row, at5[0].col), (103, 5));
        let at6: Vec<Match> = full.columns[6].ranked().collect();
        assert_eq!((at6[0].row, at6[0].col), (100, 6));
        assert_eq!(full.match_count(), 2);
    }

    #[test]
    fn test_reduce_takes_cell_maximum() {
        let mut p = NeighborProfile::new(4, 8);
        p.offer(0, 0, 0.2);
        p.offer(1, 1, 0.9);
        p.offer(3, 3, 0.4);
        let m = reduce_all_neighbors(&p, 4, 4, 2, 2);
        assert!((m.get(0, 0) - 0.9).abs() < 1e-6);
        assert!((m.get(1, 1) - 0.4).abs() < 1e-6);
        assert_eq!(m.get(0, 1), EMPTY_CELL);
        assert_eq!(m.get(1, 0), EMPTY_CELL);
    }

    #[test]
    fn test_reduce_drops_out_of_bounds_row() {
        let height = 5;
        let mut p = NeighborProfile::new(4, 8);
        p.offer(0, height, 0.99);
        p.offer(1, 0, 0.5);
        let m = reduce_all_neighbors(&p, height, 4, 2, 2);
        // Only the in-bounds match lands
        assert!((m.get(0, 0) - 0.5).abs() < 1e-6);
        for row in 0..2 {
            for col in 0..2 {
                assert!(m.get(row, col) < 0.98);
            }
        }
    }

    #[test]
    fn test_reduce_checks_width_against_width() {
        // A wide, short output grid: column cells beyond the output height
        // are still valid
        let mut p = NeighborProfile::new(8, 2);
        p.offer(7, 0, 0.3);
        let m = reduce_all_neighbors(&p, 2, 8, 1, 8);
        assert!((m.get(0, 7) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_heap_independent_of_arrival_order() {
        let matches = [
            Match::new(4, 0, 0.5),
            Match::new(1, 0, 0.5),
            Match::new(9, 0, 0.8),
            Match::new(2, 0, 0.5),
            Match::new(7, 0, 0.1),
        ];
        let mut forward = MatchHeap::new();
        let mut backward = MatchHeap::new();
        for m in matches {
            forward.offer(m, 3);
        }
        for m in matches.iter().rev() {
            backward.offer(*m, 3);
        }
        let rows = |h: &MatchHeap| h.ranked().map(|m| m.row).collect::<Vec<_>>();
        assert_eq!(rows(&forward), vec![9, 1, 2]);
        assert_eq!(rows(&forward), rows(&backward));
    }

    #[test]
    fn test_matrix_sees_matches_beyond_capacity() {
        let mut p = NeighborProfile::new(4, 1).with_matrix(4, 2, 2);
        p.offer(0, 0, 0.9);
        // Rejected by the full column heap, still counted in the matrix
        p.offer(0, 3, 0.7);
        assert_eq!(p.columns[0].len(), 1);
        let m = p.matrix().unwrap();
        assert!((m.get(0, 0) - 0.9).abs() < 1e-6);
        assert!((m.get(1, 0) - 0.7).abs() < 1e-6);
        assert_eq!(m.get(0, 1), EMPTY_CELL);
    }

    #[test]
    fn test_tile_matrix_merges_in_global_coordinates() {
        let mut full = NeighborProfile::new(8, 2).with_matrix(8, 2, 2);
        let mut tile = full.empty_tile(2, 6, 4);
        // Local (row 1, col 1) is global (row 5, col 7)
        tile.offer(1, 1, 0.6);
        // Local row 9 is global row 13, outside the grid
        tile.offer(0, 9, 0.95);
        full.merge_tile(&tile, 6, 4);

        let m = full.matrix().unwrap();
        assert!((m.get(1, 1) - 0.6).abs() < 1e-6);
        assert_eq!(m.get(0, 0), EMPTY_CELL);
        let at7: Vec<Match> = full.columns[7].ranked().collect();
        assert_eq!((at7[0].row, at7[0].col), (5, 7));
    }

    #[test]
    fn test_accumulator_geometry_mismatch() {
        let mut a = MatrixAccumulator::new(8, 8, 2, 2);
        let b = MatrixAccumulator::new(8, 4, 2, 2);
        assert!(!a.merge(&b));
    }
}
