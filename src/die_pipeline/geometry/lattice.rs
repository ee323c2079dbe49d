use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Rows of the ROM array: 16 word groups of 5 rows.
pub const NROWS: usize = 16 * 5;
/// Columns of the ROM array: 16 groups of 22 columns.
pub const NCOLS: usize = 16 * 22;

/// Logical dimensions of the cell lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    pub rows: usize,
    pub cols: usize,
}

impl Default for Lattice {
    fn default() -> Self {
        Self { rows: NROWS, cols: NCOLS }
    }
}

/// A rectangular block of cells, half-open on both axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl Tile {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows.len() * self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.clone().flat_map(move |r| self.cols.clone().map(move |c| (r, c)))
    }
}

impl Lattice {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let cols = self.cols;
        (0..self.rows).flat_map(move |r| (0..cols).map(move |c| (r, c)))
    }

    /// Splits the lattice into `rows / tile_rows` by `cols / tile_cols`
    /// tiles with evenly spread boundaries, row-major. 80 x 352 with 16 x 16
    /// tiles gives 5 x 22 tiles of exactly 16 x 16.
    pub fn tiles(&self, tile_rows: usize, tile_cols: usize) -> Vec<Tile> {
        let n = (self.rows / tile_rows.max(1)).max(1);
        let m = (self.cols / tile_cols.max(1)).max(1);
        let mut tiles = Vec::with_capacity(n * m);
        for i in 0..n {
            for j in 0..m {
                tiles.push(Tile::new(
                    self.rows * i / n..self.rows * (i + 1) / n,
                    self.cols * j / m..self.cols * (j + 1) / m,
                ));
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiles_cover_lattice() {
        let lattice = Lattice::default();
        let tiles = lattice.tiles(16, 16);
        assert_eq!(tiles.len(), 5 * 22);
        assert!(tiles.iter().all(|t| t.rows.len() == 16 && t.cols.len() == 16));
        assert_eq!(tiles.iter().map(Tile::len).sum::<usize>(), lattice.len());
    }

    #[test]
    fn test_uneven_tiles_cover_lattice() {
        let lattice = Lattice::new(10, 7);
        let tiles = lattice.tiles(4, 3);
        assert_eq!(tiles.len(), 2 * 2);
        assert_eq!(tiles.iter().map(Tile::len).sum::<usize>(), 70);
        assert_eq!(tiles[3], Tile::new(5..10, 3..7));
    }

    #[test]
    fn test_tile_cells_are_row_major() {
        let cells: Vec<_> = Tile::new(1..3, 4..6).cells().collect();
        assert_eq!(cells, vec![(1, 4), (1, 5), (2, 4), (2, 5)]);
    }
}
