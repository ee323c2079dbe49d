use std::ops::Index;

/// Row-major matrix of classified cells, one `bool` per bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: usize,
    cols: usize,
    bits: Vec<bool>,
}

impl BitMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, bits: vec![false; rows * cols] }
    }

    pub fn ones(rows: usize, cols: usize) -> Self {
        Self { rows, cols, bits: vec![true; rows * cols] }
    }

    /// Builds a matrix from row-major bits. Returns `None` if the length
    /// does not match `rows * cols`.
    pub fn from_bits(rows: usize, cols: usize, bits: Vec<bool>) -> Option<Self> {
        (bits.len() == rows * cols).then_some(Self { rows, cols, bits })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        (row < self.rows && col < self.cols).then(|| self.bits[row * self.cols + col])
    }

    /// Sets a cell. Panics when the cell is outside the matrix, like slice indexing.
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) out of range");
        self.bits[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[bool] {
        &self.bits[row * self.cols..(row + 1) * self.cols]
    }

    /// All cells, row-major.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub(crate) fn bits_mut(&mut self) -> &mut [bool] {
        &mut self.bits
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Cells where `self` and `other` disagree, in row-major order.
    /// Returns `None` when the shapes differ.
    pub fn diff(&self, other: &BitMatrix) -> Option<Vec<(usize, usize)>> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.bits
                .iter()
                .zip(&other.bits)
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, _)| (i / self.cols, i % self.cols))
                .collect(),
        )
    }
}

impl Index<(usize, usize)> for BitMatrix {
    type Output = bool;

    fn index(&self, (row, col): (usize, usize)) -> &bool {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) out of range");
        &self.bits[row * self.cols + col]
    }
}
