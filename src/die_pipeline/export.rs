//! Merging reads of two photographs and the textual dump.

use std::path::Path;

use tracing::{debug, info};

use crate::die_pipeline::common::BitMatrix;
use crate::die_pipeline::common::error::{ReadError, Result};

/// Rows of the first FX-2500 word groups taken from the second photograph.
pub const FX2500_SPLIT_ROW: usize = 16;

/// Takes rows `[0, split_row)` from `top` and `[split_row, rows)` from
/// `bottom`. Both matrices must have the same shape.
pub fn merge(top: &BitMatrix, bottom: &BitMatrix, split_row: usize) -> Result<BitMatrix> {
    if top.shape() != bottom.shape() {
        return Err(ReadError::DimensionMismatch { left: top.shape(), right: bottom.shape() });
    }
    let (rows, cols) = top.shape();
    if split_row > rows {
        return Err(ReadError::InvalidSplit { split_row, rows });
    }

    let mut merged = Vec::with_capacity(rows * cols);
    for row in 0..rows {
        let source = if row < split_row { top } else { bottom };
        merged.extend_from_slice(source.row(row));
    }
    debug!(split_row, "Merged two reads");
    BitMatrix::from_bits(rows, cols, merged)
        .ok_or(ReadError::DimensionMismatch { left: (rows, cols), right: (rows, cols) })
}

/// Which rows of the lattice carry instruction words.
///
/// Each group of `group_rows` lattice rows stores one word group, of which
/// the first `word_rows` rows are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpLayout {
    pub group_rows: usize,
    pub word_rows: usize,
}

impl Default for DumpLayout {
    fn default() -> Self {
        Self { group_rows: 5, word_rows: 4 }
    }
}

impl DumpLayout {
    /// Lattice rows exported, in output order.
    pub fn exported_rows(&self, rows: usize) -> Vec<usize> {
        let groups = rows / self.group_rows.max(1);
        (0..groups)
            .flat_map(|g| (0..self.word_rows.min(self.group_rows)).map(move |j| g * self.group_rows + j))
            .collect()
    }
}

/// Renders the exported rows as lines of `0`/`1`, joined by newlines with
/// no trailing newline. 80 lattice rows give 64 lines.
pub fn dump(bits: &BitMatrix, layout: DumpLayout) -> String {
    layout
        .exported_rows(bits.rows())
        .into_iter()
        .map(|row| bits.row(row).iter().map(|&b| if b { '1' } else { '0' }).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_dump<P: AsRef<Path>>(bits: &BitMatrix, layout: DumpLayout, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut text = dump(bits, layout);
    text.push('\n');
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Wrote ROM dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_pipeline::geometry::{NCOLS, NROWS};

    #[test]
    fn test_merge_takes_rows_from_each_side() {
        let a = BitMatrix::zeros(NROWS, NCOLS);
        let b = BitMatrix::ones(NROWS, NCOLS);
        let merged = merge(&a, &b, NROWS / 2).unwrap();
        for row in 0..NROWS {
            let expected = row >= NROWS / 2;
            assert!(merged.row(row).iter().all(|&bit| bit == expected), "row {row}");
        }
    }

    #[test]
    fn test_merge_edges() {
        let a = BitMatrix::zeros(4, 3);
        let b = BitMatrix::ones(4, 3);
        assert_eq!(merge(&a, &b, 0).unwrap(), b);
        assert_eq!(merge(&a, &b, 4).unwrap(), a);
        assert!(matches!(merge(&a, &b, 5), Err(ReadError::InvalidSplit { split_row: 5, rows: 4 })));
    }

    #[test]
    fn test_merge_rejects_mismatched_shapes() {
        let err = merge(&BitMatrix::zeros(4, 3), &BitMatrix::zeros(3, 4), 1).unwrap_err();
        assert!(matches!(err, ReadError::DimensionMismatch { left: (4, 3), right: (3, 4) }));
    }

    #[test]
    fn test_dump_skips_fifth_row_of_each_group() {
        let mut bits = BitMatrix::zeros(NROWS, NCOLS);
        for g in 0..16 {
            for c in 0..NCOLS {
                bits.set(g * 5 + 4, c, true);
            }
        }
        bits.set(5, 0, true);
        let text = dump(&bits, DumpLayout::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 64);
        assert!(lines.iter().all(|l| l.len() == NCOLS));
        // Row 5 is the first row of group 1, exported as line 4.
        assert!(lines[4].starts_with("10"));
        assert_eq!(text.matches('1').count(), 1);
    }

    #[test]
    fn test_write_dump() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rom.txt");
        write_dump(&BitMatrix::ones(10, 3), DumpLayout::default(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "111\n111\n111\n111\n111\n111\n111\n111\n");
    }
}
