use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use tracing::{debug, info};

use crate::die_pipeline::common::BitMatrix;
use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::overrides::fx2500::FX2500_OVERRIDES;

/// Cell values forced regardless of classifier output.
///
/// Persisted as text, one `row col bit` entry per line; `#` starts a
/// comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<(usize, usize), bool>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrections for the merged FX-2500 read.
    pub fn fx2500() -> Self {
        FX2500_OVERRIDES
            .iter()
            .map(|&((row, col), bit)| ((row, col), bit == 1))
            .collect()
    }

    /// Adds or replaces an entry, returning the previous value.
    pub fn insert(&mut self, row: usize, col: usize, bit: bool) -> Option<bool> {
        self.entries.insert((row, col), bit)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<bool> {
        self.entries.get(&(row, col)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), bool)> + '_ {
        self.entries.iter().map(|(&cell, &bit)| (cell, bit))
    }

    /// Later entries win over earlier ones.
    pub fn extend_from(&mut self, other: &OverrideTable) {
        self.entries.extend(other.iter());
    }

    /// Forces every listed cell in place and returns how many cells actually
    /// changed. Entries outside the matrix are rejected before anything is
    /// written.
    pub fn apply(&self, bits: &mut BitMatrix) -> Result<usize> {
        let (rows, cols) = bits.shape();
        if let Some((&(row, col), _)) = self.entries.iter().find(|((r, c), _)| *r >= rows || *c >= cols) {
            return Err(ReadError::InvalidCell { row, col, rows, cols });
        }

        let mut changed = 0;
        for (&(row, col), &bit) in &self.entries {
            if bits[(row, col)] != bit {
                debug!(row, col, bit, "Override disagrees with classifier");
                changed += 1;
            }
            bits.set(row, col, bit);
        }
        info!("Fixed {} bits", changed);
        Ok(changed)
    }

    /// Non-mutating form of [`apply`](Self::apply).
    pub fn applied(&self, bits: &BitMatrix) -> Result<(BitMatrix, usize)> {
        let mut out = bits.clone();
        let changed = self.apply(&mut out)?;
        Ok((out, changed))
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut table = Self::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(|c: char| c.is_whitespace() || c == ',').filter(|f| !f.is_empty()).collect();
            let parse_err = |reason: String| ReadError::ParseError { line: i + 1, reason };
            let [row, col, bit] = fields.as_slice() else {
                return Err(parse_err(format!("expected `row col bit`, got {:?}", line)));
            };
            let row = row.parse::<usize>().map_err(|e| parse_err(format!("row: {e}")))?;
            let col = col.parse::<usize>().map_err(|e| parse_err(format!("col: {e}")))?;
            let bit = match *bit {
                "0" => false,
                "1" => true,
                other => return Err(parse_err(format!("bit must be 0 or 1, got {other:?}"))),
            };
            table.insert(row, col, bit);
        }
        Ok(table)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ReadError::load(path, e))?;
        Self::from_text(&text)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for ((row, col), bit) in self.iter() {
            let _ = writeln!(out, "{} {} {}", row, col, u8::from(bit));
        }
        out
    }

    /// Entry lines for `cells`, pre-filled with their current values in
    /// `bits`, ready to be edited into an override file.
    pub fn template(cells: &[(usize, usize)], bits: &BitMatrix) -> String {
        let mut out = String::from("# row col bit\n");
        for &(row, col) in cells {
            match bits.get(row, col) {
                Some(bit) => {
                    let _ = writeln!(out, "{} {} {}", row, col, u8::from(bit));
                }
                None => {
                    let _ = writeln!(out, "# {} {} outside the lattice", row, col);
                }
            }
        }
        out
    }
}

impl FromIterator<((usize, usize), bool)> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = ((usize, usize), bool)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_pipeline::geometry::{NCOLS, NROWS};

    fn checker(rows: usize, cols: usize) -> BitMatrix {
        let bits = (0..rows * cols).map(|i| (i / cols + i % cols) % 2 == 0).collect();
        BitMatrix::from_bits(rows, cols, bits).unwrap()
    }

    #[test]
    fn test_fx2500_table_fits_lattice() {
        let table = OverrideTable::fx2500();
        assert_eq!(table.len(), 66);
        assert_eq!(table.get(5, 293), Some(true));
        assert_eq!(table.get(70, 316), Some(false));
        assert!(table.iter().all(|((r, c), _)| r < NROWS && c < NCOLS));
    }

    #[test]
    fn test_apply_forces_values_and_counts_changes() {
        let mut bits = checker(NROWS, NCOLS);
        let raw = bits.clone();
        let table = OverrideTable::fx2500();
        let expected = table.iter().filter(|&((r, c), b)| raw[(r, c)] != b).count();

        assert_eq!(table.apply(&mut bits).unwrap(), expected);
        for ((r, c), b) in table.iter() {
            assert_eq!(bits[(r, c)], b);
        }
        let untouched = raw.diff(&bits).unwrap();
        assert!(untouched.iter().all(|&(r, c)| table.get(r, c).is_some()));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let table = OverrideTable::fx2500();
        let (once, _) = table.applied(&checker(NROWS, NCOLS)).unwrap();
        let (twice, changed) = table.applied(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_out_of_range_entry_changes_nothing() {
        let mut table = OverrideTable::new();
        table.insert(0, 0, true);
        table.insert(5, 0, true);
        let mut bits = BitMatrix::zeros(4, 4);
        assert!(matches!(table.apply(&mut bits), Err(ReadError::InvalidCell { row: 5, col: 0, .. })));
        assert_eq!(bits, BitMatrix::zeros(4, 4));
    }

    #[test]
    fn test_text_round_trip_and_comments() {
        let text = "# header\n3 4 1\n\n 10, 20, 0  # trailing\n";
        let table = OverrideTable::from_text(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(10, 20), Some(false));
        assert_eq!(OverrideTable::from_text(&table.to_text()).unwrap(), table);
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let err = OverrideTable::from_text("1 2 1\n1 2 3\n").unwrap_err();
        assert!(matches!(err, ReadError::ParseError { line: 2, .. }));
        assert!(OverrideTable::from_text("1 2\n").is_err());
    }

    #[test]
    fn test_template_uses_current_values() {
        let mut bits = BitMatrix::zeros(3, 3);
        bits.set(1, 2, true);
        let text = OverrideTable::template(&[(1, 2), (0, 0)], &bits);
        let table = OverrideTable::from_text(&text).unwrap();
        assert_eq!(table.get(1, 2), Some(true));
        assert_eq!(table.get(0, 0), Some(false));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.txt");
        std::fs::write(&path, OverrideTable::fx2500().to_text()).unwrap();
        assert_eq!(OverrideTable::from_file(&path).unwrap(), OverrideTable::fx2500());
    }
}
