//! Calibration descriptor types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::geometry::lattice::Lattice;

/// A photograph coordinate in pixels. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at fraction `t` of the way from `self` to `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Hand-measured calibration of one photograph.
///
/// `row_corners[0]` holds the left and right ends of the first lattice row,
/// `row_corners[1]` those of the last row. `col_corners[0]` holds the top
/// ends of the first and last columns, `col_corners[1]` their bottom ends.
/// Row and column lines are measured separately because the cell centres
/// of a row and of a column do not sit on a common orthogonal grid once the
/// photograph is skewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDescriptor {
    #[serde(default)]
    pub name: String,
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub row_corners: [[Point; 2]; 2],
    pub col_corners: [[Point; 2]; 2],
    #[serde(default)]
    pub lattice: Lattice,
}

impl CalibrationDescriptor {
    /// Reads a JSON descriptor. A relative photograph path is resolved
    /// against the descriptor's own directory.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ReadError::load(path, e))?;
        let mut descriptor: CalibrationDescriptor = serde_json::from_str(&text).map_err(|e| {
            ReadError::ParseError { line: e.line(), reason: format!("{}: {}", path.display(), e) }
        })?;
        if descriptor.path.is_relative() {
            if let Some(dir) = path.parent() {
                descriptor.path = dir.join(&descriptor.path);
            }
        }
        if descriptor.name.is_empty() {
            descriptor.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(descriptor)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReadError::ParseError { line: 0, reason: e.to_string() })
    }

    /// Patch radius scaled to the photograph: 5 px per 4096 px of width.
    pub fn default_radius(&self) -> usize {
        (self.width * 5 / 4096).max(1)
    }

    /// Axis-aligned calibration placing cell `(r, c)` at
    /// `origin + (c * pitch.0, r * pitch.1)`.
    pub fn synthetic(
        path: impl Into<PathBuf>,
        width: usize,
        height: usize,
        (rows, cols): (usize, usize),
        origin: (f64, f64),
        pitch: (f64, f64),
    ) -> Self {
        let left = origin.0;
        let top = origin.1;
        let right = left + cols.saturating_sub(1) as f64 * pitch.0;
        let bottom = top + rows.saturating_sub(1) as f64 * pitch.1;
        let tl = Point::new(left, top);
        let tr = Point::new(right, top);
        let bl = Point::new(left, bottom);
        let br = Point::new(right, bottom);
        Self {
            name: "synthetic".to_string(),
            path: path.into(),
            width,
            height,
            row_corners: [[tl, tr], [bl, br]],
            col_corners: [[tl, tr], [bl, br]],
            lattice: Lattice::new(rows, cols),
        }
    }
}
