use nalgebra::{Matrix2, Vector2};

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::geometry::types::{CalibrationDescriptor, Point};

/// Relative determinant below which two lattice lines count as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

fn fraction(k: usize, n: usize) -> f64 {
    if n <= 1 { 0.0 } else { k as f64 / (n - 1) as f64 }
}

/// Intersection of line `a -> b` with line `c -> d`, or `None` when they are
/// parallel or either is degenerate.
fn intersection(a: Point, b: Point, c: Point, d: Point) -> Option<Point> {
    let m = Matrix2::new(
        b.x - a.x, c.x - d.x,
        b.y - a.y, c.y - d.y,
    );
    let scale = a.distance(b) * c.distance(d);
    if scale == 0.0 || m.determinant().abs() <= PARALLEL_EPSILON * scale {
        return None;
    }
    let t = m.lu().solve(&Vector2::new(c.x - a.x, c.y - a.y))?;
    Some(a.lerp(b, t[0]))
}

/// Position of a cell on the calibrated lattice, without bounds checks.
///
/// The row line runs between the interpolated left and right ends of row
/// `row`; the column line between the interpolated top and bottom ends of
/// column `col`. Their intersection is the cell centre.
pub fn lattice_position(descriptor: &CalibrationDescriptor, row: usize, col: usize) -> Option<Point> {
    let [first_row, last_row] = descriptor.row_corners;
    let [top, bottom] = descriptor.col_corners;
    let tr = fraction(row, descriptor.lattice.rows);
    let tc = fraction(col, descriptor.lattice.cols);

    intersection(
        first_row[0].lerp(last_row[0], tr),
        first_row[1].lerp(last_row[1], tr),
        top[0].lerp(top[1], tc),
        bottom[0].lerp(bottom[1], tc),
    )
}

/// Maps a cell address to its sub-pixel position in the photograph.
///
/// Fails with `InvalidCell` outside the lattice and with `CalibrationError`
/// when the calibration lines are degenerate or the position lands outside
/// the declared photograph bounds.
pub fn cell_to_pixel(descriptor: &CalibrationDescriptor, row: usize, col: usize) -> Result<Point> {
    let lattice = descriptor.lattice;
    if !lattice.contains(row, col) {
        return Err(ReadError::InvalidCell { row, col, rows: lattice.rows, cols: lattice.cols });
    }

    let p = lattice_position(descriptor, row, col)
        .ok_or_else(|| ReadError::calibration(row, col, "calibration lines are parallel or degenerate"))?;

    if !(p.x >= 0.0 && p.y >= 0.0 && p.x < descriptor.width as f64 && p.y < descriptor.height as f64) {
        return Err(ReadError::calibration(
            row,
            col,
            format!(
                "position ({:.1}, {:.1}) is outside the {}x{} photograph",
                p.x, p.y, descriptor.width, descriptor.height
            ),
        ));
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_pipeline::geometry::presets;
    use crate::die_pipeline::geometry::{NCOLS, NROWS};

    const EPS: f64 = 1e-6;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < EPS
    }

    #[test]
    fn test_corners_match_calibration_intersections() {
        for d in presets::all() {
            let [first_row, last_row] = d.row_corners;
            let [top, bottom] = d.col_corners;
            let corners = [
                ((0, 0), intersection(first_row[0], first_row[1], top[0], bottom[0])),
                ((0, NCOLS - 1), intersection(first_row[0], first_row[1], top[1], bottom[1])),
                ((NROWS - 1, 0), intersection(last_row[0], last_row[1], top[0], bottom[0])),
                ((NROWS - 1, NCOLS - 1), intersection(last_row[0], last_row[1], top[1], bottom[1])),
            ];
            for ((r, c), expected) in corners {
                let p = cell_to_pixel(&d, r, c).unwrap();
                assert!(close(p, expected.unwrap()), "{} corner ({r}, {c})", d.name);
            }
        }
    }

    #[test]
    fn test_monotonic_along_rows_and_columns() {
        let d = presets::mk51_rom();
        let mut prev = cell_to_pixel(&d, 0, 100).unwrap();
        for r in 1..NROWS {
            let p = cell_to_pixel(&d, r, 100).unwrap();
            assert!(p.y > prev.y, "row {r}");
            prev = p;
        }
        let mut prev = cell_to_pixel(&d, 40, 0).unwrap();
        for c in 1..NCOLS {
            let p = cell_to_pixel(&d, 40, c).unwrap();
            assert!(p.x > prev.x, "col {c}");
            prev = p;
        }
    }

    #[test]
    fn test_synthetic_identity_mapping() {
        let d = CalibrationDescriptor::synthetic("x.png", 40, 40, (4, 4), (5.0, 5.0), (10.0, 10.0));
        for r in 0..4 {
            for c in 0..4 {
                let p = cell_to_pixel(&d, r, c).unwrap();
                assert!(close(p, Point::new(5.0 + 10.0 * c as f64, 5.0 + 10.0 * r as f64)));
            }
        }
    }

    #[test]
    fn test_degenerate_calibration_reports_cell() {
        let mut d = CalibrationDescriptor::synthetic("x.png", 40, 40, (4, 4), (5.0, 5.0), (10.0, 10.0));
        // Column lines collapsed onto the row direction.
        d.col_corners = d.row_corners;
        d.col_corners[1] = d.col_corners[0];
        let err = cell_to_pixel(&d, 2, 3).unwrap_err();
        assert!(matches!(err, ReadError::CalibrationError { row: 2, col: 3, .. }));
    }

    #[test]
    fn test_out_of_bounds_is_a_calibration_error() {
        let d = CalibrationDescriptor::synthetic("x.png", 20, 20, (4, 4), (5.0, 5.0), (10.0, 10.0));
        assert!(cell_to_pixel(&d, 0, 1).is_ok());
        let err = cell_to_pixel(&d, 0, 2).unwrap_err();
        assert!(matches!(err, ReadError::CalibrationError { row: 0, col: 2, .. }));
    }

    #[test]
    fn test_cell_outside_lattice() {
        let d = presets::mk51_rom();
        assert!(matches!(
            cell_to_pixel(&d, NROWS, 0),
            Err(ReadError::InvalidCell { row: NROWS, col: 0, .. })
        ));
    }
}
