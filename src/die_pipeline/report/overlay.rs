use crate::die_pipeline::classify::RankedCell;
use crate::die_pipeline::common::BitMatrix;
use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::geometry::{CalibrationDescriptor, Point, cell_to_pixel};
use crate::die_pipeline::photo::{Photograph, RgbImageData};
use crate::die_pipeline::report::types::Rgb8Image;

const MARK_RADIUS: i64 = 2;

/// Pixel positions of every cell holding `value`.
pub fn cell_positions(descriptor: &CalibrationDescriptor, bits: &BitMatrix, value: bool) -> Result<Vec<Point>> {
    let mut points = Vec::new();
    for row in 0..bits.rows() {
        for (col, &bit) in bits.row(row).iter().enumerate() {
            if bit == value {
                points.push(cell_to_pixel(descriptor, row, col)?);
            }
        }
    }
    Ok(points)
}

pub fn outlier_positions(descriptor: &CalibrationDescriptor, cells: &[RankedCell]) -> Result<Vec<Point>> {
    cells.iter().map(|c| cell_to_pixel(descriptor, c.row, c.col)).collect()
}

fn to_rgb8(rgb: &RgbImageData) -> Rgb8Image {
    let shift = rgb.bits_per_sample.saturating_sub(8);
    Rgb8Image {
        width: rgb.width,
        height: rgb.height,
        data: rgb.data.iter().map(|&v| (v >> shift).min(255) as u8).collect(),
    }
}

/// The photograph at 8 bits with a small square drawn on each point.
pub fn render_overlay(photo: &Photograph, points: &[Point], color: [u8; 3]) -> Rgb8Image {
    let mut image = to_rgb8(photo.rgb());
    for p in points {
        let (cx, cy) = (p.x.round() as i64, p.y.round() as i64);
        for dy in -MARK_RADIUS..=MARK_RADIUS {
            for dx in -MARK_RADIUS..=MARK_RADIUS {
                image.put(cx + dx, cy + dy, color);
            }
        }
    }
    image
}

/// Raw RGB window of `2 * half` pixels around a cell, for comparing the same
/// cell across photographs. The window is clipped to the photograph.
pub fn cell_crop(photo: &Photograph, row: usize, col: usize, half: usize) -> Result<RgbImageData> {
    let p = cell_to_pixel(photo.descriptor(), row, col)?;
    let rgb = photo.rgb();
    let (cx, cy) = (p.x as usize, p.y as usize);
    let x0 = cx.saturating_sub(half);
    let y0 = cy.saturating_sub(half);
    let x1 = (cx + half).min(rgb.width);
    let y1 = (cy + half).min(rgb.height);
    if x0 >= x1 || y0 >= y1 {
        return Err(ReadError::calibration(row, col, "crop window is empty"));
    }

    let mut data = Vec::with_capacity((x1 - x0) * (y1 - y0) * 3);
    for y in y0..y1 {
        let start = (y * rgb.width + x0) * 3;
        data.extend_from_slice(&rgb.data[start..start + (x1 - x0) * 3]);
    }
    Ok(RgbImageData { width: x1 - x0, height: y1 - y0, data, bits_per_sample: rgb.bits_per_sample })
}
