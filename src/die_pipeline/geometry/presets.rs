//! Calibrations of the photographs the ROM was read from.

use crate::die_pipeline::geometry::lattice::Lattice;
use crate::die_pipeline::geometry::types::{CalibrationDescriptor, Point};

fn descriptor(
    name: &str,
    path: &str,
    (width, height): (usize, usize),
    rows: [[(f64, f64); 2]; 2],
    cols: [[(f64, f64); 2]; 2],
) -> CalibrationDescriptor {
    let p = |(x, y): (f64, f64)| Point::new(x, y);
    CalibrationDescriptor {
        name: name.to_string(),
        path: path.into(),
        width,
        height,
        row_corners: [[p(rows[0][0]), p(rows[0][1])], [p(rows[1][0]), p(rows[1][1])]],
        col_corners: [[p(cols[0][0]), p(cols[0][1])], [p(cols[1][0]), p(cols[1][1])]],
        lattice: Lattice::default(),
    }
}

pub fn mk51_rom() -> CalibrationDescriptor {
    descriptor(
        "mk51",
        "img/mk51_rom_die.jpg",
        (4096, 1396),
        [[(510.0, 197.5), (3743.1, 202.0)], [(494.6, 1108.5), (3757.0, 1113.6)]],
        [[(534.7, 190.2), (3712.7, 195.3)], [(533.5, 1128.0), (3712.4, 1120.8)]],
    )
}

pub fn fx2500_rom() -> CalibrationDescriptor {
    descriptor(
        "fx2500",
        "img/fx2500_rom_die.jpeg",
        (4096, 1643),
        [[(635.8, 516.4), (3610.7, 466.0)], [(663.2, 1303.0), (3636.4, 1253.3)]],
        [[(664.3, 510.3), (3583.8, 458.9)], [(677.6, 1320.2), (3597.6, 1260.9)]],
    )
}

/// Second FX-2500 die photograph; sharper in the first word group.
pub fn fx2500_rom_2() -> CalibrationDescriptor {
    descriptor(
        "fx2500-2",
        "img/fx2500_rom_die2.jpeg",
        (4096, 1428),
        [[(539.2, 205.4), (3858.0, 306.8)], [(527.8, 1087.5), (3844.0, 1191.3)]],
        [[(571.2, 200.2), (3828.8, 299.1)], [(543.2, 1109.8), (3801.4, 1197.3)]],
    )
}

pub fn fx2500_scan() -> CalibrationDescriptor {
    descriptor(
        "fx2500-scan",
        "img/fx2500.bmp",
        (6929, 2306),
        [[(869.7, 438.1), (6899.2, 333.2)], [(924.3, 2036.3), (6925.1, 1935.0)]],
        [[(926.9, 423.3), (6846.6, 321.0)], [(955.5, 2071.7), (6874.5, 1946.7)]],
    )
}

pub fn mk51_scan() -> CalibrationDescriptor {
    descriptor(
        "mk51-scan",
        "img/mk51.tif",
        (9409, 3210),
        [[(1250.3, 483.5), (8606.1, 492.1)], [(1215.1, 2556.4), (8638.0, 2567.8)]],
        [[(1306.3, 465.6), (8536.5, 477.1)], [(1303.2, 2600.1), (8537.1, 2583.3)]],
    )
}

pub fn all() -> Vec<CalibrationDescriptor> {
    vec![mk51_rom(), fx2500_rom(), fx2500_rom_2(), fx2500_scan(), mk51_scan()]
}

pub fn by_name(name: &str) -> Option<CalibrationDescriptor> {
    all().into_iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(by_name("FX2500-2").map(|d| d.height), Some(1428));
        assert!(by_name("unknown").is_none());
    }

    #[test]
    fn test_radius_scales_with_width() {
        assert_eq!(mk51_rom().default_radius(), 5);
        assert_eq!(mk51_scan().default_radius(), 11);
    }
}
