use std::path::Path;

use crate::die_pipeline::common::error::{ReadError, Result};
use crate::die_pipeline::photo::image_reader::ImageCrateReader;
use crate::die_pipeline::photo::rawloader_reader::RawLoaderReader;
use crate::die_pipeline::photo::types::RgbImageData;

pub trait PhotoReader {
    fn read_photo(&self, data: &[u8]) -> Result<RgbImageData>;

    /// Decodes the contents of the file at `path`. Readers that pick a
    /// decoder per file override this; the rest ignore the path.
    fn read_file(&self, path: &Path, data: &[u8]) -> Result<RgbImageData> {
        let _ = path;
        self.read_photo(data)
    }
}

const RAW_EXTENSIONS: &[&str] = &["arw", "cr2", "cr3", "nef", "raf", "dng", "orf", "rw2", "pef"];

/// Picks a decoder from the file extension: camera RAW files go through
/// rawloader, everything else through the `image` crate.
pub fn reader_for_path(path: &Path) -> Box<dyn PhotoReader + Send + Sync> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if RAW_EXTENSIONS.contains(&ext.as_str()) {
        Box::new(RawLoaderReader)
    } else {
        Box::new(ImageCrateReader)
    }
}

/// Default reader. Files are decoded by the reader [`reader_for_path`] picks
/// from their extension. Bare bytes try camera RAW decoding first, then the
/// `image` crate; rawloader rejects plain rasters because they carry no
/// camera make, so the order matters for TIFF-wrapped RAW.
pub struct AutoReader;

impl PhotoReader for AutoReader {
    fn read_photo(&self, data: &[u8]) -> Result<RgbImageData> {
        RawLoaderReader.read_photo(data).or_else(|raw_err| {
            ImageCrateReader.read_photo(data).map_err(|err| {
                ReadError::UnsupportedFormat(format!("not a camera RAW ({raw_err}) nor a raster image ({err})"))
            })
        })
    }

    fn read_file(&self, path: &Path, data: &[u8]) -> Result<RgbImageData> {
        reader_for_path(path).read_photo(data)
    }
}

impl<T: PhotoReader + ?Sized> PhotoReader for Box<T> {
    fn read_photo(&self, data: &[u8]) -> Result<RgbImageData> {
        (**self).read_photo(data)
    }

    fn read_file(&self, path: &Path, data: &[u8]) -> Result<RgbImageData> {
        (**self).read_file(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die_pipeline::geometry::CalibrationDescriptor;
    use crate::die_pipeline::photo::Photograph;

    const WIDTH: u32 = 40;
    const HEIGHT: u32 = 30;

    fn checkerboard() -> image::RgbImage {
        image::RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
            if (x / 5 + y / 5) % 2 == 0 { image::Rgb([230, 230, 230]) } else { image::Rgb([20, 20, 20]) }
        })
    }

    fn descriptor(path: &Path) -> CalibrationDescriptor {
        CalibrationDescriptor::synthetic(path, WIDTH as usize, HEIGHT as usize, (2, 3), (5.0, 5.0), (10.0, 10.0))
    }

    #[test]
    fn test_raster_formats_decode() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["png", "tif", "bmp", "jpg"] {
            let path = dir.path().join(format!("die.{ext}"));
            checkerboard().save(&path).unwrap();
            let bytes = std::fs::read(&path).unwrap();

            let sniffed = AutoReader.read_photo(&bytes).unwrap();
            assert_eq!((sniffed.width, sniffed.height), (WIDTH as usize, HEIGHT as usize), "{ext}");
            assert_eq!(sniffed.bits_per_sample, 16, "{ext}");

            let photo = Photograph::load(&descriptor(&path)).unwrap();
            assert_eq!(photo.feature().width(), WIDTH as usize, "{ext}");
            assert_eq!(photo.feature().height(), HEIGHT as usize, "{ext}");
            assert!(photo.feature().data().iter().any(|v| v.abs() > 1.0), "{ext}: flat feature map");
        }
    }

    #[test]
    fn test_files_are_decoded_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("die.arw");
        checkerboard().save_with_format(&path, image::ImageFormat::Png).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        assert!(AutoReader.read_photo(&bytes).is_ok());
        assert!(AutoReader.read_file(&path, &bytes).is_err());
        assert!(matches!(
            Photograph::load(&descriptor(&path)),
            Err(ReadError::LoadError { path: ref p, .. }) if *p == path
        ));
    }

    #[test]
    fn test_undecodable_bytes_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = Photograph::load(&descriptor(&path)).unwrap_err();
        assert!(matches!(err, ReadError::LoadError { path: ref p, .. } if *p == path));
        assert!(err.to_string().contains("x.jpg"));
    }
}
