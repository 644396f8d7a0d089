//! Image directory source and decoder.

use std::path::{Path, PathBuf};

use framereel_core::{Error, Result};
use framereel_pipeline::{ItemLoader, ItemSource, WorkDescriptor};
use image::RgbImage;

use crate::listing::find_files_with_extensions;

/// The image files of one directory, in sorted path order.
#[derive(Debug, Clone)]
pub struct ImageDirectory {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl ImageDirectory {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ItemSource for ImageDirectory {
    type Payload = PathBuf;

    fn list(&self) -> Result<Vec<WorkDescriptor<PathBuf>>> {
        let files = find_files_with_extensions(&self.dir, &self.extensions)?;
        Ok(WorkDescriptor::enumerate(files))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Decodes an image file into a packed 8-bit RGB frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl ItemLoader<PathBuf> for ImageLoader {
    type Item = RgbImage;

    fn load(&self, descriptor: &WorkDescriptor<PathBuf>) -> Result<RgbImage> {
        let path = &descriptor.payload;
        let decoded = image::open(path)
            .map_err(|e| Error::load(descriptor.index, format!("{}: {e}", path.display())))?;
        let frame = decoded.to_rgb8();
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::load(
                descriptor.index,
                format!("{}: image has no pixels", path.display()),
            ));
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::{GrayImage, Luma};

    #[test]
    fn lists_descriptors_in_path_order() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["002.png", "000.png", "001.jpg"] {
            std::fs::write(tmp.path().join(name), b"").unwrap();
        }
        let source = ImageDirectory::new(tmp.path(), vec![".png".into(), ".jpg".into()]);
        let descriptors = source.list().unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[1].index, 1);
        assert!(descriptors[1].payload.ends_with("001.jpg"));
        assert_eq!(source.describe(), tmp.path().display().to_string());
    }

    #[test]
    fn loads_grayscale_as_rgb() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("g.png");
        GrayImage::from_pixel(4, 3, Luma([200])).save(&path).unwrap();

        let frame = ImageLoader.load(&WorkDescriptor::new(0, path)).unwrap();
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.get_pixel(0, 0).0, [200, 200, 200]);
    }

    #[test]
    fn corrupt_file_is_a_load_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let err = ImageLoader.load(&WorkDescriptor::new(7, path)).unwrap_err();
        assert_matches!(err, Error::Load { index: 7, .. });
        assert!(err.to_string().contains("broken.png"));
    }
}
