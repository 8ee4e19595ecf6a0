use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};

use crate::error::Result;

/// JPEG quality used for cropped panorama views.
pub const CROP_JPEG_QUALITY: u8 = 95;

/// Save an image as JPEG with the given quality (1-100).
///
/// Creates parent directories as needed and converts to RGB8 before encoding.
pub fn save_jpeg(img: &DynamicImage, path: impl AsRef<Path>, quality: u8) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);

    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    encoder.encode(rgb_img.as_raw(), width, height, ExtendedColorType::Rgb8)?;

    Ok(())
}
