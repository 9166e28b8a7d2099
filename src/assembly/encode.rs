//! Page image encoding

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};

use super::error::AssemblyResult;
use super::types::ImageFormat;

/// Encode a composed page in the configured format.
///
/// `quality` applies to JPEG only; PNG and WebP are written lossless.
pub fn encode_page(image: &RgbImage, format: ImageFormat, quality: u8) -> AssemblyResult<Vec<u8>> {
    let mut output = Vec::new();
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100));
            image.write_with_encoder(encoder)?;
        }
        ImageFormat::Png => {
            image.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;
        }
        ImageFormat::Webp => {
            image.write_to(&mut Cursor::new(&mut output), image::ImageFormat::WebP)?;
        }
    }
    Ok(output)
}

/// JPEG bytes plus pixel size of a persisted page, for embedding in a PDF.
///
/// JPEG files are passed through untouched; other formats are decoded and
/// re-encoded at `quality`.
pub struct EmbeddableJpeg {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn load_as_jpeg(path: &Path, quality: u8) -> AssemblyResult<EmbeddableJpeg> {
    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg"));

    let decoded: DynamicImage = image::open(path)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let data = if is_jpeg && matches!(decoded, DynamicImage::ImageRgb8(_)) {
        std::fs::read(path).map_err(image::ImageError::IoError)?
    } else {
        encode_page(&rgb, ImageFormat::Jpeg, quality)?
    };

    Ok(EmbeddableJpeg { data, width, height })
}
