//! Image helpers used by the document composer.
//!
//! Reading an image's pixel size is modelled by [`DimensionProbe`] so layout
//! decisions do not depend on the PDF backend. The remaining helpers decode
//! images into a form `genpdf` accepts and convert pixel sizes into
//! millimetres.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use genpdf::error::{Context as _, Error};
use genpdf::Mm;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb as Pixel};
use thiserror::Error;

use crate::config::AssetSource;
use crate::style::Rgb;

/// Resolution assumed for raster images without physical size information.
pub const IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

/// Size in millimetres a `pixels` long edge takes at [`IMAGE_DPI`].
pub fn native_mm(pixels: u32) -> f64 {
    MM_PER_INCH * f64::from(pixels) / IMAGE_DPI
}

/// Height of an image of `pixel_width` x `pixel_height` embedded at
/// `target_width` while keeping its aspect ratio.
pub fn embedded_height(pixel_width: u32, pixel_height: u32, target_width: f64) -> f64 {
    if pixel_width == 0 {
        return 0.0;
    }
    target_width * f64::from(pixel_height) / f64::from(pixel_width)
}

/// Failure to read an image's pixel size.
#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("cannot read image header of {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {} has no area ({width}x{height})", path.display())]
    Empty {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// Reads the pixel size of an image file.
pub trait DimensionProbe {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), DimensionError>;
}

/// Reads dimensions from the image header without decoding the pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageHeaderProbe;

impl DimensionProbe for ImageHeaderProbe {
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), DimensionError> {
        let (width, height) =
            image::image_dimensions(path).map_err(|source| DimensionError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        if width == 0 || height == 0 {
            return Err(DimensionError::Empty {
                path: path.to_path_buf(),
                width,
                height,
            });
        }
        Ok((width, height))
    }
}

/// Loads an image from in-memory bytes.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<DynamicImage, Error> {
    image::load_from_memory(bytes.as_ref()).context("Failed to decode image from provided bytes")
}

/// Loads an image from `path`, guessing the format from its content.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Decodes an asset and drops any alpha channel, which `genpdf` cannot embed.
pub fn load_asset(source: &AssetSource) -> Result<DynamicImage, Error> {
    let image = match source {
        AssetSource::Path(path) => decode_image_from_path(path)?,
        AssetSource::Bytes(bytes) => decode_image_from_bytes(bytes)?,
    };
    Ok(flatten(image))
}

pub(crate) fn flatten(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Native size of `image` in millimetres at [`IMAGE_DPI`].
pub fn native_size_mm(image: &DynamicImage) -> (f64, f64) {
    let (width, height) = image.dimensions();
    (native_mm(width), native_mm(height))
}

/// Diagonal two-color gradient used when no cover artwork is configured.
pub fn cover_gradient(width: u32, height: u32, start: Rgb, end: Rgb) -> DynamicImage {
    let width_f = width.saturating_sub(1) as f32;
    let height_f = height.saturating_sub(1) as f32;
    let (start, end) = (start.channels(), end.channels());
    let buffer = ImageBuffer::from_fn(width, height, |x, y| {
        let xf = if width_f > 0.0 { x as f32 / width_f } else { 0.0 };
        let yf = if height_f > 0.0 { y as f32 / height_f } else { 0.0 };
        let mix = (0.35 * xf + 0.65 * yf).clamp(0.0, 1.0);
        let mut channels = [0u8; 3];
        for (index, channel) in channels.iter_mut().enumerate() {
            let from = f32::from(start[index]);
            let to = f32::from(end[index]);
            *channel = (from + (to - from) * mix).round().clamp(0.0, 255.0) as u8;
        }
        Pixel(channels)
    });
    DynamicImage::ImageRgb8(buffer)
}

/// Encodes `image` as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
    Ok(bytes)
}
