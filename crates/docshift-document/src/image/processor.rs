// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, colour-mode normalisation, grayscale, contrast,
// sharpening, and encoding. Operates on in-memory images using the `image`
// crate only, so it is available without the advanced imaging feature.

use std::io::Cursor;
use std::path::Path;

use docshift_core::error::DocshiftError;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma};
use tracing::{debug, info, instrument};

/// 3x3 sharpen kernel (weights sum to 16, normalised here).
const SHARPEN_KERNEL: [f32; 9] = [
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    32.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
    -2.0 / 16.0,
];

/// Image processing pipeline operating on a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping the
/// transformed image, enabling method chaining.
///
/// ```ignore
/// let png = ImageProcessor::open("scan.jpg")?
///     .grayscale()
///     .adjust_contrast(2.0)
///     .sharpen()
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocshiftError> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocshiftError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocshiftError> {
        let img = image::load_from_memory(data)
            .map_err(|err| DocshiftError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Reduce the image to 8-bit RGB or 8-bit grayscale.
    ///
    /// Alpha channels, 16-bit and float buffers are flattened; images without
    /// colour stay grayscale.
    pub fn normalize_color_mode(self) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => self.image,
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(self.image.to_luma8()),
            other => {
                debug!(color = ?other.color(), "Converting to RGB8");
                DynamicImage::ImageRgb8(other.to_rgb8())
            }
        };
        Self { image }
    }

    /// Convert the image to 8-bit grayscale.
    #[instrument(skip(self))]
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Scale contrast by `factor` around the mean intensity of the image.
    ///
    /// 1.0 is a no-op; 2.0 doubles the distance of every pixel from the mean.
    /// The result is grayscale.
    #[instrument(skip(self))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let gray = self.image.to_luma8();
        let mean = mean_intensity(&gray);
        debug!(factor, mean, "Adjusting contrast");

        let contrasted = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let value = gray.get_pixel(x, y).0[0] as f32;
            let adjusted = mean + factor * (value - mean);
            Luma([adjusted.round().clamp(0.0, 255.0) as u8])
        });
        Self {
            image: DynamicImage::ImageLuma8(contrasted),
        }
    }

    /// Apply a 3x3 sharpening filter.
    #[instrument(skip(self))]
    pub fn sharpen(self) -> Self {
        debug!("Sharpening");
        Self {
            image: self.image.filter3x3(&SHARPEN_KERNEL),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, DocshiftError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Write the image as PNG regardless of the path's extension.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), DocshiftError> {
        self.image
            .save_with_format(path.as_ref(), ImageFormat::Png)
            .map_err(|err| {
                DocshiftError::ImageError(format!(
                    "failed to save image to {}: {}",
                    path.as_ref().display(),
                    err
                ))
            })
    }
}

/// Read an encoded image's dimensions from its header without decoding pixels.
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), DocshiftError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|err| DocshiftError::ImageError(err.to_string()))?
        .into_dimensions()
        .map_err(|err| DocshiftError::ImageError(err.to_string()))
}

/// Average luma of a grayscale image, 0.0 for an empty one.
fn mean_intensity(gray: &GrayImage) -> f32 {
    let count = gray.width() as u64 * gray.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    sum as f32 / count as f32
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, DocshiftError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| DocshiftError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
