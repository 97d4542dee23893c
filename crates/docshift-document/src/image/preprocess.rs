// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR preprocessing: two interchangeable pipelines behind one trait.
//
// The implementation is chosen once, when the pipeline is built, from what
// this binary was compiled with and what the configuration asks for. It is
// never switched per request.

use std::sync::Arc;

use docshift_core::config::PreprocessingMode;
use docshift_core::error::Result;
use image::DynamicImage;
use tracing::info;

use super::processor::ImageProcessor;

/// Turns a decoded source image into an OCR-friendly image.
pub trait Preprocessor: Send + Sync {
    /// Short name for logs ("full", "reduced").
    fn name(&self) -> &'static str;

    /// Produce the OCR-optimised version of `image`.
    fn preprocess(&self, image: &DynamicImage) -> Result<DynamicImage>;
}

/// Fallback pipeline: grayscale, 2x contrast, sharpen. No binarization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReducedPreprocessor;

impl Preprocessor for ReducedPreprocessor {
    fn name(&self) -> &'static str {
        "reduced"
    }

    fn preprocess(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let processed = ImageProcessor::from_dynamic(image.clone())
            .grayscale()
            .adjust_contrast(2.0)
            .sharpen();
        Ok(processed.into_dynamic())
    }
}

/// Full pipeline: denoise, edge-preserving smoothing, CLAHE, Gaussian
/// adaptive threshold, morphological closing.
#[cfg(feature = "advanced-imaging")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPreprocessor;

#[cfg(feature = "advanced-imaging")]
impl Preprocessor for FullPreprocessor {
    fn name(&self) -> &'static str {
        "full"
    }

    fn preprocess(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let enhanced = crate::scan::enhance::ScanEnhancer::from_dynamic(image.clone())
            .enhance_for_ocr();
        Ok(enhanced.into_dynamic())
    }
}

/// Whether the full pipeline was compiled into this binary.
pub const fn full_pipeline_available() -> bool {
    cfg!(feature = "advanced-imaging")
}

/// Pick the preprocessing pipeline for the lifetime of the process.
///
/// `Full` without the `advanced-imaging` feature is a configuration error,
/// so a misconfigured deployment fails at startup rather than per request.
pub fn select_preprocessor(mode: PreprocessingMode) -> Result<Arc<dyn Preprocessor>> {
    let selected: Arc<dyn Preprocessor> = match mode {
        PreprocessingMode::Reduced => Arc::new(ReducedPreprocessor),
        PreprocessingMode::Auto | PreprocessingMode::Full => full_or(mode)?,
    };
    info!(pipeline = selected.name(), ?mode, "OCR preprocessing selected");
    Ok(selected)
}

#[cfg(feature = "advanced-imaging")]
fn full_or(_mode: PreprocessingMode) -> Result<Arc<dyn Preprocessor>> {
    Ok(Arc::new(FullPreprocessor))
}

#[cfg(not(feature = "advanced-imaging"))]
fn full_or(mode: PreprocessingMode) -> Result<Arc<dyn Preprocessor>> {
    match mode {
        PreprocessingMode::Full => Err(docshift_core::error::DocshiftError::Config(
            "full preprocessing requested but the advanced-imaging feature is not compiled in"
                .into(),
        )),
        _ => Ok(Arc::new(ReducedPreprocessor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn text_like_image() -> DynamicImage {
        // Light page with a dark bar, enough structure for every filter.
        let mut img = RgbImage::from_pixel(120, 80, Rgb([235, 235, 230]));
        for y in 30..40 {
            for x in 10..110 {
                img.put_pixel(x, y, Rgb([20, 20, 25]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn reduced_pipeline_outputs_grayscale_of_same_size() {
        let out = ReducedPreprocessor.preprocess(&text_like_image()).unwrap();
        assert_eq!((out.width(), out.height()), (120, 80));
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn reduced_pipeline_increases_contrast() {
        let out = ReducedPreprocessor
            .preprocess(&text_like_image())
            .unwrap()
            .to_luma8();
        let bar = out.get_pixel(60, 35).0[0];
        let page = out.get_pixel(60, 5).0[0];
        assert!(bar < 20, "bar should darken, got {bar}");
        assert!(page > 235, "page should brighten, got {page}");
    }

    #[test]
    fn reduced_mode_selects_reduced() {
        let selected = select_preprocessor(PreprocessingMode::Reduced).unwrap();
        assert_eq!(selected.name(), "reduced");
    }

    #[cfg(feature = "advanced-imaging")]
    #[test]
    fn auto_mode_prefers_full_when_compiled_in() {
        let selected = select_preprocessor(PreprocessingMode::Auto).unwrap();
        assert_eq!(selected.name(), "full");
    }

    #[cfg(feature = "advanced-imaging")]
    #[test]
    fn full_pipeline_outputs_binary_image() {
        let out = FullPreprocessor
            .preprocess(&text_like_image())
            .unwrap()
            .to_luma8();
        assert_eq!(out.dimensions(), (120, 80));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[cfg(not(feature = "advanced-imaging"))]
    #[test]
    fn full_mode_without_feature_is_a_config_error() {
        assert!(matches!(
            select_preprocessor(PreprocessingMode::Full),
            Err(docshift_core::error::DocshiftError::Config(_))
        ));
    }

    #[test]
    fn both_pipelines_accept_grayscale_input() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([128])));
        let selected = select_preprocessor(PreprocessingMode::Auto).unwrap();
        assert!(selected.preprocess(&gray).is_ok());
        assert!(ReducedPreprocessor.preprocess(&gray).is_ok());
    }
}
