// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement for OCR: median denoise, bilateral smoothing, CLAHE,
// Gaussian adaptive thresholding, and morphological closing.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{median_filter, separable_filter_equal};
use imageproc::morphology::close;
use tracing::{debug, info, instrument};

/// Median filter aperture (3x3).
const MEDIAN_RADIUS: u32 = 1;
/// Bilateral filter diameter 9.
const BILATERAL_RADIUS: i32 = 4;
const BILATERAL_SIGMA_COLOR: f32 = 75.0;
const BILATERAL_SIGMA_SPACE: f32 = 75.0;
const CLAHE_CLIP_LIMIT: f32 = 2.0;
const CLAHE_TILES: u32 = 8;
/// Adaptive threshold neighbourhood (11x11) and offset.
const THRESHOLD_BLOCK: usize = 11;
const THRESHOLD_OFFSET: i32 = 2;
/// Closing with a 1x1 structuring element.
const CLOSING_RADIUS: u8 = 0;

/// Enhances photographed or scanned text for character recognition.
///
/// Works on a grayscale copy of the input. Every step consumes `self` and
/// returns the enhanced image, so the pipeline reads top to bottom.
pub struct ScanEnhancer {
    /// The working image, always 8-bit grayscale.
    image: GrayImage,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    /// Wrap a decoded image, converting it to grayscale.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.to_luma8(),
        }
    }

    pub fn from_gray(image: GrayImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image)
    }

    // -- Pipeline -------------------------------------------------------------

    /// Run the full OCR enhancement pipeline:
    ///
    /// 1. Median blur (3x3) to remove salt-and-pepper noise
    /// 2. Bilateral filter (d=9, sigma 75/75) to smooth while keeping edges
    /// 3. CLAHE (clip 2.0, 8x8 tiles) for local contrast
    /// 4. Gaussian adaptive threshold (11x11, C=2) to binarize
    /// 5. Morphological closing (1x1) to clean speckling
    #[instrument(skip(self), fields(width = self.image.width(), height = self.image.height()))]
    pub fn enhance_for_ocr(self) -> Self {
        info!("Running full OCR enhancement pipeline");
        self.denoise()
            .bilateral()
            .equalize_local(CLAHE_CLIP_LIMIT, CLAHE_TILES)
            .adaptive_threshold()
            .close_gaps()
    }

    /// Median blur with a 3x3 aperture.
    pub fn denoise(self) -> Self {
        debug!("Median denoise");
        Self {
            image: median_filter(&self.image, MEDIAN_RADIUS, MEDIAN_RADIUS),
        }
    }

    /// Edge-preserving bilateral smoothing over a circular window.
    pub fn bilateral(self) -> Self {
        debug!("Bilateral filter");
        Self {
            image: bilateral_filter(
                &self.image,
                BILATERAL_RADIUS,
                BILATERAL_SIGMA_COLOR,
                BILATERAL_SIGMA_SPACE,
            ),
        }
    }

    /// Contrast-limited adaptive histogram equalization.
    pub fn equalize_local(self, clip_limit: f32, tiles: u32) -> Self {
        debug!(clip_limit, tiles, "CLAHE");
        Self {
            image: clahe(&self.image, clip_limit, tiles),
        }
    }

    /// Binarize against a Gaussian-weighted local mean.
    ///
    /// A pixel becomes white when it is brighter than `local_mean - C`.
    pub fn adaptive_threshold(self) -> Self {
        debug!(block = THRESHOLD_BLOCK, c = THRESHOLD_OFFSET, "Adaptive threshold");
        let kernel = gaussian_kernel(THRESHOLD_BLOCK);
        let local_mean: GrayImage = separable_filter_equal(&self.image, &kernel);

        let binary = GrayImage::from_fn(self.image.width(), self.image.height(), |x, y| {
            let value = self.image.get_pixel(x, y).0[0] as i32;
            let threshold = local_mean.get_pixel(x, y).0[0] as i32 - THRESHOLD_OFFSET;
            Luma([if value > threshold { 255 } else { 0 }])
        });
        Self { image: binary }
    }

    /// Morphological closing (dilate then erode).
    pub fn close_gaps(self) -> Self {
        debug!("Morphological closing");
        Self {
            image: close(&self.image, Norm::LInf, CLOSING_RADIUS),
        }
    }
}

// -- Filters ------------------------------------------------------------------

/// Normalised 1-D Gaussian kernel of odd length `size`.
///
/// Sigma follows the OpenCV rule for a given aperture:
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Bilateral filter for grayscale images.
///
/// Each output pixel is the average of its circular neighbourhood weighted by
/// both spatial distance and intensity difference. Borders are replicated.
fn bilateral_filter(image: &GrayImage, radius: i32, sigma_color: f32, sigma_space: f32) -> GrayImage {
    let (width, height) = image.dimensions();

    // Spatial weights for every offset inside the circular window.
    let mut offsets: Vec<(i32, i32, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let dist2 = (dx * dx + dy * dy) as f32;
            if dist2 > (radius * radius) as f32 {
                continue;
            }
            offsets.push((dx, dy, (-dist2 / (2.0 * sigma_space * sigma_space)).exp()));
        }
    }

    // Range weights for every possible intensity difference.
    let color_weights: Vec<f32> = (0..256)
        .map(|d| {
            let d = d as f32;
            (-(d * d) / (2.0 * sigma_color * sigma_color)).exp()
        })
        .collect();

    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;

    GrayImage::from_fn(width, height, |x, y| {
        let center = image.get_pixel(x, y).0[0];
        let mut weighted_sum = 0.0f32;
        let mut weight_total = 0.0f32;

        for &(dx, dy, spatial) in &offsets {
            let nx = (x as i32 + dx).clamp(0, max_x) as u32;
            let ny = (y as i32 + dy).clamp(0, max_y) as u32;
            let neighbour = image.get_pixel(nx, ny).0[0];
            let weight = spatial * color_weights[center.abs_diff(neighbour) as usize];
            weighted_sum += weight * neighbour as f32;
            weight_total += weight;
        }

        Luma([(weighted_sum / weight_total).round().clamp(0.0, 255.0) as u8])
    })
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into a `tiles x tiles` grid. Each tile gets its own
/// clipped, equalised lookup table, and every pixel is mapped through a
/// bilinear blend of the four nearest tile tables.
fn clahe(image: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    // Ceil-sized tiles can leave trailing grid cells empty on small images,
    // so the grid is recounted from the tile size.
    let tile_w = width.div_ceil(tiles.clamp(1, width));
    let tile_h = height.div_ceil(tiles.clamp(1, height));
    let grid_x = width.div_ceil(tile_w);
    let grid_y = height.div_ceil(tile_h);

    // One lookup table per tile.
    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((grid_x * grid_y) as usize);
    for ty in 0..grid_y {
        for tx in 0..grid_x {
            let x0 = (tx * tile_w).min(width);
            let y0 = (ty * tile_h).min(height);
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(image, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * grid_x + tx) as usize];

    GrayImage::from_fn(width, height, |x, y| {
        let value = image.get_pixel(x, y).0[0] as usize;

        // Position in tile-centre coordinates.
        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = fx.floor().clamp(0.0, (grid_x - 1) as f32) as u32;
        let ty0 = fy.floor().clamp(0.0, (grid_y - 1) as f32) as u32;
        let tx1 = (tx0 + 1).min(grid_x - 1);
        let ty1 = (ty0 + 1).min(grid_y - 1);
        let wx = (fx - tx0 as f32).clamp(0.0, 1.0);
        let wy = (fy - ty0 as f32).clamp(0.0, 1.0);

        let top = lut_at(tx0, ty0)[value] as f32 * (1.0 - wx) + lut_at(tx1, ty0)[value] as f32 * wx;
        let bottom =
            lut_at(tx0, ty1)[value] as f32 * (1.0 - wx) + lut_at(tx1, ty1)[value] as f32 * wx;
        let mapped = top * (1.0 - wy) + bottom * wy;

        Luma([mapped.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clipped histogram-equalisation table for one tile.
fn tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = x1.saturating_sub(x0) * y1.saturating_sub(y0);
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, entry) in lut.iter_mut().enumerate() {
            *entry = i as u8;
        }
        return lut;
    }

    // Clip and redistribute the excess evenly, remainder to the lowest bins.
    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for (i, bin) in histogram.iter_mut().enumerate() {
        *bin += share + u32::from(i < remainder);
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (i, bin) in histogram.iter().enumerate() {
        cumulative += bin;
        lut[i] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

// -- Tests --------------------------------------------------------------------
