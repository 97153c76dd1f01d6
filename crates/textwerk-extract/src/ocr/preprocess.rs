// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR preprocessing strategies.
//
// Each strategy is a fixed sequence of transforms over a grayscale image:
//
//   basic       grayscale, contrast x2.0, median 3x3, sharpen
//   advanced    upscale to 300 dpi, grayscale, orientation, adaptive contrast,
//               Otsu binarization, median 3x3 + gaussian 0.5, sharpen
//   aggressive  upscale to 600 dpi, grayscale, orientation, contrast x3.0,
//               Otsu binarization, open + close 3x3, sharpen, edge enhance

use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::{close, open};
use textwerk_core::error::Result;
use textwerk_core::types::PreprocessStrategy;
use tracing::{debug, instrument};

use crate::image::processor::{ImageProcessor, encode_png};

const ADVANCED_TARGET_DPI: u32 = 300;
const AGGRESSIVE_TARGET_DPI: u32 = 600;
const BASIC_CONTRAST: f32 = 2.0;
const AGGRESSIVE_CONTRAST: f32 = 3.0;
/// Adaptive contrast only kicks in below this intensity standard deviation.
const LOW_CONTRAST_STD_DEV: f32 = 30.0;
const MAX_ADAPTIVE_CONTRAST: f32 = 2.5;

/// Decode `data`, run `strategy`, and return the result as PNG.
#[instrument(skip(data), fields(bytes = data.len(), strategy = strategy.as_str()))]
pub fn preprocess(data: &[u8], strategy: PreprocessStrategy) -> Result<Vec<u8>> {
    let processed = apply(ImageProcessor::from_bytes(data)?, strategy);
    debug!(
        width = processed.width(),
        height = processed.height(),
        "preprocessing done"
    );
    encode_png(&DynamicImage::ImageLuma8(processed))
}

/// Run one strategy over an already-decoded image.
pub fn apply(processor: ImageProcessor, strategy: PreprocessStrategy) -> GrayImage {
    match strategy {
        PreprocessStrategy::Basic => {
            let gray = processor.grayscale().adjust_contrast(BASIC_CONTRAST).to_luma();
            sharpen(&median_filter(&gray, 1, 1))
        }
        PreprocessStrategy::Advanced => {
            let processor = processor
                .upscale_to_dpi(ADVANCED_TARGET_DPI)
                .grayscale()
                .correct_orientation();
            let processor = match adaptive_contrast_factor(processor.intensity_std_dev()) {
                Some(factor) => processor.adjust_contrast(factor),
                None => processor,
            };
            let binary = binarize(&processor.to_luma());
            sharpen(&soft_denoise(&binary))
        }
        PreprocessStrategy::Aggressive => {
            let gray = processor
                .upscale_to_dpi(AGGRESSIVE_TARGET_DPI)
                .grayscale()
                .correct_orientation()
                .adjust_contrast(AGGRESSIVE_CONTRAST)
                .to_luma();
            let binary = binarize(&gray);
            let cleaned = morphological_denoise(&binary).unwrap_or_else(|| soft_denoise(&binary));
            edge_enhance(&sharpen(&cleaned))
        }
    }
}

/// Contrast multiplier for a low-contrast image, `None` when contrast is fine.
pub fn adaptive_contrast_factor(std_dev: f32) -> Option<f32> {
    (std_dev < LOW_CONTRAST_STD_DEV)
        .then(|| (LOW_CONTRAST_STD_DEV / std_dev.max(1.0)).min(MAX_ADAPTIVE_CONTRAST))
}

// -- Binarization -------------------------------------------------------------

/// Otsu binarization, falling back to a median threshold when the histogram
/// has no between-class variance.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let histogram = histogram(gray);
    let threshold = otsu_threshold(&histogram).unwrap_or_else(|| median_threshold(&histogram));
    threshold_image(gray, threshold)
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }
    histogram
}

fn threshold_image(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0];
        Luma([if value <= threshold { 0 } else { 255 }])
    })
}

/// Threshold maximising between-class variance, if any split separates
/// two classes.
pub fn otsu_threshold(histogram: &[u64; 256]) -> Option<u8> {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }
    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0u64;
    let mut max_variance = 0.0;
    let mut best = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0 {
            break;
        }
        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;
        let variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);
        if variance > max_variance {
            max_variance = variance;
            best = Some(t as u8);
        }
    }
    best
}

/// Intensity of the median pixel.
pub fn median_threshold(histogram: &[u64; 256]) -> u8 {
    let total: u64 = histogram.iter().sum();
    let half = total.div_ceil(2);
    let mut seen = 0u64;
    for (value, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen >= half && seen > 0 {
            return value as u8;
        }
    }
    128
}

// -- Denoising ----------------------------------------------------------------

fn soft_denoise(gray: &GrayImage) -> GrayImage {
    gaussian_blur_f32(&median_filter(gray, 1, 1), 0.5)
}

/// Open then close with a 3x3 square. `None` for images too small for the
/// structuring element.
fn morphological_denoise(gray: &GrayImage) -> Option<GrayImage> {
    if gray.width() < 3 || gray.height() < 3 {
        return None;
    }
    Some(close(&open(gray, Norm::LInf, 1), Norm::LInf, 1))
}

// -- Convolution --------------------------------------------------------------

const SHARPEN: ([i32; 9], i32) = ([-2, -2, -2, -2, 32, -2, -2, -2, -2], 16);
const EDGE_ENHANCE: ([i32; 9], i32) = ([-1, -1, -1, -1, 10, -1, -1, -1, -1], 2);

pub fn sharpen(gray: &GrayImage) -> GrayImage {
    convolve3x3(gray, &SHARPEN.0, SHARPEN.1)
}

pub fn edge_enhance(gray: &GrayImage) -> GrayImage {
    convolve3x3(gray, &EDGE_ENHANCE.0, EDGE_ENHANCE.1)
}

/// 3x3 convolution with clamped edges.
fn convolve3x3(gray: &GrayImage, kernel: &[i32; 9], divisor: i32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0i32;
        for (k, weight) in kernel.iter().enumerate() {
            let dx = (k % 3) as i64 - 1;
            let dy = (k / 3) as i64 - 1;
            let sx = (x as i64 + dx).clamp(0, width as i64 - 1) as u32;
            let sy = (y as i64 + dy).clamp(0, height as i64 - 1) as u32;
            acc += weight * i32::from(gray.get_pixel(sx, sy).0[0]);
        }
        Luma([(acc / divisor).clamp(0, 255) as u8])
    })
}
