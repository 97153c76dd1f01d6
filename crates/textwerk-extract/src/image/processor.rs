// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — orientation-aware decoding, grayscale, DPI upscaling and
// mean-centred contrast, plus image description and content classification.

use std::collections::HashSet;
use std::io::Cursor;

use image::metadata::Orientation;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageFormat, ImageReader};
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::extraction::{ImageDetails, ImageKind};
use tracing::{debug, instrument};

/// Page height assumed when estimating resolution from pixel dimensions.
const ASSUMED_PAGE_INCHES: f32 = 11.0;
/// Below this many distinct colours a near-square image counts as a diagram.
const DIAGRAM_MAX_COLOURS: usize = 50;

/// Image processing pipeline operating on a single in-memory image.
///
/// Each operation consumes `self` and returns a new processor wrapping the
/// transformed image, so steps chain:
///
/// ```ignore
/// let png = ImageProcessor::from_bytes(&data)?
///     .upscale_to_dpi(300)
///     .grayscale()
///     .correct_orientation()
///     .adjust_contrast(2.0)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
    /// EXIF orientation read at decode time, not yet applied.
    orientation: Orientation,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode encoded bytes (PNG, JPEG, TIFF, ...), remembering the EXIF
    /// orientation for [`correct_orientation`](Self::correct_orientation).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| TextwerkError::ImageError(format!("unreadable image: {}", err)))?;
        let mut decoder = reader
            .into_decoder()
            .map_err(|err| TextwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
        let image = DynamicImage::from_decoder(decoder)
            .map_err(|err| TextwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(
            width = image.width(),
            height = image.height(),
            ?orientation,
            "Image decoded from bytes"
        );
        Ok(Self { image, orientation })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image,
            orientation: Orientation::NoTransforms,
        }
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

    /// Single-channel copy of the current image.
    pub fn to_luma(&self) -> GrayImage {
        self.image.to_luma8()
    }

    /// Resolution estimate assuming the longer side spans an 11-inch page.
    pub fn estimated_dpi(&self) -> f32 {
        self.width().max(self.height()) as f32 / ASSUMED_PAGE_INCHES
    }

    /// Standard deviation of luma intensity.
    pub fn intensity_std_dev(&self) -> f32 {
        let gray = self.to_luma();
        let count = f64::from(gray.width()) * f64::from(gray.height());
        if count == 0.0 {
            return 0.0;
        }
        let mean = gray.pixels().map(|p| f64::from(p.0[0])).sum::<f64>() / count;
        let variance = gray
            .pixels()
            .map(|p| (f64::from(p.0[0]) - mean).powi(2))
            .sum::<f64>()
            / count;
        variance.sqrt() as f32
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Upscale (Lanczos3) so the estimated resolution reaches `target_dpi`.
    /// Images already at or above the target are untouched.
    #[instrument(skip(self), fields(target_dpi))]
    pub fn upscale_to_dpi(self, target_dpi: u32) -> Self {
        let estimated = self.estimated_dpi();
        if estimated <= 0.0 || estimated >= target_dpi as f32 {
            return self;
        }
        let scale = target_dpi as f32 / estimated;
        let width = (self.width() as f32 * scale).round() as u32;
        let height = (self.height() as f32 * scale).round() as u32;
        debug!(estimated, scale, width, height, "Upscaling image");
        let resized = self
            .image
            .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        Self {
            image: resized,
            orientation: self.orientation,
        }
    }

    /// Apply the EXIF orientation recorded at decode time.
    pub fn correct_orientation(mut self) -> Self {
        if self.orientation != Orientation::NoTransforms {
            debug!(orientation = ?self.orientation, "Correcting orientation");
            self.image.apply_orientation(self.orientation);
            self.orientation = Orientation::NoTransforms;
        }
        self
    }

    /// Convert the image to grayscale (luma).
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
            orientation: self.orientation,
        }
    }

    /// Scale contrast by `factor` around the image's mean intensity. Values
    /// above 1.0 increase contrast; 1.0 is a no-op. The result is grayscale.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        let mut gray = self.image.to_luma8();
        let count = (gray.width() as f32 * gray.height() as f32).max(1.0);
        let mean = gray.pixels().map(|p| f32::from(p.0[0])).sum::<f32>() / count;
        for pixel in gray.pixels_mut() {
            let value = factor * (f32::from(pixel.0[0]) - mean) + mean;
            pixel.0[0] = value.clamp(0.0, 255.0) as u8;
        }
        Self {
            image: DynamicImage::ImageLuma8(gray),
            orientation: self.orientation,
        }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

/// Encode a `DynamicImage` as PNG.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|err| TextwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Decode `data` and report its properties and content kind.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn describe(data: &[u8]) -> Result<ImageDetails> {
    let format = image::guess_format(data)
        .ok()
        .and_then(|f| f.extensions_str().first().map(|ext| (*ext).to_owned()));
    let image = image::load_from_memory(data)
        .map_err(|err| TextwerkError::ImageError(format!("failed to decode image: {}", err)))?;
    Ok(ImageDetails {
        width: image.width(),
        height: image.height(),
        format,
        color_type: format!("{:?}", image.color()),
        size_bytes: data.len(),
        kind: classify(&image),
    })
}

/// Very wide or tall images are charts; near-square images with few colours
/// are diagrams; everything else is a plain image.
pub fn classify(image: &DynamicImage) -> ImageKind {
    let (width, height) = (image.width(), image.height());
    let aspect = if height > 0 {
        width as f32 / height as f32
    } else {
        1.0
    };
    if !(0.33..=3.0).contains(&aspect) {
        return ImageKind::Chart;
    }
    if aspect > 0.8 && aspect < 1.2 && distinct_colours(image, DIAGRAM_MAX_COLOURS) < DIAGRAM_MAX_COLOURS {
        return ImageKind::Diagram;
    }
    ImageKind::Image
}

/// Count distinct RGB colours, stopping once `limit` is reached.
fn distinct_colours(image: &DynamicImage, limit: usize) -> usize {
    let mut seen = HashSet::new();
    for pixel in image.to_rgb8().pixels() {
        seen.insert(pixel.0);
        if seen.len() >= limit {
            break;
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn png(image: DynamicImage) -> Vec<u8> {
        encode_png(&image).unwrap()
    }

    #[test]
    fn wide_image_is_a_chart() {
        let data = png(DynamicImage::ImageRgb8(RgbImage::new(400, 100)));
        let details = describe(&data).unwrap();
        assert_eq!(details.kind, ImageKind::Chart);
        assert_eq!((details.width, details.height), (400, 100));
        assert_eq!(details.format.as_deref(), Some("png"));
        assert_eq!(details.color_type, "Rgb8");
        assert_eq!(details.size_bytes, data.len());
    }

    #[test]
    fn flat_square_is_a_diagram_and_noisy_square_an_image() {
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([10, 200, 30])));
        assert_eq!(classify(&flat), ImageKind::Diagram);

        let noisy = RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 0]));
        assert_eq!(classify(&DynamicImage::ImageRgb8(noisy)), ImageKind::Image);
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            describe(b"definitely not an image"),
            Err(TextwerkError::ImageError(_))
        ));
    }

    #[test]
    fn upscale_reaches_target_resolution() {
        let small = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(110, 55)));
        assert_eq!(small.estimated_dpi(), 10.0);
        let upscaled = small.upscale_to_dpi(20);
        assert_eq!((upscaled.width(), upscaled.height()), (220, 110));

        let large = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(3300, 10)));
        assert_eq!(large.upscale_to_dpi(300).width(), 3300);
    }

    #[test]
    fn contrast_is_centred_on_the_mean() {
        let gray = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 100 } else { 140 }]));
        let out = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(gray))
            .adjust_contrast(2.0)
            .to_luma();
        assert_eq!(out.get_pixel(0, 0).0[0], 80);
        assert_eq!(out.get_pixel(1, 0).0[0], 160);
    }

    #[test]
    fn std_dev_of_flat_image_is_zero() {
        let flat = ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            8,
            8,
            Luma([77]),
        )));
        assert_eq!(flat.intensity_std_dev(), 0.0);
    }

    #[test]
    fn decoded_png_has_no_orientation_to_apply() {
        let data = png(DynamicImage::ImageLuma8(GrayImage::new(3, 2)));
        let processor = ImageProcessor::from_bytes(&data).unwrap().correct_orientation();
        assert_eq!((processor.width(), processor.height()), (3, 2));
    }
}
