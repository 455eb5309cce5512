// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image regulator — scale to target resolution, rectify, center crop, and
// resize to the unified square size consumed by volume estimation.

use fvolume_core::error::{FvolumeError, Result};
use fvolume_core::{Calibration, ImageSize, RegulatorConfig, ResampleFilter};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Pixel};
use tracing::{debug, info, instrument};

use crate::rectify::{Image, rectify};

/// The square region kept by [`center_crop`], in `image` crate `(x, y)` terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    /// Column offset of the left edge.
    pub x: u32,
    /// Row offset of the top edge.
    pub y: u32,
    /// Edge length, equal to the shorter side of the image.
    pub side: u32,
}

impl CropWindow {
    /// Largest centered square. When the side difference is odd the extra
    /// pixel is dropped from the trailing edge.
    pub fn centered(size: ImageSize) -> Self {
        let side = size.min_side();
        let offset = size.rows.abs_diff(size.cols) / 2;
        if size.rows > size.cols {
            Self { x: 0, y: offset, side }
        } else {
            Self { x: offset, y: 0, side }
        }
    }
}

/// Crop the largest centered square out of `image`.
///
/// Square images are returned unchanged.
pub fn center_crop<P>(image: &Image<P>) -> Image<P>
where
    P: Pixel + 'static,
{
    let size = ImageSize::from_dimensions(image.dimensions());
    if size.is_square() {
        return image.clone();
    }
    let window = CropWindow::centered(size);
    debug!(x = window.x, y = window.y, side = window.side, "Center crop");
    imageops::crop_imm(image, window.x, window.y, window.side, window.side).to_image()
}

/// Resize both axes by the same `scale`, rounding to the nearest pixel count.
pub fn scale_resize<P>(image: &Image<P>, scale: f64, filter: FilterType) -> Result<Image<P>>
where
    P: Pixel + 'static,
{
    let scaled = |extent: u32| -> Result<u32> {
        let value = (f64::from(extent) * scale).round().max(1.0);
        if !value.is_finite() || value > f64::from(u32::MAX) {
            return Err(FvolumeError::InvalidImage(format!(
                "scaling {extent} px by {scale} overflows the image extent"
            )));
        }
        Ok(value as u32)
    };
    let width = scaled(image.width())?;
    let height = scaled(image.height())?;
    Ok(imageops::resize(image, width, height, filter))
}

pub(crate) fn filter_type(filter: ResampleFilter) -> FilterType {
    match filter {
        ResampleFilter::Nearest => FilterType::Nearest,
        ResampleFilter::Triangle => FilterType::Triangle,
        ResampleFilter::CatmullRom => FilterType::CatmullRom,
        ResampleFilter::Gaussian => FilterType::Gaussian,
        ResampleFilter::Lanczos3 => FilterType::Lanczos3,
    }
}

/// Turns an arbitrary capture into a rectified square of the unified size.
///
/// ```ignore
/// let regulator = ImageRegulator::new(RegulatorConfig::default())?;
/// let calibration = Calibration::from_path("capture.json")?;
/// let square = regulator.regulate(&image, &calibration)?;
/// assert_eq!(square.dimensions(), (224, 224));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageRegulator {
    config: RegulatorConfig,
}

impl ImageRegulator {
    pub fn new(config: RegulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegulatorConfig {
        &self.config
    }

    /// Run the full pipeline on an integer-sampled image buffer.
    ///
    /// The calibration center is given at the capture's native resolution and
    /// is rescaled alongside the image before rectification.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn regulate<P>(&self, image: &Image<P>, calibration: &Calibration) -> Result<Image<P>>
    where
        P: Pixel + Sync + 'static,
        P::Subpixel: Send + Sync + 'static,
    {
        calibration.validate()?;
        let size = ImageSize::from_dimensions(image.dimensions());
        if size.is_empty() {
            return Err(FvolumeError::InvalidImage(format!(
                "cannot regulate an empty {size} image"
            )));
        }

        let filter = filter_type(self.config.filter);
        let scale = f64::from(self.config.target_min_side()) / f64::from(size.min_side());
        info!(scale, "Scaling capture to target resolution");
        let resized = scale_resize(image, scale, filter)?;
        debug!(width = resized.width(), height = resized.height(), "Resize complete");

        let rectified = rectify(
            &resized,
            &calibration.lens_distortion_lookup_table,
            calibration.scaled_center(scale),
        )?;
        let cropped = center_crop(&rectified);

        let (rows, cols) = self.config.unified_image_size;
        let regulated = imageops::resize(&cropped, cols, rows, filter);
        info!(rows, cols, "Image regulated");
        Ok(regulated)
    }

    /// [`regulate`](Self::regulate) for a decoded image of any pixel layout.
    ///
    /// 8- and 16-bit buffers keep their layout; floating-point images are
    /// converted to RGBA8 first.
    pub fn regulate_dynamic(
        &self,
        image: &DynamicImage,
        calibration: &Calibration,
    ) -> Result<DynamicImage> {
        let regulated = match image {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(self.regulate(buf, calibration)?),
            DynamicImage::ImageLumaA8(buf) => {
                DynamicImage::ImageLumaA8(self.regulate(buf, calibration)?)
            }
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(self.regulate(buf, calibration)?),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(self.regulate(buf, calibration)?),
            DynamicImage::ImageLuma16(buf) => {
                DynamicImage::ImageLuma16(self.regulate(buf, calibration)?)
            }
            DynamicImage::ImageLumaA16(buf) => {
                DynamicImage::ImageLumaA16(self.regulate(buf, calibration)?)
            }
            DynamicImage::ImageRgb16(buf) => DynamicImage::ImageRgb16(self.regulate(buf, calibration)?),
            DynamicImage::ImageRgba16(buf) => {
                DynamicImage::ImageRgba16(self.regulate(buf, calibration)?)
            }
            other => DynamicImage::ImageRgba8(self.regulate(&other.to_rgba8(), calibration)?),
        };
        Ok(regulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fvolume_core::Point;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba32FImage};

    fn flat_calibration(center: Point<f64>) -> Calibration {
        Calibration::new(vec![0.0, 0.0, 0.0], center)
    }

    #[test]
    fn crop_window_tall_image() {
        let window = CropWindow::centered(ImageSize::new(10, 4));
        assert_eq!(window, CropWindow { x: 0, y: 3, side: 4 });
    }

    #[test]
    fn crop_window_drops_odd_margin_from_trailing_edge() {
        // 7 - 4 = 3, offset 1: keeps columns 1..5, drops column 0 and 5..7.
        let window = CropWindow::centered(ImageSize::new(4, 7));
        assert_eq!(window, CropWindow { x: 1, y: 0, side: 4 });
    }

    #[test]
    fn center_crop_wide_image_slices_columns() {
        let img = GrayImage::from_fn(7, 4, |x, y| Luma([(y * 10 + x) as u8]));
        let cropped = center_crop(&img);
        assert_eq!(cropped.dimensions(), (4, 4));
        for (x, y, pixel) in cropped.enumerate_pixels() {
            assert_eq!(pixel, img.get_pixel(x + 1, y));
        }
    }

    #[test]
    fn scale_resize_rounds_to_nearest() {
        let img = RgbImage::new(200, 100);
        let resized = scale_resize(&img, 2.24, FilterType::Triangle).expect("resize");
        assert_eq!(resized.dimensions(), (448, 224));

        let shrunk = scale_resize(&img, 0.333, FilterType::Triangle).expect("resize");
        assert_eq!(shrunk.dimensions(), (67, 33));
    }

    #[test]
    fn scale_resize_never_collapses_to_zero() {
        let img = RgbImage::new(10, 3);
        let resized = scale_resize(&img, 0.01, FilterType::Nearest).expect("resize");
        assert_eq!(resized.dimensions(), (1, 1));
    }

    #[test]
    fn scale_resize_rejects_overflow() {
        let img = RgbImage::new(2, 2);
        let err = scale_resize(&img, f64::INFINITY, FilterType::Nearest).unwrap_err();
        assert!(matches!(err, FvolumeError::InvalidImage(_)));
    }

    #[test]
    fn regulator_rejects_invalid_config() {
        let config = RegulatorConfig {
            unified_image_size: (224, 112),
            ..Default::default()
        };
        assert!(ImageRegulator::new(config).is_err());
    }

    #[test]
    fn regulate_rejects_empty_image() {
        let regulator = ImageRegulator::default();
        let img = RgbImage::new(0, 10);
        let err = regulator
            .regulate(&img, &flat_calibration(Point::new(0.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, FvolumeError::InvalidImage(_)));
    }

    #[test]
    fn regulate_rejects_degenerate_lookup_table() {
        let regulator = ImageRegulator::default();
        let img = RgbImage::from_pixel(20, 10, Rgb([1, 2, 3]));
        let calibration = Calibration::new(vec![0.1], Point::new(5.0, 10.0));
        let err = regulator.regulate(&img, &calibration).unwrap_err();
        assert!(matches!(err, FvolumeError::InvalidCalibration(_)));
    }

    #[test]
    fn regulate_dynamic_keeps_integer_layout() {
        let regulator = ImageRegulator::default();
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(40, 30, Luma([4000u16])));
        let out = regulator
            .regulate_dynamic(&img, &flat_calibration(Point::new(15.0, 20.0)))
            .expect("regulate");
        assert!(matches!(out, DynamicImage::ImageLuma16(_)));
        assert_eq!((out.width(), out.height()), (224, 224));
    }

    #[test]
    fn regulate_dynamic_converts_float_images() {
        let regulator = ImageRegulator::default();
        let img = DynamicImage::ImageRgba32F(Rgba32FImage::new(30, 40));
        let out = regulator
            .regulate_dynamic(&img, &flat_calibration(Point::new(20.0, 15.0)))
            .expect("regulate");
        assert!(matches!(out, DynamicImage::ImageRgba8(_)));
        assert_eq!((out.width(), out.height()), (224, 224));
    }
}
