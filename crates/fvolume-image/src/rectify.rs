// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectifier — undoes radial lens distortion by inverse-mapping every output
// pixel through the radial sampler and copying the source pixel it lands on.

use fvolume_core::error::Result;
use fvolume_core::{ImageSize, Point};
use image::{ImageBuffer, Pixel};
use tracing::{debug, instrument, warn};

use crate::sampler::RadialSampler;

/// An owned image buffer with the pixel's native subpixel type.
pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Pixel accounting for one rectification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectifyStats {
    /// Output pixels copied from an in-bounds source pixel.
    pub written: usize,
    /// Output pixels left at zero because the source fell outside the image.
    pub zero_filled: usize,
}

impl RectifyStats {
    pub fn zero_fill_ratio(&self) -> f64 {
        let total = self.written + self.zero_filled;
        if total == 0 {
            0.0
        } else {
            self.zero_filled as f64 / total as f64
        }
    }
}

/// Rectify `image` with the given lookup table and distortion center.
///
/// The output has the same dimensions and channel layout as the input.
/// Pixels whose source coordinate falls outside the input stay zero. A
/// lookup table with fewer than two entries is rejected before any pixel
/// is written.
pub fn rectify<P>(
    image: &Image<P>,
    lookup_table: &[f64],
    distortion_center: Point<f64>,
) -> Result<Image<P>>
where
    P: Pixel + Sync,
    P::Subpixel: Send + Sync,
{
    Ok(rectify_with_stats(image, lookup_table, distortion_center)?.0)
}

/// [`rectify`], also reporting how many pixels were zero-filled.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn rectify_with_stats<P>(
    image: &Image<P>,
    lookup_table: &[f64],
    distortion_center: Point<f64>,
) -> Result<(Image<P>, RectifyStats)>
where
    P: Pixel + Sync,
    P::Subpixel: Send + Sync,
{
    let size = ImageSize::from_dimensions(image.dimensions());
    let sampler = RadialSampler::new(lookup_table, distortion_center, size)?;
    let mut rectified: Image<P> = ImageBuffer::new(image.width(), image.height());
    if size.is_empty() {
        return Ok((rectified, RectifyStats::default()));
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    let cols = size.cols as usize;
    let source: &[P::Subpixel] = image.as_raw();

    // Each output row only reads the source, so rows are independent.
    let fill_row = |(row, out_row): (usize, &mut [P::Subpixel])| -> usize {
        let mut zero_filled = 0;
        for (col, out_pixel) in out_row.chunks_exact_mut(channels).enumerate() {
            let target = Point::new(row as f64, col as f64);
            match size.checked_index(sampler.sample(target)) {
                Some(src) => {
                    let offset = (src.row as usize * cols + src.col as usize) * channels;
                    out_pixel.copy_from_slice(&source[offset..offset + channels]);
                }
                None => zero_filled += 1,
            }
        }
        zero_filled
    };

    let stride = cols * channels;

    #[cfg(feature = "parallel")]
    let zero_filled: usize = {
        use rayon::prelude::*;
        rectified.par_chunks_mut(stride).enumerate().map(fill_row).sum()
    };

    #[cfg(not(feature = "parallel"))]
    let zero_filled: usize = rectified.chunks_mut(stride).enumerate().map(fill_row).sum();

    let stats = RectifyStats {
        written: size.pixel_count() - zero_filled,
        zero_filled,
    };
    debug!(
        written = stats.written,
        zero_filled = stats.zero_filled,
        radius_max = sampler.radius_max(),
        "Rectification complete"
    );
    if stats.zero_fill_ratio() > 0.5 {
        warn!(
            ratio = stats.zero_fill_ratio(),
            "Most rectified pixels fell outside the source; calibration may not match this resolution"
        );
    }
    Ok((rectified, stats))
}
