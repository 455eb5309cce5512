// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Radial distortion sampler — maps a target pixel of the rectified image to
// the source pixel it is read from, using a radial magnification lookup table.

use fvolume_core::error::{FvolumeError, Result};
use fvolume_core::{Calibration, ImageSize, Point};

/// Inverse mapping from rectified coordinates to distorted source coordinates.
///
/// The lookup table is indexed by radius normalised against `radius_max`, the
/// distance from the distortion center to the farthest image corner. Radii at
/// or beyond `radius_max` use the final table entry.
///
/// `radius_max` is fixed per image and computed on construction.
#[derive(Debug, Clone, Copy)]
pub struct RadialSampler<'a> {
    lookup_table: &'a [f64],
    center: Point<f64>,
    radius_max: f64,
}

impl<'a> RadialSampler<'a> {
    /// Fails with [`FvolumeError::InvalidCalibration`] when `lookup_table` has
    /// fewer than the two entries interpolation needs.
    pub fn new(
        lookup_table: &'a [f64],
        center: Point<f64>,
        image_size: ImageSize,
    ) -> Result<Self> {
        if lookup_table.len() < 2 {
            return Err(FvolumeError::InvalidCalibration(format!(
                "lookup table needs at least 2 entries, got {}",
                lookup_table.len()
            )));
        }
        let size = image_size.as_point();
        let farthest_corner = center.max(size - center);
        Ok(Self {
            lookup_table,
            center,
            radius_max: farthest_corner.norm(),
        })
    }

    pub fn center(&self) -> Point<f64> {
        self.center
    }

    pub fn radius_max(&self) -> f64 {
        self.radius_max
    }

    /// Magnification factor at distance `radius` from the distortion center.
    pub fn magnification(&self, radius: f64) -> f64 {
        let table = self.lookup_table;
        let last_index = table.len() - 1;
        if radius >= self.radius_max {
            return table[last_index];
        }

        let relative_position = radius / self.radius_max * last_index as f64;
        let floor = relative_position.floor();
        let frac = relative_position - floor;
        let lo = (floor as usize).min(last_index);
        let hi = (relative_position.ceil() as usize).min(last_index);
        table[lo] * (1.0 - frac) + table[hi] * frac
    }

    /// Source coordinate for the target `point`, truncated toward zero.
    ///
    /// The result may lie outside the image; callers bounds-check it.
    pub fn sample(&self, point: Point<f64>) -> Point<i64> {
        let offset = point - self.center;
        let magnification = self.magnification(offset.norm());
        (self.center + offset * (1.0 + magnification)).truncate()
    }
}

/// One-shot form of [`RadialSampler::sample`] for a single point.
pub fn sample(
    point: Point<f64>,
    calibration: &Calibration,
    image_size: ImageSize,
) -> Result<Point<i64>> {
    let sampler = RadialSampler::new(
        &calibration.lens_distortion_lookup_table,
        calibration.lens_distortion_center,
        image_size,
    )?;
    Ok(sampler.sample(point))
}
