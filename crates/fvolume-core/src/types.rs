// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types: pixel coordinates, image extents, and the lens
// calibration record uploaded alongside each capture.

use std::ops::{Add, Div, Mul, Sub};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FvolumeError, Result};

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2-component `(row, col)` coordinate.
///
/// `Point<f64>` is used for distortion math, `Point<i64>` for truncated
/// source coordinates that may still lie outside the image. Serialised as a
/// two-element JSON array `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "[T; 2]",
    into = "[T; 2]",
    bound(serialize = "T: Serialize + Copy", deserialize = "T: Deserialize<'de>")
)]
pub struct Point<T> {
    pub row: T,
    pub col: T,
}

impl<T> Point<T> {
    pub const fn new(row: T, col: T) -> Self {
        Self { row, col }
    }
}

impl<T> From<[T; 2]> for Point<T> {
    fn from([row, col]: [T; 2]) -> Self {
        Self { row, col }
    }
}

impl<T> From<Point<T>> for [T; 2] {
    fn from(point: Point<T>) -> Self {
        [point.row, point.col]
    }
}

impl<T: Add<Output = T>> Add for Point<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.row + rhs.row, self.col + rhs.col)
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.row - rhs.row, self.col - rhs.col)
    }
}

impl<T: Mul<Output = T> + Copy> Mul<T> for Point<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self::new(self.row * rhs, self.col * rhs)
    }
}

impl<T: Div<Output = T> + Copy> Div<T> for Point<T> {
    type Output = Self;

    fn div(self, rhs: T) -> Self {
        Self::new(self.row / rhs, self.col / rhs)
    }
}

impl Point<f64> {
    /// Euclidean length of the vector from the origin.
    pub fn norm(self) -> f64 {
        (self.row * self.row + self.col * self.col).sqrt()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.row.max(other.row), self.col.max(other.col))
    }

    /// Truncate each component toward zero.
    pub fn truncate(self) -> Point<i64> {
        Point::new(self.row as i64, self.col as i64)
    }

    pub fn is_finite(self) -> bool {
        self.row.is_finite() && self.col.is_finite()
    }
}

// ---------------------------------------------------------------------------
// ImageSize
// ---------------------------------------------------------------------------

/// Extent of the two spatial axes of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub rows: u32,
    pub cols: u32,
}

impl ImageSize {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    /// Build from the `(width, height)` pair the `image` crate reports.
    pub const fn from_dimensions((width, height): (u32, u32)) -> Self {
        Self::new(height, width)
    }

    pub fn as_point(self) -> Point<f64> {
        Point::new(f64::from(self.rows), f64::from(self.cols))
    }

    pub fn min_side(self) -> u32 {
        self.rows.min(self.cols)
    }

    pub fn is_square(self) -> bool {
        self.rows == self.cols
    }

    pub fn is_empty(self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn pixel_count(self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Whether every component of `point` lies within `[0, dimension)`.
    pub fn contains(self, point: Point<i64>) -> bool {
        self.checked_index(point).is_some()
    }

    /// Convert `point` to an in-bounds index, or `None` if it falls outside.
    pub fn checked_index(self, point: Point<i64>) -> Option<Point<u32>> {
        let row = u32::try_from(point.row).ok().filter(|&r| r < self.rows)?;
        let col = u32::try_from(point.col).ok().filter(|&c| c < self.cols)?;
        Some(Point::new(row, col))
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// Lens calibration captured alongside an image.
///
/// Only the lookup table and the distortion center drive rectification. The
/// remaining fields are carried through from capture uploads unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Magnification factors indexed by normalised radius, innermost first.
    pub lens_distortion_lookup_table: Vec<f64>,
    /// Optical axis origin in pixel space, `[row, col]`, at capture resolution.
    pub lens_distortion_center: Point<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_lens_distortion_lookup_table: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic_matrix: Option<[[f64; 3]; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intrinsic_matrix_reference_dimensions: Option<[f64; 2]>,
}

/// A capture upload: the calibration is nested under `calibration_data`.
/// Other capture fields (depth map, attitude, crop rect) are ignored here.
///
/// The capture client writes `lens_distortion_center` as `[x, y]`, i.e.
/// `[col, row]`. [`CaptureRecord::into_calibration`] swaps it into the
/// `(row, col)` order used everywhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub calibration_data: Calibration,
}

impl CaptureRecord {
    /// The calibration with its center converted from `[x, y]` to `(row, col)`.
    pub fn into_calibration(self) -> Calibration {
        let mut calibration = self.calibration_data;
        let center = calibration.lens_distortion_center;
        calibration.lens_distortion_center = Point::new(center.col, center.row);
        calibration
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CalibrationDocument {
    Capture(CaptureRecord),
    Bare(Calibration),
}

impl Calibration {
    pub fn new(lookup_table: Vec<f64>, center: Point<f64>) -> Self {
        Self {
            lens_distortion_lookup_table: lookup_table,
            lens_distortion_center: center,
            inverse_lens_distortion_lookup_table: None,
            intrinsic_matrix: None,
            pixel_size: None,
            intrinsic_matrix_reference_dimensions: None,
        }
    }

    /// Parse a calibration from JSON and validate it.
    ///
    /// A bare record's center is read as `[row, col]`. A record wrapped in a
    /// [`CaptureRecord`] comes from the capture client and is read as `[x, y]`.
    pub fn from_json(json: &str) -> Result<Self> {
        let calibration = match serde_json::from_str::<CalibrationDocument>(json)? {
            CalibrationDocument::Capture(record) => record.into_calibration(),
            CalibrationDocument::Bare(calibration) => calibration,
        };
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Reject tables that cannot be interpolated and non-finite values.
    pub fn validate(&self) -> Result<()> {
        let table = &self.lens_distortion_lookup_table;
        if table.len() < 2 {
            return Err(FvolumeError::InvalidCalibration(format!(
                "lookup table needs at least 2 entries, got {}",
                table.len()
            )));
        }
        if let Some(index) = table.iter().position(|value| !value.is_finite()) {
            return Err(FvolumeError::InvalidCalibration(format!(
                "lookup table entry {index} is not finite"
            )));
        }
        if !self.lens_distortion_center.is_finite() {
            return Err(FvolumeError::InvalidCalibration(
                "distortion center is not finite".into(),
            ));
        }
        Ok(())
    }

    /// Distortion center in the coordinate space of an image resized by `scale`.
    pub fn scaled_center(&self, scale: f64) -> Point<f64> {
        self.lens_distortion_center * scale
    }

    /// Smallest and largest magnification in the table.
    pub fn magnification_range(&self) -> Option<(f64, f64)> {
        self.lens_distortion_lookup_table
            .iter()
            .copied()
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn point_arithmetic_is_component_wise() {
        let a = Point::new(1.5, -2.0);
        let b = Point::new(0.5, 4.0);
        assert_eq!(a + b, Point::new(2.0, 2.0));
        assert_eq!(a - b, Point::new(1.0, -6.0));
        assert_eq!(a * 2.0, Point::new(3.0, -4.0));
        assert_eq!(b / 0.5, Point::new(1.0, 8.0));
        assert_eq!(a.max(b), Point::new(1.5, 4.0));
    }

    #[test]
    fn point_norm_and_distance() {
        assert_eq!(Point::new(3.0, 4.0).norm(), 5.0);
        assert_eq!(Point::new(1.0, 1.0).distance(Point::new(4.0, 5.0)), 5.0);
    }

    #[test]
    fn truncate_rounds_toward_zero() {
        assert_eq!(Point::new(2.9, -0.5).truncate(), Point::new(2, 0));
        assert_eq!(Point::new(-1.7, 7.0).truncate(), Point::new(-1, 7));
    }

    #[test]
    fn checked_index_bounds() {
        let size = ImageSize::new(4, 6);
        assert_eq!(size.checked_index(Point::new(3, 5)), Some(Point::new(3, 5)));
        assert!(size.contains(Point::new(0, 0)));
        assert!(!size.contains(Point::new(-1, 0)));
        assert!(!size.contains(Point::new(4, 0)));
        assert!(!size.contains(Point::new(0, 6)));
        assert!(!size.contains(Point::new(i64::MAX, 0)));
    }

    #[test]
    fn image_size_from_width_height() {
        let size = ImageSize::from_dimensions((200, 100));
        assert_eq!(size, ImageSize::new(100, 200));
        assert_eq!(size.min_side(), 100);
        assert!(!size.is_square());
        assert_eq!(size.to_string(), "100x200");
    }

    #[test]
    fn parse_bare_calibration() {
        let json = r#"{
            "lens_distortion_lookup_table": [0.0, 0.01, 0.03],
            "lens_distortion_center": [1512.5, 2016.0]
        }"#;
        let calibration = Calibration::from_json(json).expect("valid calibration");
        assert_eq!(calibration.lens_distortion_lookup_table.len(), 3);
        assert_eq!(calibration.lens_distortion_center, Point::new(1512.5, 2016.0));
        assert!(calibration.intrinsic_matrix.is_none());
    }

    #[test]
    fn parse_capture_record() {
        let json = r#"{
            "calibration_data": {
                "intrinsic_matrix": [[2742.0, 0.0, 0.0], [0.0, 2742.0, 0.0], [1509.0, 2015.0, 1.0]],
                "pixel_size": 0.001,
                "intrinsic_matrix_reference_dimensions": [3024.0, 4032.0],
                "lens_distortion_center": [1510.0, 2014.0],
                "lens_distortion_lookup_table": [0.0, 0.002, 0.004, 0.008]
            },
            "device_attitude": {"pitch": 0.1, "roll": 0.0, "yaw": 1.2}
        }"#;
        let calibration = Calibration::from_json(json).expect("valid capture record");
        assert_eq!(calibration.lens_distortion_lookup_table.len(), 4);
        assert_eq!(calibration.pixel_size, Some(0.001));
        assert_eq!(
            calibration.intrinsic_matrix_reference_dimensions,
            Some([3024.0, 4032.0])
        );
        // Client writes [x, y]; stored as (row, col).
        assert_eq!(calibration.lens_distortion_center, Point::new(2014.0, 1510.0));
    }

    #[test]
    fn capture_record_center_is_swapped_to_row_col() {
        let bare = r#"{"lens_distortion_lookup_table": [0.0, 0.1], "lens_distortion_center": [30, 40]}"#;
        let wrapped = format!(r#"{{"calibration_data": {bare}}}"#);

        let from_bare = Calibration::from_json(bare).expect("bare calibration");
        let from_capture = Calibration::from_json(&wrapped).expect("capture record");
        assert_eq!(from_bare.lens_distortion_center, Point::new(30.0, 40.0));
        assert_eq!(from_capture.lens_distortion_center, Point::new(40.0, 30.0));
    }

    #[test]
    fn short_lookup_table_is_rejected() {
        let json = r#"{"lens_distortion_lookup_table": [0.1], "lens_distortion_center": [0, 0]}"#;
        let err = Calibration::from_json(json).unwrap_err();
        assert!(matches!(err, FvolumeError::InvalidCalibration(_)));
    }

    #[test]
    fn non_finite_center_is_rejected() {
        let calibration = Calibration::new(vec![0.0, 0.1], Point::new(f64::NAN, 1.0));
        assert!(calibration.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Calibration::from_json("{not json").unwrap_err();
        assert!(matches!(err, FvolumeError::Serialization(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"lens_distortion_lookup_table": [0.0, 0.5], "lens_distortion_center": [10, 20]}}"#
        )
        .expect("write calibration");

        let calibration = Calibration::from_path(file.path()).expect("load calibration");
        assert_eq!(calibration.lens_distortion_center, Point::new(10.0, 20.0));
        assert_eq!(calibration.magnification_range(), Some((0.0, 0.5)));
    }

    #[test]
    fn scaled_center_multiplies_both_axes() {
        let calibration = Calibration::new(vec![0.0, 0.0], Point::new(50.0, 100.0));
        assert_eq!(calibration.scaled_center(2.0), Point::new(100.0, 200.0));
    }

    #[test]
    fn center_round_trips_as_array() {
        let calibration = Calibration::new(vec![0.0, 0.25], Point::new(3.0, 4.0));
        let json = serde_json::to_string(&calibration).expect("serialize");
        assert!(json.contains("\"lens_distortion_center\":[3.0,4.0]"));
    }
}
