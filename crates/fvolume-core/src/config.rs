// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Regulator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FvolumeError, Result};

/// Output edge length shared by every regulated image.
pub const UNIFIED_IMAGE_SIZE: (u32, u32) = (224, 224);

/// Resampling kernel used by both resize steps of the regulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

/// Settings for the image regulation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorConfig {
    /// Final `(rows, cols)` of every regulated image. Both must be equal.
    pub unified_image_size: (u32, u32),
    /// Kernel for the pre-rectification and final resize.
    pub filter: ResampleFilter,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            unified_image_size: UNIFIED_IMAGE_SIZE,
            filter: ResampleFilter::default(),
        }
    }
}

impl RegulatorConfig {
    /// Load and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (rows, cols) = self.unified_image_size;
        if rows == 0 || cols == 0 {
            return Err(FvolumeError::InvalidConfig(format!(
                "unified image size must be positive, got {rows}x{cols}"
            )));
        }
        if rows != cols {
            return Err(FvolumeError::InvalidConfig(format!(
                "unified image size must be square, got {rows}x{cols}"
            )));
        }
        Ok(())
    }

    /// Shorter side of the unified size; the pre-rectification resize target.
    pub fn target_min_side(&self) -> u32 {
        let (rows, cols) = self.unified_image_size;
        rows.min(cols)
    }
}
