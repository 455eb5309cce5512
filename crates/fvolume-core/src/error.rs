// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for fvolume.

use thiserror::Error;

/// Top-level error type for all fvolume operations.
#[derive(Debug, Error)]
pub enum FvolumeError {
    // -- Input validation --
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Codec (surfaced from the `image` crate) --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FvolumeError>;
