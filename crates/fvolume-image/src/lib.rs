// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// fvolume-image — Geometric preprocessing of captured images.
//
// Provides the radial distortion sampler, the per-pixel rectifier built on it,
// and the regulator that chains resize, rectification, center crop, and a
// final resize into a fixed-size square ready for volume estimation.

pub mod rectify;
pub mod regulate;
pub mod sampler;

pub use rectify::{Image, RectifyStats, rectify, rectify_with_stats};
pub use regulate::{CropWindow, ImageRegulator, center_crop, scale_resize};
pub use sampler::{RadialSampler, sample};
