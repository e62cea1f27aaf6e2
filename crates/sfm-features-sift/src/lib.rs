//! SIFT-like keypoint detector and descriptor.
//!
//! ## Quickstart
//!
//! ```
//! use sfm_features_core::ByteImage;
//! use sfm_features_sift::{Sift, SiftParams, DESCRIPTOR_LENGTH};
//!
//! let img = ByteImage::new(64, 64, 3).unwrap();
//! let sift = Sift::new(SiftParams::default());
//! let descriptors = sift.process(&img);
//! assert!(descriptors.iter().all(|d| d.data.len() == DESCRIPTOR_LENGTH));
//! ```
//!
//! Algorithm:
//! 1. Convert to luminance in `[0, 1]` and blur to the base scale.
//! 2. Per octave, build `samples_per_octave + 3` Gaussian levels and their
//!    differences (DoG).
//! 3. Keep 3x3x3 DoG extrema, refine them with a quadratic fit in (x, y, scale)
//!    and reject low-contrast and edge-like responses.
//! 4. Assign one or more dominant gradient orientations per keypoint.
//! 5. Describe each oriented keypoint with a 4x4 grid of 8-bin gradient
//!    histograms (128 values), normalized, clamped at 0.2 and renormalized.
//!
//! Keypoint positions are reported in pixels of the input image.

mod blur;
mod describe;
mod detector;
mod params;

pub use detector::Sift;
pub use params::SiftParams;

/// Length of every descriptor produced by [`Sift`].
pub const DESCRIPTOR_LENGTH: usize = 128;
