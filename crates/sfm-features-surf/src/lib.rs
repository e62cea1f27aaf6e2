//! SURF-like keypoint detector and upright descriptor.
//!
//! Interest points are maxima of the determinant of a box-filter Hessian
//! evaluated on an integral image, over `octaves` octaves of four filter sizes
//! each (9, 15, 21, 27 for the first octave; sizes and sampling step double
//! with every octave). Descriptors sum Haar wavelet responses
//! `(dx, dy, |dx|, |dy|)` over a 4x4 grid of sub-regions (64 values, unit
//! length). Orientation is not estimated; descriptors are upright.

mod describe;
mod detector;
mod integral;
mod params;

pub use detector::Surf;
pub use params::SurfParams;

/// Length of every descriptor produced by [`Surf`].
pub const DESCRIPTOR_LENGTH: usize = 64;
