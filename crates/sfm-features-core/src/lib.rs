//! Core types and utilities for per-view feature extraction.
//!
//! This crate is intentionally small. It does *not* depend on any concrete
//! keypoint detector or view store; it only provides the image container the
//! detectors consume, the half-size rescale used to bound extraction cost, and
//! the descriptor record every detector produces.

mod descriptor;
mod image;
mod logger;
mod pyramid;

pub use descriptor::{Descriptor, Descriptors};
pub use image::{sample_bilinear, sample_bilinear_u8, ByteImage, GrayImageF32, ImageError};
pub use pyramid::{rescale_down_to, rescale_half_size, rescale_to_max_area};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
