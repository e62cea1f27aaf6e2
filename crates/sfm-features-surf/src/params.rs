use serde::{Deserialize, Serialize};

/// Settings for [`crate::Surf`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfParams {
    /// Number of octaves to search. Octaves whose largest filter does not fit
    /// into the image are skipped.
    pub octaves: usize,
    /// Minimal Hessian determinant (intensities in `0..=255`) of a keypoint.
    pub contrast_threshold: f32,
}

impl Default for SurfParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            contrast_threshold: 500.0,
        }
    }
}
