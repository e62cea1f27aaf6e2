use serde::{Deserialize, Serialize};

/// Scale-space and rejection settings for [`crate::Sift`].
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SiftParams {
    /// DoG samples per octave used for extrema detection.
    pub samples_per_octave: usize,
    /// Index of the last octave to process (octave 0 is the input resolution).
    pub max_octave: usize,
    /// Minimal absolute DoG value of an accepted keypoint.
    ///
    /// `None` uses `0.02 / samples_per_octave`.
    pub contrast_threshold: Option<f32>,
    /// Maximal ratio of principal curvatures; larger values keep more
    /// edge-like responses.
    pub edge_ratio_threshold: f32,
    /// Blur of the first level of every octave.
    pub base_blur_sigma: f32,
    /// Blur assumed to be already present in the input image.
    pub inherent_blur_sigma: f32,
}

impl Default for SiftParams {
    fn default() -> Self {
        Self {
            samples_per_octave: 3,
            max_octave: 4,
            contrast_threshold: None,
            edge_ratio_threshold: 10.0,
            base_blur_sigma: 1.6,
            inherent_blur_sigma: 0.5,
        }
    }
}

impl SiftParams {
    pub fn effective_contrast_threshold(&self) -> f32 {
        self.contrast_threshold
            .unwrap_or(0.02 / self.samples_per_octave.max(1) as f32)
    }
}
