use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sfm_features_sift::SiftParams;
use sfm_features_surf::SurfParams;

use super::FeaturesError;

/// Extractor variant selected for a [`crate::Features::compute`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    #[default]
    Sift,
    Surf,
}

impl FeatureType {
    pub const ALL: [FeatureType; 2] = [FeatureType::Sift, FeatureType::Surf];

    /// Length of every descriptor produced by this variant.
    pub const fn descriptor_length(self) -> usize {
        match self {
            FeatureType::Sift => sfm_features_sift::DESCRIPTOR_LENGTH,
            FeatureType::Surf => sfm_features_surf::DESCRIPTOR_LENGTH,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FeatureType::Sift => "sift",
            FeatureType::Surf => "surf",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = FeaturesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        FeatureType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FeaturesError::InvalidFeatureType(s.to_string()))
    }
}

/// Configuration of the feature orchestrator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesOptions {
    /// Variant used by [`crate::Features::compute_configured`].
    pub feature_type: FeatureType,
    /// Ignore cached descriptors and always extract.
    pub force_recompute: bool,
    /// Name of the per-view data embedding that caches descriptors. Empty
    /// disables caching.
    pub feature_embedding: String,
    /// Name of the per-view color image to extract from.
    pub image_embedding: String,
    /// Maximal pixel count of the image handed to the extractor. Larger
    /// images are halved until they fit.
    pub max_image_size: usize,
    /// Update the feature embedding in memory without persisting the view.
    pub skip_saving_views: bool,
    /// Size of a dedicated worker pool. `None` uses the global rayon pool.
    pub num_threads: Option<usize>,
    pub sift: SiftParams,
    pub surf: SurfParams,
}

impl Default for FeaturesOptions {
    fn default() -> Self {
        Self {
            feature_type: FeatureType::Sift,
            force_recompute: false,
            feature_embedding: String::new(),
            image_embedding: "original".to_string(),
            max_image_size: 6_000_000,
            skip_saving_views: false,
            num_threads: None,
            sift: SiftParams::default(),
            surf: SurfParams::default(),
        }
    }
}

impl FeaturesOptions {
    /// Whether descriptors are read from and written to a view embedding.
    #[inline]
    pub fn caching_enabled(&self) -> bool {
        !self.feature_embedding.is_empty()
    }
}
