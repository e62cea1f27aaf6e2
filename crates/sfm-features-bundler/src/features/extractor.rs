use sfm_features_core::{ByteImage, Descriptors};
use sfm_features_sift::Sift;
use sfm_features_surf::Surf;

use super::{FeatureType, FeaturesOptions};

/// Keypoint detector plus descriptor computation.
///
/// Implementations are stateless with respect to the processed image, so a
/// single instance is shared by all workers of a call.
pub trait FeatureExtractor: Send + Sync {
    /// Length of every descriptor returned by [`FeatureExtractor::process`].
    fn descriptor_length(&self) -> usize;

    /// Detect and describe keypoints. Positions are in `image` pixels.
    fn process(&self, image: &ByteImage) -> Descriptors;
}

impl FeatureExtractor for Sift {
    fn descriptor_length(&self) -> usize {
        sfm_features_sift::DESCRIPTOR_LENGTH
    }

    fn process(&self, image: &ByteImage) -> Descriptors {
        Sift::process(self, image)
    }
}

impl FeatureExtractor for Surf {
    fn descriptor_length(&self) -> usize {
        sfm_features_surf::DESCRIPTOR_LENGTH
    }

    fn process(&self, image: &ByteImage) -> Descriptors {
        Surf::process(self, image)
    }
}

/// Construct the extractor for `kind` from its section of `options`.
pub fn build_extractor(kind: FeatureType, options: &FeaturesOptions) -> Box<dyn FeatureExtractor> {
    match kind {
        FeatureType::Sift => Box::new(Sift::new(options.sift.clone())),
        FeatureType::Surf => Box::new(Surf::new(options.surf.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_extractor_matches_variant_length() {
        let options = FeaturesOptions::default();
        for kind in FeatureType::ALL {
            let extractor = build_extractor(kind, &options);
            assert_eq!(extractor.descriptor_length(), kind.descriptor_length());
        }
    }

    #[test]
    fn extractors_find_nothing_on_flat_image() {
        let mut image = ByteImage::new(64, 64, 3).unwrap();
        for y in 0..64 {
            for x in 0..64 {
                for c in 0..3 {
                    image.set(x, y, c, 128);
                }
            }
        }
        let options = FeaturesOptions::default();
        for kind in FeatureType::ALL {
            assert!(build_extractor(kind, &options).process(&image).is_empty());
        }
    }
}
