use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sfm_features_core::{ByteImage, Descriptor};

/// Per-view feature record consumed by matching.
///
/// Keypoint `i` has position `positions[i]`, color `colors[i]` and descriptor
/// `descr_data[i * descriptor_length..(i + 1) * descriptor_length]`. Positions
/// are in the pixels of the (possibly downscaled) `width x height` image the
/// features were computed at. An absent view leaves its slot at the default
/// value, which has no keypoints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
    pub descriptor_length: usize,
    pub positions: Vec<Point2<f32>>,
    pub colors: Vec<[u8; 3]>,
    pub descr_data: Vec<f32>,
}

/// One viewport per scene view, indexed by view id.
pub type ViewportList = Vec<Viewport>;

impl Viewport {
    /// Number of keypoints.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Descriptor vector of keypoint `i`.
    pub fn descriptor(&self, i: usize) -> Option<&[f32]> {
        let len = self.descriptor_length;
        self.descr_data.get(i * len..(i + 1) * len)
    }

    /// Flatten `descriptors` computed on `image`. Colors are sampled from the
    /// image at each keypoint position.
    pub(crate) fn from_descriptors(
        image: &ByteImage,
        descriptors: &[Descriptor],
        descriptor_length: usize,
    ) -> Self {
        let mut positions = Vec::with_capacity(descriptors.len());
        let mut colors = Vec::with_capacity(descriptors.len());
        let mut descr_data = Vec::with_capacity(descriptors.len() * descriptor_length);
        for d in descriptors {
            positions.push(d.position());
            colors.push(image.color_at(d.x, d.y));
            descr_data.extend_from_slice(&d.data);
        }
        Self {
            width: image.width(),
            height: image.height(),
            descriptor_length,
            positions,
            colors,
            descr_data,
        }
    }
}
