use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One localized keypoint with its descriptor vector.
///
/// `x`, `y` are pixel coordinates in the image the detector ran on. The length
/// of `data` is fixed by the detector that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub x: f32,
    pub y: f32,
    pub data: Vec<f32>,
}

pub type Descriptors = Vec<Descriptor>;

impl Descriptor {
    #[inline]
    pub fn position(&self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }
}
