use crate::describe::describe_upright;
use crate::integral::IntegralImage;
use crate::params::SurfParams;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use sfm_features_core::{ByteImage, Descriptor, Descriptors, GrayImageF32};

#[cfg(feature = "tracing")]
use tracing::instrument;

const INTERVALS: usize = 4;
const DXY_WEIGHT: f32 = 0.9;
/// Interpolated extrema further than this (in sample units) are rejected.
const MAX_OFFSET: f32 = 1.0;

/// Hessian determinant responses of one filter size on the octave grid.
struct ResponseLayer {
    filter_size: usize,
    cols: usize,
    rows: usize,
    data: Vec<f32>,
}

impl ResponseLayer {
    #[inline]
    fn at(&self, c: usize, r: usize) -> f32 {
        self.data[r * self.cols + c]
    }
}

/// Refined keypoint in image pixels.
#[derive(Clone, Copy, Debug)]
struct Keypoint {
    x: f32,
    y: f32,
    scale: f32,
}

/// SURF-like detector.
pub struct Surf {
    params: SurfParams,
}

impl Surf {
    pub fn new(params: SurfParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SurfParams {
        &self.params
    }

    /// Detect and describe keypoints of `image`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    pub fn process(&self, image: &ByteImage) -> Descriptors {
        if image.is_empty() {
            return Vec::new();
        }
        let integral = IntegralImage::new(&GrayImageF32::from_byte_image(image));
        let min_side = integral.width().min(integral.height());

        let mut keypoints = Vec::new();
        for octave in 0..self.params.octaves {
            let step = 1usize << octave;
            let sizes = filter_sizes(octave);
            if sizes[INTERVALS - 1] > min_side {
                break;
            }
            let layers: Vec<ResponseLayer> = sizes
                .iter()
                .map(|&size| build_layer(&integral, size, step))
                .collect();
            let before = keypoints.len();
            for m in 1..INTERVALS - 1 {
                self.find_maxima(&layers, m, step, &mut keypoints);
            }
            debug!(
                "surf octave {octave}: step {step}, {} keypoints",
                keypoints.len() - before
            );
        }

        keypoints
            .into_iter()
            .map(|kp| Descriptor {
                x: kp.x,
                y: kp.y,
                data: describe_upright(&integral, kp.x, kp.y, kp.scale),
            })
            .collect()
    }

    fn find_maxima(
        &self,
        layers: &[ResponseLayer],
        m: usize,
        step: usize,
        out: &mut Vec<Keypoint>,
    ) {
        let (below, mid, above) = (&layers[m - 1], &layers[m], &layers[m + 1]);
        let border = above.filter_size / (2 * step) + 1;
        if mid.cols <= 2 * border || mid.rows <= 2 * border {
            return;
        }
        for r in border..mid.rows - border {
            for c in border..mid.cols - border {
                let v = mid.at(c, r);
                if v <= self.params.contrast_threshold || !is_maximum([below, mid, above], c, r) {
                    continue;
                }
                if let Some(kp) = interpolate([below, mid, above], c, r, step) {
                    out.push(kp);
                }
            }
        }
    }
}

fn filter_sizes(octave: usize) -> [usize; INTERVALS] {
    let mut sizes = [0; INTERVALS];
    for (i, s) in sizes.iter_mut().enumerate() {
        *s = 3 * ((2usize << octave) * (i + 1) + 1);
    }
    sizes
}

fn build_layer(integral: &IntegralImage, size: usize, step: usize) -> ResponseLayer {
    let cols = integral.width() / step;
    let rows = integral.height() / step;
    let lobe = (size / 3) as isize;
    let border = ((size - 1) / 2) as isize;
    let size_i = size as isize;
    let inv_area = 1.0 / (size * size) as f32;

    let mut data = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            let x = (c * step) as isize;
            let y = (r * step) as isize;
            let dxx = integral.box_sum(x - border, y - lobe + 1, size_i, 2 * lobe - 1)
                - 3.0 * integral.box_sum(x - lobe / 2, y - lobe + 1, lobe, 2 * lobe - 1);
            let dyy = integral.box_sum(x - lobe + 1, y - border, 2 * lobe - 1, size_i)
                - 3.0 * integral.box_sum(x - lobe + 1, y - lobe / 2, 2 * lobe - 1, lobe);
            let dxy = integral.box_sum(x + 1, y - lobe, lobe, lobe)
                + integral.box_sum(x - lobe, y + 1, lobe, lobe)
                - integral.box_sum(x - lobe, y - lobe, lobe, lobe)
                - integral.box_sum(x + 1, y + 1, lobe, lobe);
            let (dxx, dyy, dxy) = (dxx * inv_area, dyy * inv_area, dxy * inv_area);
            data.push(dxx * dyy - (DXY_WEIGHT * dxy).powi(2));
        }
    }

    ResponseLayer {
        filter_size: size,
        cols,
        rows,
        data,
    }
}

fn is_maximum(layers: [&ResponseLayer; 3], c: usize, r: usize) -> bool {
    let v = layers[1].at(c, r);
    for (li, layer) in layers.iter().enumerate() {
        for nr in r - 1..=r + 1 {
            for nc in c - 1..=c + 1 {
                if li == 1 && nr == r && nc == c {
                    continue;
                }
                if layer.at(nc, nr) >= v {
                    return false;
                }
            }
        }
    }
    true
}

/// Quadratic fit of the response around a discrete maximum.
fn interpolate(layers: [&ResponseLayer; 3], c: usize, r: usize, step: usize) -> Option<Keypoint> {
    let [b, m, t] = layers;
    let v = m.at(c, r);

    let gx = 0.5 * (m.at(c + 1, r) - m.at(c - 1, r));
    let gy = 0.5 * (m.at(c, r + 1) - m.at(c, r - 1));
    let gs = 0.5 * (t.at(c, r) - b.at(c, r));

    let dxx = m.at(c + 1, r) + m.at(c - 1, r) - 2.0 * v;
    let dyy = m.at(c, r + 1) + m.at(c, r - 1) - 2.0 * v;
    let dss = t.at(c, r) + b.at(c, r) - 2.0 * v;
    let dxy = 0.25 * (m.at(c + 1, r + 1) - m.at(c - 1, r + 1) - m.at(c + 1, r - 1)
        + m.at(c - 1, r - 1));
    let dxs = 0.25 * (t.at(c + 1, r) - t.at(c - 1, r) - b.at(c + 1, r) + b.at(c - 1, r));
    let dys = 0.25 * (t.at(c, r + 1) - t.at(c, r - 1) - b.at(c, r + 1) + b.at(c, r - 1));

    let hess = Matrix3::new(
        dxx, dxy, dxs, //
        dxy, dyy, dys, //
        dxs, dys, dss,
    );
    let offset = -hess.lu().solve(&Vector3::new(gx, gy, gs))?;
    if offset.iter().any(|o| !o.is_finite() || o.abs() >= MAX_OFFSET) {
        return None;
    }

    let size_step = (t.filter_size - m.filter_size) as f32;
    let size = m.filter_size as f32 + offset.z * size_step;
    Some(Keypoint {
        x: (c as f32 + offset.x) * step as f32,
        y: (r as f32 + offset.y) * step as f32,
        scale: 1.2 * size / 9.0,
    })
}
