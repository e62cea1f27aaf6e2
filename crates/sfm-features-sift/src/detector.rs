use crate::blur::{decimate, gaussian_blur};
use crate::describe::{describe, dominant_orientations};
use crate::params::SiftParams;
use log::debug;
use nalgebra::{Matrix3, Vector3};
use sfm_features_core::{ByteImage, Descriptor, Descriptors, GrayImageF32};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Octaves smaller than this (in either dimension) are not processed.
const MIN_OCTAVE_SIDE: usize = 16;
const MAX_LOCALIZE_STEPS: usize = 5;

struct Octave {
    blurred: Vec<GrayImageF32>,
    dog: Vec<GrayImageF32>,
}

/// Refined extremum in octave pixel coordinates.
#[derive(Clone, Copy, Debug)]
struct Keypoint {
    x: f32,
    y: f32,
    sample: f32,
}

/// SIFT-like detector.
pub struct Sift {
    params: SiftParams,
}

impl Sift {
    pub fn new(params: SiftParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &SiftParams {
        &self.params
    }

    /// Detect and describe keypoints of `image`.
    ///
    /// Output order is deterministic: octave, scale sample, row, column, then
    /// orientation.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, image), fields(width = image.width(), height = image.height()))
    )]
    pub fn process(&self, image: &ByteImage) -> Descriptors {
        let mut out = Vec::new();
        if image.is_empty() {
            return out;
        }

        let p = &self.params;
        let samples = p.samples_per_octave.max(1);
        let gray = GrayImageF32::from_byte_image(image);
        let pre_blur = (p.base_blur_sigma.powi(2) - p.inherent_blur_sigma.powi(2))
            .max(0.0)
            .sqrt();
        let mut base = gaussian_blur(&gray, pre_blur);

        for octave in 0..=p.max_octave {
            if base.width < MIN_OCTAVE_SIDE || base.height < MIN_OCTAVE_SIDE {
                break;
            }
            let oct = build_octave(base, samples, p.base_blur_sigma);
            let scale = 2f32.powi(octave as i32);

            let keypoints = self.find_keypoints(&oct, samples);
            debug!(
                "sift octave {octave}: {}x{}, {} keypoints",
                oct.dog[0].width,
                oct.dog[0].height,
                keypoints.len()
            );

            for kp in keypoints {
                let sigma = p.base_blur_sigma * 2f32.powf(kp.sample / samples as f32);
                let level = &oct.blurred[(kp.sample.round() as usize).clamp(1, samples)];
                for orientation in dominant_orientations(level, kp.x, kp.y, sigma) {
                    out.push(Descriptor {
                        x: kp.x * scale,
                        y: kp.y * scale,
                        data: describe(level, kp.x, kp.y, sigma, orientation),
                    });
                }
            }

            base = decimate(&oct.blurred[samples]);
        }

        out
    }

    fn find_keypoints(&self, oct: &Octave, samples: usize) -> Vec<Keypoint> {
        let threshold = self.params.effective_contrast_threshold();
        let (w, h) = (oct.dog[0].width, oct.dog[0].height);
        let mut keypoints = Vec::new();
        for s in 1..=samples {
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    if oct.dog[s].get(x, y).abs() < 0.5 * threshold {
                        continue;
                    }
                    if !is_extremum(&oct.dog, s, x, y) {
                        continue;
                    }
                    if let Some(kp) = self.localize(&oct.dog, samples, s, x, y) {
                        keypoints.push(kp);
                    }
                }
            }
        }
        keypoints
    }

    /// Quadratic refinement in (x, y, scale) followed by contrast and edge
    /// rejection.
    fn localize(
        &self,
        dog: &[GrayImageF32],
        samples: usize,
        s: usize,
        x: usize,
        y: usize,
    ) -> Option<Keypoint> {
        let (w, h) = (dog[0].width as isize, dog[0].height as isize);
        let (mut xi, mut yi, mut si) = (x, y, s);

        let mut fit = None;
        for _ in 0..MAX_LOCALIZE_STEPS {
            let (grad, hess) = derivatives(dog, si, xi, yi);
            let offset = -hess.lu().solve(&grad)?;
            if offset.iter().all(|o| o.abs() < 0.5) {
                fit = Some((grad, hess, offset));
                break;
            }
            let nx = xi as isize + offset.x.round() as isize;
            let ny = yi as isize + offset.y.round() as isize;
            let ns = si as isize + offset.z.round() as isize;
            if nx < 1 || ny < 1 || nx >= w - 1 || ny >= h - 1 || ns < 1 || ns > samples as isize {
                return None;
            }
            (xi, yi, si) = (nx as usize, ny as usize, ns as usize);
        }
        let (grad, hess, offset) = fit?;

        let contrast = dog[si].get(xi, yi) + 0.5 * grad.dot(&offset);
        if contrast.abs() < self.params.effective_contrast_threshold() {
            return None;
        }

        let (dxx, dyy, dxy) = (hess[(0, 0)], hess[(1, 1)], hess[(0, 1)]);
        let trace = dxx + dyy;
        let det = dxx * dyy - dxy * dxy;
        let r = self.params.edge_ratio_threshold;
        if det <= 0.0 || trace * trace * r >= (r + 1.0) * (r + 1.0) * det {
            return None;
        }

        Some(Keypoint {
            x: xi as f32 + offset.x,
            y: yi as f32 + offset.y,
            sample: si as f32 + offset.z,
        })
    }
}

fn build_octave(base: GrayImageF32, samples: usize, base_sigma: f32) -> Octave {
    let k = 2f32.powf(1.0 / samples as f32);
    let mut blurred = Vec::with_capacity(samples + 3);
    blurred.push(base);
    let mut sigma_prev = base_sigma;
    for _ in 1..samples + 3 {
        let sigma = sigma_prev * k;
        let step = (sigma * sigma - sigma_prev * sigma_prev).sqrt();
        let next = gaussian_blur(&blurred[blurred.len() - 1], step);
        blurred.push(next);
        sigma_prev = sigma;
    }

    let dog = blurred
        .windows(2)
        .map(|pair| {
            let mut d = pair[1].clone();
            for (v, &lo) in d.data.iter_mut().zip(&pair[0].data) {
                *v -= lo;
            }
            d
        })
        .collect();

    Octave { blurred, dog }
}

fn is_extremum(dog: &[GrayImageF32], s: usize, x: usize, y: usize) -> bool {
    let v = dog[s].get(x, y);
    let mut is_max = true;
    let mut is_min = true;
    for (li, level) in dog[s - 1..=s + 1].iter().enumerate() {
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if li == 1 && nx == x && ny == y {
                    continue;
                }
                let n = level.get(nx, ny);
                is_max &= v > n;
                is_min &= v < n;
            }
        }
        if !is_max && !is_min {
            return false;
        }
    }
    is_max || is_min
}

/// Central-difference gradient and Hessian of the DoG stack at `(x, y, s)`.
fn derivatives(dog: &[GrayImageF32], s: usize, x: usize, y: usize) -> (Vector3<f32>, Matrix3<f32>) {
    let d = |ds: isize, dy: isize, dx: isize| {
        dog[(s as isize + ds) as usize].get((x as isize + dx) as usize, (y as isize + dy) as usize)
    };
    let c = d(0, 0, 0);

    let gx = 0.5 * (d(0, 0, 1) - d(0, 0, -1));
    let gy = 0.5 * (d(0, 1, 0) - d(0, -1, 0));
    let gs = 0.5 * (d(1, 0, 0) - d(-1, 0, 0));

    let dxx = d(0, 0, 1) + d(0, 0, -1) - 2.0 * c;
    let dyy = d(0, 1, 0) + d(0, -1, 0) - 2.0 * c;
    let dss = d(1, 0, 0) + d(-1, 0, 0) - 2.0 * c;
    let dxy = 0.25 * (d(0, 1, 1) - d(0, 1, -1) - d(0, -1, 1) + d(0, -1, -1));
    let dxs = 0.25 * (d(1, 0, 1) - d(1, 0, -1) - d(-1, 0, 1) + d(-1, 0, -1));
    let dys = 0.25 * (d(1, 1, 0) - d(1, -1, 0) - d(-1, 1, 0) + d(-1, -1, 0));

    (
        Vector3::new(gx, gy, gs),
        Matrix3::new(
            dxx, dxy, dxs, //
            dxy, dyy, dys, //
            dxs, dys, dss,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with_peak(value: f32) -> Vec<GrayImageF32> {
        (0..3)
            .map(|s| {
                let mut img = GrayImageF32::new(5, 5);
                if s == 1 {
                    img.data[2 * 5 + 2] = value;
                }
                img
            })
            .collect()
    }

    #[test]
    fn isolated_peak_is_extremum() {
        assert!(is_extremum(&stack_with_peak(1.0), 1, 2, 2));
        assert!(is_extremum(&stack_with_peak(-1.0), 1, 2, 2));
        assert!(!is_extremum(&stack_with_peak(0.0), 1, 2, 2));
    }

    #[test]
    fn octave_has_expected_levels() {
        let mut base = GrayImageF32::new(20, 20);
        base.data[210] = 1.0;
        let oct = build_octave(base, 3, 1.6);
        assert_eq!(oct.blurred.len(), 6);
        assert_eq!(oct.dog.len(), 5);
    }
}
