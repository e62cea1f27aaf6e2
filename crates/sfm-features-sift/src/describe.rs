//! Orientation assignment and the 4x4x8 gradient histogram descriptor.

use sfm_features_core::GrayImageF32;
use std::f32::consts::{PI, SQRT_2};

const TWO_PI: f32 = 2.0 * PI;

const ORI_BINS: usize = 36;
const ORI_SMOOTH_PASSES: usize = 6;
const ORI_PEAK_RATIO: f32 = 0.8;
const ORI_WINDOW_FACTOR: f32 = 1.5;

const DESC_WIDTH: usize = 4;
const DESC_BINS: usize = 8;
const DESC_BIN_SCALE: f32 = 3.0;
const DESC_CLAMP: f32 = 0.2;

#[inline]
fn gradient(img: &GrayImageF32, x: isize, y: isize) -> (f32, f32) {
    let dx = img.get_clamped(x + 1, y) - img.get_clamped(x - 1, y);
    let dy = img.get_clamped(x, y + 1) - img.get_clamped(x, y - 1);
    (dx.hypot(dy), dy.atan2(dx).rem_euclid(TWO_PI))
}

#[inline]
fn is_interior(img: &GrayImageF32, x: isize, y: isize) -> bool {
    x > 0 && y > 0 && x < img.width as isize - 1 && y < img.height as isize - 1
}

/// Dominant gradient orientations around `(x, y)`, in radians `[0, 2π)`.
///
/// Every smoothed histogram peak within `ORI_PEAK_RATIO` of the maximum
/// yields one orientation. Empty when the neighbourhood has no gradient.
pub(crate) fn dominant_orientations(img: &GrayImageF32, x: f32, y: f32, sigma: f32) -> Vec<f32> {
    let sigma_w = ORI_WINDOW_FACTOR * sigma;
    let radius = (3.0 * sigma_w).round() as isize;
    let (cx, cy) = (x.round() as isize, y.round() as isize);

    let mut hist = [0f32; ORI_BINS];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (px, py) = (cx + dx, cy + dy);
            if !is_interior(img, px, py) {
                continue;
            }
            let (rx, ry) = (px as f32 - x, py as f32 - y);
            let d2 = rx * rx + ry * ry;
            if d2 > (radius * radius) as f32 {
                continue;
            }
            let (mag, angle) = gradient(img, px, py);
            let bin = (angle * ORI_BINS as f32 / TWO_PI) as usize % ORI_BINS;
            hist[bin] += mag * (-d2 / (2.0 * sigma_w * sigma_w)).exp();
        }
    }

    for _ in 0..ORI_SMOOTH_PASSES {
        let prev = hist;
        for i in 0..ORI_BINS {
            hist[i] = (prev[(i + ORI_BINS - 1) % ORI_BINS] + prev[i] + prev[(i + 1) % ORI_BINS])
                / 3.0;
        }
    }

    let (argmax, max) = hist
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0f32), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    if max <= 0.0 {
        return Vec::new();
    }

    let mut orientations = Vec::new();
    for i in 0..ORI_BINS {
        let l = hist[(i + ORI_BINS - 1) % ORI_BINS];
        let c = hist[i];
        let r = hist[(i + 1) % ORI_BINS];
        if c > l && c > r && c >= ORI_PEAK_RATIO * max {
            let offset = 0.5 * (l - r) / (l - 2.0 * c + r);
            orientations.push(bin_angle(i as f32 + offset));
        }
    }
    // Plateaus have no strict peak; fall back to the strongest bin.
    if orientations.is_empty() {
        orientations.push(bin_angle(argmax as f32));
    }
    orientations
}

#[inline]
fn bin_angle(bin: f32) -> f32 {
    ((bin + 0.5) * TWO_PI / ORI_BINS as f32).rem_euclid(TWO_PI)
}

/// 128-value descriptor of the patch at `(x, y)` rotated by `orientation`.
pub(crate) fn describe(
    img: &GrayImageF32,
    x: f32,
    y: f32,
    sigma: f32,
    orientation: f32,
) -> Vec<f32> {
    let bin_width = DESC_BIN_SCALE * sigma;
    let half = DESC_WIDTH as f32 * 0.5;
    let radius = (bin_width * SQRT_2 * (DESC_WIDTH as f32 + 1.0) * 0.5).round() as isize;
    let (sin, cos) = orientation.sin_cos();
    let (cx, cy) = (x.round() as isize, y.round() as isize);

    let mut hist = vec![0f32; DESC_WIDTH * DESC_WIDTH * DESC_BINS];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (px, py) = (cx + dx, cy + dy);
            if !is_interior(img, px, py) {
                continue;
            }
            let (ox, oy) = (px as f32 - x, py as f32 - y);
            let rx = (cos * ox + sin * oy) / bin_width;
            let ry = (-sin * ox + cos * oy) / bin_width;
            let bx = rx + half - 0.5;
            let by = ry + half - 0.5;
            if bx <= -1.0 || by <= -1.0 || bx >= DESC_WIDTH as f32 || by >= DESC_WIDTH as f32 {
                continue;
            }

            let (mag, angle) = gradient(img, px, py);
            let bo = (angle - orientation).rem_euclid(TWO_PI) * DESC_BINS as f32 / TWO_PI;
            let weight = mag * (-(rx * rx + ry * ry) / (2.0 * half * half)).exp();
            accumulate(&mut hist, bx, by, bo, weight);
        }
    }

    normalize(&mut hist);
    hist.iter_mut().for_each(|v| *v = v.min(DESC_CLAMP));
    normalize(&mut hist);
    hist
}

/// Trilinear distribution of one sample over (x, y, orientation) bins.
fn accumulate(hist: &mut [f32], bx: f32, by: f32, bo: f32, weight: f32) {
    let (x0, y0, o0) = (bx.floor(), by.floor(), bo.floor());
    let (fx, fy, fo) = (bx - x0, by - y0, bo - o0);
    let o0 = o0 as usize % DESC_BINS;
    let o1 = (o0 + 1) % DESC_BINS;

    for (ix, wx) in [(x0 as isize, 1.0 - fx), (x0 as isize + 1, fx)] {
        if ix < 0 || ix >= DESC_WIDTH as isize {
            continue;
        }
        for (iy, wy) in [(y0 as isize, 1.0 - fy), (y0 as isize + 1, fy)] {
            if iy < 0 || iy >= DESC_WIDTH as isize {
                continue;
            }
            let cell = (iy as usize * DESC_WIDTH + ix as usize) * DESC_BINS;
            let w = weight * wx * wy;
            hist[cell + o0] += w * (1.0 - fo);
            hist[cell + o1] += w * fo;
        }
    }
}

fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|a| a * a).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|a| *a /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp_x(w: usize, h: usize) -> GrayImageF32 {
        let mut img = GrayImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.data[y * w + x] = x as f32 / w as f32;
            }
        }
        img
    }

    #[test]
    fn ramp_orientation_points_along_x() {
        let img = ramp_x(48, 48);
        let oris = dominant_orientations(&img, 24.0, 24.0, 2.0);
        assert!(!oris.is_empty());
        let best = oris
            .iter()
            .map(|&a| a.min(TWO_PI - a))
            .fold(f32::INFINITY, f32::min);
        assert!(best < 0.2, "closest orientation {best} rad from +x");
    }

    #[test]
    fn flat_patch_has_no_orientation() {
        let img = GrayImageF32::new(32, 32);
        assert!(dominant_orientations(&img, 16.0, 16.0, 2.0).is_empty());
    }

    #[test]
    fn descriptor_is_unit_length() {
        let img = ramp_x(64, 64);
        let d = describe(&img, 32.0, 32.0, 2.0, 0.0);
        assert_eq!(d.len(), 128);
        let norm = d.iter().map(|a| a * a).sum::<f32>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-4);
    }
}
