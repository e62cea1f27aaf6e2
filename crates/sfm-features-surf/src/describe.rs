use crate::integral::IntegralImage;

const GRID: usize = 4;
const SAMPLES_PER_CELL: usize = 5;

/// Haar wavelet responses `(dx, dy)` of side `size` centered at `(x, y)`.
#[inline]
fn haar(integral: &IntegralImage, x: isize, y: isize, size: isize) -> (f32, f32) {
    let half = size / 2;
    let dx = integral.box_sum(x, y - half, half, size) - integral.box_sum(x - half, y - half, half, size);
    let dy = integral.box_sum(x - half, y, size, half) - integral.box_sum(x - half, y - half, size, half);
    (dx, dy)
}

/// Upright 64-value descriptor on a `20 * scale` window around `(x, y)`.
pub(crate) fn describe_upright(integral: &IntegralImage, x: f32, y: f32, scale: f32) -> Vec<f32> {
    let samples = (GRID * SAMPLES_PER_CELL) as isize;
    let haar_size = ((2.0 * scale).round() as isize).max(2) & !1;
    let sigma = 3.3 * scale;
    let inv_two_sigma2 = 1.0 / (2.0 * sigma * sigma);

    let mut desc = vec![0f32; GRID * GRID * 4];
    for j in 0..samples {
        for i in 0..samples {
            let ox = (i - samples / 2) as f32 + 0.5;
            let oy = (j - samples / 2) as f32 + 0.5;
            let sx = x + ox * scale;
            let sy = y + oy * scale;
            let (dx, dy) = haar(integral, sx.round() as isize, sy.round() as isize, haar_size);

            let d2 = (ox * scale).powi(2) + (oy * scale).powi(2);
            let w = (-d2 * inv_two_sigma2).exp();
            let (dx, dy) = (dx * w, dy * w);

            let cell = (j as usize / SAMPLES_PER_CELL) * GRID + i as usize / SAMPLES_PER_CELL;
            let out = &mut desc[cell * 4..cell * 4 + 4];
            out[0] += dx;
            out[1] += dy;
            out[2] += dx.abs();
            out[3] += dy.abs();
        }
    }

    let norm = desc.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        desc.iter_mut().for_each(|v| *v /= norm);
    }
    desc
}
