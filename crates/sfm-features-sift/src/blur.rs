use sfm_features_core::GrayImageF32;

pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(1.0) as isize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Separable Gaussian blur with replicated borders.
pub(crate) fn gaussian_blur(src: &GrayImageF32, sigma: f32) -> GrayImageF32 {
    if sigma <= 0.0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let (w, h) = (src.width, src.height);

    let mut tmp = GrayImageF32::new(w, h);
    for y in 0..h {
        let row = src.row(y);
        let out = tmp.row_mut(y);
        for (x, dst) in out.iter_mut().enumerate() {
            let mut acc = 0.0;
            for (k, &wk) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += wk * row[sx];
            }
            *dst = acc;
        }
    }

    let mut out = GrayImageF32::new(w, h);
    for y in 0..h {
        let dst = out.row_mut(y);
        for (k, &wk) in kernel.iter().enumerate() {
            let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
            for (d, &s) in dst.iter_mut().zip(tmp.row(sy)) {
                *d += wk * s;
            }
        }
    }
    out
}

/// Keep every other pixel in both directions.
pub(crate) fn decimate(src: &GrayImageF32) -> GrayImageF32 {
    let w = (src.width / 2).max(1);
    let h = (src.height / 2).max(1);
    let mut out = GrayImageF32::new(w, h);
    for y in 0..h {
        let row = src.row((2 * y).min(src.height - 1));
        for (x, d) in out.row_mut(y).iter_mut().enumerate() {
            *d = row[(2 * x).min(src.width - 1)];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(1.3);
        assert_relative_eq!(k.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
        let n = k.len();
        for i in 0..n / 2 {
            assert_relative_eq!(k[i], k[n - 1 - i]);
        }
    }

    #[test]
    fn blur_preserves_constant_image() {
        let mut img = GrayImageF32::new(9, 7);
        img.data.iter_mut().for_each(|v| *v = 0.25);
        let out = gaussian_blur(&img, 2.0);
        for v in out.data {
            assert_relative_eq!(v, 0.25, epsilon = 1e-5);
        }
    }

    #[test]
    fn decimate_halves_dimensions() {
        let mut img = GrayImageF32::new(5, 4);
        for (i, v) in img.data.iter_mut().enumerate() {
            *v = i as f32;
        }
        let out = decimate(&img);
        assert_eq!((out.width, out.height), (2, 2));
        assert_eq!(out.data, vec![0.0, 2.0, 10.0, 12.0]);
    }
}
