use sfm_features_core::GrayImageF32;

/// Summed-area table over intensities in `0..=255`.
pub(crate) struct IntegralImage {
    width: usize,
    height: usize,
    sums: Vec<f64>, // (w + 1) x (h + 1), first row/column zero
}

impl IntegralImage {
    pub(crate) fn new(img: &GrayImageF32) -> Self {
        let (w, h) = (img.width, img.height);
        let stride = w + 1;
        let mut sums = vec![0f64; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0f64;
            for (x, &v) in img.row(y).iter().enumerate() {
                row_sum += v as f64 * 255.0;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row_sum;
            }
        }
        Self {
            width: w,
            height: h,
            sums,
        }
    }

    #[inline]
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// Sum over `cols x rows` pixels starting at `(x, y)`, clipped to the image.
    #[inline]
    pub(crate) fn box_sum(&self, x: isize, y: isize, cols: isize, rows: isize) -> f32 {
        let x0 = x.clamp(0, self.width as isize) as usize;
        let y0 = y.clamp(0, self.height as isize) as usize;
        let x1 = (x + cols).clamp(0, self.width as isize) as usize;
        let y1 = (y + rows).clamp(0, self.height as isize) as usize;
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        let s = self.width + 1;
        let sum = self.sums[y1 * s + x1] - self.sums[y0 * s + x1] - self.sums[y1 * s + x0]
            + self.sums[y0 * s + x0];
        sum as f32
    }
}
