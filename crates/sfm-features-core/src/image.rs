/// Errors produced when wrapping raw pixel buffers.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid image dimensions (width={width}, height={height}, channels={channels})")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },
}

/// Interleaved 8-bit image with `channels` samples per pixel.
///
/// Row-major, `data.len() == width * height * channels`. The default value is
/// the empty 0x0 image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteImage {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl ByteImage {
    /// Zero-filled image.
    pub fn new(width: usize, height: usize, channels: usize) -> Result<Self, ImageError> {
        let len = checked_len(width, height, channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// Wrap an interleaved buffer.
    pub fn from_raw(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        let expected = checked_len(width, height, channels)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize, channel: usize) -> u8 {
        self.data[(y * self.width + x) * self.channels + channel]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: u8) {
        let idx = (y * self.width + x) * self.channels + channel;
        self.data[idx] = value;
    }

    /// Bilinear RGB color at `(x, y)`; gray images are replicated.
    pub fn color_at(&self, x: f32, y: f32) -> [u8; 3] {
        if self.channels >= 3 {
            [
                sample_bilinear_u8(self, x, y, 0),
                sample_bilinear_u8(self, x, y, 1),
                sample_bilinear_u8(self, x, y, 2),
            ]
        } else {
            let v = sample_bilinear_u8(self, x, y, 0);
            [v, v, v]
        }
    }
}

fn checked_len(width: usize, height: usize, channels: usize) -> Result<usize, ImageError> {
    if width == 0 || height == 0 || channels == 0 {
        return Err(ImageError::InvalidDimensions {
            width,
            height,
            channels,
        });
    }
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ImageError::InvalidDimensions {
            width,
            height,
            channels,
        })
}

/// Bilinear sample of one channel. Coordinates are clamped to the image, so
/// border pixels are replicated. Returns `0.0` for an empty image.
#[inline]
pub fn sample_bilinear(src: &ByteImage, x: f32, y: f32, channel: usize) -> f32 {
    if src.is_empty() || channel >= src.channels {
        return 0.0;
    }
    let x = clamp_coord(x, src.width);
    let y = clamp_coord(y, src.height);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.at(x0, y0, channel) as f32;
    let p10 = src.at(x1, y0, channel) as f32;
    let p01 = src.at(x0, y1, channel) as f32;
    let p11 = src.at(x1, y1, channel) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &ByteImage, x: f32, y: f32, channel: usize) -> u8 {
    sample_bilinear(src, x, y, channel).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn clamp_coord(v: f32, len: usize) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, (len - 1) as f32)
    } else {
        0.0
    }
}

/// Single-channel float image, intensities in `[0, 1]`.
#[derive(Clone, Debug)]
pub struct GrayImageF32 {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>, // row-major, len = w*h
}

impl GrayImageF32 {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Luminance of an 8-bit image (BT.601 weights for color input).
    pub fn from_byte_image(img: &ByteImage) -> Self {
        let mut out = Self::new(img.width(), img.height());
        let c = img.channels();
        for (dst, px) in out.data.iter_mut().zip(img.as_raw().chunks_exact(c)) {
            let v = if c >= 3 {
                0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32
            } else {
                px[0] as f32
            };
            *dst = v / 255.0;
        }
        out
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Read with replicated borders.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let w = self.width;
        &mut self.data[y * w..(y + 1) * w]
    }
}
