//! Half-size rescaling for bounding extraction cost.
//!
//! Each step halves both dimensions (`w >> 1`, `h >> 1`, never below one
//! pixel) and averages the 2x2 source block of every output pixel. Applying
//! the step `k` times therefore yields `source_dims >> k`, which is what lets
//! cached descriptors be matched back to a source image by repeated halving.

use crate::ByteImage;

/// Downscale by exactly one pyramid level.
pub fn rescale_half_size(img: &ByteImage) -> ByteImage {
    if img.is_empty() {
        return img.clone();
    }
    let (iw, ih, c) = (img.width(), img.height(), img.channels());
    let ow = (iw >> 1).max(1);
    let oh = (ih >> 1).max(1);

    let src = img.as_raw();
    let mut out = Vec::with_capacity(ow * oh * c);
    for y in 0..oh {
        let y0 = (2 * y).min(ih - 1);
        let y1 = (2 * y + 1).min(ih - 1);
        for x in 0..ow {
            let x0 = (2 * x).min(iw - 1);
            let x1 = (2 * x + 1).min(iw - 1);
            for ch in 0..c {
                let sum = src[(y0 * iw + x0) * c + ch] as u32
                    + src[(y0 * iw + x1) * c + ch] as u32
                    + src[(y1 * iw + x0) * c + ch] as u32
                    + src[(y1 * iw + x1) * c + ch] as u32;
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }

    // Dimensions are derived from a valid image, so this cannot fail.
    ByteImage::from_raw(ow, oh, c, out).unwrap_or_default()
}

/// Halve until `width * height <= max_area`.
///
/// Returns the rescaled image and the number of halvings applied. Stops early
/// on a 1x1 image, which cannot shrink further.
pub fn rescale_to_max_area(mut img: ByteImage, max_area: usize) -> (ByteImage, u32) {
    let mut levels = 0;
    while img.area() > max_area && img.area() > 1 {
        img = rescale_half_size(&img);
        levels += 1;
    }
    (img, levels)
}

/// Halve while the image is strictly larger than `width x height` in both
/// dimensions.
///
/// The result matches the target exactly only when the target is reachable by
/// integer halving; callers must compare the dimensions afterwards.
pub fn rescale_down_to(mut img: ByteImage, width: usize, height: usize) -> ByteImage {
    while img.width() > width && img.height() > height {
        let next = rescale_half_size(&img);
        if next.width() == img.width() && next.height() == img.height() {
            break;
        }
        img = next;
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: usize, h: usize, c: usize) -> ByteImage {
        let mut img = ByteImage::new(w, h, c).expect("image");
        for y in 0..h {
            for x in 0..w {
                for ch in 0..c {
                    img.set(x, y, ch, (((x + y) % 2) * 200 + ch) as u8);
                }
            }
        }
        img
    }

    #[test]
    fn half_size_averages_blocks() {
        let img = ByteImage::from_raw(2, 2, 1, vec![0, 100, 50, 250]).expect("image");
        let half = rescale_half_size(&img);
        assert_eq!((half.width(), half.height()), (1, 1));
        assert_eq!(half.as_raw(), &[100]);
    }

    #[test]
    fn half_size_floors_odd_dimensions() {
        let half = rescale_half_size(&checker(7, 5, 3));
        assert_eq!((half.width(), half.height(), half.channels()), (3, 2, 3));
        assert_eq!(half.at(0, 0, 0), 100);
        assert_eq!(half.at(0, 0, 2), 102);
    }

    #[test]
    fn max_area_uses_minimal_number_of_halvings() {
        let src = checker(640, 480, 3);
        let (img, levels) = rescale_to_max_area(src.clone(), 640 * 480);
        assert_eq!(levels, 0);
        assert_eq!(img, src);

        let (img, levels) = rescale_to_max_area(src.clone(), 10_000);
        assert_eq!(levels, 3);
        assert_eq!((img.width(), img.height()), (640 >> 3, 480 >> 3));
        assert!(img.area() <= 10_000);
        assert!((640 >> 2) * (480 >> 2) > 10_000);

        let (again, _) = rescale_to_max_area(src, 10_000);
        assert_eq!(again, img);
    }

    #[test]
    fn max_area_terminates_on_tiny_ceiling() {
        let (img, _) = rescale_to_max_area(checker(9, 3, 1), 0);
        assert_eq!((img.width(), img.height()), (1, 1));
    }

    #[test]
    fn down_to_reaches_reachable_size() {
        let img = rescale_down_to(checker(400, 300, 1), 100, 75);
        assert_eq!((img.width(), img.height()), (100, 75));

        let img = rescale_down_to(checker(400, 300, 1), 400, 300);
        assert_eq!((img.width(), img.height()), (400, 300));
    }

    #[test]
    fn down_to_stops_short_of_unreachable_size() {
        let img = rescale_down_to(checker(64, 64, 1), 30, 30);
        assert_eq!((img.width(), img.height()), (16, 16));
    }
}
