use sfm_features_core::ByteImage;
use sfm_features_sift::{Sift, SiftParams, DESCRIPTOR_LENGTH};

/// Gray background with bright Gaussian blobs at `centers`.
fn blob_image(w: usize, h: usize, centers: &[(f32, f32)], sigma: f32) -> ByteImage {
    let mut img = ByteImage::new(w, h, 3).expect("image");
    for y in 0..h {
        for x in 0..w {
            let mut v = 20.0f32;
            for &(cx, cy) in centers {
                let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                v += 220.0 * (-d2 / (2.0 * sigma * sigma)).exp();
            }
            let v = v.round().clamp(0.0, 255.0) as u8;
            for c in 0..3 {
                img.set(x, y, c, v);
            }
        }
    }
    img
}

#[test]
fn finds_keypoint_on_blob_center() {
    let img = blob_image(128, 128, &[(64.0, 64.0)], 6.0);
    let sift = Sift::new(SiftParams::default());
    let descriptors = sift.process(&img);

    assert!(!descriptors.is_empty(), "expected at least one keypoint");
    let closest = descriptors
        .iter()
        .map(|d| ((d.x - 64.0).powi(2) + (d.y - 64.0).powi(2)).sqrt())
        .fold(f32::INFINITY, f32::min);
    assert!(closest < 2.5, "closest keypoint is {closest:.2} px from the blob");
}

#[test]
fn descriptors_have_fixed_length_and_unit_norm() {
    let img = blob_image(160, 120, &[(40.0, 40.0), (110.0, 70.0)], 5.0);
    let descriptors = Sift::new(SiftParams::default()).process(&img);
    assert!(!descriptors.is_empty());
    for d in &descriptors {
        assert_eq!(d.data.len(), DESCRIPTOR_LENGTH);
        let norm = d.data.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3, "descriptor norm {norm}");
        assert!(d.x >= 0.0 && d.x < 160.0 && d.y >= 0.0 && d.y < 120.0);
    }
}

#[test]
fn processing_is_deterministic() {
    let img = blob_image(96, 96, &[(30.0, 50.0), (70.0, 40.0)], 4.0);
    let sift = Sift::new(SiftParams::default());
    assert_eq!(sift.process(&img), sift.process(&img));
}

#[test]
fn flat_and_tiny_images_yield_nothing() {
    let sift = Sift::new(SiftParams::default());
    assert!(sift.process(&ByteImage::new(64, 64, 1).expect("image")).is_empty());
    assert!(sift.process(&ByteImage::new(8, 8, 3).expect("image")).is_empty());
    assert!(sift.process(&ByteImage::default()).is_empty());
}

#[test]
fn high_contrast_threshold_rejects_everything() {
    let img = blob_image(128, 128, &[(64.0, 64.0)], 6.0);
    let params = SiftParams {
        contrast_threshold: Some(10.0),
        ..SiftParams::default()
    };
    assert!(Sift::new(params).process(&img).is_empty());
}
