use std::sync::{Arc, Mutex};

use sfm_features_bundler::{
    embedding, FeatureEvent, FeatureType, Features, FeaturesError, FeaturesOptions, MemoryScene,
    MemoryView, StoreError, View, Viewport, ViewportList,
};
use sfm_features_core::{rescale_to_max_area, ByteImage, Descriptor};

/// Dark background with bright Gaussian blobs at `centers`.
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
            img.set(x, y, 0, v);
            img.set(x, y, 1, v.saturating_sub(10));
            img.set(x, y, 2, v / 2);
        }
    }
    img
}

fn view_image(id: usize) -> ByteImage {
    let shift = id as f32 * 3.0;
    blob_image(160, 120, &[(40.0 + shift, 40.0), (110.0, 70.0 - shift)], 5.0)
}

fn blob_scene(views: usize) -> MemoryScene {
    MemoryScene::new(
        (0..views)
            .map(|id| Some(MemoryView::new(id).with_image("original", view_image(id))))
            .collect(),
    )
}

fn caching(name: &str) -> FeaturesOptions {
    FeaturesOptions {
        feature_embedding: name.to_string(),
        ..FeaturesOptions::default()
    }
}

fn recorder(features: Features) -> (Features, Arc<Mutex<Vec<FeatureEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let features = features.with_progress(move |e| sink.lock().unwrap().push(e.clone()));
    (features, events)
}

fn assert_consistent(vp: &Viewport, descriptor_length: usize) {
    assert_eq!(vp.descriptor_length, descriptor_length);
    assert_eq!(vp.colors.len(), vp.len());
    assert_eq!(vp.descr_data.len(), vp.len() * descriptor_length);
    for p in &vp.positions {
        assert!(p.x >= 0.0 && p.x < vp.width as f32, "x={} w={}", p.x, vp.width);
        assert!(p.y >= 0.0 && p.y < vp.height as f32, "y={} h={}", p.y, vp.height);
    }
}

#[test]
fn viewports_are_consistent_for_every_variant() {
    for kind in FeatureType::ALL {
        let mut scene = blob_scene(3);
        let mut viewports = ViewportList::new();
        Features::new(FeaturesOptions::default())
            .compute(&mut scene, kind, Some(&mut viewports))
            .expect("compute");

        assert_eq!(viewports.len(), 3);
        for vp in &viewports {
            assert_eq!((vp.width, vp.height), (160, 120));
            assert_consistent(vp, kind.descriptor_length());
        }
    }
}

#[test]
fn sift_viewport_colors_come_from_the_image() {
    let mut scene = blob_scene(1);
    let mut viewports = ViewportList::new();
    Features::new(FeaturesOptions::default())
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect("compute");

    let vp = &viewports[0];
    assert!(!vp.is_empty());
    let image = view_image(0);
    for (p, color) in vp.positions.iter().zip(&vp.colors) {
        assert_eq!(*color, image.color_at(p.x, p.y));
    }
}

#[test]
fn large_images_are_halved_to_the_budget() {
    let mut options = FeaturesOptions::default();
    options.max_image_size = 80 * 60;
    let (features, events) = recorder(Features::new(options));

    let mut scene = blob_scene(2);
    let mut viewports = ViewportList::new();
    features
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect("compute");

    let (expected, levels) = rescale_to_max_area(view_image(1), 80 * 60);
    assert_eq!(levels, 1);
    let vp = &viewports[1];
    assert_eq!((vp.width, vp.height), (160 >> 1, 120 >> 1));
    assert_consistent(vp, 128);
    for (p, color) in vp.positions.iter().zip(&vp.colors) {
        assert_eq!(*color, expected.color_at(p.x, p.y));
    }

    let rescaled = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, FeatureEvent::Rescaled { levels: 1, .. }))
        .count();
    assert_eq!(rescaled, 2);
}

#[test]
fn cached_features_match_fresh_ones() {
    let options = caching("original-sift");
    let mut scene = blob_scene(2);

    let mut fresh = ViewportList::new();
    Features::new(options.clone())
        .compute(&mut scene, FeatureType::Sift, Some(&mut fresh))
        .expect("first compute");
    let stored = scene
        .view(0)
        .and_then(|v| v.data_embedding("original-sift"))
        .expect("embedding written")
        .to_vec();
    let decoded = embedding::decode(&stored, 128).expect("decode");
    assert_eq!((decoded.width, decoded.height), (160, 120));
    assert_eq!(decoded.descriptors.len(), fresh[0].len());

    let (features, events) = recorder(Features::new(options));
    let mut cached = ViewportList::new();
    features
        .compute(&mut scene, FeatureType::Sift, Some(&mut cached))
        .expect("second compute");

    assert_eq!(fresh, cached);
    // Views with an empty cached set are extracted again.
    for event in events.lock().unwrap().iter() {
        match event {
            FeatureEvent::Extracted { view_id, .. } => assert!(fresh[*view_id].is_empty()),
            FeatureEvent::LoadedFromCache { view_id, count } => {
                assert_eq!(*count, fresh[*view_id].len())
            }
            _ => {}
        }
    }
    assert!(!fresh[0].is_empty());
}

#[test]
fn cache_is_reused_across_a_downscaled_run() {
    let mut options = caching("features");
    options.max_image_size = 80 * 60;
    let mut scene = blob_scene(1);
    Features::new(options.clone())
        .compute(&mut scene, FeatureType::Surf, None)
        .expect("cache-only compute");

    let mut viewports = ViewportList::new();
    Features::new(options)
        .compute(&mut scene, FeatureType::Surf, Some(&mut viewports))
        .expect("viewport compute");
    assert_eq!((viewports[0].width, viewports[0].height), (80, 60));
    assert_consistent(&viewports[0], 64);
}

#[test]
fn absent_views_leave_default_slots() {
    let mut scene = MemoryScene::new(vec![
        Some(MemoryView::new(0).with_image("original", view_image(0))),
        None,
        Some(MemoryView::new(2).with_image("original", view_image(2))),
    ]);
    let mut viewports = ViewportList::new();
    Features::new(FeaturesOptions::default())
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect("compute");

    assert_eq!(viewports.len(), 3);
    assert_eq!(viewports[1], Viewport::default());
    assert_eq!((viewports[0].width, viewports[2].width), (160, 160));
}

#[test]
fn stale_cache_aborts_the_whole_call() {
    let stale = embedding::encode(
        &[Descriptor {
            x: 3.0,
            y: 4.0,
            data: vec![0.0; 128],
        }],
        128,
        50,
        50,
    )
    .expect("encode");
    let mut scene = blob_scene(3);
    scene
        .view_mut(1)
        .expect("view")
        .set_data("features", stale);

    let mut viewports = ViewportList::new();
    let err = Features::new(caching("features"))
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect_err("mismatch must fail");
    assert!(matches!(
        err,
        FeaturesError::RescaleMismatch {
            view_id: 1,
            cached: (50, 50),
            actual: (40, 30),
        }
    ));
    assert!(viewports.is_empty());
}

#[test]
fn thread_count_does_not_change_results() {
    let run = |threads| {
        let mut options = FeaturesOptions::default();
        options.num_threads = Some(threads);
        let mut scene = blob_scene(4);
        let mut viewports = ViewportList::new();
        Features::new(options)
            .compute(&mut scene, FeatureType::Surf, Some(&mut viewports))
            .expect("compute");
        viewports
    };
    assert_eq!(run(1), run(4));
}

#[test]
fn missing_outputs_are_a_precondition_error() {
    let mut scene = blob_scene(1);
    let err = Features::new(FeaturesOptions::default())
        .compute(&mut scene, FeatureType::Sift, None)
        .expect_err("no output requested");
    assert!(matches!(err, FeaturesError::NoOutputRequested));
    assert_eq!(scene.view(0).expect("view").cleanup_count(), 0);
}

#[test]
fn skip_saving_keeps_embedding_in_memory() {
    let mut options = caching("features");
    options.skip_saving_views = true;
    let mut scene = blob_scene(2);
    Features::new(options)
        .compute(&mut scene, FeatureType::Surf, None)
        .expect("compute");

    for id in 0..2 {
        let view = scene.view(id).expect("view");
        assert_eq!(view.save_count(), 0);
        assert!(view.data_embedding("features").is_some());
    }
}

#[test]
fn other_variant_cache_is_rejected() {
    let mut scene = blob_scene(1);
    Features::new(caching("features"))
        .compute(&mut scene, FeatureType::Surf, None)
        .expect("surf compute");

    let mut viewports = ViewportList::new();
    let err = Features::new(caching("features"))
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect_err("descriptor length differs");
    assert!(matches!(
        err,
        FeaturesError::Embedding {
            view_id: 0,
            source: embedding::EmbeddingError::DescriptorLength {
                expected: 128,
                found: 64
            }
        }
    ));
}

#[test]
fn missing_image_is_a_store_error() {
    let mut scene = MemoryScene::new(vec![Some(MemoryView::new(0))]);
    let mut viewports = ViewportList::new();
    let err = Features::new(FeaturesOptions::default())
        .compute(&mut scene, FeatureType::Sift, Some(&mut viewports))
        .expect_err("no image");
    assert!(matches!(
        err,
        FeaturesError::Store {
            view_id: 0,
            source: StoreError::MissingEmbedding { .. }
        }
    ));
}

#[test]
fn feature_type_names_are_validated() {
    assert_eq!("Sift".parse::<FeatureType>().expect("sift"), FeatureType::Sift);
    assert!(matches!(
        "harris".parse::<FeatureType>(),
        Err(FeaturesError::InvalidFeatureType(_))
    ));
}
