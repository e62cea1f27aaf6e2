//! Per-view feature extraction for incremental structure-from-motion.
//!
//! The entry point is [`Features::compute`]: for every view of a [`Scene`] it
//! loads the color image, downsizes it by repeated halving until it fits the
//! configured pixel budget, runs the selected [`FeatureType`] extractor and
//! fills one [`Viewport`] per view index. Views are processed in parallel on a
//! rayon pool, one view per dispatch.
//!
//! Descriptors can be cached in a named per-view embedding (see
//! [`embedding`]). On later runs the cached descriptors are decoded instead
//! of recomputed, and the source image is halved until it matches the
//! dimensions the descriptors were computed at.
//!
//! ```
//! use sfm_features_bundler::{
//!     FeatureType, Features, FeaturesOptions, MemoryScene, MemoryView, ViewportList,
//! };
//! use sfm_features_core::ByteImage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = ByteImage::new(64, 48, 3)?;
//! let mut scene = MemoryScene::new(vec![Some(MemoryView::new(0).with_image("original", image))]);
//!
//! let features = Features::new(FeaturesOptions::default());
//! let mut viewports = ViewportList::new();
//! features.compute(&mut scene, FeatureType::Sift, Some(&mut viewports))?;
//! assert_eq!(viewports.len(), 1);
//! assert_eq!((viewports[0].width, viewports[0].height), (64, 48));
//! # Ok(())
//! # }
//! ```

pub mod embedding;
mod features;
mod io;
mod memory;
mod scene;
mod viewport;

pub use embedding::{DecodedDescriptors, EmbeddingError, EmbeddingHeader};
pub use features::{
    build_extractor, FeatureEvent, FeatureExtractor, FeatureType, Features, FeaturesError,
    FeaturesOptions, ProgressFn,
};
pub use io::FeaturesIoError;
pub use memory::{MemoryScene, MemoryView};
pub use scene::{Scene, StoreError, View, ViewId};
pub use viewport::{Viewport, ViewportList};

pub use sfm_features_sift::SiftParams;
pub use sfm_features_surf::SurfParams;
