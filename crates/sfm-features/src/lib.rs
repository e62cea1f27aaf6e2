//! High-level facade crate for the `sfm-features-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - (feature-gated) an on-disk [`directory::DirectoryScene`] whose views keep
//!   their images and cached descriptors in plain files
//! - (feature-gated) the `sfm-features` command line tool
//!
//! ## Quickstart
//!
//! ```no_run
//! use sfm_features::directory::DirectoryScene;
//! use sfm_features::{FeatureType, Features, FeaturesOptions, ViewportList};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut scene = DirectoryScene::open("scene")?;
//! let options = FeaturesOptions {
//!     feature_embedding: "original-sift".into(),
//!     ..FeaturesOptions::default()
//! };
//!
//! let mut viewports = ViewportList::new();
//! Features::new(options).compute(&mut scene, FeatureType::Sift, Some(&mut viewports))?;
//! for (id, vp) in viewports.iter().enumerate() {
//!     println!("view {id}: {} features at {}x{}", vp.len(), vp.width, vp.height);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `sfm_features::core`: image container, half-size rescaling, descriptors, logging.
//! - `sfm_features::sift`: DoG keypoints with 128-float gradient histogram descriptors.
//! - `sfm_features::surf`: box-filter Hessian keypoints with 64-float Haar descriptors.
//! - `sfm_features::bundler`: the orchestrator, view store traits and descriptor cache format.
//! - `sfm_features::directory` (feature `image`): directory-backed scene.

pub use sfm_features_bundler as bundler;
pub use sfm_features_core as core;
pub use sfm_features_sift as sift;
pub use sfm_features_surf as surf;

pub use sfm_features_bundler::{
    FeatureEvent, FeatureType, Features, FeaturesError, FeaturesOptions, MemoryScene, MemoryView,
    Scene, StoreError, View, ViewId, Viewport, ViewportList,
};
pub use sfm_features_core::{ByteImage, Descriptor, Descriptors};

#[cfg(feature = "image")]
pub mod directory;
