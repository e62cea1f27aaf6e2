use crate::embedding::EmbeddingError;
use crate::scene::{StoreError, ViewId};

/// Errors returned by [`crate::Features::compute`].
///
/// Any per-view error aborts the whole call.
#[derive(thiserror::Error, Debug)]
pub enum FeaturesError {
    #[error("neither viewports nor a feature embedding were requested")]
    NoOutputRequested,
    #[error("invalid feature type `{0}` (expected `sift` or `surf`)")]
    InvalidFeatureType(String),
    #[error(
        "view {view_id}: cached features were computed at {}x{} but the image rescales to {}x{}",
        cached.0, cached.1, actual.0, actual.1
    )]
    RescaleMismatch {
        view_id: ViewId,
        cached: (usize, usize),
        actual: (usize, usize),
    },
    #[error("view {view_id}: extractor produced a descriptor of length {found}, expected {expected}")]
    DescriptorLength {
        view_id: ViewId,
        expected: usize,
        found: usize,
    },
    #[error("view {view_id}: invalid feature embedding")]
    Embedding {
        view_id: ViewId,
        #[source]
        source: EmbeddingError,
    },
    #[error("view {view_id}: view store failure")]
    Store {
        view_id: ViewId,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
