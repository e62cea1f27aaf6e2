//! View store contracts consumed by the feature orchestrator.

use sfm_features_core::{ByteImage, ImageError};

/// Stable identifier of a view; equals its index in the scene.
pub type ViewId = usize;

/// Errors raised by a view store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("view {view_id} has no embedding `{name}`")]
    MissingEmbedding { view_id: ViewId, name: String },
    #[error("embedding `{name}` of view {view_id} is not an image")]
    NotAnImage { view_id: ViewId, name: String },
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("view store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One view of a scene: named images plus named opaque data embeddings.
///
/// Each view is visited by at most one worker at a time, so implementations
/// only need `Send`.
pub trait View: Send {
    fn id(&self) -> ViewId;

    /// Whether a data embedding with this name exists (loaded or on disk).
    fn has_data_embedding(&self, name: &str) -> bool;

    /// Bytes of a data embedding, loading it if needed.
    fn data(&mut self, name: &str) -> Result<&[u8], StoreError>;

    /// Create or replace a data embedding. The change is in-memory until
    /// [`View::save`].
    fn set_data(&mut self, name: &str, data: Vec<u8>);

    /// Color image stored under `name`, converted to 8 bits per sample.
    fn byte_image(&mut self, name: &str) -> Result<ByteImage, StoreError>;

    /// Persist pending changes.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Release cached image and data buffers that are not pending a save.
    fn cache_cleanup(&mut self);
}

/// An ordered collection of optional views.
///
/// Absent entries are tolerated: the orchestrator skips them and leaves the
/// corresponding output slot empty.
pub trait Scene {
    type View: View;

    fn views(&self) -> &[Option<Self::View>];

    fn views_mut(&mut self) -> &mut [Option<Self::View>];
}
